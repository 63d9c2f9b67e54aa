use image::RgbImage;
use rollcall_core::{EncoderError, EuclideanMatcher, FaceEncoder, Gallery, MatchOutcome};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    Enroll {
        name: String,
        images: Vec<PathBuf>,
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    Recognize {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<MatchOutcome>, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
///
/// The thread is the only owner of the encoder and the gallery, so gallery
/// growth and matching never race.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Encode each stored image and add its first face to the gallery under `name`.
    ///
    /// Returns how many embeddings were added. Images without a face are
    /// skipped; an unreadable image aborts the request, keeping whatever was
    /// added before it.
    pub async fn enroll(&self, name: &str, images: Vec<PathBuf>) -> Result<usize, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Enroll {
            name: name.to_string(),
            images,
            reply,
        })
        .await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Match every face in `image` against the gallery, in detector order.
    pub async fn recognize(&self, image: RgbImage) -> Result<Vec<MatchOutcome>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Recognize { image, reply }).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    async fn send(&self, request: EngineRequest) -> Result<(), EngineError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Takes ownership of an already-loaded encoder and the startup gallery
/// snapshot, then serves requests until every handle is dropped.
pub fn spawn_engine(
    mut encoder: Box<dyn FaceEncoder>,
    mut gallery: Gallery,
    tolerance: f32,
) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            tracing::info!(embeddings = gallery.len(), tolerance, "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Enroll {
                        name,
                        images,
                        reply,
                    } => {
                        let result = run_enroll(encoder.as_mut(), &mut gallery, &name, &images);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Recognize { image, reply } => {
                        let result = run_recognize(encoder.as_mut(), &gallery, &image, tolerance);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn run_enroll(
    encoder: &mut dyn FaceEncoder,
    gallery: &mut Gallery,
    name: &str,
    images: &[PathBuf],
) -> Result<usize, EngineError> {
    let mut added = 0;
    for path in images {
        if gallery.enroll_image(encoder, name, path)? {
            added += 1;
        } else {
            tracing::warn!(name, path = %path.display(), "no face found in image; skipping");
        }
    }
    tracing::debug!(name, added, total = gallery.len(), "enroll: gallery extended");
    Ok(added)
}

fn run_recognize(
    encoder: &mut dyn FaceEncoder,
    gallery: &Gallery,
    image: &RgbImage,
    tolerance: f32,
) -> Result<Vec<MatchOutcome>, EngineError> {
    let faces = encoder.encode(image)?;

    let outcomes = faces
        .iter()
        .map(|probe| {
            let result = gallery.decide(&EuclideanMatcher, probe, tolerance);
            tracing::debug!(
                outcome = result.outcome.label(),
                distance = ?result.distance,
                "recognize: face matched"
            );
            result.outcome
        })
        .collect();

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{solid, ColorEncoder};
    use rollcall_core::Roster;

    #[tokio::test]
    async fn test_recognize_empty_gallery_is_unknown() {
        let engine = spawn_engine(Box::new(ColorEncoder), Gallery::new(), 0.6).unwrap();
        let outcomes = engine.recognize(solid(4, [200, 0, 0])).await.unwrap();
        assert_eq!(outcomes, vec![MatchOutcome::Unknown]);
    }

    #[tokio::test]
    async fn test_enroll_then_recognize() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::open(dir.path().join("class")).unwrap();
        roster.ensure_person_dir("Alice").unwrap();
        let face = roster.person_dir("Alice").unwrap().join("0.png");
        solid(4, [200, 0, 0]).save(&face).unwrap();
        let blank = roster.person_dir("Alice").unwrap().join("1.png");
        solid(4, [0, 0, 0]).save(&blank).unwrap();

        let engine = spawn_engine(Box::new(ColorEncoder), Gallery::new(), 0.6).unwrap();
        assert_eq!(engine.enroll("Alice", vec![face, blank]).await.unwrap(), 1);

        let outcomes = engine.recognize(solid(4, [190, 5, 0])).await.unwrap();
        assert_eq!(outcomes, vec![MatchOutcome::Known("Alice".into())]);
    }

    #[tokio::test]
    async fn test_enroll_unreadable_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.jpg");
        std::fs::write(&path, b"garbage").unwrap();

        let engine = spawn_engine(Box::new(ColorEncoder), Gallery::new(), 0.6).unwrap();
        let err = engine.enroll("Alice", vec![path]).await.unwrap_err();
        assert!(matches!(err, EngineError::Encoder(EncoderError::Image(_))));
    }
}
