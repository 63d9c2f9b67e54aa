//! Face encoder seam: image in, one embedding per detected face out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Embedding;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("image decode failed: {0}")]
    Image(String),
}

/// Turns a decoded photo into face embeddings.
///
/// Embeddings are returned in the order the detector reports faces; callers
/// must not assume any spatial ordering.
pub trait FaceEncoder: Send {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError>;
}

/// SCRFD detection followed by ArcFace embedding, both via ONNX Runtime.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    /// Load `det_10g.onnx` and `w600k_r50.onnx` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(&model_dir.join(SCRFD_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(ARCFACE_MODEL_FILE))?;
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError> {
        let faces = self.detector.detect(image)?;
        tracing::debug!(faces = faces.len(), "faces detected");

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in &faces {
            match self.recognizer.extract(image, face) {
                Ok(embedding) => embeddings.push(embedding),
                // Faces decoded without landmarks cannot be aligned.
                Err(RecognizerError::NoLandmarks) => {
                    tracing::debug!(confidence = face.confidence, "face without landmarks skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(embeddings)
    }
}

/// Deterministic stand-in for the ONNX pipeline, for tests that need faces
/// without model files.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;

    /// Treats every square tile of the image (left to right) as one face whose
    /// embedding is the tile's mean color. Near-black tiles hold no face.
    pub struct ColorEncoder;

    impl FaceEncoder for ColorEncoder {
        fn encode(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError> {
            let side = image.height().max(1);
            let tiles = image.width() / side;
            let mut out = Vec::new();

            for tile in 0..tiles {
                let mut sum = [0.0f32; 3];
                for y in 0..image.height() {
                    for x in tile * side..(tile + 1) * side {
                        let p = image.get_pixel(x, y);
                        for c in 0..3 {
                            sum[c] += p[c] as f32;
                        }
                    }
                }
                let n = (side * image.height()) as f32;
                let mean: Vec<f32> = sum.iter().map(|s| s / n / 255.0).collect();
                if mean.iter().all(|&m| m < 0.06) {
                    continue;
                }
                out.push(Embedding::new(mean));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ColorEncoder;
    use super::*;

    #[test]
    fn test_color_encoder_tiles() {
        // Red tile, then a black tile that holds no face.
        let mut image = RgbImage::new(8, 4);
        for y in 0..4 {
            for x in 0..4 {
                image.put_pixel(x, y, image::Rgb([255, 0, 0]));
            }
        }
        let faces = ColorEncoder.encode(&image).unwrap();
        assert_eq!(faces.len(), 1);
        assert!((faces[0].values[0] - 1.0).abs() < 1e-6);
    }
}
