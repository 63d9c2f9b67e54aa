//! In-memory embedding gallery (the enrolled faces).

use crate::encoder::{EncoderError, FaceEncoder};
use crate::roster::{Roster, RosterError};
use crate::types::{Embedding, MatchResult, Matcher};
use std::path::Path;

/// Parallel collections of stored embeddings and the person each belongs to.
///
/// Append-only: no dedup, no capacity limit. A person with several images
/// simply owns several entries.
#[derive(Debug, Default, Clone)]
pub struct Gallery {
    embeddings: Vec<Embedding>,
    names: Vec<String>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_person(&mut self, name: &str, embedding: Embedding) {
        self.embeddings.push(embedding);
        self.names.push(name.to_string());
    }

    /// Both collections, index-aligned.
    pub fn all(&self) -> (&[Embedding], &[String]) {
        (&self.embeddings, &self.names)
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Distinct person names in enrollment order.
    pub fn names(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for name in &self.names {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
            }
        }
        seen
    }

    /// Match a probe against every stored embedding.
    pub fn decide(&self, matcher: &dyn Matcher, probe: &Embedding, tolerance: f32) -> MatchResult {
        matcher.decide(probe, &self.embeddings, &self.names, tolerance)
    }

    /// Encode one stored image and append its first face under `name`.
    ///
    /// Returns `Ok(false)` when the image holds no detectable face.
    pub fn enroll_image(
        &mut self,
        encoder: &mut dyn FaceEncoder,
        name: &str,
        path: &Path,
    ) -> Result<bool, EncoderError> {
        let unreadable = |e: String| EncoderError::Image(format!("{}: {e}", path.display()));
        // The `.jpg` name is not trusted; browsers often post PNG.
        let image = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| unreadable(e.to_string()))?
            .decode()
            .map_err(|e| unreadable(e.to_string()))?
            .to_rgb8();

        match encoder.encode(&image)?.into_iter().next() {
            Some(embedding) => {
                self.add_person(name, embedding);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Build the startup gallery from every image under the roster.
    ///
    /// Unreadable images and images without a face are skipped with a warning.
    pub fn scan(roster: &Roster, encoder: &mut dyn FaceEncoder) -> Result<Self, RosterError> {
        let mut gallery = Self::new();

        for name in roster.person_names()? {
            for path in roster.image_files(&name)? {
                match gallery.enroll_image(encoder, &name, &path) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(path = %path.display(), "no face found in image; skipping");
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "unreadable image; skipping");
                    }
                }
            }
        }

        tracing::info!(
            embeddings = gallery.len(),
            persons = gallery.names().len(),
            "gallery loaded"
        );
        Ok(gallery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::test_support::ColorEncoder;
    use image::ImageFormat;
    use std::io::Cursor;
    use crate::types::{EuclideanMatcher, MatchOutcome, DEFAULT_MATCH_TOLERANCE};
    use image::{Rgb, RgbImage};

    #[test]
    fn test_add_person_keeps_collections_aligned() {
        let mut gallery = Gallery::new();
        gallery.add_person("Alice", Embedding::new(vec![1.0]));
        gallery.add_person("Bob", Embedding::new(vec![2.0]));
        gallery.add_person("Alice", Embedding::new(vec![1.1]));

        let (embeddings, names) = gallery.all();
        assert_eq!(embeddings.len(), 3);
        assert_eq!(names, &["Alice", "Bob", "Alice"]);
        assert_eq!(gallery.names(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_decide_on_empty_gallery() {
        let gallery = Gallery::new();
        let probe = Embedding::new(vec![0.0]);
        let result = gallery.decide(&EuclideanMatcher, &probe, DEFAULT_MATCH_TOLERANCE);
        assert_eq!(result.outcome, MatchOutcome::Unknown);
    }

    #[test]
    fn test_scan_skips_faceless_and_broken_images() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::open(dir.path().join("class")).unwrap();

        roster.ensure_person_dir("Alice").unwrap();
        RgbImage::from_pixel(4, 4, Rgb([200, 0, 0]))
            .save(roster.person_dir("Alice").unwrap().join("0.png"))
            .unwrap();
        // Black images carry no face for the color encoder.
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save(roster.person_dir("Alice").unwrap().join("1.png"))
            .unwrap();
        roster.write_image("Alice", 2, b"not an image").unwrap();

        roster.ensure_person_dir("Bob").unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 200]))
            .save(roster.person_dir("Bob").unwrap().join("0.png"))
            .unwrap();

        let gallery = Gallery::scan(&roster, &mut ColorEncoder).unwrap();
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.names(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_enroll_image_sniffs_format_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::open(dir.path().join("class")).unwrap();

        let mut png = Vec::new();
        RgbImage::from_pixel(16, 16, Rgb([200, 0, 0]))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        // Registration always names the file `.jpg`.
        let path = roster.write_image("Alice", 0, &png).unwrap();

        let mut gallery = Gallery::new();
        assert!(gallery.enroll_image(&mut ColorEncoder, "Alice", &path).unwrap());
        assert_eq!(gallery.names(), vec!["Alice"]);
    }
}
