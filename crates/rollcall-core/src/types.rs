use serde::{Deserialize, Serialize, Serializer};

/// Default maximum Euclidean distance for two embeddings to count as the same person.
pub const DEFAULT_MATCH_TOLERANCE: f32 = 0.6;

/// Label reported for a face that matched nobody in the gallery.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Outcome of matching one query face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Known(String),
    Unknown,
}

impl MatchOutcome {
    /// The matched name, or `None` for an unknown face.
    pub fn name(&self) -> Option<&str> {
        match self {
            MatchOutcome::Known(name) => Some(name),
            MatchOutcome::Unknown => None,
        }
    }

    /// Name as reported to clients: the identifier, or `"Unknown"`.
    pub fn label(&self) -> &str {
        self.name().unwrap_or(UNKNOWN_LABEL)
    }
}

impl Serialize for MatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Result of matching a probe embedding against the gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Distance to the nearest stored embedding; `None` when the gallery is empty.
    pub distance: Option<f32>,
}

/// Strategy for deciding which enrolled person (if any) a probe embedding belongs to.
pub trait Matcher {
    fn decide(
        &self,
        probe: &Embedding,
        embeddings: &[Embedding],
        names: &[String],
        tolerance: f32,
    ) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// Every stored embedding is a candidate on its own; several embeddings of
/// the same person are not aggregated. Ties keep the lowest index.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn decide(
        &self,
        probe: &Embedding,
        embeddings: &[Embedding],
        names: &[String],
        tolerance: f32,
    ) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, stored) in embeddings.iter().enumerate() {
            let distance = probe.euclidean_distance(stored);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        match best {
            Some((idx, distance)) if distance <= tolerance => MatchResult {
                outcome: names
                    .get(idx)
                    .map(|name| MatchOutcome::Known(name.clone()))
                    .unwrap_or(MatchOutcome::Unknown),
                distance: Some(distance),
            },
            Some((_, distance)) => MatchResult {
                outcome: MatchOutcome::Unknown,
                distance: Some(distance),
            },
            None => MatchResult {
                outcome: MatchOutcome::Unknown,
                distance: None,
            },
        }
    }
}
