//! rollcall-core — face matching and attendance bookkeeping.
//!
//! Faces are detected with SCRFD and embedded with ArcFace (ONNX Runtime,
//! CPU). Matching is nearest-neighbour over Euclidean distance. Attendance
//! lives in a flat CSV ledger rewritten on every change.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod gallery;
pub mod ledger;
pub mod photo;
pub mod recognizer;
pub mod roster;
pub mod types;

pub use encoder::{EncoderError, FaceEncoder, OnnxFaceEncoder};
pub use gallery::Gallery;
pub use ledger::{AttendanceRecord, CsvLedgerFile, Ledger, LedgerError, LedgerStorage, Status};
pub use roster::{Roster, RosterError};
pub use types::{
    BoundingBox, Embedding, EuclideanMatcher, MatchOutcome, MatchResult, Matcher,
    DEFAULT_MATCH_TOLERANCE,
};
