//! Nearest-match resolution of query faces against the gallery.

use serde::Serialize;

use crate::extractor::{BoundingBox, QueryFace};
use crate::scorer::{self, ScoreError};
use crate::storage::IdentityRecord;

/// Cosine-distance cutoff: a record at or above this is never a match.
/// System-wide (config), never per-request.
pub const DEFAULT_THRESHOLD: f32 = 0.30;

/// Sentinel name for a face that matches no gallery record.
pub const UNKNOWN: &str = "Unknown";

/// Per-face classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Matched identity name, or [`UNKNOWN`].
    pub name: String,
    /// `(1 - distance) * 100`, rounded to two decimals, when matched;
    /// exactly `0` when unmatched — never the rejected candidate's score.
    pub confidence: f32,
    /// The query face's detector box, passed through unchanged.
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl MatchResult {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN
    }
}

/// Classifies one query face against a gallery snapshot.
///
/// Linear scan; a record wins iff its distance is strictly below both the
/// threshold and the current best, so an exactly-at-threshold record is
/// rejected and exact ties keep the earliest-scanned record (insertion
/// order, per `Store::scan_all`). A scoring failure on any record aborts
/// the whole resolution rather than silently skipping the record.
pub fn resolve(
    gallery: &[IdentityRecord],
    face: &QueryFace,
    threshold: f32,
) -> Result<MatchResult, ScoreError> {
    let mut best_name: Option<&str> = None;
    let mut best_distance = f32::INFINITY;

    for record in gallery {
        let distance = scorer::distance(&record.embedding, &face.embedding)?;
        if distance < threshold && distance < best_distance {
            best_distance = distance;
            best_name = Some(&record.name);
        }
    }

    Ok(match best_name {
        Some(name) => MatchResult {
            name: name.to_owned(),
            confidence: confidence(best_distance),
            bbox: face.bbox,
        },
        None => MatchResult {
            name: UNKNOWN.to_owned(),
            confidence: 0.0,
            bbox: face.bbox,
        },
    })
}

/// Resolves every detected face independently against one gallery snapshot.
/// Results align with detector order; faces never interact (two faces may
/// both match the same identity).
pub fn resolve_all(
    gallery: &[IdentityRecord],
    faces: &[QueryFace],
    threshold: f32,
) -> Result<Vec<MatchResult>, ScoreError> {
    faces
        .iter()
        .map(|face| resolve(gallery, face, threshold))
        .collect()
}

fn confidence(distance: f32) -> f32 {
    ((1.0 - distance) * 100.0 * 100.0).round() / 100.0
}
