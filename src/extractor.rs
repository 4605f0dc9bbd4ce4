//! Boundary with the external face-detection and embedding model.
//!
//! The model itself is a collaborator, not part of this crate: anything
//! that can turn image bytes into per-face embeddings with bounding boxes
//! can sit behind [`FaceExtractor`]. The production implementation drives
//! a configured external command over stdin/stdout JSON.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Detector-reported face region in source-image pixel coordinates.
/// Opaque to the matcher; passed through to results unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One detected face in a query image. Transient: consumed by the matcher,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFace {
    pub embedding: Vec<f32>,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Whether zero detected faces is an error (`Strict`, registration) or an
/// empty result (`Tolerant`, recognition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Strict,
    Tolerant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no face detected in the image")]
    NoFaceDetected,
    #[error("image could not be decoded: {0}")]
    ImageDecode(String),
    #[error("extractor backend failed: {0}")]
    Backend(String),
}

pub trait FaceExtractor {
    /// Detects faces in `image` and returns one embedding + box per face.
    ///
    /// Strict mode fails with [`ExtractError::NoFaceDetected`] on zero
    /// faces; tolerant mode returns an empty vec. Undecodable input fails
    /// with [`ExtractError::ImageDecode`] in either mode — zero faces and
    /// an unreadable image are distinct outcomes.
    fn extract(&self, image: &[u8], mode: ExtractionMode) -> Result<Vec<QueryFace>, ExtractError>;
}

/// Applies strict-mode enforcement to a raw detection list. Implementations
/// whose backend has no native strict mode call this on the backend output.
pub fn apply_mode(
    mode: ExtractionMode,
    faces: Vec<QueryFace>,
) -> Result<Vec<QueryFace>, ExtractError> {
    match mode {
        ExtractionMode::Strict if faces.is_empty() => Err(ExtractError::NoFaceDetected),
        _ => Ok(faces),
    }
}

#[derive(Debug, Deserialize)]
struct SidecarReply {
    #[serde(default)]
    faces: Vec<QueryFace>,
    error: Option<SidecarFault>,
}

#[derive(Debug, Deserialize)]
struct SidecarFault {
    kind: String,
    message: String,
}

/// Runs the configured extractor command once per request: image bytes on
/// stdin, one JSON reply on stdout, either `{"faces": [...]}` or
/// `{"error": {"kind": ..., "message": ...}}`.
pub struct SidecarExtractor {
    command: String,
}

impl SidecarExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self, image: &[u8]) -> Result<Vec<QueryFace>, ExtractError> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ExtractError::Backend("extractor command is empty".to_owned()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractError::Backend(format!("spawning {program}: {e}")))?;

        // Feed stdin from a separate thread while draining stdout, so a
        // sidecar that replies before consuming the whole image cannot
        // deadlock on a full pipe buffer. Closing stdin signals end of
        // image; a sidecar that exits without draining it is fine, the
        // reply decides the outcome.
        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(mut stdin) = stdin {
                    if let Err(e) = stdin.write_all(image) {
                        log::debug!("extractor stdin closed early: {e}");
                    }
                }
            });
            child.wait_with_output()
        })
        .map_err(|e| ExtractError::Backend(format!("waiting for {program}: {e}")))?;

        let reply: SidecarReply = serde_json::from_slice(&output.stdout).map_err(|e| {
            log::debug!(
                "unparseable extractor reply, stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            ExtractError::Backend(format!("malformed extractor reply: {e}"))
        })?;

        if let Some(fault) = reply.error {
            return Err(match fault.kind.as_str() {
                "decode" => ExtractError::ImageDecode(fault.message),
                _ => ExtractError::Backend(fault.message),
            });
        }
        if !output.status.success() {
            return Err(ExtractError::Backend(format!(
                "extractor exited with {}",
                output.status
            )));
        }
        Ok(reply.faces)
    }
}

impl FaceExtractor for SidecarExtractor {
    fn extract(&self, image: &[u8], mode: ExtractionMode) -> Result<Vec<QueryFace>, ExtractError> {
        apply_mode(mode, self.run(image)?)
    }
}
