//! Registration and recognition orchestration over the gallery.
//!
//! Workflows take the store and extractor as explicit handles — no module
//! globals — and convert every failure into the client-facing response
//! shapes at the boundary. Internal invariant violations are logged in
//! full and surfaced only as generic messages.

use image::ImageFormat;
use serde::Serialize;
use std::error::Error as _;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::extractor::{ExtractError, ExtractionMode, FaceExtractor};
use crate::matcher::{self, MatchResult};
use crate::scorer::{self, ScoreError};
use crate::storage::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected before any extractor call: missing name, missing image,
    /// disallowed file type.
    #[error("{0}")]
    Validation(String),
    #[error("no face detected in the image")]
    NoFaceDetected,
    #[error("{0} faces detected where exactly one was expected")]
    MultipleFaces(usize),
    #[error("image could not be processed")]
    ImageDecode(String),
    #[error("extractor backend failed")]
    Extractor(String),
    #[error("embedding comparison failed")]
    Comparison(#[from] ScoreError),
    #[error("gallery storage failed")]
    Persistence(#[from] StoreError),
}

impl From<ExtractError> for ServiceError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NoFaceDetected => ServiceError::NoFaceDetected,
            ExtractError::ImageDecode(msg) => ServiceError::ImageDecode(msg),
            ExtractError::Backend(msg) => ServiceError::Extractor(msg),
        }
    }
}

impl ServiceError {
    /// Client-facing message. Internals (scorer, store, backend details)
    /// stay generic; the full error is logged by [`report`].
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(msg) => msg.clone(),
            ServiceError::NoFaceDetected => {
                "No face detected in the image. Please upload a clear photo.".to_owned()
            }
            ServiceError::MultipleFaces(count) => format!(
                "Found {count} faces where exactly one was expected. \
                 Please upload a photo with a single face."
            ),
            ServiceError::ImageDecode(_) => "Could not process the image.".to_owned(),
            ServiceError::Extractor(_) => "Face extraction failed.".to_owned(),
            ServiceError::Comparison(_) => "Face comparison failed.".to_owned(),
            ServiceError::Persistence(_) => "Could not access the face gallery.".to_owned(),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ServiceError::ImageDecode(_)
                | ServiceError::Extractor(_)
                | ServiceError::Comparison(_)
                | ServiceError::Persistence(_)
        )
    }
}

/// Registers one face under `name`: validation, strict single-face
/// extraction, then one durable insert. Returns the new record id.
pub fn register(
    store: &Store,
    extractor: &dyn FaceExtractor,
    name: &str,
    image: &[u8],
) -> Result<u64, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("Missing name".to_owned()));
    }
    validate_image(image)?;

    let mut faces = extractor.extract(image, ExtractionMode::Strict)?;
    if faces.len() > 1 {
        return Err(ServiceError::MultipleFaces(faces.len()));
    }
    // strict mode promises at least one face, but a misbehaving extractor
    // must surface as an error, not a panic
    let Some(face) = faces.pop() else {
        return Err(ServiceError::NoFaceDetected);
    };

    // A zero/NaN embedding would poison every later comparison; refuse it
    // at the door.
    scorer::validate(&face.embedding)?;

    let id = store.insert(name, face.embedding, now_secs())?;
    log::info!("registered '{name}' as record {id}");
    Ok(id)
}

/// Recognizes every face in `image` against one gallery snapshot taken
/// once for the whole request. Zero detected faces is a success with an
/// empty result list, distinct from an undecodable image.
pub fn recognize(
    store: &Store,
    extractor: &dyn FaceExtractor,
    image: &[u8],
    threshold: f32,
) -> Result<Vec<MatchResult>, ServiceError> {
    validate_image(image)?;

    let faces = extractor.extract(image, ExtractionMode::Tolerant)?;
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    let gallery = store.scan_all()?;
    let results = matcher::resolve_all(&gallery, &faces, threshold)?;
    log::info!(
        "recognized {} face(s) against {} record(s)",
        results.len(),
        gallery.len()
    );
    Ok(results)
}

fn validate_image(image: &[u8]) -> Result<(), ServiceError> {
    if image.is_empty() {
        return Err(ServiceError::Validation("No photo uploaded".to_owned()));
    }
    match image::guess_format(image) {
        Ok(ImageFormat::Png | ImageFormat::Jpeg) => Ok(()),
        Ok(other) => Err(ServiceError::Validation(format!(
            "Unsupported image type {other:?}; use PNG or JPEG"
        ))),
        Err(_) => Err(ServiceError::Validation(
            "File is not a recognizable image".to_owned(),
        )),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Logs the failure server-side and returns the client-facing message.
fn report(err: &ServiceError) -> String {
    if err.is_internal() {
        match err.source() {
            Some(source) => log::error!("request failed: {err}: {source}"),
            None => log::error!("request failed: {err:?}"),
        }
    } else {
        log::debug!("request rejected: {err}");
    }
    err.user_message()
}

/// Client-facing shape of a registration outcome.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterResponse {
    pub fn from_result(name: &str, result: Result<u64, ServiceError>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                message: Some(format!("User {} registered successfully!", name.trim())),
                error: None,
            },
            Err(err) => Self {
                success: false,
                message: None,
                error: Some(report(&err)),
            },
        }
    }
}

/// Client-facing shape of a recognition outcome. All-or-nothing: matches
/// are never mixed with an error.
#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub matches: Vec<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognizeResponse {
    pub fn from_result(result: Result<Vec<MatchResult>, ServiceError>) -> Self {
        match result {
            Ok(matches) => Self {
                success: true,
                matches,
                error: None,
            },
            Err(err) => Self {
                success: false,
                matches: Vec::new(),
                error: Some(report(&err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn png_passes_validation() {
        assert!(validate_image(&png_bytes()).is_ok());
    }

    #[test]
    fn empty_image_is_a_validation_error() {
        assert!(matches!(
            validate_image(&[]),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_a_validation_error() {
        assert!(matches!(
            validate_image(b"definitely not an image"),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn non_png_jpeg_format_is_rejected() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Bmp).unwrap();
        let err = validate_image(&buf.into_inner()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn extract_errors_map_into_the_taxonomy() {
        assert!(matches!(
            ServiceError::from(ExtractError::NoFaceDetected),
            ServiceError::NoFaceDetected
        ));
        assert!(matches!(
            ServiceError::from(ExtractError::ImageDecode("x".into())),
            ServiceError::ImageDecode(_)
        ));
        assert!(matches!(
            ServiceError::from(ExtractError::Backend("x".into())),
            ServiceError::Extractor(_)
        ));
    }

    #[test]
    fn internal_errors_surface_generic_messages() {
        let comparison = ServiceError::Comparison(ScoreError::DegenerateVector);
        assert_eq!(comparison.user_message(), "Face comparison failed.");
        let persistence = ServiceError::Persistence(StoreError::Dimension {
            expected: 128,
            got: 64,
        });
        assert_eq!(
            persistence.user_message(),
            "Could not access the face gallery."
        );
        // no internal detail leaks through
        assert!(!comparison.user_message().contains("zero-magnitude"));
        assert!(!persistence.user_message().contains("128"));
    }

    #[test]
    fn failure_response_shapes_carry_no_matches() {
        let response =
            RecognizeResponse::from_result(Err(ServiceError::Validation("nope".into())));
        assert!(!response.success);
        assert!(response.matches.is_empty());
        assert_eq!(response.error.as_deref(), Some("nope"));
    }

    #[test]
    fn register_response_serializes_like_the_wire_contract() {
        let ok = RegisterResponse::from_result("alice", Ok(1));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "User alice registered successfully!");
        assert!(json.get("error").is_none());
    }
}
