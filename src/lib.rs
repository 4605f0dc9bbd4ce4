pub mod config;
pub mod extractor;
pub mod matcher;
pub mod scorer;
pub mod storage;
pub mod workflow;

// Re-export the matching-core types for convenience
pub use extractor::{
    BoundingBox, ExtractError, ExtractionMode, FaceExtractor, QueryFace, SidecarExtractor,
};
pub use matcher::{MatchResult, DEFAULT_THRESHOLD, UNKNOWN};
pub use scorer::ScoreError;
pub use storage::{IdentityRecord, Store, StoreError};
pub use workflow::{RecognizeResponse, RegisterResponse, ServiceError};
