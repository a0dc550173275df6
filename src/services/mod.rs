pub mod classify;
pub mod config;
pub mod ingest;
pub mod progress;
pub mod types;

pub use classify::ClassifyService;
pub use config::{
    ClassifierConfig, ConfigService, EmbeddingConfig, ProjectConfig, ScanConfig, StorageConfig,
};
pub use ingest::{discover_images, generate_vector_id, IngestService, SUPPORTED_EXTENSIONS};
pub use progress::{CancelFlag, ChannelSink, ProgressEvent, ProgressSink};
pub use types::{ClassifySummary, ImageRecord, IngestSummary};
