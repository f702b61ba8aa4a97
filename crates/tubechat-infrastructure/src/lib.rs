//! Adapters for tubechat: configuration loading, path resolution and
//! transcript stores.

pub mod config_service;
pub mod paths;
pub mod transcript_store;

pub use config_service::ConfigService;
pub use paths::{PathError, TubechatPaths};
pub use transcript_store::{InMemoryTranscriptStore, JsonTranscriptStore};
