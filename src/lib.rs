pub mod changelog;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod issues;
pub mod models;
pub mod opsgenie;
pub mod projects;
pub mod retry;
pub mod session;
pub mod sink;

pub use client::{JiraClient, SearchTransport};
pub use error::{Error, Result};
pub use models::*;
pub use session::{ApiSession, Auth};

// Collector re-exports
pub use collector::{Collection, CollectionJob, JobState, QueryCollector, page_offsets};

// Config re-exports
pub use config::{CollectorSettings, FileConfigStore, SettingsStore};

pub use retry::RetryPolicy;
pub use sink::{FilePageSink, PageSink};

pub use changelog::{ChangelogQuery, FieldChange, IssueChangelog};
pub use issues::FieldValue;
pub use opsgenie::OpsgenieClient;
