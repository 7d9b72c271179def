pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, resolve_config_path};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, PublishError, StatsSnapshot};
pub use service::{RegistrarHandle, RegistrarService, ServiceConfig, SubmitError};
