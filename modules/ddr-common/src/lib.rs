pub mod config;
pub mod error;
pub mod lenient;
pub mod text;
pub mod types;

pub use config::{FusionConfig, DEFAULT_ANOMALY_THRESHOLD_C};
pub use error::{DdrError, DdrResult};
pub use types::*;
