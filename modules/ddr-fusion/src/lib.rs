pub mod clustering;
pub mod collaborators;
pub mod confidence;
pub mod merger;
pub mod pipeline;
pub mod report_context;
pub mod temperature;
pub mod urgency;

pub use pipeline::{FusionPipeline, FusionReport, RunStats};
pub use report_context::ReportContext;
