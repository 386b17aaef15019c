//! Pipeline driver and run reporting

pub mod driver;
pub mod report;

pub use driver::PipelineDriver;
pub use report::{RunReport, TrackStatus};
