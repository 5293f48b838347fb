pub mod cache;
pub mod images;
pub mod locator;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod stats;

pub use processor::{DatabaseBuilder, OutputTarget};
pub use stats::BuildReport;
