pub mod image_processor;
pub mod job_worker;
pub mod metrics;

pub use image_processor::*;
pub use job_worker::*;
pub use metrics::*;
