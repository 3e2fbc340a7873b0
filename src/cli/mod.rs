pub mod orchestration;

pub use orchestration::{preview_next_release, run_pipeline, PipelineReport, Stage};
