// src/vision/mod.rs
// Frame filtering and preprocessing ahead of the remote landmark detector

pub mod frame_filter;
pub mod preprocessor;

pub use frame_filter::{FrameFilter, FrameFilterConfig, FrameFilterResult, FrameStatistics};

pub use preprocessor::{preprocess_for_detector, PreprocessConfig};
