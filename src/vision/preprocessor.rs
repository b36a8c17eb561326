// src/vision/preprocessor.rs
// Frame preprocessing before upload to the remote landmark detector

use image::DynamicImage;

/// Target dimensions for detector input. 640x480 matches the camera's
/// native capture size; larger frames only cost upload time.
const TARGET_WIDTH: u32 = 640;
const TARGET_HEIGHT: u32 = 480;

/// Configuration for detector-input preprocessing.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub enable_resize: bool,
    /// Brightness adjustment in 8-bit steps; 0 leaves the frame alone.
    pub brightness_boost: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: TARGET_WIDTH,
            target_height: TARGET_HEIGHT,
            enable_resize: true,
            brightness_boost: 0,
        }
    }
}

/// Shrinks (never enlarges) a frame to the detector's input size,
/// preserving aspect ratio, and applies the configured brightness boost.
pub fn preprocess_for_detector(frame: &DynamicImage, config: &PreprocessConfig) -> DynamicImage {
    let mut processed = frame.clone();

    if config.enable_resize
        && (processed.width() > config.target_width || processed.height() > config.target_height)
    {
        processed = processed.resize(
            config.target_width,
            config.target_height,
            image::imageops::FilterType::Triangle,
        );
    }

    if config.brightness_boost != 0 {
        processed = processed.brighten(config.brightness_boost);
    }

    processed
}
