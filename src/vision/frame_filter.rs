// src/vision/frame_filter.rs
// Frame filtering to skip unchanged frames before calling the remote landmark detector

use std::time::Instant;

use image::DynamicImage;
use tracing::debug;

/// Per-frame state remembered for comparison with the next frame.
#[derive(Clone, Debug)]
struct FrameState {
    hash: u64,
    pixel_checksum: u64,
    timestamp: Instant,
}

/// Counters describing how aggressively the filter has been skipping.
#[derive(Debug, Clone, Default)]
pub struct FrameStatistics {
    pub total_frames: u64,
    pub processed_frames: u64,
    pub skipped_frames: u64,
    pub skipped_low_change: u64,
    pub skipped_no_skin: u64,
    pub detector_calls_saved: u64,
}

impl FrameStatistics {
    pub fn skip_rate(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.skipped_frames as f64 / self.total_frames as f64
        }
    }
}

/// Outcome of evaluating one frame.
#[derive(Debug, Clone)]
pub struct FrameFilterResult {
    pub should_process: bool,
    pub reason: String,
    pub diff_percentage: f32,
    pub hand_plausible: bool,
}

/// Configuration for frame filtering.
#[derive(Debug, Clone)]
pub struct FrameFilterConfig {
    /// Minimum difference threshold (0.0 to 1.0). Frames changing less
    /// than this fraction since the last processed frame are skipped.
    pub min_diff_threshold: f32,

    /// Minimum skin-tone pixel ratio (0.0 to 1.0). Frames below this are
    /// unlikely to contain a hand near the camera. Set to 0.0 to disable.
    pub min_skin_ratio: f32,

    /// Even if the frame looks unchanged, process one after this many
    /// seconds so a perfectly still hand keeps updating the count.
    pub max_skip_duration_secs: u64,

    /// Compare frames by perceptual hash instead of weighted checksum.
    pub use_perceptual_hash: bool,
}

impl Default for FrameFilterConfig {
    fn default() -> Self {
        Self {
            min_diff_threshold: 0.02,
            min_skin_ratio: 0.02,
            max_skip_duration_secs: 2,
            use_perceptual_hash: true,
        }
    }
}

/// Decides, frame by frame, whether the remote detector should be called.
///
/// Owns all of its comparison state; create one per detection loop and drop
/// it when the loop stops.
pub struct FrameFilter {
    config: FrameFilterConfig,
    previous: Option<FrameState>,
    stats: FrameStatistics,
}

impl FrameFilter {
    pub fn new(config: FrameFilterConfig) -> Self {
        Self {
            config,
            previous: None,
            stats: FrameStatistics::default(),
        }
    }

    pub fn statistics(&self) -> &FrameStatistics {
        &self.stats
    }

    /// Forget the previous frame, forcing the next one to be processed.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Evaluates one frame against the previous one.
    pub fn evaluate(&mut self, frame: &DynamicImage) -> FrameFilterResult {
        let now = Instant::now();
        self.stats.total_frames += 1;

        // Cheapest check first: frames with almost no skin-tone pixels are
        // not going to contain a usable hand.
        let skin_ratio = skin_tone_ratio(frame);
        if skin_ratio < self.config.min_skin_ratio {
            self.stats.skipped_frames += 1;
            self.stats.skipped_no_skin += 1;
            self.stats.detector_calls_saved += 1;

            return FrameFilterResult {
                should_process: false,
                reason: format!("low skin ratio: {:.1}%", skin_ratio * 100.0),
                diff_percentage: 0.0,
                hand_plausible: false,
            };
        }

        let pixel_checksum = pixel_checksum(frame);
        let hash = if self.config.use_perceptual_hash {
            perceptual_hash(frame)
        } else {
            0
        };

        let Some(previous) = self.previous.clone() else {
            self.previous = Some(FrameState {
                hash,
                pixel_checksum,
                timestamp: now,
            });
            self.stats.processed_frames += 1;
            return FrameFilterResult {
                should_process: true,
                reason: "first frame".to_string(),
                diff_percentage: 1.0,
                hand_plausible: true,
            };
        };

        // The timestamp marks the last *processed* frame, so the timeout
        // below still fires on a perfectly still scene at any frame rate.
        let elapsed = now.duration_since(previous.timestamp).as_secs();
        let diff_percentage = if self.config.use_perceptual_hash {
            hash_difference(previous.hash, hash)
        } else {
            checksum_difference(previous.pixel_checksum, pixel_checksum)
        };

        let timed_out = elapsed >= self.config.max_skip_duration_secs;
        let should_process = timed_out || diff_percentage >= self.config.min_diff_threshold;

        self.previous = Some(FrameState {
            hash,
            pixel_checksum,
            timestamp: if should_process {
                now
            } else {
                previous.timestamp
            },
        });

        if should_process {
            self.stats.processed_frames += 1;
            let reason = if timed_out {
                format!("timeout: {}s since last processed frame", elapsed)
            } else {
                format!("changed: {:.1}%", diff_percentage * 100.0)
            };
            FrameFilterResult {
                should_process: true,
                reason,
                diff_percentage,
                hand_plausible: true,
            }
        } else {
            self.stats.skipped_frames += 1;
            self.stats.skipped_low_change += 1;
            self.stats.detector_calls_saved += 1;
            debug!(
                diff = diff_percentage,
                "skipping frame with insufficient change"
            );
            FrameFilterResult {
                should_process: false,
                reason: format!("low change: {:.1}%", diff_percentage * 100.0),
                diff_percentage,
                hand_plausible: true,
            }
        }
    }
}

/// Position-weighted pixel checksum for fast comparison.
fn pixel_checksum(frame: &DynamicImage) -> u64 {
    // Downsample to 32x32 for speed.
    let small = frame.resize_exact(32, 32, image::imageops::FilterType::Nearest);
    let rgba = small.to_rgba8();

    let mut checksum: u64 = 0;
    for (i, pixel) in rgba.pixels().enumerate() {
        // Weight by position so spatial shifts register as changes.
        let weight = (i as u64 + 1) % 997;
        checksum = checksum.wrapping_add(
            (pixel[0] as u64 * weight)
                .wrapping_add(pixel[1] as u64 * weight)
                .wrapping_add(pixel[2] as u64 * weight),
        );
    }

    checksum
}

/// 64-bit perceptual hash; similar frames produce nearby hashes.
fn perceptual_hash(frame: &DynamicImage) -> u64 {
    // 8x8 grayscale with a nearest-neighbor resize; rough structure is all
    // the hash needs and higher-quality filters are far slower here.
    let small = frame.resize_exact(8, 8, image::imageops::FilterType::Nearest);
    let gray = small.to_luma8();

    let sum: u32 = gray.pixels().map(|p| p[0] as u32).sum();
    let avg: u32 = sum / 64;

    let mut hash: u64 = 0;
    for (i, pixel) in gray.pixels().enumerate() {
        if pixel[0] as u32 > avg {
            hash |= 1 << i;
        }
    }

    hash
}

/// Ratio of pixels falling inside a broad RGB skin-tone envelope.
fn skin_tone_ratio(frame: &DynamicImage) -> f32 {
    let small = frame.resize_exact(64, 64, image::imageops::FilterType::Nearest);
    let rgba = small.to_rgba8();

    let total_pixels = rgba.pixels().len() as u32;
    let mut skin_pixels = 0u32;

    for pixel in rgba.pixels() {
        let r = pixel[0] as i32;
        let g = pixel[1] as i32;
        let b = pixel[2] as i32;

        // Classic RGB skin rule: red dominant over blue, moderate green,
        // enough overall brightness. Deliberately loose; the detector makes
        // the real call.
        let is_skin = r > 95 && g > 40 && b > 20 && r > b && (r - b) > 15 && r > g;

        if is_skin {
            skin_pixels += 1;
        }
    }

    skin_pixels as f32 / total_pixels as f32
}

/// Normalized Hamming distance between two perceptual hashes.
fn hash_difference(hash1: u64, hash2: u64) -> f32 {
    let xor = hash1 ^ hash2;
    xor.count_ones() as f32 / 64.0
}

/// Normalized difference between two pixel checksums.
fn checksum_difference(checksum1: u64, checksum2: u64) -> f32 {
    let diff = checksum1.abs_diff(checksum2) as f32;
    // Max possible diff for a 32x32 RGB downsample.
    let max_diff = 32.0 * 32.0 * 255.0 * 3.0;
    (diff / max_diff).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn solid_image(r: u8, g: u8, b: u8) -> DynamicImage {
        let img = RgbaImage::from_fn(100, 100, |_, _| image::Rgba([r, g, b, 255]));
        DynamicImage::ImageRgba8(img)
    }

    // Skin-toned fill that passes the plausibility check.
    fn skin_image() -> DynamicImage {
        solid_image(200, 140, 110)
    }

    #[test]
    fn test_skin_ratio_detects_skin_tones() {
        assert!(skin_tone_ratio(&skin_image()) > 0.5);
        assert!(skin_tone_ratio(&solid_image(40, 180, 60)) < 0.1);
    }

    #[test]
    fn test_perceptual_hash_similar_images() {
        let hash1 = perceptual_hash(&solid_image(100, 100, 100));
        let hash2 = perceptual_hash(&solid_image(105, 105, 105));

        assert!(hash_difference(hash1, hash2) < 0.2);
    }

    #[test]
    fn test_perceptual_hash_different_images() {
        let mut img = RgbaImage::from_fn(100, 100, |_, _| image::Rgba([30, 30, 30, 255]));
        for y in 0..50 {
            for x in 0..100 {
                img.put_pixel(x, y, image::Rgba([220, 220, 220, 255]));
            }
        }
        let half_bright = DynamicImage::ImageRgba8(img);

        let hash1 = perceptual_hash(&solid_image(30, 30, 30));
        let hash2 = perceptual_hash(&half_bright);

        assert!(hash_difference(hash1, hash2) > 0.3);
    }

    #[test]
    fn test_first_frame_always_processes() {
        let mut filter = FrameFilter::new(FrameFilterConfig::default());
        let result = filter.evaluate(&skin_image());

        assert!(result.should_process);
        assert_eq!(result.reason, "first frame");
    }

    #[test]
    fn test_identical_frame_skipped() {
        let mut filter = FrameFilter::new(FrameFilterConfig {
            max_skip_duration_secs: 60,
            ..FrameFilterConfig::default()
        });

        assert!(filter.evaluate(&skin_image()).should_process);
        assert!(!filter.evaluate(&skin_image()).should_process);
        assert_eq!(filter.statistics().detector_calls_saved, 1);
    }

    #[test]
    fn test_low_skin_frame_filtered() {
        let mut filter = FrameFilter::new(FrameFilterConfig::default());
        let result = filter.evaluate(&solid_image(40, 180, 60));

        assert!(!result.should_process);
        assert!(!result.hand_plausible);
    }

    #[test]
    fn test_reset_forces_reprocessing() {
        let mut filter = FrameFilter::new(FrameFilterConfig {
            max_skip_duration_secs: 60,
            ..FrameFilterConfig::default()
        });

        assert!(filter.evaluate(&skin_image()).should_process);
        filter.reset();
        assert!(filter.evaluate(&skin_image()).should_process);
    }
}
