// crates/framecut-core/src/config.rs
//
// Engine tuning knobs, applied once at session construction.
// The settings store lives outside the core; it hands a (possibly partial)
// config across this boundary, so every field carries a serde default and a
// missing key falls back to the values below.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum resident decoded frames in the cache.
    /// At 1920×1080 RGBA each frame is ~8 MB; 150 frames ≈ 1.2 GB, which is
    /// the working set for five seconds of 30 fps scrubbing.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Frames kept resident ahead of the playhead in the playback direction.
    #[serde(default = "default_prefetch_ahead")]
    pub prefetch_ahead: u32,

    /// Frames kept resident behind the playhead (ahead:back = 4:1).
    #[serde(default = "default_prefetch_back")]
    pub prefetch_back: u32,

    /// Timer rate used when the source does not report a frame rate.
    #[serde(default = "default_playback_fps")]
    pub playback_fps: f64,

    /// Forward distance (frames) up to which the decoder reads sequentially
    /// instead of seeking. Roughly 1.5 s at 30 fps — past that, a keyframe
    /// seek plus GOP burn is cheaper than decoding every intermediate frame.
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold: u32,
}

fn default_cache_capacity() -> usize { 150 }
fn default_prefetch_ahead() -> u32 { 16 }
fn default_prefetch_back() -> u32 { 4 }
fn default_playback_fps() -> f64 { 30.0 }
fn default_seek_threshold() -> u32 { 48 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            prefetch_ahead: default_prefetch_ahead(),
            prefetch_back:  default_prefetch_back(),
            playback_fps:   default_playback_fps(),
            seek_threshold: default_seek_threshold(),
        }
    }
}
