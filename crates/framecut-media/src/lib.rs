// crates/framecut-media/src/lib.rs
//
// The decode/cache/playback pipeline. No UI dependency — communicates with
// the render surface via the PlayerEvent channel only.
//
// To add a new media capability:
//   1. Create a new module file here
//   2. Add `pub mod mymodule;` below
//   3. Wire it into PlaybackController (playback.rs)

pub mod cache;
pub mod decode;
pub mod error;
pub mod playback;
pub mod prefetch;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export the main public API so the UI's imports stay simple.
pub use cache::{CacheStats, FrameCache};
pub use decode::{FrameDecoder, FrameSource};
pub use error::{DecodeError, OpenError};
pub use playback::PlaybackController;
pub use prefetch::{PrefetchGoal, Prefetcher, SourceFactory};

// Re-export the core types that cross the channel so downstream crates can
// depend on framecut-media alone.
pub use framecut_core::{EngineConfig, Frame, PixelFormat, PlayerEvent, PlaybackState, VideoInfo};
