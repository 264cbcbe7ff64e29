// crates/framecut-core/src/lib.rs
//
// Pure data and policy for FrameCut — no ffmpeg, no threads, no UI types.
// framecut-media builds the decode/cache/playback pipeline on top of this
// crate; the UI layer depends on both and talks to the pipeline via the
// PlayerEvent channel.

pub mod config;
pub mod events;
pub mod export;
pub mod frame;
pub mod helpers;
pub mod state;
pub mod timeline;

// Re-export the types that cross crate boundaries so downstream imports
// stay shallow.
pub use config::EngineConfig;
pub use events::PlayerEvent;
pub use frame::{Frame, PixelFormat};
pub use state::{Direction, PlaybackState, PlaybackStatus, VideoInfo};
pub use timeline::{Segment, SegmentError, TimelineModel};
