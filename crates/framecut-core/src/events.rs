// crates/framecut-core/src/events.rs
//
// Events sent from the playback pipeline to the render surface.
// The UI drains these from a crossbeam channel once per repaint; nothing in
// framecut-media calls back into UI code.

use crate::frame::Frame;
use crate::state::PlaybackState;

/// Notifications from PlaybackController to the render surface.
///
/// `StateChanged` fires on status/direction/trim-point changes; plain
/// playhead movement is observable through the `index` on `FrameReady`, so a
/// 30 fps tick does not double every frame with a state event.
#[derive(Clone, Debug)]
pub enum PlayerEvent {
    /// A frame for the current playhead position is ready to draw.
    FrameReady { index: u32, frame: Frame },
    /// Status, direction, or a trim marker changed.
    StateChanged(PlaybackState),
    /// Decode failed twice for this index; playback continues at the next
    /// frame. Surfaced so the UI can show a dropped-frame warning.
    FrameSkipped { index: u32 },
}
