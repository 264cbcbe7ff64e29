// crates/framecut-core/src/state.rs
//
// Playback state and probed source properties. Owned exclusively by
// framecut-media's PlaybackController — the UI reads snapshots of these via
// PlayerEvent::StateChanged and never mutates them directly.

/// Playback direction. Forward advances frame indices, backward decrements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// The three controller states. `Playing` pairs with the `direction` field
/// on PlaybackState; Stopped implies the playhead was reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Paused,
    Playing,
}

/// Snapshot of the playback state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_index: u32,
    pub status:        PlaybackStatus,
    pub direction:     Direction,
    /// Trim markers. Recorded without affecting decode; segment creation
    /// validates them (`TimelineModel::add_segment`).
    pub in_point:      Option<u32>,
    pub out_point:     Option<u32>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: 0,
            status:        PlaybackStatus::Stopped,
            direction:     Direction::Forward,
            in_point:      None,
            out_point:     None,
        }
    }
}

/// Source properties probed when a video is opened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub frame_count:   u32,
    pub fps:           f64,
    pub width:         u32,
    pub height:        u32,
    pub duration_secs: f64,
}

impl VideoInfo {
    /// Index of the last decodable frame.
    pub fn last_frame(&self) -> u32 {
        self.frame_count.saturating_sub(1)
    }
}
