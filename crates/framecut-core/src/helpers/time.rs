// crates/framecut-core/src/helpers/time.rs
//
// Shared frame/time conversions and display formatting used by the UI layer
// and export planning. Canonical source — keep timeline rulers, the player
// overlay, and segment labels from growing diverged copies.

/// Seconds at which a given frame index is presented.
pub fn frame_to_secs(frame: u32, fps: f64) -> f64 {
    if fps > 0.0 {
        frame as f64 / fps
    } else {
        0.0
    }
}

/// Nearest frame index for a timestamp, never negative.
pub fn secs_to_frame(secs: f64, fps: f64) -> u32 {
    if fps > 0.0 {
        (secs * fps).round().max(0.0) as u32
    } else {
        0
    }
}

/// Format a frame position as `HH:MM:SS:FF` timecode.
///
/// Used by the player overlay and the timeline ruler, where frame-level
/// precision matters.
///
/// ```
/// use framecut_core::helpers::time::format_timecode;
/// assert_eq!(format_timecode(0, 30.0),    "00:00:00:00");
/// assert_eq!(format_timecode(1845, 30.0), "00:01:01:15");
/// assert_eq!(format_timecode(45, 0.0),    "00:00:00:00");
/// ```
pub fn format_timecode(frame: u32, fps: f64) -> String {
    if fps <= 0.0 {
        return "00:00:00:00".into();
    }
    let total_secs = frame as f64 / fps;
    let hours = (total_secs / 3600.0) as u32;
    let mins  = ((total_secs % 3600.0) / 60.0) as u32;
    let secs  = (total_secs % 60.0) as u32;
    let ff    = (frame as f64 % fps) as u32;
    format!("{hours:02}:{mins:02}:{secs:02}:{ff:02}")
}

/// Format a duration in seconds as a compact human-readable string.
///
/// Used in the segment list, where frame-level precision is unnecessary.
///
/// ```
/// use framecut_core::helpers::time::format_duration;
/// assert_eq!(format_duration(4.2),    "4.2s");
/// assert_eq!(format_duration(187.0),  "3:07");
/// assert_eq!(format_duration(3875.0), "1:04:35");
/// ```
pub fn format_duration(secs: f64) -> String {
    if secs >= 3600.0 {
        format!(
            "{}:{:02}:{:02}",
            secs as u64 / 3600,
            (secs as u64 % 3600) / 60,
            secs as u64 % 60,
        )
    } else if secs >= 60.0 {
        format!("{}:{:02}", secs as u64 / 60, secs as u64 % 60)
    } else {
        format!("{secs:.1}s")
    }
}
