// crates/framecut-media/src/error.rs
//
// Error taxonomy for the decode pipeline.
//
// OpenError ends the current video session (surfaced to the user, no retry).
// DecodeError is transient: the controller retries once from a keyframe,
// then skips the frame and keeps playing. Neither is ever fatal to the
// process.

use std::path::PathBuf;

use ffmpeg_the_third as ffmpeg;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("no video stream in {path}")]
    NoVideoStream { path: PathBuf },

    /// The container opened but reports zero decodable frames — corrupt
    /// metadata or an unsupported stream layout.
    #[error("no decodable frames in {path}")]
    EmptyVideo { path: PathBuf },

    /// Unsupported format, corrupt file, missing codec — whatever FFmpeg
    /// refused with.
    #[error("failed to open {path}: {source}")]
    Backend { path: PathBuf, source: ffmpeg::Error },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("seek to frame {index} failed: {source}")]
    Seek { index: u32, source: ffmpeg::Error },

    #[error("codec error at frame {index}: {source}")]
    Codec { index: u32, source: ffmpeg::Error },

    #[error("end of stream before frame {index}")]
    EndOfStream { index: u32 },
}
