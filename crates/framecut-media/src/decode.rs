// crates/framecut-media/src/decode.rs
//
// FrameDecoder: stateful per-video decoder addressed by frame index.
// Owns its ffmpeg input context + codec context + RGBA scaler. NOT safe for
// concurrent calls on one handle — the controller and the prefetcher each
// own their own instance (see playback.rs / prefetch.rs).

use std::path::{Path, PathBuf};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use tracing::debug;

use framecut_core::{EngineConfig, Frame, PixelFormat, VideoInfo};

use crate::error::{DecodeError, OpenError};

/// The seam between the playback pipeline and an actual decoder.
///
/// `FrameDecoder` is the production implementation; tests drive the
/// controller and prefetcher with synthetic sources. Implementations are
/// stateful and single-caller — wrap in a lock or give each caller its own.
pub trait FrameSource: Send {
    fn info(&self) -> VideoInfo;

    /// Produce the exact frame at `index`. Codecs are forward-only between
    /// keyframes, so an implementation may decode and discard predecessors.
    fn decode_at(&mut self, index: u32) -> Result<Frame, DecodeError>;
}

pub struct FrameDecoder {
    #[allow(dead_code)]
    path:    PathBuf,
    ictx:    ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::video::Video,
    scaler:  SwsContext,
    video_idx: usize,
    tb_num:  i32,
    tb_den:  i32,
    info:    VideoInfo,
    /// Index of the last decoded frame; None right after open, a seek, or a
    /// decode failure — meaning the next call re-anchors with a fresh
    /// keyframe seek. That reset is the retry mechanism the controller
    /// relies on.
    position: Option<u32>,
    /// Forward distance up to which sequential decode beats a seek.
    seek_threshold: u32,
}

impl FrameDecoder {
    pub fn open(path: &Path, cfg: &EngineConfig) -> Result<Self, OpenError> {
        let path = path.to_path_buf();
        let backend = |source| OpenError::Backend { path: path.clone(), source };

        ffmpeg::init().map_err(backend)?;
        let ictx = input(&path).map_err(backend)?;

        let (video_idx, tb_num, tb_den, rate_num, rate_den, nb_frames, stream_dur) = {
            let stream = ictx
                .streams()
                .best(Type::Video)
                .ok_or_else(|| OpenError::NoVideoStream { path: path.clone() })?;
            let tb = stream.time_base();
            let rate = stream.avg_frame_rate();
            (
                stream.index(),
                tb.numerator(),
                tb.denominator(),
                rate.numerator(),
                rate.denominator(),
                stream.frames(),
                stream.duration(),
            )
        };

        // Second context for decoder construction (Parameters borrows from
        // Stream/ictx).
        let ictx2 = input(&path).map_err(backend)?;
        let stream2 = ictx2
            .stream(video_idx)
            .ok_or_else(|| OpenError::NoVideoStream { path: path.clone() })?;
        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())
            .map_err(backend)?;
        let decoder = dec_ctx.decoder().video().map_err(backend)?;

        let fps = if rate_num > 0 && rate_den > 0 {
            rate_num as f64 / rate_den as f64
        } else {
            cfg.playback_fps
        };

        // Container duration first, stream duration as fallback.
        let duration_secs = {
            let d = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
            if d > 0.0 {
                d
            } else {
                (stream_dur.max(0) as f64) * tb_num as f64 / tb_den as f64
            }
        };

        let frame_count = if nb_frames > 0 {
            nb_frames as u32
        } else {
            (duration_secs * fps).round() as u32
        };
        if frame_count == 0 {
            return Err(OpenError::EmptyVideo { path: path.clone() });
        }

        let (w, h) = (decoder.width(), decoder.height());
        if w == 0 || h == 0 {
            return Err(OpenError::EmptyVideo { path: path.clone() });
        }

        let scaler = SwsContext::get(
            decoder.format(), w, h,
            Pixel::RGBA, w, h,
            Flags::BILINEAR,
        )
        .map_err(backend)?;

        debug!(
            "opened {} — {frame_count} frames @ {fps:.3} fps, {w}x{h}",
            path.display(),
        );

        Ok(Self {
            path,
            ictx,
            decoder,
            scaler,
            video_idx,
            tb_num,
            tb_den,
            info: VideoInfo { frame_count, fps, width: w, height: h, duration_secs },
            position: None,
            seek_threshold: cfg.seek_threshold,
        })
    }

    /// Keyframe-anchored backward seek toward `index`.
    ///
    /// A backward seek (`..=ts`) lands on the keyframe at or before the
    /// target, and `read_until`'s index filter discards the pre-roll. A seek
    /// soft-fail on a forward target falls through to sequential decode for
    /// the same reason; a backward target that cannot seek is unreachable
    /// and surfaces as an error.
    fn seek_to(&mut self, index: u32) -> Result<(), DecodeError> {
        let ts = index_to_pts(index, self.tb_num, self.tb_den, self.info.fps);
        if ts <= 0 && self.position.is_none() {
            // Fresh context already at the start; seeking to 0 is a no-op
            // (and EPERMs on some demuxers).
            return Ok(());
        }
        match self.ictx.seek(ts, ..=ts) {
            Ok(()) => {
                self.decoder.flush();
                self.position = None;
                Ok(())
            }
            Err(e) => {
                if self.position.map_or(false, |pos| index <= pos) {
                    self.position = None;
                    Err(DecodeError::Seek { index, source: e })
                } else {
                    debug!("seek soft-fail at frame {index}: {e} — decoding forward");
                    Ok(())
                }
            }
        }
    }

    /// Decode forward until the target index, discarding pre-roll frames
    /// without scaling them (scaling every GOP frame triples the seek cost).
    fn read_until(&mut self, index: u32) -> Result<Frame, DecodeError> {
        let video_idx = self.video_idx;
        let (tb_num, tb_den) = (self.tb_num, self.tb_den);
        let fps = self.info.fps;
        let (w, h) = (self.info.width, self.info.height);

        for (stream, packet) in self.ictx.packets().flatten() {
            if stream.index() != video_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let got = decoded
                    .pts()
                    .map(|pts| pts_to_index(pts, tb_num, tb_den, fps))
                    .unwrap_or_else(|| self.position.map_or(0, |p| p + 1));
                self.position = Some(got);
                if got < index {
                    continue;
                }
                let mut out = ffmpeg::util::frame::video::Video::empty();
                if let Err(e) = self.scaler.run(&decoded, &mut out) {
                    self.position = None;
                    return Err(DecodeError::Codec { index, source: e });
                }
                return Ok(rgba_frame(&out, index, w, h));
            }
        }

        // Packet stream exhausted — drain the decoder before giving up.
        let _ = self.decoder.send_eof();
        let mut decoded = ffmpeg::util::frame::video::Video::empty();
        let mut last_good: Option<Frame> = None;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let got = decoded
                .pts()
                .map(|pts| pts_to_index(pts, tb_num, tb_den, fps))
                .unwrap_or_else(|| self.position.map_or(0, |p| p + 1));
            self.position = Some(got);
            let mut out = ffmpeg::util::frame::video::Video::empty();
            if self.scaler.run(&decoded, &mut out).is_err() {
                break;
            }
            let frame = rgba_frame(&out, index, w, h);
            if got >= index {
                self.position = None; // decoder drained; re-anchor next call
                return Ok(frame);
            }
            last_good = Some(frame);
        }

        // EOF before the target. Metadata frame counts routinely overshoot
        // variable-rate sources, so a past-the-end request gets the final
        // frame when one was decoded.
        self.position = None;
        match last_good {
            Some(frame) => Ok(frame),
            None => Err(DecodeError::EndOfStream { index }),
        }
    }
}

impl FrameSource for FrameDecoder {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn decode_at(&mut self, index: u32) -> Result<Frame, DecodeError> {
        if needs_seek(self.position, index, self.seek_threshold) {
            self.seek_to(index)?;
        }
        self.read_until(index)
    }
}

/// Seek policy: backward targets always seek (codecs are forward-only);
/// small forward distances decode sequentially (cheaper than a seek + GOP
/// burn); far forward targets seek.
pub(crate) fn needs_seek(position: Option<u32>, target: u32, threshold: u32) -> bool {
    match position {
        Some(pos) => target <= pos || target > pos.saturating_add(threshold),
        None => true,
    }
}

fn index_to_pts(index: u32, tb_num: i32, tb_den: i32, fps: f64) -> i64 {
    (index as f64 / fps * tb_den as f64 / tb_num as f64).round() as i64
}

fn pts_to_index(pts: i64, tb_num: i32, tb_den: i32, fps: f64) -> u32 {
    (pts as f64 * tb_num as f64 / tb_den as f64 * fps).round().max(0.0) as u32
}

/// Destripe the scaler output (stride-padded rows) into a packed RGBA frame
/// labeled with the requested index.
fn rgba_frame(out: &ffmpeg::util::frame::video::Video, index: u32, w: u32, h: u32) -> Frame {
    let stride = out.stride(0);
    let raw = out.data(0);
    let row_bytes = w as usize * 4;
    let data: Vec<u8> = (0..h as usize)
        .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
        .copied()
        .collect();
    Frame::new(index, w, h, PixelFormat::Rgba8, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handle_always_seeks() {
        assert!(needs_seek(None, 0, 48));
        assert!(needs_seek(None, 500, 48));
    }

    #[test]
    fn backward_and_same_position_seek() {
        assert!(needs_seek(Some(100), 100, 48));
        assert!(needs_seek(Some(100), 40, 48));
    }

    #[test]
    fn near_forward_decodes_sequentially() {
        assert!(!needs_seek(Some(100), 101, 48));
        assert!(!needs_seek(Some(100), 148, 48));
    }

    #[test]
    fn far_forward_seeks() {
        assert!(needs_seek(Some(100), 149, 48));
        assert!(needs_seek(Some(100), 5_000, 48));
    }

    #[test]
    fn threshold_overflow_saturates() {
        assert!(!needs_seek(Some(u32::MAX - 1), u32::MAX, u32::MAX));
    }

    #[test]
    fn pts_index_round_trip() {
        // 30 fps over a 1/15360 time base (common MP4 layout).
        let (tb_num, tb_den, fps) = (1, 15_360, 30.0);
        for index in [0u32, 1, 29, 30, 719, 10_000] {
            let pts = index_to_pts(index, tb_num, tb_den, fps);
            assert_eq!(pts_to_index(pts, tb_num, tb_den, fps), index);
        }
    }

    #[test]
    fn ntsc_rate_round_trips() {
        // 30000/1001 fps over 1/30000 — fractional frame durations.
        let (tb_num, tb_den) = (1, 30_000);
        let fps = 30_000.0 / 1_001.0;
        for index in [0u32, 1, 100, 2_997, 86_400] {
            let pts = index_to_pts(index, tb_num, tb_den, fps);
            assert_eq!(pts_to_index(pts, tb_num, tb_den, fps), index);
        }
    }
}
