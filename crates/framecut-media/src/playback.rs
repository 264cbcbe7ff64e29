// crates/framecut-media/src/playback.rs
//
// PlaybackController: owns the playhead, the play/pause/stop state machine,
// the per-video cache instance, and the synchronous decode handle. The UI
// drives it (seek/step/tick/...) and drains PlayerEvent from `events`; the
// prefetcher runs behind it filling the cache around the playhead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use framecut_core::{
    Direction, EngineConfig, Frame, PlaybackState, PlaybackStatus, PlayerEvent, VideoInfo,
};

use crate::cache::{CacheStats, FrameCache};
use crate::decode::{FrameDecoder, FrameSource};
use crate::error::{DecodeError, OpenError};
use crate::prefetch::{PrefetchGoal, Prefetcher, SourceFactory};

pub struct PlaybackController {
    path:       PathBuf,
    cache:      Arc<FrameCache>,
    /// Synchronous decode handle for playhead misses. The prefetcher owns a
    /// separate handle built by `factory`, so a miss here never waits on
    /// background work.
    source:     Box<dyn FrameSource>,
    factory:    SourceFactory,
    prefetcher: Prefetcher,
    state:      PlaybackState,
    info:       VideoInfo,
    config:     EngineConfig,
    speed:      f64,
    /// Frame currently pinned in the cache (the one on screen).
    pinned:     Option<u32>,
    tx:         Sender<PlayerEvent>,
    /// Drained by the render surface once per repaint.
    pub events: Receiver<PlayerEvent>,
}

impl PlaybackController {
    /// Open a video with FFmpeg decoding. Presents frame 0 and starts
    /// warming the cache immediately.
    pub fn open(path: impl Into<PathBuf>, config: EngineConfig) -> Result<Self, OpenError> {
        let cfg = config;
        let factory: SourceFactory = Arc::new(move |p: &Path| {
            FrameDecoder::open(p, &cfg).map(|d| Box::new(d) as Box<dyn FrameSource>)
        });
        Self::with_factory(path, factory, config)
    }

    /// Open with a custom source backend. The factory is used for the
    /// synchronous handle, the prefetcher's handle, and every later `load`.
    pub fn with_factory(
        path: impl Into<PathBuf>,
        factory: SourceFactory,
        config: EngineConfig,
    ) -> Result<Self, OpenError> {
        let path = path.into();
        let source = (&*factory)(&path)?;
        let info = source.info();
        let (tx, events) = bounded(256);

        let mut ctrl = Self {
            path,
            cache: Arc::new(FrameCache::new(config.cache_capacity)),
            source,
            factory: Arc::clone(&factory),
            prefetcher: Prefetcher::spawn(factory, config.prefetch_ahead, config.prefetch_back),
            state: PlaybackState::default(),
            info,
            config,
            speed: 1.0,
            pinned: None,
            tx,
            events,
        };
        ctrl.present(0); // first frame on screen + warm-up prefetch
        Ok(ctrl)
    }

    /// Replace the open video. Everything issued for the old one is
    /// invalidated; the old cache instance is dropped wholesale.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<VideoInfo, OpenError> {
        let path = path.into();
        let source = (&*self.factory)(&path)?;

        // Invalidate before swapping so in-flight prefetch jobs are
        // discarded on completion instead of landing in the new cache.
        self.prefetcher.invalidate();
        self.pinned = None; // pinned entry dies with the old cache

        self.info = source.info();
        self.source = source;
        self.path = path;
        self.cache = Arc::new(FrameCache::new(self.config.cache_capacity));
        self.state = PlaybackState::default();
        self.emit_state();
        self.present(0);
        Ok(self.info)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Transport ────────────────────────────────────────────────────────

    pub fn play(&mut self) {
        self.set_playing(Direction::Forward);
    }

    pub fn play_backward(&mut self) {
        self.set_playing(Direction::Backward);
    }

    fn set_playing(&mut self, direction: Direction) {
        if self.state.status == PlaybackStatus::Playing && self.state.direction == direction {
            return;
        }
        self.state.status = PlaybackStatus::Playing;
        self.state.direction = direction;
        self.emit_state();
        self.refresh_prefetch();
    }

    pub fn pause(&mut self) {
        if self.state.status == PlaybackStatus::Playing {
            self.state.status = PlaybackStatus::Paused;
            self.emit_state();
        }
    }

    /// Stop playback and reset the playhead to the first frame.
    pub fn stop(&mut self) {
        self.state.status = PlaybackStatus::Stopped;
        self.state.current_index = 0;
        self.emit_state();
        self.present(0);
    }

    /// Jump to `index` (clamped). Stays in the current transport state.
    pub fn seek(&mut self, index: u32) {
        let index = index.min(self.info.last_frame());
        self.state.current_index = index;
        self.present(index);
    }

    /// Nudge the playhead by `delta` frames, clamped to the video. Works in
    /// every transport state.
    pub fn step(&mut self, delta: i32) {
        let last = self.info.last_frame() as i64;
        let next = (self.state.current_index as i64 + delta as i64).clamp(0, last) as u32;
        self.state.current_index = next;
        self.present(next);
    }

    /// One playback-timer tick: advance the playhead one frame in the
    /// playback direction and present it. Reaching the end of the trim range
    /// (or the video) pauses — observable via StateChanged.
    pub fn tick(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            return;
        }
        let cur = self.state.current_index;
        let next = match self.state.direction {
            Direction::Forward => {
                // The out point is exclusive: the last playable frame is the
                // one before it.
                let last_allowed = match self.state.out_point {
                    Some(out) => out.saturating_sub(1).min(self.info.last_frame()),
                    None => self.info.last_frame(),
                };
                if cur >= last_allowed {
                    self.state.status = PlaybackStatus::Paused;
                    self.emit_state();
                    return;
                }
                cur + 1
            }
            Direction::Backward => {
                let first_allowed = self.state.in_point.unwrap_or(0);
                if cur <= first_allowed {
                    self.state.status = PlaybackStatus::Paused;
                    self.emit_state();
                    return;
                }
                cur - 1
            }
        };
        self.state.current_index = next;
        self.present(next);
    }

    /// Timer period the UI should drive `tick` with.
    pub fn tick_interval(&self) -> Duration {
        let fps = if self.info.fps > 0.0 { self.info.fps } else { self.config.playback_fps };
        Duration::from_secs_f64(1.0 / (fps * self.speed))
    }

    pub fn set_speed(&mut self, speed: f64) {
        if speed > 0.0 {
            self.speed = speed;
        }
    }

    // ── Trim markers ─────────────────────────────────────────────────────

    /// Record the current frame as the in point. An out point at or before
    /// it can never form a valid segment and is dropped.
    pub fn set_in_point(&mut self) {
        let idx = self.state.current_index;
        self.state.in_point = Some(idx);
        if self.state.out_point.is_some_and(|out| out <= idx) {
            self.state.out_point = None;
        }
        self.emit_state();
    }

    pub fn set_out_point(&mut self) {
        let idx = self.state.current_index;
        self.state.out_point = Some(idx);
        if self.state.in_point.is_some_and(|inp| inp >= idx) {
            self.state.in_point = None;
        }
        self.emit_state();
    }

    pub fn clear_points(&mut self) {
        if self.state.in_point.is_some() || self.state.out_point.is_some() {
            self.state.in_point = None;
            self.state.out_point = None;
            self.emit_state();
        }
    }

    // ── Frame delivery ───────────────────────────────────────────────────

    fn present(&mut self, index: u32) {
        let frame = match self.cache.get(index) {
            Some(frame) => frame,
            None => {
                // Sync decode on the calling thread: a brief stall beats a
                // hole on screen, and this handle never waits on prefetch.
                match self.decode_with_retry(index) {
                    Ok(frame) => {
                        self.cache.put(index, frame.clone());
                        frame
                    }
                    Err(e) => {
                        warn!("frame {index} skipped: {e}");
                        self.emit(PlayerEvent::FrameSkipped { index });
                        self.refresh_prefetch();
                        return;
                    }
                }
            }
        };
        self.repin(index);
        self.emit(PlayerEvent::FrameReady { index, frame });
        self.refresh_prefetch();
    }

    fn decode_with_retry(&mut self, index: u32) -> Result<Frame, DecodeError> {
        match self.source.decode_at(index) {
            Ok(frame) => Ok(frame),
            Err(first) => {
                // One retry: the decoder re-anchors on a keyframe after any
                // failure, so transient seek/codec errors get a clean run.
                debug!("decode {index} failed ({first}); retrying from keyframe");
                self.source.decode_at(index)
            }
        }
    }

    /// Keep the on-screen frame pinned so eviction cannot drop it while the
    /// renderer may re-draw it; release the previous one.
    fn repin(&mut self, index: u32) {
        if self.pinned == Some(index) {
            return;
        }
        if let Some(prev) = self.pinned.take() {
            self.cache.unpin(prev);
        }
        if self.cache.pin(index) {
            self.pinned = Some(index);
        }
    }

    fn refresh_prefetch(&self) {
        self.prefetcher.request(PrefetchGoal {
            path:         self.path.clone(),
            center:       self.state.current_index,
            direction:    self.state.direction,
            generation:   self.prefetcher.generation(),
            total_frames: self.info.frame_count,
            cache:        Arc::clone(&self.cache),
        });
    }

    fn emit_state(&self) {
        self.emit(PlayerEvent::StateChanged(self.state));
    }

    fn emit(&self, event: PlayerEvent) {
        if self.tx.try_send(event).is_err() {
            warn!("event channel full — render surface not draining; event dropped");
        }
    }
}
