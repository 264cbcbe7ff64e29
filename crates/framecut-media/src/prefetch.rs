// crates/framecut-media/src/prefetch.rs
//
// Prefetcher: background worker that keeps a direction-biased window of
// frames resident around the playhead so scrubbing and playback hit cache
// instead of stalling on decode.
//
// Goals are delivered latest-wins through a Mutex+Condvar slot: the worker
// always serves the freshest playhead position and abandons the rest of a
// stale plan. The worker owns its own decoder handle (built by the source
// factory), so a cache miss on the playhead is never queued behind prefetch
// work. Cancellation is a generation counter — jobs issued before a video
// was closed/replaced are discarded on completion, never mid-decode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use framecut_core::Direction;

use crate::cache::FrameCache;
use crate::decode::FrameSource;
use crate::error::OpenError;

/// Builds a decoder handle for a path. The prefetch worker keeps its handle
/// across goals for the same file and rebuilds it when the file changes.
pub type SourceFactory =
    Arc<dyn Fn(&Path) -> Result<Box<dyn FrameSource>, OpenError> + Send + Sync>;

/// One desired prefetch window. Carries the cache instance and the
/// generation it was issued under so a superseded goal can never touch a
/// newer session's cache.
#[derive(Clone)]
pub struct PrefetchGoal {
    pub path:         PathBuf,
    pub center:       u32,
    pub direction:    Direction,
    pub generation:   u64,
    pub total_frames: u32,
    pub cache:        Arc<FrameCache>,
}

struct Shared {
    /// Latest-wins goal slot; the controller overwrites, the worker takes.
    goal:       Mutex<Option<PrefetchGoal>>,
    cvar:       Condvar,
    generation: AtomicU64,
    shutdown:   AtomicBool,
}

pub struct Prefetcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Prefetcher {
    pub fn spawn(factory: SourceFactory, ahead: u32, back: u32) -> Self {
        let shared = Arc::new(Shared {
            goal:       Mutex::new(None),
            cvar:       Condvar::new(),
            generation: AtomicU64::new(0),
            shutdown:   AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run_worker(worker_shared, factory, ahead, back));
        Self { shared, worker: Some(worker) }
    }

    /// Overwrite any pending goal — the worker always gets the freshest one.
    pub fn request(&self, goal: PrefetchGoal) {
        *self.shared.goal.lock().unwrap() = Some(goal);
        self.shared.cvar.notify_one();
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Invalidate all outstanding work (video closed or replaced). Returns
    /// the new generation; goals must be re-issued under it.
    pub fn invalidate(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.cvar.notify_one();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(shared: Arc<Shared>, factory: SourceFactory, ahead: u32, back: u32) {
    let mut source: Option<(PathBuf, Box<dyn FrameSource>)> = None;

    loop {
        let goal = {
            let mut slot = shared.goal.lock().unwrap();
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                match slot.take() {
                    Some(goal) => break goal,
                    None => slot = shared.cvar.wait(slot).unwrap(),
                }
            }
        };

        if goal.generation != shared.generation.load(Ordering::Acquire) {
            continue; // superseded before it even started
        }

        // (Re)open the worker's private decoder when the source file changes.
        if source.as_ref().map(|(p, _)| p != &goal.path).unwrap_or(true) {
            match (&*factory)(&goal.path) {
                Ok(s) => source = Some((goal.path.clone(), s)),
                Err(e) => {
                    warn!("prefetch open {} failed: {e}", goal.path.display());
                    source = None;
                    continue;
                }
            }
        }
        let (_, src) = source.as_mut().expect("decoder opened above");

        for index in plan_window(goal.center, goal.direction, ahead, back, goal.total_frames) {
            if shared.shutdown.load(Ordering::Acquire) {
                return;
            }
            // A newer goal makes the rest of this plan stale — serve it.
            if shared.goal.lock().unwrap().is_some() {
                break;
            }
            if goal.generation != shared.generation.load(Ordering::Acquire) {
                break;
            }
            if goal.cache.contains(index) {
                continue;
            }

            match src.decode_at(index) {
                Ok(frame) => {
                    // Re-check desirability immediately before insertion: a
                    // frame decoded for a stale window must never land in the
                    // cache of a newer session or outside the live window.
                    if goal.generation != shared.generation.load(Ordering::Acquire) {
                        break;
                    }
                    let still_wanted = match shared.goal.lock().unwrap().as_ref() {
                        Some(newer) => window_contains(
                            newer.center,
                            newer.direction,
                            ahead,
                            back,
                            newer.total_frames,
                            index,
                        ),
                        None => true, // goal unchanged; index came from this plan
                    };
                    if still_wanted {
                        goal.cache.put(index, frame);
                    }
                }
                Err(e) => debug!("prefetch decode {index} failed: {e}"),
            }
        }
    }
}

/// Inclusive window bounds around `center`, biased toward the playback
/// direction and clamped to the video.
fn window_bounds(center: u32, direction: Direction, ahead: u32, back: u32, total_frames: u32) -> (u32, u32) {
    let last = total_frames.saturating_sub(1);
    let center = center.min(last);
    let (fwd, bwd) = match direction {
        Direction::Forward  => (ahead, back),
        Direction::Backward => (back, ahead),
    };
    (center.saturating_sub(bwd), center.saturating_add(fwd).min(last))
}

/// Desired decode order for a window: closest to the playhead first (those
/// are the frames whose absence stalls the very next tick), ties broken
/// toward the playback direction.
pub(crate) fn plan_window(
    center: u32,
    direction: Direction,
    ahead: u32,
    back: u32,
    total_frames: u32,
) -> Vec<u32> {
    if total_frames == 0 {
        return Vec::new();
    }
    let (lo, hi) = window_bounds(center, direction, ahead, back, total_frames);
    let center = center.min(total_frames - 1);
    let mut indices: Vec<u32> = (lo..=hi).collect();
    indices.sort_by_key(|&i| {
        let toward = match direction {
            Direction::Forward  => i >= center,
            Direction::Backward => i <= center,
        };
        (i.abs_diff(center), if toward { 0u8 } else { 1u8 })
    });
    indices
}

pub(crate) fn window_contains(
    center: u32,
    direction: Direction,
    ahead: u32,
    back: u32,
    total_frames: u32,
    index: u32,
) -> bool {
    if total_frames == 0 {
        return false;
    }
    let (lo, hi) = window_bounds(center, direction, ahead, back, total_frames);
    (lo..=hi).contains(&index)
}
