// crates/framecut-media/src/testutil.rs
//
// Shared test doubles for the pipeline: a synthetic FrameSource with
// scripted failures and a gate for holding a decode mid-flight.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};

use framecut_core::{Frame, PixelFormat, VideoInfo};

use crate::decode::FrameSource;
use crate::error::DecodeError;

pub(crate) fn make_frame(index: u32) -> Frame {
    Frame::new(index, 2, 2, PixelFormat::Rgba8, vec![(index & 0xFF) as u8; 16])
}

pub(crate) fn make_info(frame_count: u32) -> VideoInfo {
    VideoInfo {
        frame_count,
        fps: 30.0,
        width: 2,
        height: 2,
        duration_secs: frame_count as f64 / 30.0,
    }
}

/// One-shot latch: decodes block on `wait` until `release` opens it for good.
#[derive(Clone)]
pub(crate) struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub(crate) fn new() -> Self {
        Gate(Arc::new((Mutex::new(false), Condvar::new())))
    }

    pub(crate) fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }

    pub(crate) fn release(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
}

/// Synthetic decoder: every index inside the video succeeds instantly with a
/// tiny frame, except the scripted failures. Logs decode order so tests can
/// assert what actually hit the "decoder".
pub(crate) struct StubSource {
    info:      VideoInfo,
    log:       Arc<Mutex<Vec<u32>>>,
    fail:      HashSet<u32>,
    fail_once: Arc<Mutex<HashSet<u32>>>,
    gate:      Option<Gate>,
}

impl StubSource {
    pub(crate) fn new(frame_count: u32) -> Self {
        Self {
            info:      make_info(frame_count),
            log:       Arc::new(Mutex::new(Vec::new())),
            fail:      HashSet::new(),
            fail_once: Arc::new(Mutex::new(HashSet::new())),
            gate:      None,
        }
    }

    /// Every decode fails. Used to make a prefetch path inert so a test can
    /// observe the sync path alone.
    pub(crate) fn broken(frame_count: u32) -> Self {
        let mut stub = Self::new(frame_count);
        stub.fail = (0..frame_count).collect();
        stub
    }

    pub(crate) fn failing_always(mut self, indices: &[u32]) -> Self {
        self.fail.extend(indices.iter().copied());
        self
    }

    pub(crate) fn failing_once(self, indices: &[u32]) -> Self {
        self.fail_once.lock().unwrap().extend(indices.iter().copied());
        self
    }

    pub(crate) fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn log(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.log)
    }
}

impl FrameSource for StubSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn decode_at(&mut self, index: u32) -> Result<Frame, DecodeError> {
        // Log before blocking so tests can observe an in-flight decode.
        self.log.lock().unwrap().push(index);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if index >= self.info.frame_count {
            return Err(DecodeError::EndOfStream { index });
        }
        if self.fail.contains(&index) {
            return Err(DecodeError::EndOfStream { index });
        }
        if self.fail_once.lock().unwrap().remove(&index) {
            return Err(DecodeError::EndOfStream { index });
        }
        Ok(make_frame(index))
    }
}

/// Route test logs through tracing when RUST_LOG is set; harmless otherwise.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
