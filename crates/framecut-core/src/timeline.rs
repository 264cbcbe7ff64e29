// crates/framecut-core/src/timeline.rs
//
// The trim-segment list: ordered in/out ranges that playback and export
// consume. Owned by the session; reset whenever a new video is imported.
// Serializable via serde — project save/load happens outside the core.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("out point must be after in point ({in_point} >= {out_point})")]
    EmptyRange { in_point: u32, out_point: u32 },
    #[error("out point {out_point} past the end of the video ({total_frames} frames)")]
    OutOfBounds { out_point: u32, total_frames: u32 },
}

/// One trim range in source-frame coordinates. `out_point` is exclusive:
/// the segment covers frames `[in_point, out_point)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id:        Uuid,
    pub in_point:  u32,
    pub out_point: u32,
    /// Dense 0..N-1 ranking; re-normalized on reorder/delete.
    pub order:     u32,
}

impl Segment {
    pub fn duration_frames(&self) -> u32 {
        self.out_point - self.in_point
    }

    pub fn duration_secs(&self, fps: f64) -> f64 {
        if fps > 0.0 {
            self.duration_frames() as f64 / fps
        } else {
            0.0
        }
    }
}

/// Ordered segment list bound to one opened video.
///
/// The vec is kept sorted by `order` and orders are kept dense, so
/// `segments()` is a plain slice borrow and position == order at all times.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimelineModel {
    segments:     Vec<Segment>,
    total_frames: u32,
}

impl TimelineModel {
    pub fn new(total_frames: u32) -> Self {
        Self { segments: Vec::new(), total_frames }
    }

    /// Clear everything and re-bind to a new source. Called on import.
    pub fn reset(&mut self, total_frames: u32) {
        self.segments.clear();
        self.total_frames = total_frames;
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Append the current in/out markers as a new segment.
    pub fn add_segment(&mut self, in_point: u32, out_point: u32) -> Result<Uuid, SegmentError> {
        if in_point >= out_point {
            return Err(SegmentError::EmptyRange { in_point, out_point });
        }
        if out_point > self.total_frames {
            return Err(SegmentError::OutOfBounds { out_point, total_frames: self.total_frames });
        }
        let id = Uuid::new_v4();
        self.segments.push(Segment {
            id,
            in_point,
            out_point,
            order: self.segments.len() as u32,
        });
        Ok(id)
    }

    /// Remove a segment by id. Remaining orders are re-normalized to 0..N-1.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.segments.len();
        self.segments.retain(|s| s.id != id);
        let removed = self.segments.len() != before;
        if removed {
            self.renormalize();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Move a segment to a new position in the ordering (drag-reorder).
    /// `new_pos` past the end moves it last. Returns false for unknown ids.
    pub fn move_segment(&mut self, id: Uuid, new_pos: usize) -> bool {
        let Some(from) = self.segments.iter().position(|s| s.id == id) else {
            return false;
        };
        let seg = self.segments.remove(from);
        let to = new_pos.min(self.segments.len());
        self.segments.insert(to, seg);
        self.renormalize();
        true
    }

    /// Segments sorted by their dense order ranking.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, id: Uuid) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Range-validity check the export collaborator uses to fail fast before
    /// invoking external tooling.
    pub fn is_valid_segment(&self, seg: &Segment) -> bool {
        seg.in_point < seg.out_point && seg.out_point <= self.total_frames
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment durations, in frames.
    pub fn total_duration_frames(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_frames() as u64).sum()
    }

    fn renormalize(&mut self) {
        for (i, seg) in self.segments.iter_mut().enumerate() {
            seg.order = i as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(ranges: &[(u32, u32)]) -> (TimelineModel, Vec<Uuid>) {
        let mut model = TimelineModel::new(10_000);
        let ids = ranges
            .iter()
            .map(|&(a, b)| model.add_segment(a, b).unwrap())
            .collect();
        (model, ids)
    }

    #[test]
    fn add_rejects_empty_range() {
        let mut model = TimelineModel::new(100);
        assert_eq!(
            model.add_segment(50, 50),
            Err(SegmentError::EmptyRange { in_point: 50, out_point: 50 }),
        );
        assert_eq!(
            model.add_segment(60, 40),
            Err(SegmentError::EmptyRange { in_point: 60, out_point: 40 }),
        );
        assert!(model.is_empty());
    }

    #[test]
    fn add_rejects_out_of_bounds() {
        let mut model = TimelineModel::new(100);
        assert_eq!(
            model.add_segment(90, 101),
            Err(SegmentError::OutOfBounds { out_point: 101, total_frames: 100 }),
        );
        // The last frame boundary itself is fine (out_point is exclusive).
        assert!(model.add_segment(90, 100).is_ok());
    }

    #[test]
    fn orders_are_dense_after_remove() {
        let (mut model, ids) = model_with(&[(0, 10), (20, 30), (40, 50)]);
        assert!(model.remove(ids[1]));
        let orders: Vec<u32> = model.segments().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(model.segments()[1].in_point, 40);
    }

    #[test]
    fn reorder_swaps_and_sorts_by_order() {
        // Spec scenario: [(100,200) order 0, (50,80) order 1] swapped returns
        // [(50,80), (100,200)].
        let (mut model, ids) = model_with(&[(100, 200), (50, 80)]);
        assert!(model.move_segment(ids[1], 0));
        let ranges: Vec<(u32, u32)> = model
            .segments()
            .iter()
            .map(|s| (s.in_point, s.out_point))
            .collect();
        assert_eq!(ranges, vec![(50, 80), (100, 200)]);
        assert_eq!(model.segments()[0].order, 0);
        assert_eq!(model.segments()[1].order, 1);
    }

    #[test]
    fn move_past_end_lands_last() {
        let (mut model, ids) = model_with(&[(0, 10), (20, 30), (40, 50)]);
        assert!(model.move_segment(ids[0], 99));
        assert_eq!(model.segments()[2].id, ids[0]);
        assert_eq!(model.segments()[2].order, 2);
    }

    #[test]
    fn move_unknown_id_is_a_noop() {
        let (mut model, _) = model_with(&[(0, 10)]);
        assert!(!model.move_segment(Uuid::new_v4(), 0));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn reset_clears_and_rebinds() {
        let (mut model, _) = model_with(&[(0, 10), (20, 30)]);
        model.reset(500);
        assert!(model.is_empty());
        assert_eq!(model.total_frames(), 500);
    }

    #[test]
    fn validity_check_tracks_source_bounds() {
        let (model, _) = model_with(&[(0, 10)]);
        let good = model.segments()[0];
        assert!(model.is_valid_segment(&good));

        let mut shrunk = TimelineModel::new(5);
        shrunk.segments = vec![good];
        assert!(!shrunk.is_valid_segment(&good));
    }

    #[test]
    fn durations_sum_across_segments() {
        let (model, _) = model_with(&[(0, 10), (100, 130)]);
        assert_eq!(model.total_duration_frames(), 40);
        assert!((model.segments()[1].duration_secs(30.0) - 1.0).abs() < 1e-9);
    }
}
