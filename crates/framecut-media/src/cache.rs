// crates/framecut-media/src/cache.rs
//
// FrameCache: fixed-capacity LRU store of decoded frames, shared between the
// render path (reads) and the prefetch + sync-decode paths (writes).
//
// Layout: slot arena + intrusive doubly-linked LRU list over slot indices +
// frame-index → slot map. No Rc cycles, O(1) promote/evict. The mutex guards
// only the map/list mutation — a decode never runs under it, so a render
// read is blocked for a pointer swap at worst.
//
// Pinning: the entry currently on screen is pinned by the controller.
// Eviction never removes a pinned entry; if that would leave the cache over
// capacity, the overflow is tolerated and resolved when the pin drops
// (deferred eviction, logged as a soft warning since it means renderer
// frames are being held too long).

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::warn;

use framecut_core::Frame;

const NIL: usize = usize::MAX;

/// Counters exposed for diagnostics overlays and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub len:      usize,
    pub capacity: usize,
    pub hits:     u64,
    pub misses:   u64,
}

struct Slot {
    index: u32,
    frame: Frame,
    pins:  u32,
    prev:  usize,
    next:  usize,
}

struct Inner {
    map:    HashMap<u32, usize>,
    slots:  Vec<Option<Slot>>,
    free:   Vec<usize>,
    /// Most recently used slot, or NIL when empty.
    head:   usize,
    /// Least recently used slot, or NIL when empty.
    tail:   usize,
    hits:   u64,
    misses: u64,
}

impl Inner {
    fn slot(&self, i: usize) -> &Slot {
        self.slots[i].as_ref().expect("live slot")
    }

    fn slot_mut(&mut self, i: usize) -> &mut Slot {
        self.slots[i].as_mut().expect("live slot")
    }

    fn detach(&mut self, i: usize) {
        let (prev, next) = {
            let s = self.slot(i);
            (s.prev, s.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slot_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slot_mut(next).prev = prev;
        }
        let s = self.slot_mut(i);
        s.prev = NIL;
        s.next = NIL;
    }

    fn push_front(&mut self, i: usize) {
        let old_head = self.head;
        {
            let s = self.slot_mut(i);
            s.prev = NIL;
            s.next = old_head;
        }
        if old_head != NIL {
            self.slot_mut(old_head).prev = i;
        }
        self.head = i;
        if self.tail == NIL {
            self.tail = i;
        }
    }

    fn alloc(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Evict the least-recently-used unpinned entry. Returns false when every
    /// resident entry is pinned.
    fn evict_lru_unpinned(&mut self) -> bool {
        let mut i = self.tail;
        while i != NIL {
            let (pins, prev, index) = {
                let s = self.slot(i);
                (s.pins, s.prev, s.index)
            };
            if pins == 0 {
                self.detach(i);
                self.map.remove(&index);
                self.slots[i] = None;
                self.free.push(i);
                return true;
            }
            i = prev;
        }
        false
    }

    fn enforce_capacity(&mut self, capacity: usize) {
        while self.map.len() > capacity {
            if !self.evict_lru_unpinned() {
                warn!(
                    "cache full but pinned ({} resident, capacity {}) — deferring eviction to unpin",
                    self.map.len(),
                    capacity,
                );
                break;
            }
        }
    }
}

/// Thread-safe LRU frame store. One instance per opened video; a new import
/// gets a fresh instance so stale background work can never touch it.
pub struct FrameCache {
    inner:    Mutex<Inner>,
    capacity: usize,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map:    HashMap::new(),
                slots:  Vec::new(),
                free:   Vec::new(),
                head:   NIL,
                tail:   NIL,
                hits:   0,
                misses: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a frame and promote it to most-recently-used.
    ///
    /// The returned Frame is an Arc clone — it stays valid for the caller
    /// regardless of what eviction does afterwards.
    pub fn get(&self, index: u32) -> Option<Frame> {
        let mut inner = self.inner.lock();
        match inner.map.get(&index).copied() {
            Some(slot) => {
                inner.detach(slot);
                inner.push_front(slot);
                inner.hits += 1;
                Some(inner.slot(slot).frame.clone())
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        self.inner.lock().map.contains_key(&index)
    }

    /// Insert or replace a frame, promote it, and evict LRU unpinned entries
    /// while over capacity. Atomic with respect to `get` — an entry is never
    /// partially visible.
    pub fn put(&self, index: u32, frame: Frame) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.map.get(&index).copied() {
            inner.slot_mut(slot).frame = frame;
            inner.detach(slot);
            inner.push_front(slot);
            return; // replacement never grows the map
        }
        let slot = inner.alloc(Slot { index, frame, pins: 0, prev: NIL, next: NIL });
        inner.map.insert(index, slot);
        inner.push_front(slot);
        inner.enforce_capacity(self.capacity);
    }

    /// Protect an entry from eviction. Returns false when the index is not
    /// resident. Does not promote — pinning follows a `get` that already did.
    pub fn pin(&self, index: u32) -> bool {
        let mut inner = self.inner.lock();
        match inner.map.get(&index).copied() {
            Some(slot) => {
                inner.slot_mut(slot).pins += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one pin. If the cache is still over capacity, the deferred
    /// eviction happens here.
    pub fn unpin(&self, index: u32) {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.map.get(&index).copied() else {
            return; // cleared while pinned — the renderer's Arc keeps it alive
        };
        let pins = {
            let s = inner.slot_mut(slot);
            debug_assert!(s.pins > 0, "unpin without matching pin for frame {index}");
            s.pins = s.pins.saturating_sub(1);
            s.pins
        };
        if pins == 0 {
            inner.enforce_capacity(self.capacity);
        }
    }

    /// Release every entry, pinned or not. Callers holding Frame clones are
    /// unaffected (Arc payloads). Hit/miss counters survive — they are
    /// per-instance diagnostics, not per-fill.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.slots.clear();
        inner.free.clear();
        inner.head = NIL;
        inner.tail = NIL;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            len:      inner.map.len(),
            capacity: self.capacity,
            hits:     inner.hits,
            misses:   inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_frame;
    use std::sync::Arc;

    fn resident(cache: &FrameCache) -> Vec<u32> {
        let mut v: Vec<u32> = cache.inner.lock().map.keys().copied().collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn get_after_put_returns_same_payload() {
        let cache = FrameCache::new(4);
        let f = make_frame(9);
        cache.put(9, f.clone());
        let got = cache.get(9).unwrap();
        assert_eq!(got.index, 9);
        assert_eq!(got.data().as_ptr(), f.data().as_ptr());
    }

    #[test]
    fn never_exceeds_capacity_without_pins() {
        let cache = FrameCache::new(3);
        for i in 0..50u32 {
            cache.put(i, make_frame(i));
            assert!(cache.len() <= 3, "over capacity after put({i})");
        }
        // Interleave reads to shuffle LRU order; bound must still hold.
        for i in (0..50u32).step_by(7) {
            let _ = cache.get(i);
            cache.put(100 + i, make_frame(100 + i));
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn lru_eviction_respects_access_order() {
        // Accessed A,B,C,A (capacity 3): inserting D evicts B.
        let cache = FrameCache::new(3);
        cache.put(0, make_frame(0)); // A
        cache.put(1, make_frame(1)); // B
        cache.put(2, make_frame(2)); // C
        assert!(cache.get(0).is_some()); // touch A

        cache.put(3, make_frame(3)); // D
        assert_eq!(resident(&cache), vec![0, 2, 3]);
        assert!(!cache.contains(1));
    }

    #[test]
    fn replacement_promotes_and_does_not_grow() {
        let cache = FrameCache::new(2);
        cache.put(0, make_frame(0));
        cache.put(1, make_frame(1));
        cache.put(0, make_frame(0)); // replace: 0 becomes MRU
        cache.put(2, make_frame(2)); // evicts 1, the LRU
        assert_eq!(resident(&cache), vec![0, 2]);
    }

    #[test]
    fn pinned_entry_is_skipped_by_eviction() {
        let cache = FrameCache::new(2);
        cache.put(0, make_frame(0));
        cache.put(1, make_frame(1));
        assert!(cache.pin(0)); // 0 is the LRU, but pinned

        cache.put(2, make_frame(2)); // must evict 1 instead
        assert_eq!(resident(&cache), vec![0, 2]);
    }

    #[test]
    fn all_pinned_overflows_then_deferred_eviction_on_unpin() {
        let cache = FrameCache::new(2);
        cache.put(0, make_frame(0));
        cache.put(1, make_frame(1));
        assert!(cache.pin(0));
        assert!(cache.pin(1));

        // Every candidate is pinned: the insert overflows rather than fails.
        cache.put(2, make_frame(2));
        assert_eq!(cache.len(), 3);
        assert_eq!(resident(&cache), vec![0, 1, 2]);

        // Unpin resolves the overflow by evicting the LRU unpinned entry —
        // which is the one just released.
        cache.unpin(0);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(0));
        assert!(cache.contains(1));
        assert!(cache.contains(2));
    }

    #[test]
    fn nested_pins_require_matching_unpins() {
        let cache = FrameCache::new(1);
        cache.put(0, make_frame(0));
        assert!(cache.pin(0));
        assert!(cache.pin(0));

        cache.put(1, make_frame(1)); // overflow: 0 double-pinned
        cache.unpin(0);
        assert!(cache.contains(0), "still pinned once");
        cache.unpin(0);
        assert!(!cache.contains(0), "fully unpinned — deferred eviction fires");
    }

    #[test]
    fn pin_missing_index_reports_absent() {
        let cache = FrameCache::new(2);
        assert!(!cache.pin(42));
        cache.unpin(42); // no-op, must not panic
    }

    #[test]
    fn clear_releases_everything_but_held_frames_stay_valid() {
        let cache = FrameCache::new(4);
        cache.put(0, make_frame(0));
        cache.pin(0);
        let held = cache.get(0).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(held.data().len(), held.byte_len()); // payload untouched
        cache.unpin(0); // entry gone; must not panic
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = FrameCache::new(2);
        cache.put(0, make_frame(0));
        let _ = cache.get(0);
        let _ = cache.get(0);
        let _ = cache.get(5);
        let s = cache.stats();
        assert_eq!((s.hits, s.misses), (2, 1));
        assert_eq!(s.capacity, 2);
        assert_eq!(s.len, 1);
    }

    #[test]
    fn concurrent_readers_and_writer_stay_consistent() {
        let cache = Arc::new(FrameCache::new(16));
        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..500u32 {
                    cache.put(i, make_frame(i));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500u32 {
                        if let Some(f) = cache.get(i) {
                            assert_eq!(f.index, i);
                        }
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
