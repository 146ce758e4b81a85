use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use pcm_engine_core::RingBuffer;

struct RingState<T> {
    ring: RingBuffer<T>,
    overruns: u64,
}

/// A [`RingBuffer`] shared between a cpal callback and an engine worker.
///
/// The callback side never blocks: input callbacks push (dropping the oldest
/// samples on overrun) and output callbacks pop whatever is queued. The worker
/// side blocks on a condition variable until there is enough data or room.
///
/// Sizes passed to the blocking calls are in samples and are expected to be
/// whole frames; reads hand out whole multiples of `unit` only, so channel
/// interleaving is never split across two reads.
pub struct SharedRing<T> {
    state: Mutex<RingState<T>>,
    changed: Condvar,
}

impl<T: Copy + Default> SharedRing<T> {
    /// `capacity` is rounded down to a multiple of `unit` (at least one unit).
    pub fn new(capacity: usize, unit: usize) -> Self {
        let unit = unit.max(1);
        let capacity = (capacity / unit * unit).max(unit);
        Self {
            state: Mutex::new(RingState {
                ring: RingBuffer::new(capacity),
                overruns: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Producer side of an input stream.
    pub fn push_overwrite(&self, samples: &[T]) {
        let mut state = self.state.lock();
        let dropped = state.ring.write(samples);
        if dropped > 0 {
            state.overruns += 1;
            log::trace!("input ring overrun, dropped {} samples", dropped);
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Consumer side of an output stream: move queued samples into `out`.
    ///
    /// Returns how many were moved; the caller fills the rest with silence.
    pub fn pop_available(&self, out: &mut [T]) -> usize {
        let n = self.state.lock().ring.read_into(out);
        self.changed.notify_all();
        n
    }

    /// Wait until `out` can be filled, then fill it.
    ///
    /// If `timeout` passes first, returns whatever whole units are queued,
    /// which may be zero.
    pub fn read_blocking(&self, out: &mut [T], unit: usize, timeout: Duration) -> usize {
        let unit = unit.max(1);
        let wanted = out.len() / unit * unit;
        let deadline = Instant::now() + timeout;

        let mut state = self.state.lock();
        while state.ring.count() < wanted {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        let take = state.ring.count().min(wanted) / unit * unit;
        state.ring.read_into(&mut out[..take])
    }

    /// Wait for room, then queue as many whole units of `samples` as fit.
    ///
    /// Returns the number of samples queued; zero only if no room appeared
    /// within `timeout`.
    pub fn write_blocking(&self, samples: &[T], unit: usize, timeout: Duration) -> usize {
        let unit = unit.max(1);
        let deadline = Instant::now() + timeout;

        let mut state = self.state.lock();
        loop {
            let room = state.ring.free().min(samples.len()) / unit * unit;
            if room > 0 {
                state.ring.write(&samples[..room]);
                return room;
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return 0;
            }
        }
    }

    /// Wait until every queued sample has been consumed.
    ///
    /// Returns `false` if `timeout` passed first.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.ring.is_empty() {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.ring.is_empty();
            }
        }
        true
    }

    pub fn clear(&self) {
        self.state.lock().ring.reset();
        self.changed.notify_all();
    }

    /// Number of input overruns since creation.
    pub fn overruns(&self) -> u64 {
        self.state.lock().overruns
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }
}
