//! Bounded SPSC sample FIFO for the object render backend
//!
//! One ring per source: the host mixer callback writes, the render pump
//! reads. The two endpoints run on different threads, so samples are stored
//! as `AtomicU32` float bits and a single `buffered` counter with
//! release/acquire ordering is the synchronisation variable. Positions are
//! updated before `buffered` is published, so neither endpoint observes a
//! partially written span.
//!
//! Overrun policy is drop-oldest: a write that would exceed capacity first
//! discards as many of the oldest samples as it is about to append. The
//! writer advancing the read cursor is only safe while the reader is idle
//! (starved or stopped), which is the only condition under which the ring
//! can fill up.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

struct RingShared {
    data: Box<[AtomicU32]>,
    capacity: usize,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    buffered: AtomicUsize,
}

impl RingShared {
    /// Advance the read cursor without copying. Clamped to what is buffered.
    fn drop_oldest(&self, n: usize) {
        let n = n.min(self.buffered.load(Ordering::Acquire));
        if n == 0 {
            return;
        }
        let rp = self.read_pos.load(Ordering::Relaxed);
        self.read_pos.store((rp + n) % self.capacity, Ordering::Relaxed);
        self.buffered.fetch_sub(n, Ordering::Release);
    }
}

/// Create a ring holding `frames * channels` samples
pub fn ring(frames: usize, channels: usize) -> (RingWriter, RingReader) {
    let capacity = frames * channels;
    let data = (0..capacity).map(|_| AtomicU32::new(0)).collect();
    let shared = Arc::new(RingShared {
        data,
        capacity,
        read_pos: AtomicUsize::new(0),
        write_pos: AtomicUsize::new(0),
        buffered: AtomicUsize::new(0),
    });
    (
        RingWriter { shared: Arc::clone(&shared) },
        RingReader { shared },
    )
}

/// Producer half; owned by the host-callback side
pub struct RingWriter {
    shared: Arc<RingShared>,
}

impl RingWriter {
    /// Append contiguous samples, dropping the oldest on overrun
    pub fn write(&self, src: &[f32]) {
        self.write_strided(src, src.len(), 0);
    }

    /// Append `samples` values gathered every `stride`-th element of `src`.
    /// Stride 0 means contiguous.
    pub fn write_strided(&self, src: &[f32], samples: usize, stride: usize) {
        let s = &*self.shared;
        let n = samples.min(s.capacity);
        if n == 0 {
            return;
        }
        if s.buffered.load(Ordering::Acquire) + n > s.capacity {
            s.drop_oldest(n);
        }
        let step = stride.max(1);
        debug_assert!(src.len() > (n - 1) * step);
        let mut wp = s.write_pos.load(Ordering::Relaxed);
        for i in 0..n {
            s.data[wp].store(src[i * step].to_bits(), Ordering::Relaxed);
            wp += 1;
            if wp == s.capacity {
                wp = 0;
            }
        }
        s.write_pos.store(wp, Ordering::Relaxed);
        s.buffered.fetch_add(n, Ordering::Release);
    }

    pub fn buffered_samples(&self) -> usize {
        self.shared.buffered.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// Consumer half; owned by the render pump side
pub struct RingReader {
    shared: Arc<RingShared>,
}

impl RingReader {
    /// Copy up to `dst.len()` samples out in FIFO order, zero-filling the
    /// tail on underrun. Returns the number of samples actually copied.
    pub fn read(&self, dst: &mut [f32]) -> usize {
        let s = &*self.shared;
        let avail = s.buffered.load(Ordering::Acquire);
        let take = dst.len().min(avail);
        let mut rp = s.read_pos.load(Ordering::Relaxed);
        for d in dst[..take].iter_mut() {
            *d = f32::from_bits(s.data[rp].load(Ordering::Relaxed));
            rp += 1;
            if rp == s.capacity {
                rp = 0;
            }
        }
        dst[take..].fill(0.0);
        if take > 0 {
            s.read_pos.store(rp, Ordering::Relaxed);
            s.buffered.fetch_sub(take, Ordering::Release);
        }
        take
    }

    /// Discard up to `n` buffered samples
    pub fn drop_samples(&self, n: usize) {
        self.shared.drop_oldest(n);
    }

    /// Discard everything currently buffered
    pub fn clear(&self) {
        let buffered = self.shared.buffered.load(Ordering::Acquire);
        self.shared.drop_oldest(buffered);
    }

    pub fn buffered_samples(&self) -> usize {
        self.shared.buffered.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}
