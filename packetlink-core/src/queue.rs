//! Interrupt-safe receive queue
//!
//! The transport's receive interrupt calls [`RxQueue::push`], which only
//! stores the byte and raises a pending flag. All framing work (assembly,
//! checksum, dispatch) happens later when the main loop drains the queue
//! through [`ByteSource`](crate::channel::ByteSource).
//!
//! Single producer, single consumer. Head and tail are free-running counters;
//! the producer owns `head`, the consumer owns `tail`, and each publishes its
//! counter with release ordering after touching the slot.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Lock-free byte ring of `N` slots (`N` a power of two)
pub struct RxQueue<const N: usize> {
    slots: [AtomicU8; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    pending: AtomicBool,
    dropped: AtomicUsize,
}

impl<const N: usize> RxQueue<N> {
    const CAPACITY_OK: () = assert!(N.is_power_of_two(), "RxQueue capacity must be a power of two");

    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY_SLOT: AtomicU8 = AtomicU8::new(0);

    /// Create an empty queue; usable in a `static`
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: [Self::EMPTY_SLOT; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            pending: AtomicBool::new(false),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Producer side: enqueue `byte`
    ///
    /// Returns `false` and counts the byte as dropped when the queue is full.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == N {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.slots[head & (N - 1)].store(byte, Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Consumer side: dequeue the oldest byte
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let byte = self.slots[tail & (N - 1)].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Bytes waiting to be consumed
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Consumer side: read and clear the pending flag
    ///
    /// Clear before draining, so a byte pushed mid-drain leaves the flag set.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Bytes rejected because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for RxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for RxQueue<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxQueue")
            .field("capacity", &N)
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue: RxQueue<8> = RxQueue::new();
        assert!(queue.is_empty());

        for byte in 1..=5 {
            assert!(queue.push(byte));
        }
        assert_eq!(queue.len(), 5);
        assert!(queue.take_pending());
        assert!(!queue.take_pending());

        let drained: Vec<u8> = core::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![1, 2, 3, 4, 5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops() {
        let queue: RxQueue<4> = RxQueue::new();
        for byte in 0..4 {
            assert!(queue.push(byte));
        }
        assert!(!queue.push(99));
        assert_eq!(queue.dropped(), 1);

        assert_eq!(queue.pop(), Some(0));
        assert!(queue.push(4));
        let drained: Vec<u8> = core::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_static_queue() {
        static QUEUE: RxQueue<16> = RxQueue::new();
        QUEUE.push(0xAA);
        assert_eq!(QUEUE.pop(), Some(0xAA));
    }

    #[test]
    fn test_concurrent_producer() {
        let queue = Arc::new(RxQueue::<64>::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..10_000u32 {
                    while !queue.push(i as u8) {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        let mut received = 0u32;
        while received < 10_000 {
            if let Some(byte) = queue.pop() {
                assert_eq!(byte, received as u8);
                received += 1;
            }
        }
        producer.join().unwrap();
        assert!(queue.is_empty());
    }
}
