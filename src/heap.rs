//! # Bump Allocator
//!
//! Hands out zeroed blocks from one fixed region by advancing a cursor.
//! Nothing is ever freed, so blocks can never overlap or dangle; each block
//! is split off the free tail with `split_at_mut`, which makes disjointness
//! a property of the types rather than of pointer arithmetic.
//!
//! Allocation only happens during init, before the task loop starts.
//! Exhaustion is fatal through [`Heap::alloc`]/[`Heap::alloc_batch`]; the
//! `try_` forms report it instead.

use crate::error::AllocError;
use crate::sched::Scheduler;

/// Monotonic allocator over a fixed region.
pub struct Heap<'a> {
    free: &'a mut [u8],
    used: usize,
}

/// Length of the heap that starts at `start` when the stack grows down from
/// `stack_top` and needs `stack_reserve` bytes. Zero if they overlap.
pub const fn span_below_stack(start: usize, stack_top: usize, stack_reserve: usize) -> usize {
    stack_top.saturating_sub(stack_reserve).saturating_sub(start)
}

impl<'a> Heap<'a> {
    /// Build a heap over all of `region`.
    pub fn new(region: &'a mut [u8]) -> Self {
        Self { free: region, used: 0 }
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.free.len()
    }

    pub fn try_alloc(&mut self, size: usize) -> Result<&'a mut [u8], AllocError> {
        let available = self.free.len();
        if size > available {
            return Err(AllocError::Exhausted {
                requested: size,
                available,
            });
        }
        let (block, rest) = core::mem::take(&mut self.free).split_at_mut(size);
        self.free = rest;
        self.used += size;
        block.fill(0);
        Ok(block)
    }

    /// Allocate exactly `size` zeroed bytes. Shuts down if they do not fit.
    pub fn alloc(&mut self, sched: &dyn Scheduler, size: usize) -> &'a mut [u8] {
        match self.try_alloc(size) {
            Ok(block) => block,
            Err(err) => {
                log::error!("{}", err);
                sched.shutdown("alloc_chunk failed")
            }
        }
    }

    /// How many `item_size`-byte items fit right now, clamped to `count`.
    /// Zero-sized items always fit.
    pub fn batch_capacity(&self, item_size: usize, count: usize) -> usize {
        match item_size {
            0 => count,
            size => (self.free.len() / size).min(count),
        }
    }

    /// Allocate as many `item_size`-byte items as fit, up to `count`, as one
    /// zeroed block. Returns the block and the number of items in it.
    pub fn try_alloc_batch(
        &mut self,
        item_size: usize,
        count: usize,
    ) -> Result<(&'a mut [u8], usize), AllocError> {
        let fits = self.batch_capacity(item_size, count);
        if fits == 0 {
            return Err(AllocError::NoItemFits {
                item_size,
                available: self.free.len(),
            });
        }
        let block = self.try_alloc(item_size * fits)?;
        Ok((block, fits))
    }

    /// Like [`Heap::try_alloc_batch`], but shuts down if not even one item
    /// fits.
    pub fn alloc_batch(
        &mut self,
        sched: &dyn Scheduler,
        item_size: usize,
        count: usize,
    ) -> (&'a mut [u8], usize) {
        match self.try_alloc_batch(item_size, count) {
            Ok(batch) => batch,
            Err(err) => {
                log::error!("{}", err);
                sched.shutdown("alloc_chunks failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Respond;

    struct PanicSched;

    impl Scheduler for PanicSched {
        fn is_shutdown(&self) -> bool {
            false
        }

        fn report_shutdown(&self, _out: &dyn Respond) {}

        fn shutdown(&self, reason: &'static str) -> ! {
            panic!("shutdown: {}", reason)
        }
    }

    fn region(len: usize) -> &'static mut [u8] {
        Box::leak(vec![0xAA; len].into_boxed_slice())
    }

    fn span(block: &[u8]) -> (usize, usize) {
        let start = block.as_ptr() as usize;
        (start, start + block.len())
    }

    #[test]
    fn test_blocks_are_zeroed_and_disjoint() {
        let mut heap = Heap::new(region(128));
        let a = heap.alloc(&PanicSched, 10);
        let b = heap.alloc(&PanicSched, 30);
        let (c, n) = heap.alloc_batch(&PanicSched, 4, 3);

        assert_eq!(n, 3);
        assert_eq!((a.len(), b.len(), c.len()), (10, 30, 12));
        for block in [&*a, &*b, &*c] {
            assert!(block.iter().all(|&byte| byte == 0));
        }

        let spans = [span(a), span(b), span(c)];
        for (i, x) in spans.iter().enumerate() {
            for y in &spans[i + 1..] {
                assert!(x.1 <= y.0 || y.1 <= x.0, "{:?} overlaps {:?}", x, y);
            }
        }
        assert!(spans[0].1 <= spans[1].0, "cursor only moves up");
        assert_eq!(heap.used(), 52);
        assert_eq!(heap.remaining(), 76);
    }

    #[test]
    fn test_span_stops_short_of_stack_reserve() {
        assert_eq!(span_below_stack(0x2000_0100, 0x2000_2000, 0x100), 0x1e00);
        assert_eq!(span_below_stack(0x2000_1f80, 0x2000_2000, 0x100), 0);
        assert_eq!(span_below_stack(0x2000_0000, 0x80, 0x100), 0);
    }

    #[test]
    fn test_region_end_is_never_handed_out() {
        let mut heap = Heap::new(region(60));
        assert_eq!(heap.remaining(), 60);
        assert!(heap.try_alloc(60).is_ok());
        assert_eq!(
            heap.try_alloc(1),
            Err(AllocError::Exhausted {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_batch_clamps_to_available_space() {
        let mut heap = Heap::new(region(60));
        let (block, n) = heap.alloc_batch(&PanicSched, 8, 10);
        assert_eq!(n, 7);
        assert_eq!(block.len(), 56);
        assert_eq!(heap.remaining(), 4);
    }

    #[test]
    fn test_batch_clamps_to_requested_count() {
        let mut heap = Heap::new(region(256));
        let (block, n) = heap.alloc_batch(&PanicSched, 8, 5);
        assert_eq!(n, 5);
        assert_eq!(block.len(), 40);
        assert_eq!(heap.batch_capacity(8, 1000), 27);
    }

    #[test]
    fn test_zero_sized_batch_takes_no_space() {
        let mut heap = Heap::new(region(16));
        let (block, n) = heap.alloc_batch(&PanicSched, 0, 4);
        assert_eq!((block.len(), n), (0, 4));
        assert_eq!(heap.remaining(), 16);
    }

    #[test]
    fn test_failed_try_alloc_leaves_cursor() {
        let mut heap = Heap::new(region(32));
        heap.try_alloc(20).unwrap();
        assert!(heap.try_alloc(13).is_err());
        assert_eq!(heap.remaining(), 12);
        assert_eq!(heap.try_alloc(12).unwrap().len(), 12);
    }

    #[test]
    #[should_panic(expected = "alloc_chunk failed")]
    fn test_exhaustion_is_fatal() {
        let mut heap = Heap::new(region(48));
        heap.alloc(&PanicSched, 40);
        heap.alloc(&PanicSched, 9);
    }

    #[test]
    #[should_panic(expected = "alloc_chunks failed")]
    fn test_batch_with_no_room_is_fatal() {
        let mut heap = Heap::new(region(60));
        heap.alloc(&PanicSched, 56);
        heap.alloc_batch(&PanicSched, 8, 10);
    }
}
