//! Memory management utilities
//!
//! [`MatrixMemoryPool`] is the per-pass arena the cull traversal draws its
//! model-view matrices from. The backing storage only ever grows, so after the
//! first few frames a traversal allocates nothing.

use crate::foundation::math::Mat4;

/// Handle to one matrix handed out by a [`MatrixMemoryPool`]
///
/// A slot is only meaningful for the pass it was obtained in; it carries the
/// pass number so stale handles are caught in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixSlot {
    index: usize,
    pass: u64,
}

impl MatrixSlot {
    /// Position of the slot in the pool's backing storage
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Arena of reusable matrices with a rewinding cursor
#[derive(Debug, Clone)]
pub struct MatrixMemoryPool {
    matrices: Vec<Mat4>,
    cursor: usize,
    pass: u64,
}

impl MatrixMemoryPool {
    /// Create a pool with `initial_size` pre-allocated identity matrices
    pub fn new(initial_size: usize) -> Self {
        Self {
            matrices: vec![Mat4::identity(); initial_size],
            cursor: 0,
            pass: 0,
        }
    }

    /// Rewind the cursor; call once at the start of every traversal pass.
    ///
    /// Slots obtained before the reset must not be used afterwards.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pass += 1;
    }

    /// Hand out the next slot, growing the storage by one when exhausted.
    ///
    /// The matrix keeps whatever the previous pass left in it; callers
    /// overwrite it.
    pub fn get(&mut self) -> MatrixSlot {
        if self.cursor == self.matrices.len() {
            self.matrices.push(Mat4::identity());
        }
        let slot = MatrixSlot {
            index: self.cursor,
            pass: self.pass,
        };
        self.cursor += 1;
        slot
    }

    /// Hand out the next slot initialised to `value`
    pub fn get_with(&mut self, value: Mat4) -> MatrixSlot {
        let slot = self.get();
        self.matrices[slot.index] = value;
        slot
    }

    /// Read a slot obtained during the current pass
    pub fn slot(&self, slot: MatrixSlot) -> &Mat4 {
        debug_assert_eq!(slot.pass, self.pass, "matrix slot used after pool reset");
        &self.matrices[slot.index]
    }

    /// Mutable access to a slot obtained during the current pass
    pub fn slot_mut(&mut self, slot: MatrixSlot) -> &mut Mat4 {
        debug_assert_eq!(slot.pass, self.pass, "matrix slot used after pool reset");
        &mut self.matrices[slot.index]
    }

    /// Size of the backing storage
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// True when no matrix has ever been allocated
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Number of slots handed out since the last reset
    pub fn in_use(&self) -> usize {
        self.cursor
    }
}

impl Default for MatrixMemoryPool {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pool_grows_to_max_of_initial_and_requests() {
        for (initial, requests) in [(4, 2), (4, 4), (2, 9), (0, 3)] {
            let mut pool = MatrixMemoryPool::new(initial);
            pool.reset();
            let slots: Vec<_> = (0..requests).map(|_| pool.get()).collect();

            assert_eq!(pool.len(), initial.max(requests));
            let distinct: HashSet<_> = slots.iter().map(MatrixSlot::index).collect();
            assert_eq!(distinct.len(), requests);
        }
    }

    #[test]
    fn test_reset_reuses_storage_without_growing() {
        let mut pool = MatrixMemoryPool::new(0);
        for _ in 0..3 {
            pool.reset();
            for _ in 0..5 {
                pool.get();
            }
        }
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.in_use(), 5);
    }

    #[test]
    fn test_slots_do_not_alias() {
        let mut pool = MatrixMemoryPool::new(1);
        let a = pool.get_with(Mat4::identity() * 2.0);
        let b = pool.get_with(Mat4::identity() * 3.0);
        *pool.slot_mut(a) *= 5.0;
        assert_eq!(pool.slot(b)[(0, 0)], 3.0);
        assert_eq!(pool.slot(a)[(0, 0)], 10.0);
    }
}
