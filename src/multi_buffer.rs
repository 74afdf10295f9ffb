//! MultiBuffer: many independently growable sub-buffers packed into one
//! contiguous backing buffer.
//!
//! Layout
//! - The backing `Vec<T>` is split into consecutive regions, one per
//!   descriptor, in descriptor order. A region spans
//!   `[offset, offset + capacity)`; only its first `count` elements are
//!   occupied.
//! - Destroyed descriptors keep their region. The region is only handed out
//!   again when the id generator reissues the same id.
//! - Growing a region inserts elements into the backing buffer right after
//!   the region's occupied part and moves every later region's offset
//!   forward by the same amount.
//!
//! Invariant (checked after every mutation in debug builds): descriptor
//! regions tile the backing buffer exactly, so the sum of all descriptor
//! capacities, live or free, equals `len()`.

use crate::id_generator::{Id, IdGenerator};
use tracing::trace;

/// Opaque, recyclable handle to a sub-buffer of a [`MultiBuffer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SubBufferHandle(Id);

impl SubBufferHandle {
    pub(crate) fn new(id: Id) -> Self {
        SubBufferHandle(id)
    }

    /// The raw id backing this handle.
    pub fn id(&self) -> Id {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct SubBuffer {
    // start of the region, in elements
    offset: usize,
    capacity: usize,
    count: usize,
    is_free: bool,
}

#[derive(Debug, Clone)]
pub struct MultiBuffer<T> {
    buffer: Vec<T>,
    id_gen: IdGenerator,
    sub_buffers: Vec<SubBuffer>,
}

impl<T: Copy + Default> Default for MultiBuffer<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Copy + Default> MultiBuffer<T> {
    /// Create an empty multi-buffer with raw storage for `capacity` elements.
    ///
    /// No element is tiled yet; `len()` is zero until sub-buffers exist.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            id_gen: IdGenerator::new(0),
            sub_buffers: Vec::new(),
        }
    }

    /// Number of backing elements reserved by descriptors (live or free).
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Raw storage capacity of the backing buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Total number of occupied elements across live sub-buffers.
    pub fn combined_sub_buffers_count(&self) -> usize {
        self.sub_buffers
            .iter()
            .filter(|s| !s.is_free)
            .map(|s| s.count)
            .sum()
    }

    /// Number of live sub-buffers.
    pub fn sub_buffer_count(&self) -> usize {
        debug_assert!(self.sub_buffers.len() >= self.id_gen.returned_count());
        self.sub_buffers.len() - self.id_gen.returned_count()
    }

    /// Handles of all live sub-buffers, in backing-buffer order.
    pub fn handles(&self) -> impl Iterator<Item = SubBufferHandle> + '_ {
        self.sub_buffers
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_free)
            .map(|(i, _)| SubBufferHandle::new(i as Id))
    }

    /// Drop every sub-buffer and release all tiled elements.
    ///
    /// Every handle issued so far becomes invalid.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.id_gen.reset(0);
        self.sub_buffers.clear();
    }

    /// True if the descriptor regions partition the backing buffer with no
    /// gap and no overlap.
    pub fn is_tiled(&self) -> bool {
        let mut next = 0usize;
        for s in &self.sub_buffers {
            if s.offset != next || s.count > s.capacity {
                return false;
            }
            next += s.capacity;
        }
        next == self.buffer.len()
    }

    #[inline]
    fn verify(&self) {
        debug_assert!(
            self.is_tiled(),
            "multi-buffer regions no longer tile the backing buffer"
        );
    }

    /// Append the occupied elements of every live sub-buffer, in descriptor
    /// order, to `dst`.
    pub fn flatcopy_to(&self, dst: &mut Vec<T>) {
        dst.reserve(self.combined_sub_buffers_count());
        for s in self.sub_buffers.iter().filter(|s| !s.is_free && s.count > 0) {
            dst.extend_from_slice(&self.buffer[s.offset..s.offset + s.count]);
        }
    }

    /// Copy the occupied elements of every live sub-buffer into the front of
    /// `dst`, returning the number of elements written.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `combined_sub_buffers_count()`.
    pub fn flatcopy_into(&self, dst: &mut [T]) -> usize {
        let mut written = 0;
        for s in self.sub_buffers.iter().filter(|s| !s.is_free && s.count > 0) {
            dst[written..written + s.count]
                .copy_from_slice(&self.buffer[s.offset..s.offset + s.count]);
            written += s.count;
        }
        written
    }

    /// Create a sub-buffer able to hold `capacity` elements before growing.
    ///
    /// A recycled id reuses its old descriptor and region, growing the
    /// region in place when `capacity` exceeds it. A fresh id appends a new
    /// region at the tail of the backing buffer.
    pub fn sub_buffer_create(&mut self, capacity: usize) -> SubBufferHandle {
        let id = self.id_gen.get();
        let index = id as usize;
        if index < self.sub_buffers.len() {
            let sub = self.sub_buffers[index];
            assert!(sub.is_free, "id {id} reissued for a live sub-buffer");
            if capacity > sub.capacity {
                let delta = capacity - sub.capacity;
                self.insert_pseudo(sub.offset + sub.capacity, delta);
                let shifted = self.shift_after(index, delta);
                self.sub_buffers[index].capacity = capacity;
                trace!(
                    id,
                    old = sub.capacity,
                    new = capacity,
                    shifted,
                    "grew reused sub-buffer"
                );
            } else {
                trace!(id, capacity = sub.capacity, "reused sub-buffer");
            }
        } else {
            debug_assert_eq!(index, self.sub_buffers.len());
            // New regions start after every existing one, free ones included.
            let offset: usize = self.sub_buffers.iter().map(|s| s.capacity).sum();
            debug_assert_eq!(offset, self.buffer.len());
            self.sub_buffers.push(SubBuffer {
                offset,
                capacity,
                count: 0,
                is_free: true,
            });
            if capacity != 0 {
                self.buffer.resize(offset + capacity, T::default());
            }
        }
        let sub = &mut self.sub_buffers[index];
        sub.is_free = false;
        sub.count = 0;
        self.verify();
        SubBufferHandle::new(id)
    }

    /// Destroy a live sub-buffer. Its region stays reserved for the next
    /// create that reuses the same id.
    pub fn sub_buffer_destroy(&mut self, handle: SubBufferHandle) {
        let index = self.check_handle(handle);
        let sub = &mut self.sub_buffers[index];
        sub.is_free = true;
        sub.count = 0;
        self.id_gen.put(handle.id());
        self.verify();
    }

    /// Append `value` to the sub-buffer, growing its region if full.
    pub fn sub_buffer_push(&mut self, handle: SubBufferHandle, value: T) {
        self.sub_buffer_push_with(handle, |slot| *slot = value);
    }

    /// Append a defaulted element to the sub-buffer and let `init` fill it
    /// in place. `init` may write only part of the element.
    pub fn sub_buffer_push_with<F>(&mut self, handle: SubBufferHandle, init: F)
    where
        F: FnOnce(&mut T),
    {
        let index = self.check_handle(handle);
        let sub = self.sub_buffers[index];

        let mut capacity = sub.capacity.max(1);
        if capacity < sub.count + 1 {
            capacity <<= 1;
        }
        if capacity > sub.capacity {
            let delta = capacity - sub.capacity;
            self.insert_pseudo(sub.offset + sub.count, delta);
            let shifted = self.shift_after(index, delta);
            self.sub_buffers[index].capacity = capacity;
            trace!(
                id = handle.id(),
                old = sub.capacity,
                new = capacity,
                shifted,
                "grew sub-buffer"
            );
        }

        let at = sub.offset + sub.count;
        self.buffer[at] = T::default();
        init(&mut self.buffer[at]);
        self.sub_buffers[index].count += 1;
        self.verify();
    }

    /// Reset every occupied element to its default and empty the
    /// sub-buffer. Capacity is kept.
    pub fn sub_buffer_clear(&mut self, handle: SubBufferHandle) {
        let index = self.check_handle(handle);
        let sub = self.sub_buffers[index];
        self.buffer[sub.offset..sub.offset + sub.count].fill(T::default());
        self.sub_buffers[index].count = 0;
        self.verify();
    }

    /// Index of the first occupied element matching `pred`.
    pub fn sub_buffer_find_index_of<P>(&self, handle: SubBufferHandle, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.sub_buffer_as_slice(handle).iter().position(pred)
    }

    /// Remove the first occupied element matching `pred`, keeping the order
    /// of the remaining elements. Returns false if nothing matched.
    pub fn sub_buffer_remove<P>(&mut self, handle: SubBufferHandle, pred: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        match self.sub_buffer_find_index_of(handle, pred) {
            Some(i) => {
                self.sub_buffer_remove_at(handle, i);
                true
            }
            None => false,
        }
    }

    /// Remove and return the element at `index`, shifting the later
    /// elements of the sub-buffer down by one.
    pub fn sub_buffer_remove_at(&mut self, handle: SubBufferHandle, index: usize) -> T {
        let sb = self.check_handle(handle);
        let sub = self.sub_buffers[sb];
        let at = Self::master_index(&sub, index);
        let removed = self.buffer[at];
        let end = sub.offset + sub.count;
        self.buffer[at..end].rotate_left(1);
        self.buffer[end - 1] = T::default();
        self.sub_buffers[sb].count -= 1;
        self.verify();
        removed
    }

    pub fn sub_buffer_len(&self, handle: SubBufferHandle) -> usize {
        self.sub_buffers[self.check_handle(handle)].count
    }

    pub fn sub_buffer_capacity(&self, handle: SubBufferHandle) -> usize {
        self.sub_buffers[self.check_handle(handle)].capacity
    }

    /// Start of the sub-buffer's region within the backing buffer.
    pub fn sub_buffer_offset(&self, handle: SubBufferHandle) -> usize {
        self.sub_buffers[self.check_handle(handle)].offset
    }

    pub fn sub_buffer_get_at(&self, handle: SubBufferHandle, index: usize) -> T {
        *self.sub_buffer_get_ref(handle, index)
    }

    pub fn sub_buffer_get_ref(&self, handle: SubBufferHandle, index: usize) -> &T {
        let sub = &self.sub_buffers[self.check_handle(handle)];
        &self.buffer[Self::master_index(sub, index)]
    }

    pub fn sub_buffer_get_mut(&mut self, handle: SubBufferHandle, index: usize) -> &mut T {
        let sub = self.sub_buffers[self.check_handle(handle)];
        &mut self.buffer[Self::master_index(&sub, index)]
    }

    pub fn sub_buffer_set_at(&mut self, handle: SubBufferHandle, index: usize, value: T) {
        *self.sub_buffer_get_mut(handle, index) = value;
    }

    /// Update the element at `index` in place; `update` may touch only part
    /// of it.
    pub fn sub_buffer_set_at_with<F>(&mut self, handle: SubBufferHandle, index: usize, update: F)
    where
        F: FnOnce(&mut T),
    {
        update(self.sub_buffer_get_mut(handle, index));
    }

    /// The occupied elements of the sub-buffer.
    pub fn sub_buffer_as_slice(&self, handle: SubBufferHandle) -> &[T] {
        let sub = &self.sub_buffers[self.check_handle(handle)];
        &self.buffer[sub.offset..sub.offset + sub.count]
    }

    pub fn sub_buffer_as_mut_slice(&mut self, handle: SubBufferHandle) -> &mut [T] {
        let sub = self.sub_buffers[self.check_handle(handle)];
        &mut self.buffer[sub.offset..sub.offset + sub.count]
    }

    fn check_handle(&self, handle: SubBufferHandle) -> usize {
        let index = handle.index();
        assert!(
            index < self.sub_buffers.len(),
            "sub-buffer handle {} out of range",
            handle.id()
        );
        assert!(
            !self.sub_buffers[index].is_free,
            "sub-buffer handle {} used after destroy",
            handle.id()
        );
        index
    }

    #[inline]
    fn master_index(sub: &SubBuffer, index: usize) -> usize {
        assert!(
            index < sub.count,
            "index {index} out of bounds for sub-buffer of length {}",
            sub.count
        );
        sub.offset + index
    }

    fn insert_pseudo(&mut self, at: usize, n: usize) {
        drop(
            self.buffer
                .splice(at..at, std::iter::repeat(T::default()).take(n)),
        );
    }

    // Moves the regions after `index` forward by `delta`; returns how many moved.
    fn shift_after(&mut self, index: usize, delta: usize) -> usize {
        let later = &mut self.sub_buffers[index + 1..];
        for s in later.iter_mut() {
            s.offset += delta;
        }
        later.len()
    }
}
