//! A growable sequence of fixed-size, uninterpreted slots that is itself a counted object.
//!
//! The vector never looks inside a slot. Slots `[0, len)` are live and were initialized by the
//! caller; slots `[len, capacity)` are uninitialized and must not be read. Capacity is always
//! measured in slots, never in bytes.
//!
//! Growth: [Vector::reserve] grows to exactly the requested number of slots, while
//! [Vector::push] at least doubles the capacity when it runs out, so `n` pushes copy `O(n)`
//! bytes in total.

use core::{alloc::Layout, cell::Cell, cmp, fmt, ptr::NonNull};
use std::alloc::{alloc, dealloc, handle_alloc_error, realloc};

use rcvec_error_macros::internal_error;

use crate::owner::Owner;
use crate::refcount::{Header, Ref, RefCounted};

/// Called once per live slot, in index order, when the vector is torn down.
pub type ElementTeardown = unsafe fn(NonNull<u8>);

/// Alignment of the slot buffer. Slot `i` starts at byte `i * element_size` from there, so a
/// slot is aligned to the largest power of two that divides `element_size`, up to this value.
pub const SLOT_ALIGN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorError {
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorError::IndexOutOfRange { index, len } => write!(
                f,
                "index {index} is out of range for a vector of {len} elements"
            ),
        }
    }
}

impl std::error::Error for VectorError {}

#[repr(C)]
pub struct Vector {
    header: Header,
    // None exactly when capacity is 0.
    buffer: Cell<Option<NonNull<u8>>>,
    element_size: usize,
    len: Cell<usize>,
    capacity: Cell<usize>,
    element_teardown: Option<ElementTeardown>,
    // Set only by `with_handles`, whose teardown releases what the slots point to.
    pub(crate) holds_handles: bool,
}

unsafe impl RefCounted for Vector {}

impl Vector {
    /// Allocates room for `initial_capacity` slots of `element_size` bytes each.
    ///
    /// Like any fresh counted object the vector starts with a count of 0; acquire it before
    /// handing it to anything that might release it. `element_size` must be greater than 0.
    pub fn create(
        element_size: usize,
        initial_capacity: usize,
        element_teardown: Option<ElementTeardown>,
    ) -> Ref<Vector> {
        Self::allocate(element_size, initial_capacity, element_teardown, false)
    }

    pub(crate) fn allocate(
        element_size: usize,
        initial_capacity: usize,
        element_teardown: Option<ElementTeardown>,
        holds_handles: bool,
    ) -> Ref<Vector> {
        if element_size == 0 {
            internal_error!("a vector's element size must be greater than 0");
        }

        let vector = Ref::new(
            Vector {
                header: Header::new(),
                buffer: Cell::new(None),
                element_size,
                len: Cell::new(0),
                capacity: Cell::new(0),
                element_teardown,
                holds_handles,
            },
            Some(Vector::teardown),
        );

        unsafe { vector.get() }.reserve(initial_capacity);

        vector
    }

    /// Same as [Vector::create], already acquired once by the returned owner.
    pub fn owned(
        element_size: usize,
        initial_capacity: usize,
        element_teardown: Option<ElementTeardown>,
    ) -> Owner<Vector> {
        let vector = Self::create(element_size, initial_capacity, element_teardown);

        unsafe { Owner::adopt(vector) }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    fn buffer_layout(&self, capacity: usize) -> Layout {
        let layout = capacity
            .checked_mul(self.element_size)
            .and_then(|size| Layout::from_size_align(size, SLOT_ALIGN).ok());

        match layout {
            Some(layout) => layout,
            None => internal_error!(
                "capacity overflow: {} slots of {} bytes do not fit in memory",
                capacity,
                self.element_size
            ),
        }
    }

    /// Makes sure there are at least `min_capacity` slots. When it has to grow, the buffer is
    /// reallocated to exactly `min_capacity` slots; live slots keep their bytes.
    pub fn reserve(&self, min_capacity: usize) {
        let old_capacity = self.capacity.get();

        if min_capacity <= old_capacity {
            return;
        }

        let new_layout = self.buffer_layout(min_capacity);
        let new_buffer = match self.buffer.get() {
            None => unsafe { alloc(new_layout) },
            Some(old_buffer) => unsafe {
                realloc(
                    old_buffer.as_ptr(),
                    self.buffer_layout(old_capacity),
                    new_layout.size(),
                )
            },
        };

        let new_buffer = match NonNull::new(new_buffer) {
            Some(buffer) => buffer,
            None => handle_alloc_error(new_layout),
        };

        self.buffer.set(Some(new_buffer));
        self.capacity.set(min_capacity);

        rcvec_tracing::debug!(
            old_capacity,
            new_capacity = min_capacity,
            element_size = self.element_size,
            "vector storage grown"
        );
    }

    /// Appends an uninitialized slot and returns it.
    ///
    /// # Safety
    /// The caller must write all `element_size` bytes of the slot before anything reads it,
    /// which includes the element teardown when the vector's count reaches 0.
    pub unsafe fn push(&self) -> NonNull<u8> {
        let len = self.len.get();

        if len == self.capacity.get() {
            let required = match len.checked_add(1) {
                Some(required) => required,
                None => internal_error!("capacity overflow: the vector already holds usize::MAX slots"),
            };

            self.reserve(cmp::max(required, len.saturating_mul(2)));
        }

        let slot = unsafe { self.slot_unchecked(len) };
        self.len.set(len + 1);

        slot
    }

    /// # Safety
    /// `index` must be below the capacity.
    unsafe fn slot_unchecked(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.capacity.get());

        unsafe {
            let buffer = self.buffer.get().unwrap_unchecked();
            NonNull::new_unchecked(buffer.as_ptr().add(index * self.element_size))
        }
    }

    /// The live slot at `index`, or `None` if `index >= len`.
    pub fn at(&self, index: usize) -> Option<NonNull<u8>> {
        if index < self.len.get() {
            Some(unsafe { self.slot_unchecked(index) })
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Result<NonNull<u8>, VectorError> {
        self.at(index).ok_or(VectorError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Visits the live slots in index order. The visitor returns `true` to stop early.
    ///
    /// The length is re-read before every step, so slots pushed by the visitor are visited too.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(NonNull<u8>, usize) -> bool,
    {
        let mut index = 0;

        while let Some(slot) = self.at(index) {
            if visitor(slot, index) {
                break;
            }

            index += 1;
        }
    }

    pub fn slots(&self) -> Slots<'_> {
        Slots {
            vector: self,
            next: 0,
        }
    }

    unsafe fn teardown(object: NonNull<Header>) {
        let vector = unsafe { object.cast::<Vector>().as_ref() };
        let len = vector.len.get();
        let capacity = vector.capacity.get();

        rcvec_tracing::trace!(len, capacity, "tearing down vector");

        if let Some(element_teardown) = vector.element_teardown {
            for index in 0..len {
                unsafe { element_teardown(vector.slot_unchecked(index)) };
            }
        }

        vector.len.set(0);

        if let Some(buffer) = vector.buffer.take() {
            unsafe { dealloc(buffer.as_ptr(), vector.buffer_layout(capacity)) };
        }

        vector.capacity.set(0);
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("element_size", &self.element_size)
            .field("has_element_teardown", &self.element_teardown.is_some())
            .finish()
    }
}

/// Live slots of a [Vector], in index order.
pub struct Slots<'a> {
    vector: &'a Vector,
    next: usize,
}

impl Iterator for Slots<'_> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.vector.at(self.next)?;
        self.next += 1;

        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len().saturating_sub(self.next);

        (remaining, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    thread_local! {
        static VISITED: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
    }

    unsafe fn record_u32(slot: NonNull<u8>) {
        let value = unsafe { slot.cast::<u32>().as_ptr().read() };
        VISITED.with(|visited| visited.borrow_mut().push(value));
    }

    fn write_u32(vector: &Vector, value: u32) {
        unsafe {
            let slot = vector.push();
            slot.cast::<u32>().as_ptr().write(value);
        }
    }

    fn read_u32(slot: NonNull<u8>) -> u32 {
        unsafe { slot.cast::<u32>().as_ptr().read() }
    }

    #[test]
    fn create_starts_empty_with_requested_capacity() {
        let vector = Vector::owned(4, 3, None);

        assert_eq!(vector.len(), 0);
        assert_eq!(vector.capacity(), 3);
        assert_eq!(vector.element_size(), 4);
        assert!(vector.is_empty());
        assert_eq!(vector.ref_count(), 1);
    }

    #[test]
    fn created_vector_has_count_zero() {
        let vector = Vector::create(8, 0, None);

        unsafe {
            assert_eq!(vector.ref_count(), 0);
            assert_eq!(vector.get().capacity(), 0);

            vector.acquire().release();
        }
    }

    #[test]
    fn reserve_is_exact_and_never_shrinks() {
        let vector = Vector::owned(4, 0, None);

        vector.reserve(5);
        assert_eq!(vector.capacity(), 5);

        vector.reserve(2);
        assert_eq!(vector.capacity(), 5);

        vector.reserve(9);
        assert_eq!(vector.capacity(), 9);
    }

    #[test]
    fn push_doubles_when_full() {
        let vector = Vector::owned(4, 2, None);

        let capacities: Vec<usize> = (0..9)
            .map(|value| {
                write_u32(&vector, value);
                vector.capacity()
            })
            .collect();

        assert_eq!(capacities, vec![2, 2, 4, 4, 8, 8, 8, 8, 16]);
    }

    #[test]
    fn push_then_at_returns_the_new_slot() {
        let vector = Vector::owned(4, 0, None);

        for value in 0..20 {
            let slot = unsafe { vector.push() };
            unsafe { slot.cast::<u32>().as_ptr().write(value) };

            assert_eq!(vector.at(vector.len() - 1), Some(slot));
        }
    }

    #[test]
    fn growth_preserves_contents() {
        let vector = Vector::owned(4, 1, None);

        for value in 0..100 {
            write_u32(&vector, value * 3);
        }

        let contents: Vec<u32> = vector.slots().map(read_u32).collect();
        let expected: Vec<u32> = (0..100).map(|value| value * 3).collect();

        assert_eq!(contents, expected);
    }

    #[test]
    fn at_past_the_end_is_none() {
        let vector = Vector::owned(4, 4, None);

        assert_eq!(vector.at(0), None);
        assert_eq!(
            vector.get(0),
            Err(VectorError::IndexOutOfRange { index: 0, len: 0 })
        );

        write_u32(&vector, 1);

        assert!(vector.at(0).is_some());
        assert_eq!(vector.at(1), None);
        // Within capacity but not live.
        assert_eq!(vector.at(3), None);
    }

    #[test]
    fn index_error_message() {
        let error = VectorError::IndexOutOfRange { index: 5, len: 2 };

        assert_eq!(
            error.to_string(),
            "index 5 is out of range for a vector of 2 elements"
        );
    }

    #[test]
    fn for_each_visits_in_order_and_stops_early() {
        let vector = Vector::owned(4, 0, None);

        for value in [10, 20, 30, 40] {
            write_u32(&vector, value);
        }

        let mut seen = Vec::new();
        vector.for_each(|slot, index| {
            seen.push((index, read_u32(slot)));
            false
        });

        assert_eq!(seen, vec![(0, 10), (1, 20), (2, 30), (3, 40)]);

        let mut seen = Vec::new();
        vector.for_each(|slot, _| {
            seen.push(read_u32(slot));
            read_u32(slot) == 20
        });

        assert_eq!(seen, vec![10, 20]);
    }

    #[test]
    fn element_teardown_runs_in_index_order() {
        let vector = Vector::owned(4, 1, Some(record_u32));

        for value in [5, 3, 9] {
            write_u32(&vector, value);
        }

        assert!(VISITED.with(|visited| visited.borrow().is_empty()));

        drop(vector);

        assert_eq!(VISITED.with(|visited| visited.borrow().clone()), vec![5, 3, 9]);
    }

    #[test]
    fn element_teardown_sees_only_written_slots() {
        let vector = Vector::owned(4, 0, Some(record_u32));

        assert!(VISITED.with(|visited| visited.borrow().is_empty()));
        vector.reserve(8);

        write_u32(&vector, 77);
        drop(vector);

        // Reserved but never pushed slots are not live, so only the written one is visited.
        assert_eq!(VISITED.with(|visited| visited.borrow().clone()), vec![77]);
    }

    #[test]
    fn odd_element_sizes_keep_slots_apart() {
        let vector = Vector::owned(3, 0, None);

        for byte in 0..10u8 {
            let slot = unsafe { vector.push() };
            unsafe { slot.as_ptr().write_bytes(byte, 3) };
        }

        for (index, slot) in vector.slots().enumerate() {
            let bytes = unsafe { core::slice::from_raw_parts(slot.as_ptr(), 3) };
            assert_eq!(bytes, &[index as u8; 3]);
        }
    }

    #[test]
    #[should_panic(expected = "element size must be greater than 0")]
    fn zero_element_size_is_rejected() {
        Vector::create(0, 1, None);
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn reserving_past_the_address_space_is_rejected() {
        let vector = Vector::owned(16, 0, None);

        vector.reserve(usize::MAX / 2);
    }
}
