//! Vectors whose slots hold counted references to other objects.
//!
//! A handle slot contains a nullable pointer to a counted object and owns one count of it.
//! Tearing the vector down releases each slot's pointee once, in index order, so an object
//! stored at several indices loses one count per slot. Cycles (an object that transitively
//! owns the vector holding it) are never detected and leak.

use core::{mem, ptr::NonNull};

use rcvec_error_macros::internal_error;

use crate::owner::Owner;
use crate::refcount::{self, Header, Ref, RefCounted};
use crate::vector::Vector;

/// Bytes in a handle slot.
pub const HANDLE_SIZE: usize = mem::size_of::<Option<NonNull<Header>>>();

static_assertions::assert_eq_size!(Option<Ref<Header>>, Option<NonNull<Header>>);

/// The indirect teardown for handle slots: reads the pointer stored in `slot` and, unless it
/// is null, releases the object it points to.
///
/// # Safety
/// `slot` must hold an initialized, possibly null, pointer to a live counted object whose
/// count the slot owns.
pub unsafe fn release_handle(slot: NonNull<u8>) {
    let pointee = unsafe { slot.cast::<Option<NonNull<Header>>>().as_ptr().read() };

    if let Some(pointee) = pointee {
        unsafe { refcount::release(pointee) };
    }
}

impl Vector {
    /// A vector of pointer-sized handle slots that releases its pointees on teardown.
    pub fn with_handles(initial_capacity: usize) -> Ref<Vector> {
        Self::allocate(HANDLE_SIZE, initial_capacity, Some(release_handle), true)
    }

    fn check_handle_slots(&self) {
        if !self.holds_handles {
            internal_error!(
                "tried to store a handle in a vector of {}-byte slots that does not release handles; create it with Vector::with_handles",
                self.element_size()
            );
        }
    }

    /// Stores a new count of `owner`'s object in a fresh slot and returns the slot's index.
    pub fn push_handle<T: RefCounted>(&self, owner: &Owner<T>) -> usize {
        unsafe { self.push_ref(owner.handle()) }
    }

    /// Stores a new count of `handle`'s object in a fresh slot and returns the slot's index.
    ///
    /// # Safety
    /// The object must be alive.
    pub unsafe fn push_ref<T: RefCounted>(&self, handle: Ref<T>) -> usize {
        self.check_handle_slots();

        unsafe {
            let slot = self.push();
            let acquired = handle.acquire();

            slot.cast::<Option<Ref<T>>>().as_ptr().write(Some(acquired));
        }

        self.len() - 1
    }

    /// Pushes a null handle, which teardown skips.
    pub fn push_null_handle(&self) -> usize {
        self.check_handle_slots();

        unsafe {
            let slot = self.push();
            slot.cast::<Option<NonNull<Header>>>().as_ptr().write(None);
        }

        self.len() - 1
    }

    /// The object referenced by the slot at `index`, without acquiring it. `None` when the
    /// index is out of range or the slot is null.
    ///
    /// # Safety
    /// Every slot of this vector must be a handle slot, and the one at `index` must point to
    /// a `T` (or be null).
    pub unsafe fn handle_at<T: RefCounted>(&self, index: usize) -> Option<Ref<T>> {
        let slot = self.at(index)?;

        unsafe { slot.cast::<Option<Ref<T>>>().as_ptr().read() }
    }
}
