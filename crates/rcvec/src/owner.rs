use core::{fmt, mem, ops::Deref};

use crate::refcount::{Ref, RefCounted};

/// Holds one count of a counted object for as long as it is in scope.
///
/// Cloning acquires another count, dropping releases one. While an `Owner` exists its object
/// is alive, so borrowing through it is safe.
pub struct Owner<T: RefCounted> {
    handle: Ref<T>,
}

impl<T: RefCounted> Owner<T> {
    /// Acquires a count on `handle` and takes charge of releasing it.
    ///
    /// # Safety
    /// The object must be alive.
    pub unsafe fn adopt(handle: Ref<T>) -> Self {
        Self {
            handle: unsafe { handle.acquire() },
        }
    }

    /// The raw handle, without giving up this owner's count.
    pub fn handle(&self) -> Ref<T> {
        self.handle
    }

    /// Gives the count to the caller, who becomes responsible for releasing it.
    pub fn into_ref(self) -> Ref<T> {
        let handle = self.handle;
        mem::forget(self);

        handle
    }

    pub fn ref_count(&self) -> usize {
        unsafe { self.handle.ref_count() }
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.handle.ptr_eq(other.handle)
    }
}

impl<T: RefCounted> Deref for Owner<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.handle.get() }
    }
}

impl<T: RefCounted> Clone for Owner<T> {
    fn clone(&self) -> Self {
        Self {
            handle: unsafe { self.handle.acquire() },
        }
    }
}

impl<T: RefCounted> Drop for Owner<T> {
    fn drop(&mut self) {
        unsafe { self.handle.release() }
    }
}

impl<T: RefCounted + fmt::Debug> fmt::Debug for Owner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("count", &self.ref_count())
            .field("object", &**self)
            .finish()
    }
}
