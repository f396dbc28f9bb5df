use core::{fmt, mem, ops::Deref, ptr::{self, NonNull}};

use crate::owner::Owner;
use crate::refcount::{Header, Ref, RefCounted, Teardown};

/// A counted heap cell around a single value.
///
/// The value is dropped in the teardown, so it lives exactly as long as the last count.
#[repr(C)]
pub struct Boxed<T> {
    header: Header,
    value: T,
}

unsafe impl<T> RefCounted for Boxed<T> {}

impl<T> Boxed<T> {
    /// Boxes `value` with a count of 0.
    pub fn new(value: T) -> Ref<Boxed<T>> {
        let teardown: Option<Teardown> = if mem::needs_drop::<T>() {
            Some(Self::drop_value)
        } else {
            None
        };

        Ref::new(
            Boxed {
                header: Header::new(),
                value,
            },
            teardown,
        )
    }

    pub fn owned(value: T) -> Owner<Boxed<T>> {
        unsafe { Owner::adopt(Self::new(value)) }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    unsafe fn drop_value(object: NonNull<Header>) {
        let boxed = object.cast::<Boxed<T>>().as_ptr();

        unsafe { ptr::drop_in_place(ptr::addr_of_mut!((*boxed).value)) };
    }
}

impl<T> Deref for Boxed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Boxed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Boxed").field(&self.value).finish()
    }
}
