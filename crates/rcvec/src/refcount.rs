use core::{alloc::Layout, cell::Cell, fmt, marker::PhantomData, ptr::NonNull};
use std::alloc::{alloc, dealloc, handle_alloc_error};

use rcvec_error_macros::internal_error;

/// Runs exactly once, when an object's count drops to 0, before its storage is deallocated.
/// It receives the object's header; cast it back to the concrete type to reach the other fields.
pub type Teardown = unsafe fn(NonNull<Header>);

/// The counted header embedded at the start of every manageable object.
///
/// A header does not know whether its object is alive. Once the count reaches 0 the object
/// is gone, and every further operation on it is a use-after-free that only debug builds try
/// to catch.
#[repr(C)]
pub struct Header {
    count: Cell<usize>,
    teardown: Option<Teardown>,
    // What the allocator needs to give the whole object back.
    layout: Layout,
}

impl Header {
    /// A header for a value that is about to be placed with [Ref::new].
    /// The teardown and layout are filled in by [init].
    pub const fn new() -> Self {
        Self {
            count: Cell::new(0),
            teardown: None,
            layout: Layout::new::<()>(),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("count", &self.count.get())
            .field("has_teardown", &self.teardown.is_some())
            .field("size", &self.layout.size())
            .finish()
    }
}

/// Types that can be managed through a [Header].
///
/// # Safety
/// Implementors must be `#[repr(C)]` and have a [Header] as their first field, so that a pointer
/// to the object is also a valid pointer to its header.
pub unsafe trait RefCounted: Sized {
    fn header(&self) -> &Header {
        unsafe { &*(self as *const Self).cast::<Header>() }
    }
}

/// Resets the header of `object`: count 0, the given teardown, and `T`'s layout for reclamation.
///
/// # Safety
/// `object` must point to storage obtained from the global allocator with `Layout::new::<T>()`.
/// The rest of the object must be initialized before the first [release].
pub unsafe fn init<T: RefCounted>(object: NonNull<T>, teardown: Option<Teardown>) -> NonNull<T> {
    let header = Header {
        count: Cell::new(0),
        teardown,
        layout: Layout::new::<T>(),
    };

    unsafe { object.cast::<Header>().as_ptr().write(header) };

    object
}

/// Adds one owner.
///
/// # Safety
/// `object` must be alive: initialized and not yet torn down.
#[inline]
pub unsafe fn acquire(object: NonNull<Header>) -> NonNull<Header> {
    let header = unsafe { object.as_ref() };
    let count = header.count.get();

    debug_assert!(count != usize::MAX, "reference count overflow on {object:p}");

    header.count.set(count.wrapping_add(1));

    object
}

/// Drops one owner. When that was the last one, runs the teardown and deallocates the object.
///
/// # Safety
/// `object` must be alive and the caller must own one of its counts. After this call the
/// caller must not touch `object` again.
///
/// Releasing an object whose count is already 0 is a UseAfterFree. Debug builds report it
/// with `internal_error!`; release builds do not check.
#[inline]
pub unsafe fn release(object: NonNull<Header>) {
    let header = unsafe { object.as_ref() };
    let count = header.count.get();

    if cfg!(debug_assertions) && count == 0 {
        internal_error!(
            "UseAfterFree: released the object at {:p}, whose reference count is already 0",
            object
        );
    }

    let count = count.wrapping_sub(1);
    header.count.set(count);

    if count == 0 {
        unsafe { reclaim(object) }
    }
}

#[cold]
#[inline(never)]
unsafe fn reclaim(object: NonNull<Header>) {
    let (teardown, layout) = {
        let header = unsafe { object.as_ref() };
        (header.teardown, header.layout)
    };

    rcvec_tracing::trace!(object = ?object, size = layout.size(), "reclaiming object");

    if let Some(teardown) = teardown {
        unsafe { teardown(object) };
    }

    unsafe { dealloc(object.as_ptr().cast(), layout) };
}

/// A non-owning pointer to a counted object, the way client code passes objects around.
///
/// Copying a `Ref` does not touch the count. Ownership is explicit: whoever intends to call
/// [Ref::release] later must have called [Ref::acquire] first (or been handed a count).
/// `Ref`s are neither `Send` nor `Sync`; counts are not atomic.
#[repr(transparent)]
pub struct Ref<T: RefCounted> {
    ptr: NonNull<T>,
    _marker: PhantomData<*const T>,
}

impl<T: RefCounted> Ref<T> {
    /// Moves `value` into a fresh allocation. The object starts with a count of 0, so the
    /// caller has to [acquire](Ref::acquire) it before anything may release it.
    ///
    /// Fields of `value` that need dropping are only dropped if `teardown` does so.
    pub fn new(value: T, teardown: Option<Teardown>) -> Self {
        let layout = Layout::new::<T>();
        let ptr = match NonNull::new(unsafe { alloc(layout) }.cast::<T>()) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        };

        unsafe {
            ptr.as_ptr().write(value);
            Self::from_non_null(init(ptr, teardown))
        }
    }

    pub const fn from_non_null(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    pub const fn as_non_null(self) -> NonNull<T> {
        self.ptr
    }

    pub const fn as_ptr(self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn ptr_eq(self, other: Self) -> bool {
        self.ptr == other.ptr
    }

    fn header_ptr(self) -> NonNull<Header> {
        self.ptr.cast()
    }

    /// # Safety
    /// The object must be alive.
    #[inline]
    pub unsafe fn acquire(self) -> Self {
        unsafe { acquire(self.header_ptr()) };
        self
    }

    /// # Safety
    /// The object must be alive and the caller must own one of its counts.
    #[inline]
    pub unsafe fn release(self) {
        unsafe { release(self.header_ptr()) }
    }

    /// # Safety
    /// The object must be alive.
    pub unsafe fn ref_count(self) -> usize {
        unsafe { self.header_ptr().as_ref() }.count()
    }

    /// Borrows the object.
    ///
    /// # Safety
    /// The object must stay alive for all of `'a`.
    pub unsafe fn get<'a>(self) -> &'a T {
        unsafe { &*self.ptr.as_ptr() }
    }
}

impl<T: RefCounted> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: RefCounted> Copy for Ref<T> {}

impl<T: RefCounted> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(*other)
    }
}

impl<T: RefCounted> Eq for Ref<T> {}

impl<T: RefCounted> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:p})", self.ptr)
    }
}

static_assertions::assert_eq_size!(Option<Ref<Header>>, *const u8);

// A bare header is a counted object with no payload.
unsafe impl RefCounted for Header {}
