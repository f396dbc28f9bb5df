//! Intrusively reference-counted objects and a type-erased vector built on them.
//!
//! Every manageable object starts with a [Header] holding its owner count and an optional
//! [Teardown]. [Ref] is the raw, copyable pointer client code passes around, with explicit
//! [Ref::acquire] and [Ref::release]; [Owner] ties one count to a Rust scope instead.
//!
//! [Vector] is a growable sequence of fixed-size slots whose bytes it never interprets. It is
//! a counted object itself, and when its count reaches 0 it runs its element teardown on every
//! live slot. Storing handles in the slots (see [Vector::with_handles]) lets one vector share
//! ownership of many objects, including the same object at several indices.
//!
//! ## Preconditions
//!
//! Nothing here is thread-safe: counts are plain integers and none of the types are `Send` or
//! `Sync`. Releasing an object more often than it was acquired, or touching it after its last
//! release, is undefined behavior. Debug builds report a release of an object whose count is
//! already 0 as a UseAfterFree; release builds check nothing. Reference cycles leak.
#![warn(clippy::dbg_macro)]
#![deny(unsafe_op_in_unsafe_fn)]

mod boxed;
mod handle;
mod owner;
mod refcount;
mod vector;

pub use boxed::Boxed;
pub use handle::{release_handle, HANDLE_SIZE};
pub use owner::Owner;
pub use refcount::{acquire, init, release, Header, Ref, RefCounted, Teardown};
pub use vector::{ElementTeardown, Slots, Vector, VectorError, SLOT_ALIGN};
