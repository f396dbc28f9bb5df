//! Provides testing utility functions for use throughout the rcvec crates.

use std::cell::RefCell;
use std::rc::Rc;

#[doc(hidden)]
pub use pretty_assertions::assert_eq as _pretty_assert_eq;

#[derive(PartialEq, Eq)]
pub struct DebugAsDisplay<T>(pub T);

impl<T: std::fmt::Display> std::fmt::Debug for DebugAsDisplay<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[macro_export]
macro_rules! assert_multiline_str_eq {
    ($a:expr, $b:expr) => {
        $crate::_pretty_assert_eq!($crate::DebugAsDisplay($a), $crate::DebugAsDisplay($b))
    };
}

/// Shared record of the order in which [Tracked] values were dropped.
///
/// Cloning the log shares it, so one log can be handed to many values.
#[derive(Clone, Default)]
pub struct TeardownLog {
    dropped: Rc<RefCell<Vec<i64>>>,
}

impl TeardownLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, id: i64) -> Tracked {
        Tracked {
            id,
            log: self.clone(),
        }
    }

    /// Ids in the order their values were dropped.
    pub fn dropped(&self) -> Vec<i64> {
        self.dropped.borrow().clone()
    }

    pub fn times_dropped(&self, id: i64) -> usize {
        self.dropped.borrow().iter().filter(|&&d| d == id).count()
    }

    pub fn is_empty(&self) -> bool {
        self.dropped.borrow().is_empty()
    }
}

/// A value that appends its id to a [TeardownLog] when dropped.
pub struct Tracked {
    pub id: i64,
    log: TeardownLog,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.dropped.borrow_mut().push(self.id);
    }
}

impl std::fmt::Debug for Tracked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tracked({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_records_drop_order() {
        let log = TeardownLog::new();
        let first = log.track(1);
        let second = log.track(2);

        drop(second);
        drop(first);

        assert_eq!(log.dropped(), vec![2, 1]);
        assert_eq!(log.times_dropped(1), 1);
    }

    #[test]
    fn multiline_strings_compare_as_display() {
        assert_multiline_str_eq!("0\n1\n", "0\n1\n");
    }
}
