//! Provides macros for consistent reporting of errors in rcvec's rust code.

/// `internal_error!` should be used whenever an ownership or layout invariant is broken.
/// It is a wrapper around panic that makes clear the caller violated a documented precondition.
/// This should only be used for programmer errors (double release, a zero-sized slot, a
/// capacity whose byte size overflows), never for conditions a caller is expected to check.
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => ({
        eprintln!("An internal rcvec expectation was broken.");
        eprintln!("This is a bug in the code that owns or manipulates the object below.");
        #[allow(clippy::panic)] {
            panic!($($arg)*);
        }
    })
}

/// `user_error!` reports a problem with input given to an executable and exits with code 1.
/// Library code must not use it; libraries hand recoverable conditions back as `Option` or `Result`.
#[macro_export]
macro_rules! user_error {
    ($($arg:tt)*) => ({
        eprintln!("We ran into an issue with the arguments you gave.");
        eprintln!($($arg)*);
        std::process::exit(1);
    })
}
