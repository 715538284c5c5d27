#[cfg(feature = "loom")]
pub use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{AtomicUsize, Ordering};
