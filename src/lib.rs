//! A thread-safe, reference-counted shared pointer.
//!
//! [`SharedPtr<T>`] gives several owners, possibly on different threads,
//! shared ownership of one heap value. The owners share an atomic counter
//! cell that lives in its own allocation next to the value; the owner whose
//! release takes the counter to zero frees both.
//!
//! ```
//! use shared_ptr::SharedPtr;
//! use std::thread;
//!
//! let p = SharedPtr::new(String::from("hello"));
//! let q = p.clone();
//!
//! let handle = thread::spawn(move || q.len());
//! assert_eq!(handle.join().unwrap(), 5);
//! assert_eq!(p.use_count(), 1);
//! ```
//!
//! 线程安全的引用计数共享指针。
//! [`SharedPtr<T>`] 允许多个（可能位于不同线程的）所有者共享同一个堆上的值。
//! 所有者共享一个单独分配的原子计数器单元；使计数归零的所有者负责释放值和单元。

mod count;
mod error;
mod ptr;
mod sync;

pub use error::AllocError;
pub use ptr::SharedPtr;

#[cfg(test)]
mod tests;
