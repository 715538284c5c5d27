use crate::count::SharedCount;
use crate::error::AllocError;
use std::alloc::handle_alloc_error;
use std::boxed::Box;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// One payload together with the counter cell its owners share.
///
/// Either both halves are present or the pointer is empty, so they are
/// stored as a single `Option`.
struct Group<T> {
    payload: NonNull<T>,
    count: SharedCount,
}

impl<T> Clone for Group<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Group<T> {}

impl<T> Group<T> {
    /// Free the payload and the counter cell.
    ///
    /// # Safety
    /// `self.count.decrement()` must have just returned `true`.
    #[cold]
    unsafe fn release(self) {
        log::trace!("last owner released, freeing payload at {:p}", self.payload);
        unsafe {
            // The cell goes first: dropping `T` may panic.
            self.count.dealloc();
            drop(Box::from_raw(self.payload.as_ptr()));
        }
    }
}

/// A thread-safe, reference-counted pointer to a heap value.
///
/// Every `SharedPtr` that aliases the same value shares one atomic counter
/// cell, allocated separately from the value. Cloning increments the
/// counter, dropping or resetting decrements it, and the owner whose
/// decrement brings it to zero frees both the value and the cell.
///
/// A `SharedPtr` may also be empty (see [`SharedPtr::null`]). An empty
/// pointer owns nothing, reports `use_count() == 0` and a null [`get`].
///
/// **Thread Safety**: distinct instances aliasing the same value can be
/// cloned and dropped on different threads concurrently. The value itself
/// is only handed out as `&T`; mutating it from several owners needs a lock
/// or atomics inside `T`.
///
/// **Typical Usage**:
/// ```
/// use shared_ptr::SharedPtr;
///
/// let p = SharedPtr::new(10);
/// assert_eq!(p.use_count(), 1);
///
/// let q = p.clone();
/// assert_eq!(p.use_count(), 2);
/// assert_eq!(p.get(), q.get());
///
/// drop(q);
/// assert_eq!(p.use_count(), 1);
/// assert_eq!(*p, 10);
/// ```
///
/// 线程安全的引用计数指针。
/// 所有指向同一个值的 `SharedPtr` 共享一个原子计数器单元，该单元与值分开分配。
/// 克隆会增加计数，drop 或 reset 会减少计数，使计数归零的持有者负责释放值和计数器单元。
/// `SharedPtr` 也可以为空：空指针不拥有任何东西，`use_count()` 为 0，`get()` 返回空指针。
///
/// [`get`]: SharedPtr::get
pub struct SharedPtr<T> {
    group: Option<Group<T>>,
    _owns: PhantomData<T>,
}

// SAFETY: any owner may end up dropping `T` on its own thread, and every
// owner hands out `&T`, so both bounds are needed, as for `std::sync::Arc`.
unsafe impl<T: Send + Sync> Send for SharedPtr<T> {}
unsafe impl<T: Send + Sync> Sync for SharedPtr<T> {}

impl<T> SharedPtr<T> {
    /// Create an empty pointer. Does not allocate.
    /// 创建一个空指针，不进行分配。
    #[inline]
    pub const fn null() -> Self {
        Self {
            group: None,
            _owns: PhantomData,
        }
    }

    /// Move `value` to the heap and take ownership of it.
    #[inline]
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Take ownership of a boxed value, starting a new group with one owner.
    ///
    /// If the counter cell cannot be allocated the value is dropped and
    /// [`handle_alloc_error`] is called. Use [`SharedPtr::try_from_box`] to
    /// get the failure back as an error instead.
    ///
    /// 接管一个 boxed 值，创建一个所有者数为 1 的新组。
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        match Self::try_from_box(value) {
            Ok(ptr) => ptr,
            Err(_) => handle_alloc_error(SharedCount::layout()),
        }
    }

    /// Fallible form of [`SharedPtr::from_box`].
    ///
    /// On error `value` has already been dropped; nothing is leaked.
    ///
    /// [`SharedPtr::from_box`] 的可失败版本。出错时 `value` 已被 drop，不会泄漏。
    pub fn try_from_box(value: Box<T>) -> Result<Self, AllocError> {
        let count = match SharedCount::try_new() {
            Ok(count) => count,
            Err(err) => {
                drop(value);
                return Err(err);
            }
        };

        let payload = NonNull::from(Box::leak(value));
        log::trace!("new shared group for payload at {:p}", payload);

        Ok(Self {
            group: Some(Group { payload, count }),
            _owns: PhantomData,
        })
    }

    /// Take ownership of a raw pointer.
    ///
    /// A null `ptr` yields an empty pointer without allocating a counter.
    ///
    /// # Safety
    /// A non-null `ptr` must come from [`Box::into_raw`] and must not be
    /// owned by anything else: not freed by the caller afterwards and not
    /// passed to a second `from_raw`. Two groups owning the same allocation
    /// would free it twice.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        if ptr.is_null() {
            return Self::null();
        }
        // SAFETY: upheld by the caller.
        Self::from_box(unsafe { Box::from_raw(ptr) })
    }

    /// Fallible form of [`SharedPtr::from_raw`]. On error the pointee has
    /// been dropped and freed.
    ///
    /// # Safety
    /// Same contract as [`SharedPtr::from_raw`].
    pub unsafe fn try_from_raw(ptr: *mut T) -> Result<Self, AllocError> {
        if ptr.is_null() {
            return Ok(Self::null());
        }
        // SAFETY: upheld by the caller.
        Self::try_from_box(unsafe { Box::from_raw(ptr) })
    }

    /// Returns `true` if this pointer owns nothing.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.group.is_none()
    }

    /// Borrow the value, or `None` when empty.
    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: the payload lives as long as this owner does.
        self.group.map(|group| unsafe { &*group.payload.as_ptr() })
    }

    /// Raw address of the value, null when empty. Does not affect the count.
    ///
    /// 值的原始地址，为空时返回空指针。不影响计数。
    #[inline]
    pub fn get(&self) -> *const T {
        match self.group {
            Some(group) => group.payload.as_ptr(),
            None => ptr::null(),
        }
    }

    /// Mutable access to the value when this is its only owner.
    ///
    /// Returns `None` when empty or when other owners exist.
    ///
    /// 当这是唯一的所有者时，返回值的可变引用；否则返回 `None`。
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self.group {
            // SAFETY: a count of 1 observed through `&mut self` means no
            // other owner exists, and none can appear without cloning `self`.
            Some(group) if group.count.load() == 1 => Some(unsafe { &mut *group.payload.as_ptr() }),
            _ => None,
        }
    }

    /// Number of owners of the value, 0 when empty.
    ///
    /// Other threads may clone or drop their owners at any time, so the
    /// result can be stale as soon as it is returned.
    ///
    /// 值的所有者数量，为空时为 0。
    /// 其他线程随时可能克隆或 drop 它们的持有者，因此结果返回时可能已经过时。
    #[inline]
    pub fn use_count(&self) -> usize {
        self.group.map_or(0, |group| group.count.load())
    }

    /// Release ownership and leave this pointer empty.
    ///
    /// If this was the last owner the value and the counter cell are freed.
    /// Resetting an empty pointer does nothing.
    ///
    /// 释放所有权并将此指针置空。
    /// 如果这是最后一个所有者，值和计数器单元将被释放。对空指针调用不做任何事。
    #[inline]
    pub fn reset(&mut self) {
        if let Some(group) = self.group.take() {
            if group.count.decrement() {
                // SAFETY: we took the count to zero.
                unsafe { group.release() };
            }
        }
    }

    /// Replace the owned value with `value`, which starts a new group.
    ///
    /// The counter for the new group is allocated before the old ownership
    /// is released.
    pub fn reset_with(&mut self, value: Box<T>) {
        *self = Self::from_box(value);
    }

    /// Fallible form of [`SharedPtr::reset_with`].
    ///
    /// On error `value` has been dropped and `self` still owns what it
    /// owned before.
    ///
    /// [`SharedPtr::reset_with`] 的可失败版本。
    /// 出错时 `value` 已被 drop，`self` 仍然持有之前的值。
    pub fn try_reset_with(&mut self, value: Box<T>) -> Result<(), AllocError> {
        *self = Self::try_from_box(value)?;
        Ok(())
    }

    /// Replace the owned value with a raw pointer. Null leaves `self` empty.
    ///
    /// # Safety
    /// Same contract as [`SharedPtr::from_raw`].
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        // SAFETY: upheld by the caller.
        *self = unsafe { Self::from_raw(ptr) };
    }

    /// Exchange contents with `other`. No counter changes.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.group, &mut other.group);
    }

    /// Move ownership out, leaving this pointer empty. No counter changes.
    ///
    /// 转移所有权，将此指针置空。计数不变。
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Move `other` into `self` and return the previous contents.
    #[inline]
    pub fn replace(&mut self, other: Self) -> Self {
        mem::replace(self, other)
    }

    /// Returns `true` if both pointers belong to the same group, or are both empty.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (this.group, other.group) {
            (Some(a), Some(b)) => a.count.ptr_eq(&b.count),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Clone for SharedPtr<T> {
    /// Create another owner of the same value.
    ///
    /// The counter is incremented before the new owner is returned.
    ///
    /// 创建同一个值的另一个所有者。在返回新的所有者之前计数已递增。
    #[inline]
    fn clone(&self) -> Self {
        if let Some(group) = self.group {
            group.count.increment();
        }
        Self {
            group: self.group,
            _owns: PhantomData,
        }
    }

    /// Release what `self` owns, then join `source`'s group.
    ///
    /// Nothing happens if both already belong to the same group.
    fn clone_from(&mut self, source: &Self) {
        if Self::ptr_eq(self, source) {
            return;
        }
        self.reset();
        if let Some(group) = source.group {
            group.count.increment();
            self.group = Some(group);
        }
    }
}

impl<T> Drop for SharedPtr<T> {
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for SharedPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Deref for SharedPtr<T> {
    type Target = T;

    /// # Panics
    /// Panics if the pointer is empty.
    #[inline]
    fn deref(&self) -> &T {
        match self.as_ref() {
            Some(value) => value,
            None => deref_null(),
        }
    }
}

#[cold]
#[track_caller]
fn deref_null() -> ! {
    panic!("dereferenced an empty SharedPtr")
}

impl<T> From<T> for SharedPtr<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> From<Box<T>> for SharedPtr<T> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPtr")
            .field("ptr", &self.get())
            .field("use_count", &self.use_count())
            .finish()
    }
}

impl<T> fmt::Pointer for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.get(), f)
    }
}
