use crate::error::AllocError;
use crate::sync::{AtomicUsize, Ordering};
use std::alloc::{Layout, alloc, dealloc};
use std::ptr::{self, NonNull};

/// Owner counts above this abort the process instead of wrapping.
/// 超过此值的所有者计数会中止进程，而不是回绕。
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// The heap cell every owner of one payload points at.
///
/// Kept in its own allocation, apart from the payload.
///
/// 同一负载的所有持有者共同指向的堆单元。
/// 与负载分开，单独分配。
#[derive(Debug)]
struct CountCell {
    /// Number of live `SharedPtr` instances in the group.
    /// 组内存活的 `SharedPtr` 实例数量。
    owners: AtomicUsize,
}

/// Handle to a counter cell.
///
/// Copying the handle does not touch the count; callers increment and
/// decrement explicitly.
///
/// 计数器单元的句柄。复制句柄不会改变计数，调用者需显式增减。
#[derive(Debug, Clone, Copy)]
pub(crate) struct SharedCount {
    cell: NonNull<CountCell>,
}

impl SharedCount {
    /// Layout used for every counter cell.
    #[inline]
    pub(crate) fn layout() -> Layout {
        Layout::new::<CountCell>()
    }

    /// Allocate a fresh cell with one owner.
    /// 分配一个新的单元，初始所有者数为 1。
    pub(crate) fn try_new() -> Result<Self, AllocError> {
        let layout = Self::layout();
        let raw = if injected_failure() {
            ptr::null_mut()
        } else {
            // SAFETY: `CountCell` is not zero-sized.
            unsafe { alloc(layout) }
        };

        let Some(cell) = NonNull::new(raw.cast::<CountCell>()) else {
            log::error!(
                "shared count allocation failed (size {}, align {})",
                layout.size(),
                layout.align()
            );
            return Err(AllocError::new(layout));
        };

        // SAFETY: freshly allocated with the layout of `CountCell`.
        unsafe {
            cell.as_ptr().write(CountCell {
                owners: AtomicUsize::new(1),
            });
        }

        Ok(Self { cell })
    }

    #[inline]
    fn owners(&self) -> &AtomicUsize {
        // SAFETY: the cell stays allocated while any owner holds this handle.
        unsafe { &self.cell.as_ref().owners }
    }

    /// Register one more owner.
    ///
    /// Must be called by an existing owner, so the count is at least 1 and
    /// the cell cannot be freed concurrently.
    ///
    /// 注册一个新的所有者。必须由现有所有者调用。
    #[inline]
    pub(crate) fn increment(&self) {
        let old = self.owners().fetch_add(1, Ordering::SeqCst);
        debug_assert_ne!(old, 0);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Drop one owner. Returns `true` for the holder that took the count to zero.
    ///
    /// Exactly one caller per cell ever sees `true`; it must then free the
    /// payload and call [`SharedCount::dealloc`].
    ///
    /// 移除一个所有者。只有使计数归零的持有者会得到 `true`，
    /// 并且必须随后释放负载并调用 [`SharedCount::dealloc`]。
    #[inline]
    pub(crate) fn decrement(&self) -> bool {
        let old = self.owners().fetch_sub(1, Ordering::SeqCst);
        debug_assert_ne!(old, 0);
        old == 1
    }

    /// Snapshot of the owner count.
    #[inline]
    pub(crate) fn load(&self) -> usize {
        self.owners().load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn ptr_eq(&self, other: &SharedCount) -> bool {
        self.cell == other.cell
    }

    /// Free the cell.
    ///
    /// # Safety
    /// The caller must be the holder whose [`SharedCount::decrement`]
    /// returned `true`, and no handle to this cell may be used afterwards.
    #[inline]
    pub(crate) unsafe fn dealloc(self) {
        let ptr = self.cell.as_ptr();
        unsafe {
            ptr::drop_in_place(ptr);
            dealloc(ptr.cast(), Self::layout());
        }
    }
}

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_ALLOC: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Make the next counter allocation on this thread fail.
#[cfg(test)]
pub(crate) fn fail_next_alloc() {
    FAIL_NEXT_ALLOC.with(|flag| flag.set(true));
}

#[cfg(test)]
#[inline]
fn injected_failure() -> bool {
    FAIL_NEXT_ALLOC.with(|flag| flag.replace(false))
}

#[cfg(not(test))]
#[inline(always)]
fn injected_failure() -> bool {
    false
}
