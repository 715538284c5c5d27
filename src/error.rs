use std::alloc::Layout;

/// The counter cell for a new ownership group could not be allocated.
///
/// Returned by the fallible constructors. By the time the caller sees this
/// error the payload it handed over has already been dropped.
///
/// 无法为新的所有权组分配计数器单元。
/// 调用者看到此错误时，其交出的负载已经被 drop。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("failed to allocate shared count ({size} bytes, align {align})")]
pub struct AllocError {
    size: usize,
    align: usize,
}

impl AllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Size in bytes of the allocation that failed.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the allocation that failed.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }
}
