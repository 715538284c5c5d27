mod lifecycle_tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 记录析构次数的测试负载
/// Test payload that counts how many times it was dropped.
#[derive(Debug)]
pub(crate) struct DropCounter {
    pub(crate) id: usize,
    drops: Arc<AtomicUsize>,
}

impl DropCounter {
    pub(crate) fn new(id: usize, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            id,
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn drops(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
