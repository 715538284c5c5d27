/// 生命周期测试模块
/// 测试析构恰好发生一次、赋值语义和所有权转移
use super::{DropCounter, drops};
use crate::SharedPtr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

/// 测试1: 最后一个所有者释放值，且只释放一次
#[test]
fn test_last_owner_drops_once() {
    let counter = Arc::new(AtomicUsize::new(0));

    let p = SharedPtr::new(DropCounter::new(10, &counter));
    let q = p.clone();
    assert_eq!(p.use_count(), 2);
    assert_eq!(q.id, 10);

    drop(q);
    assert_eq!(p.use_count(), 1);
    assert_eq!(drops(&counter), 0);

    drop(p);
    assert_eq!(drops(&counter), 1);
}

/// 测试2: 多次克隆后计数为 N+1，逐个释放
#[test]
fn test_n_clones_count() {
    let counter = Arc::new(AtomicUsize::new(0));
    let root = SharedPtr::new(DropCounter::new(0, &counter));

    let mut clones: Vec<_> = (0..8).map(|_| root.clone()).collect();
    for c in &clones {
        assert_eq!(c.use_count(), 9);
    }

    let mut expected = 9;
    while let Some(c) = clones.pop() {
        drop(c);
        expected -= 1;
        assert_eq!(root.use_count(), expected);
        for rest in &clones {
            assert_eq!(rest.use_count(), expected);
        }
    }

    assert_eq!(drops(&counter), 0);
    drop(root);
    assert_eq!(drops(&counter), 1);
}

/// 测试3: clone_from（拷贝赋值）释放旧值并加入新组
#[test]
fn test_clone_from_releases_previous() {
    let counter = Arc::new(AtomicUsize::new(0));

    let a = SharedPtr::new(DropCounter::new(1, &counter));
    let mut b = SharedPtr::new(DropCounter::new(2, &counter));

    b.clone_from(&a);
    assert_eq!(drops(&counter), 1);
    assert_eq!(b.id, 1);
    assert_eq!(a.use_count(), 2);
    assert!(SharedPtr::ptr_eq(&a, &b));
}

/// 测试4: 对同组的 clone_from 不改变计数
#[test]
fn test_clone_from_same_group_is_noop() {
    let sp1 = SharedPtr::new(1.23f32);
    let mut sp2 = sp1.clone();
    assert_eq!(sp1.use_count(), 2);

    sp2.clone_from(&sp1);
    assert_eq!(sp1.use_count(), 2);
    assert_eq!(sp2.use_count(), 2);

    let sp3 = sp2.clone();
    sp2.clone_from(&sp3);
    assert_eq!(sp1.get(), sp3.get());
    assert_eq!(sp1.use_count(), 3);
    assert_eq!(sp2.use_count(), 3);
    assert_eq!(sp3.use_count(), 3);

    drop(sp2);
    drop(sp3);
    assert_eq!(sp1.use_count(), 1);
}

/// 测试5: clone_from 一个空指针使目标变空
#[test]
fn test_clone_from_empty() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut a = SharedPtr::new(DropCounter::new(1, &counter));
    let empty = SharedPtr::null();

    a.clone_from(&empty);
    assert!(a.is_null());
    assert_eq!(a.use_count(), 0);
    assert_eq!(drops(&counter), 1);
}

/// 测试6: 移动赋值释放目标原来的值
#[test]
fn test_move_assign_releases_target() {
    let counter = Arc::new(AtomicUsize::new(0));

    let mut source = SharedPtr::new(DropCounter::new(1, &counter));
    let mut target = SharedPtr::new(DropCounter::new(2, &counter));
    assert_eq!(target.id, 2);

    target = source.take();
    assert_eq!(drops(&counter), 1);
    assert!(source.is_null());
    assert_eq!(target.use_count(), 1);
    assert_eq!(target.id, 1);
}

/// 测试7: replace 返回旧内容且不改变计数
#[test]
fn test_replace_returns_previous() {
    let mut a = SharedPtr::new(1i32);
    let b = SharedPtr::new(2i32);
    let b_addr = b.get();

    let old = a.replace(b);
    assert_eq!(*old, 1);
    assert_eq!(old.use_count(), 1);
    assert_eq!(a.get(), b_addr);
    assert_eq!(a.use_count(), 1);
}

/// 测试8: reset_with 只在旧值最后一个所有者处释放旧值
#[test]
fn test_reset_with_shared_old_value() {
    let counter = Arc::new(AtomicUsize::new(0));

    let mut a = SharedPtr::new(DropCounter::new(1, &counter));
    let b = a.clone();

    a.reset_with(Box::new(DropCounter::new(2, &counter)));
    assert_eq!(drops(&counter), 0);
    assert_eq!(a.use_count(), 1);
    assert_eq!(a.id, 2);
    assert_eq!(b.use_count(), 1);
    assert_eq!(b.id, 1);

    drop(b);
    assert_eq!(drops(&counter), 1);
    drop(a);
    assert_eq!(drops(&counter), 2);
}

/// 测试9: reset_raw 接管原始指针
#[test]
fn test_reset_raw() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut sp = SharedPtr::new(DropCounter::new(1, &counter));

    let raw = Box::into_raw(Box::new(DropCounter::new(2, &counter)));
    unsafe { sp.reset_raw(raw) };
    assert_eq!(drops(&counter), 1);
    assert_eq!(sp.get(), raw as *const DropCounter);
    assert_eq!(sp.use_count(), 1);

    unsafe { sp.reset_raw(std::ptr::null_mut()) };
    assert_eq!(drops(&counter), 2);
    assert!(sp.is_null());
    assert_eq!(sp.use_count(), 0);
}

/// 测试10: get_mut 只在唯一所有者时可用
#[test]
fn test_get_mut_unique_only() {
    let mut a = SharedPtr::new(1i32);
    *a.get_mut().unwrap() = 5;
    assert_eq!(*a, 5);

    let b = a.clone();
    assert!(a.get_mut().is_none());
    drop(b);

    assert_eq!(a.get_mut(), Some(&mut 5));

    let mut empty: SharedPtr<i32> = SharedPtr::null();
    assert!(empty.get_mut().is_none());
}
