// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Shared, reference-counted ownership of raw library handles.
//!
//! An [`OwnedHandle`] binds a non-null raw pointer to the free function
//! required for it at the moment the pointer enters Rust. Clones share the
//! allocation, and the deleter runs exactly once, when the last clone is
//! dropped. Equality is pointer identity, never a comparison of the pointed-to
//! objects.

use crate::Error;
use crate::ossl_ffi::error::cvt_p;
use core::{fmt, hash, ptr};
use std::sync::Arc;

/// Free function for a raw handle of type `T`.
///
/// Must not unwind.
pub type Deleter<T> = unsafe extern "C" fn(*mut T);

/// Deleter for non-owning views whose lifetime is controlled by a parent
/// object.
pub unsafe extern "C" fn null_deleter<T>(_ptr: *mut T) {}

struct HandleInner<T> {
    ptr: ptr::NonNull<T>,
    deleter: Deleter<T>,
}

// The counter is atomic. Whether the pointed-to object tolerates concurrent
// use is up to the library.
unsafe impl<T: Send + Sync> Send for HandleInner<T> {}
unsafe impl<T: Send + Sync> Sync for HandleInner<T> {}

impl<T> Drop for HandleInner<T> {
    fn drop(&mut self) {
        log::trace!("releasing {} handle {:p}", core::any::type_name::<T>(), self.ptr);
        unsafe { (self.deleter)(self.ptr.as_ptr()) };
    }
}

pub struct OwnedHandle<T> {
    inner: Arc<HandleInner<T>>,
}

impl<T> OwnedHandle<T> {
    /// Take ownership of `raw`, to be released with `deleter`.
    ///
    /// A null `raw` is taken as an allocation or parsing failure reported by
    /// the library: the thread's error queue is drained into a
    /// [`Cryptographic`](Error::Cryptographic) error.
    ///
    /// # Safety
    ///
    /// `raw` must either be null or point to a live object which no one else
    /// will release, and `deleter` must be the matching free function for it.
    pub unsafe fn new(raw: *mut T, deleter: Deleter<T>) -> Result<Self, Error> {
        let ptr = cvt_p(raw)?;
        Ok(unsafe { Self::from_non_null(ptr, deleter) })
    }

    /// Take ownership of `ptr`, to be released with `deleter`.
    ///
    /// # Safety
    ///
    /// See [`new()`](Self::new).
    pub unsafe fn from_non_null(ptr: ptr::NonNull<T>, deleter: Deleter<T>) -> Self {
        Self {
            inner: Arc::new(HandleInner { ptr, deleter }),
        }
    }

    /// The raw address.
    ///
    /// The handle keeps ownership: the pointer must neither be freed nor
    /// used past the last clone's lifetime.
    pub fn as_ptr(&self) -> *mut T {
        self.inner.ptr.as_ptr()
    }

    /// Number of clones currently sharing the allocation.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for OwnedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for OwnedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl<T> Eq for OwnedHandle<T> {}

impl<T> hash::Hash for OwnedHandle<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_ptr().hash(state)
    }
}

impl<T> fmt::Debug for OwnedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedHandle").field(&self.as_ptr()).finish()
    }
}

#[cfg(test)]
#[repr(C)]
struct TestObject {
    released: std::sync::Arc<core::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
unsafe extern "C" fn test_object_free(p: *mut TestObject) {
    let obj = unsafe { Box::from_raw(p) };
    obj.released.fetch_add(1, core::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
fn test_new_object() -> (OwnedHandle<TestObject>, std::sync::Arc<core::sync::atomic::AtomicUsize>) {
    let released = std::sync::Arc::new(core::sync::atomic::AtomicUsize::new(0));
    let raw = Box::into_raw(Box::new(TestObject {
        released: released.clone(),
    }));
    let handle = unsafe { OwnedHandle::new(raw, test_object_free) }.unwrap();
    (handle, released)
}

#[test]
fn test_clone_preserves_identity() {
    let (h, _released) = test_new_object();
    let h2 = h.clone();
    assert_eq!(h, h2);
    assert_eq!(h.as_ptr(), h2.as_ptr());
    assert_eq!(h.ref_count(), 2);
}

#[test]
fn test_distinct_allocations_differ() {
    let (a, _) = test_new_object();
    let (b, _) = test_new_object();
    assert_ne!(a, b);
}

#[test]
fn test_deleter_runs_exactly_once() {
    use core::sync::atomic::Ordering;

    let (h, released) = test_new_object();
    let h2 = h.clone();
    let h3 = h2.clone();
    let h4 = h3.clone();
    drop(h);
    drop(h3);
    assert_eq!(released.load(Ordering::SeqCst), 0);
    drop(h2);
    assert_eq!(released.load(Ordering::SeqCst), 0);
    assert_eq!(h4.ref_count(), 1);
    drop(h4);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deleter_once_across_threads() {
    use core::sync::atomic::Ordering;

    let (h, released) = test_new_object();
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let h = h.clone();
            std::thread::spawn(move || {
                let copy = h.clone();
                assert_eq!(copy.as_ptr(), h.as_ptr());
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(released.load(Ordering::SeqCst), 0);
    drop(h);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_null_is_cryptographic_error() {
    let e = unsafe { OwnedHandle::<TestObject>::new(ptr::null_mut(), test_object_free) }.unwrap_err();
    assert!(e.is_cryptographic());
}

#[test]
fn test_null_deleter_leaves_object_alone() {
    let mut value = 7u32;
    let view = unsafe { OwnedHandle::new(&mut value as *mut u32, null_deleter::<u32>) }.unwrap();
    drop(view.clone());
    drop(view);
    assert_eq!(value, 7);
}
