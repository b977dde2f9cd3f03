// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Translation of the library's error signaling conventions into [`Error`].

use crate::error::{Error, ErrorStack};
use core::{ffi, ptr};

/// Collect the calling thread's error queue into an [`Error`].
pub fn ossl_get_error() -> Error {
    let stack = ErrorStack::drain();
    match stack.errors().first() {
        Some(first) => log::debug!("library reported {} error(s), first: {}", stack.errors().len(), first),
        None => log::debug!("library signaled failure without error queue entries"),
    }
    Error::Cryptographic(stack)
}

/// Map a null return to an [`Error`].
pub fn cvt_p<T>(p: *mut T) -> Result<ptr::NonNull<T>, Error> {
    ptr::NonNull::new(p).ok_or_else(ossl_get_error)
}

/// Map a non-positive return code to an [`Error`].
pub fn cvt(r: ffi::c_int) -> Result<ffi::c_int, Error> {
    if r <= 0 { Err(ossl_get_error()) } else { Ok(r) }
}

/// Drop whatever a previous, unrelated failure left behind.
pub fn ossl_clear_error() {
    unsafe { super::sys::ERR_clear_error() };
}

#[test]
fn test_cvt() {
    assert_eq!(cvt(1).ok(), Some(1));
    let e = cvt(0).unwrap_err();
    assert!(e.is_cryptographic());
    assert!(cvt(-1).is_err());
}

#[test]
fn test_cvt_p() {
    let mut v = 5u8;
    assert!(cvt_p(&mut v as *mut u8).is_ok());
    let e = cvt_p(ptr::null_mut::<u8>()).unwrap_err();
    assert!(e.is_cryptographic());
}
