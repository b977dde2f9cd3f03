// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Trampolines between Rust closures and the library's C callback ABI.
//!
//! The C side receives a plain function pointer plus an opaque argument
//! pointing at one of the state structs below. Panics must not unwind through
//! C frames: they are caught, the C operation is told to stop, and the caller
//! resumes the panic once the library call has returned.

use super::{error::ossl_clear_error, sys};
use core::ffi::{c_char, c_int, c_void};
use std::{any, panic, slice};

/// Caller supplied passphrase source.
///
/// Receives the destination buffer and returns the number of passphrase bytes
/// written to it. Returning zero means "no passphrase available" and makes the
/// load fail.
pub type PassphraseCallback<'a> = dyn FnMut(&mut [u8]) -> usize + 'a;

/// Caller supplied key generation progress observer.
///
/// Receives the library-defined phase and sub-phase counters.
pub type ProgressCallback<'a> = dyn FnMut(i32, i32) + 'a;

pub struct PassphraseState<'a, 'b> {
    cb: Option<&'a mut PassphraseCallback<'b>>,
    panic: Option<Box<dyn any::Any + Send>>,
}

impl<'a, 'b> PassphraseState<'a, 'b> {
    pub fn new(cb: Option<&'a mut PassphraseCallback<'b>>) -> Self {
        Self { cb, panic: None }
    }

    pub fn callback(&self) -> sys::pem_password_cb {
        Some(passphrase_trampoline)
    }

    pub fn as_arg(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }

    /// Resume a panic raised by the callback, if any.
    pub fn finish(self) {
        if let Some(p) = self.panic {
            ossl_clear_error();
            panic::resume_unwind(p);
        }
    }
}

unsafe extern "C" fn passphrase_trampoline(buf: *mut c_char, size: c_int, _rwflag: c_int, u: *mut c_void) -> c_int {
    if u.is_null() || buf.is_null() {
        return 0;
    }
    let state = unsafe { &mut *(u as *mut PassphraseState<'_, '_>) };
    if state.panic.is_some() {
        return 0;
    }
    // No callback: never let the library fall back to prompting.
    let Some(cb) = state.cb.as_deref_mut() else {
        return 0;
    };
    let Ok(len) = usize::try_from(size) else {
        return 0;
    };
    let buf = unsafe { slice::from_raw_parts_mut(buf as *mut u8, len) };
    match panic::catch_unwind(panic::AssertUnwindSafe(|| cb(buf))) {
        Ok(written) if written <= len => written as c_int,
        Ok(written) => {
            log::warn!("passphrase callback reported {} bytes for a {} byte buffer", written, len);
            0
        }
        Err(p) => {
            state.panic = Some(p);
            0
        }
    }
}

pub struct ProgressState<'a, 'b> {
    cb: &'a mut ProgressCallback<'b>,
    panic: Option<Box<dyn any::Any + Send>>,
}

impl<'a, 'b> ProgressState<'a, 'b> {
    pub fn new(cb: &'a mut ProgressCallback<'b>) -> Self {
        Self { cb, panic: None }
    }

    pub fn callback(&self) -> sys::bn_gencb_cb {
        Some(progress_trampoline)
    }

    pub fn as_arg(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }

    pub fn finish(self) {
        if let Some(p) = self.panic {
            ossl_clear_error();
            panic::resume_unwind(p);
        }
    }
}

unsafe extern "C" fn progress_trampoline(p: c_int, n: c_int, gencb: *mut sys::BN_GENCB) -> c_int {
    let arg = unsafe { sys::BN_GENCB_get_arg(gencb) };
    if arg.is_null() {
        return 1;
    }
    let state = unsafe { &mut *(arg as *mut ProgressState<'_, '_>) };
    if state.panic.is_some() {
        return 0;
    }
    let cb = &mut *state.cb;
    match panic::catch_unwind(panic::AssertUnwindSafe(|| cb(p, n))) {
        Ok(()) => 1,
        Err(e) => {
            state.panic = Some(e);
            0
        }
    }
}

#[test]
fn test_passphrase_trampoline_copies() {
    let mut cb = |buf: &mut [u8]| {
        buf[..6].copy_from_slice(b"secret");
        6usize
    };
    let mut state = PassphraseState::new(Some(&mut cb));
    let mut buf = [0u8; 16];
    let written = unsafe { passphrase_trampoline(buf.as_mut_ptr() as *mut c_char, 16, 0, state.as_arg()) };
    assert_eq!(written, 6);
    assert_eq!(&buf[..6], b"secret");
    state.finish();
}

#[test]
fn test_passphrase_trampoline_overlong() {
    let mut cb = |_buf: &mut [u8]| 17usize;
    let mut state = PassphraseState::new(Some(&mut cb));
    let mut buf = [0u8; 16];
    let written = unsafe { passphrase_trampoline(buf.as_mut_ptr() as *mut c_char, 16, 0, state.as_arg()) };
    assert_eq!(written, 0);
}

#[test]
fn test_passphrase_trampoline_without_callback() {
    let mut state = PassphraseState::new(None);
    let mut buf = [0u8; 16];
    let written = unsafe { passphrase_trampoline(buf.as_mut_ptr() as *mut c_char, 16, 0, state.as_arg()) };
    assert_eq!(written, 0);
}

#[test]
fn test_passphrase_trampoline_panic() {
    let mut cb = |_buf: &mut [u8]| -> usize { panic!("no passphrase today") };
    let mut state = PassphraseState::new(Some(&mut cb));
    let mut buf = [0u8; 16];
    let written = unsafe { passphrase_trampoline(buf.as_mut_ptr() as *mut c_char, 16, 0, state.as_arg()) };
    assert_eq!(written, 0);
    let r = panic::catch_unwind(panic::AssertUnwindSafe(|| state.finish()));
    assert!(r.is_err());
}
