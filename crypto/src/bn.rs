// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! OpenSSL BIGNUM helpers.

use crate::Error;
use crate::ossl_ffi::{
    self,
    error::{cvt, cvt_p},
    sys,
};

/// Scratch context for big number operations.
///
/// Owned by the caller. Operations borrowing it only use it for the duration
/// of the call.
pub struct BnCtx {
    ctx: *mut sys::BN_CTX,
}

impl BnCtx {
    pub fn new() -> Result<Self, Error> {
        ossl_ffi::init();
        let ctx = cvt_p(unsafe { sys::BN_CTX_new() })?.as_ptr();
        Ok(Self { ctx })
    }

    pub fn as_mut_ptr(&mut self) -> *mut sys::BN_CTX {
        self.ctx
    }
}

impl Drop for BnCtx {
    fn drop(&mut self) {
        unsafe { sys::BN_CTX_free(self.ctx) };
    }
}

// A BN_CTX is not shared, moving it between threads is fine.
unsafe impl Send for BnCtx {}

pub(crate) struct Bn {
    bn: *mut sys::BIGNUM,
}

impl Bn {
    pub fn new() -> Result<Self, Error> {
        let bn = cvt_p(unsafe { sys::BN_new() })?.as_ptr();
        Ok(Self { bn })
    }

    pub fn from_word(w: u64) -> Result<Self, Error> {
        let w = sys::BN_ULONG::try_from(w).map_err(|_| Error::InvalidArgument("word exceeds BN_ULONG"))?;
        let mut bn = Self::new()?;
        cvt(unsafe { sys::BN_set_word(bn.as_mut_ptr(), w) })?;
        Ok(bn)
    }

    pub fn as_mut_ptr(&mut self) -> *mut sys::BIGNUM {
        self.bn
    }
}

impl Drop for Bn {
    fn drop(&mut self) {
        unsafe { sys::BN_free(self.bn) };
    }
}

/// Bit length of a borrowed BIGNUM, `None` if absent.
pub(crate) fn num_bits(bn: *const sys::BIGNUM) -> Option<u32> {
    if bn.is_null() {
        return None;
    }
    u32::try_from(unsafe { sys::BN_num_bits(bn) }).ok()
}

#[test]
fn test_bn_from_word() {
    let mut bn = Bn::from_word(65537).unwrap();
    assert_eq!(num_bits(bn.as_mut_ptr()), Some(17));
    let mut zero = Bn::new().unwrap();
    assert_eq!(num_bits(zero.as_mut_ptr()), Some(0));
    assert_eq!(num_bits(core::ptr::null()), None);
}

#[test]
fn test_bn_ctx_new() {
    let mut ctx = BnCtx::new().unwrap();
    assert!(!ctx.as_mut_ptr().is_null());
}
