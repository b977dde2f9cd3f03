// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Generic asymmetric key handle.

use crate::Error;
use crate::bio::{self, BioPtr, MemBioSlice};
use crate::handle::OwnedHandle;
use crate::ossl_ffi::{self, callback::PassphraseState, error::cvt, sys};
use core::ptr;

#[cfg(feature = "rsa")]
use super::RsaKey;

/// An `EVP_PKEY` handle.
///
/// Same pointer semantics as the other handles: clones share the key,
/// equality is identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PKey {
    pkey: OwnedHandle<sys::EVP_PKEY>,
}

impl PKey {
    /// Take ownership of an existing `EVP_PKEY*`.
    ///
    /// # Safety
    ///
    /// `pkey` must be null or a valid `EVP_PKEY*` whose reference is
    /// transferred to the returned instance.
    pub unsafe fn from_raw(pkey: *mut sys::EVP_PKEY) -> Result<Self, Error> {
        let pkey = ptr::NonNull::new(pkey).ok_or(Error::InvalidArgument("pkey"))?;
        Ok(Self {
            pkey: unsafe { OwnedHandle::from_non_null(pkey, sys::EVP_PKEY_free) },
        })
    }

    /// Wrap a pointer returned by the library, null meaning failure.
    pub(crate) unsafe fn from_library(pkey: *mut sys::EVP_PKEY) -> Result<Self, Error> {
        Ok(Self {
            pkey: unsafe { OwnedHandle::new(pkey, sys::EVP_PKEY_free) }?,
        })
    }

    /// Create a key referencing `rsa_key`.
    ///
    /// The RSA key is shared, not copied.
    #[cfg(feature = "rsa")]
    pub fn from_rsa_key(rsa_key: &RsaKey) -> Result<Self, Error> {
        ossl_ffi::init();
        let pkey = unsafe { Self::from_library(sys::EVP_PKEY_new()) }?;
        cvt(unsafe { sys::EVP_PKEY_set1_RSA(pkey.as_ptr(), rsa_key.as_ptr() as *mut sys::RSA) })?;
        Ok(pkey)
    }

    /// Load a SubjectPublicKeyInfo in PEM format.
    pub fn from_public_key(bio: BioPtr<'_>) -> Result<Self, Error> {
        ossl_ffi::init();
        let mut state = PassphraseState::new(None);
        unsafe {
            Self::from_library(sys::PEM_read_bio_PUBKEY(
                bio.as_ptr(),
                ptr::null_mut(),
                state.callback(),
                state.as_arg(),
            ))
        }
    }

    pub fn from_public_key_bytes(buf: &[u8]) -> Result<Self, Error> {
        let bio = MemBioSlice::new(buf)?;
        Self::from_public_key(bio.as_bio())
    }

    /// The RSA key, as a new owning reference.
    ///
    /// Fails with [`Cryptographic`](Error::Cryptographic) if this is not a
    /// RSA key.
    #[cfg(feature = "rsa")]
    pub fn rsa_key(&self) -> Result<RsaKey, Error> {
        let rsa = ossl_ffi::error::cvt_p(unsafe { sys::EVP_PKEY_get1_RSA(self.as_ptr()) })?;
        unsafe { RsaKey::from_raw(rsa.as_ptr()) }
    }

    /// Write the public part as SubjectPublicKeyInfo in PEM format.
    pub fn write_public_key(&self, bio: BioPtr<'_>) -> Result<(), Error> {
        cvt(unsafe { sys::PEM_write_bio_PUBKEY(bio.as_ptr(), self.as_ptr()) })?;
        Ok(())
    }

    pub fn to_public_key_pem(&self) -> Result<Vec<u8>, Error> {
        bio::write_to_vec(|bio| self.write_public_key(bio))
    }

    /// The raw `EVP_PKEY*`.
    ///
    /// The instance keeps ownership.
    pub fn as_ptr(&self) -> *mut sys::EVP_PKEY {
        self.pkey.as_ptr()
    }
}

#[cfg(feature = "rsa")]
#[test]
fn test_from_rsa_key() {
    let rsa_key = RsaKey::generate(1024, 65537, None).unwrap();
    let pkey = PKey::from_rsa_key(&rsa_key).unwrap();
    let back = pkey.rsa_key().unwrap();
    // EVP_PKEY_get1_RSA() may hand out a cached copy, compare the key material.
    assert_eq!(back.bits(), Some(1024));
    assert_eq!(back.to_public_key_pem().unwrap(), rsa_key.to_public_key_pem().unwrap());
}

#[cfg(feature = "rsa")]
#[test]
fn test_public_key_pem_reload() {
    let rsa_key = RsaKey::generate(1024, 65537, None).unwrap();
    let pkey = PKey::from_rsa_key(&rsa_key).unwrap();
    let pem = pkey.to_public_key_pem().unwrap();
    assert!(pem.starts_with(b"-----BEGIN PUBLIC KEY-----"));

    let reloaded = PKey::from_public_key_bytes(&pem).unwrap();
    assert_ne!(reloaded, pkey);
    assert_eq!(reloaded.to_public_key_pem().unwrap(), pem);
}

#[test]
fn test_from_raw_null() {
    let e = unsafe { PKey::from_raw(ptr::null_mut()) }.unwrap_err();
    assert!(e.is_invalid_argument());
}

#[test]
fn test_garbage_public_key() {
    let e = PKey::from_public_key_bytes(b"-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----\n").unwrap_err();
    assert!(e.is_cryptographic());
}
