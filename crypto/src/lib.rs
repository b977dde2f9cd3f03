// SPDX-License-Identifier: Apache-2.0
// Copyright 2023-2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Reference-counted handles for OpenSSL RSA keys and X.509 certificates.
//!
//! Every key and certificate wrapper owns its raw library object through a
//! shared [`OwnedHandle`](handle::OwnedHandle): clones refer to the same object,
//! equality is pointer identity and the matching free function runs once the
//! last clone is gone. Library failures surface as [`Error::Cryptographic`]
//! carrying the drained error queue.

pub mod bio;
pub mod bn;
mod error;
pub mod handle;
mod ossl_ffi;
pub mod pkey;
#[cfg(feature = "x509")]
pub mod x509;

pub use error::*;
pub use ossl_ffi::callback::{PassphraseCallback, ProgressCallback};

/// Raw C types as accepted and returned by the `from_raw()` and `as_ptr()`
/// methods.
pub mod ffi {
    pub use openssl_sys::{BIO, BN_CTX, EVP_PKEY, RSA, X509, X509_NAME};
}
