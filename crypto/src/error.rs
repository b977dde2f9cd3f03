// SPDX-License-Identifier: Apache-2.0
// Copyright 2023-2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Error type definitions.

use crate::ossl_ffi::sys;
use core::ffi::{CStr, c_int, c_ulong};
use std::{fmt, io};

/// Common error returned by all wrappers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying library reported a failure.
    ///
    /// Carries the contents of the library's error queue at the time the
    /// failure was observed. The stack may be empty if the library signaled
    /// failure through its return value only.
    #[error("cryptographic error: {0}")]
    Cryptographic(ErrorStack),

    /// A contract violation detected before reaching the library.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A Rust reader or writer used as a byte source or sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn is_cryptographic(&self) -> bool {
        matches!(self, Self::Cryptographic(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// The library error queue contents, if this is a
    /// [`Cryptographic`](Self::Cryptographic) error.
    pub fn error_stack(&self) -> Option<&ErrorStack> {
        match self {
            Self::Cryptographic(stack) => Some(stack),
            _ => None,
        }
    }
}

impl From<ErrorStack> for Error {
    fn from(value: ErrorStack) -> Self {
        Self::Cryptographic(value)
    }
}

/// Snapshot of the library's thread-local error queue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorStack {
    errors: Vec<LibraryError>,
}

impl ErrorStack {
    /// Drain the calling thread's error queue.
    ///
    /// The queue is empty afterwards.
    pub fn drain() -> Self {
        let mut errors = Vec::new();
        loop {
            let packed = unsafe { sys::ERR_get_error() };
            if packed == 0 {
                break;
            }
            errors.push(LibraryError { packed });
        }
        Self { errors }
    }

    pub fn errors(&self) -> &[LibraryError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any entry originates from `library`.
    pub fn contains_library(&self, library: ErrorLibrary) -> bool {
        self.errors.iter().any(|e| e.library() == library)
    }
}

impl fmt::Display for ErrorStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("failure without error queue entries");
        }
        for (i, e) in self.errors.iter().enumerate() {
            if i != 0 {
                f.write_str("; ")?;
            }
            fmt::Display::fmt(e, f)?;
        }
        Ok(())
    }
}

/// A single packed entry from the library's error queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibraryError {
    packed: c_ulong,
}

impl LibraryError {
    /// The packed error code as returned by `ERR_get_error()`.
    pub fn code(&self) -> u64 {
        self.packed as u64
    }

    pub fn library(&self) -> ErrorLibrary {
        ErrorLibrary::from_code(sys::ERR_GET_LIB(self.packed))
    }

    pub fn reason_code(&self) -> i32 {
        sys::ERR_GET_REASON(self.packed)
    }

    /// Library name as registered with the error subsystem, if any.
    pub fn library_str(&self) -> Option<&'static str> {
        let s = unsafe { sys::ERR_lib_error_string(self.packed) };
        static_str(s)
    }

    /// Reason text as registered with the error subsystem, if any.
    pub fn reason_str(&self) -> Option<&'static str> {
        let s = unsafe { sys::ERR_reason_error_string(self.packed) };
        static_str(s)
    }
}

fn static_str(s: *const core::ffi::c_char) -> Option<&'static str> {
    if s.is_null() {
        return None;
    }
    // Error strings are static tables owned by the library.
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error:{:08X}", self.packed)?;
        match self.library_str() {
            Some(lib) => write!(f, ":{}", lib)?,
            None => write!(f, ":{:?}", self.library())?,
        }
        match self.reason_str() {
            Some(reason) => write!(f, ":{}", reason),
            None => write!(f, ":reason({})", self.reason_code()),
        }
    }
}

/// Library subsystem an error originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorLibrary {
    None,
    Sys,
    Bn,
    Rsa,
    Evp,
    Buf,
    Obj,
    Pem,
    X509,
    Asn1,
    Crypto,
    Bio,
    X509v3,
    Rand,
    Decoder,
    Other(i32),
}

impl ErrorLibrary {
    fn from_code(lib: c_int) -> Self {
        match lib {
            sys::ERR_LIB_NONE => Self::None,
            sys::ERR_LIB_SYS => Self::Sys,
            sys::ERR_LIB_BN => Self::Bn,
            sys::ERR_LIB_RSA => Self::Rsa,
            sys::ERR_LIB_EVP => Self::Evp,
            sys::ERR_LIB_BUF => Self::Buf,
            sys::ERR_LIB_OBJ => Self::Obj,
            sys::ERR_LIB_PEM => Self::Pem,
            sys::ERR_LIB_X509 => Self::X509,
            sys::ERR_LIB_ASN1 => Self::Asn1,
            sys::ERR_LIB_CRYPTO => Self::Crypto,
            sys::ERR_LIB_BIO => Self::Bio,
            sys::ERR_LIB_X509V3 => Self::X509v3,
            sys::ERR_LIB_RAND => Self::Rand,
            sys::ERR_LIB_OSSL_DECODER => Self::Decoder,
            other => Self::Other(other),
        }
    }
}

#[test]
fn test_library_from_code() {
    assert_eq!(ErrorLibrary::from_code(sys::ERR_LIB_PEM), ErrorLibrary::Pem);
    assert_eq!(ErrorLibrary::from_code(sys::ERR_LIB_RSA), ErrorLibrary::Rsa);
    assert_eq!(ErrorLibrary::from_code(250), ErrorLibrary::Other(250));
}

#[test]
fn test_empty_stack_display() {
    let stack = ErrorStack::default();
    assert!(stack.is_empty());
    let e = Error::from(stack);
    assert!(e.is_cryptographic());
    assert!(e.error_stack().is_some_and(|s| s.is_empty()));
    assert_eq!(e.to_string(), "cryptographic error: failure without error queue entries");
}

#[test]
fn test_invalid_argument() {
    let e = Error::InvalidArgument("certificate");
    assert!(e.is_invalid_argument());
    assert!(!e.is_cryptographic());
    assert!(e.error_stack().is_none());
}
