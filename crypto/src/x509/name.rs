// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Distinguished name views.

use crate::Error;
use crate::bio;
use crate::handle::{OwnedHandle, null_deleter};
use crate::ossl_ffi::{error::cvt, sys};
use core::{cmp, ffi, marker, ops};
use std::ffi::CString;

/// A read-only view of a distinguished name owned by some parent object.
///
/// The name is bound to a no-op deleter: its lifetime is controlled by the
/// parent, which `'a` borrows from. Equality is identity of the underlying
/// `X509_NAME*`, use [`compare()`](Self::compare) to compare contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name<'a> {
    name: OwnedHandle<sys::X509_NAME>,
    _parent: marker::PhantomData<&'a ()>,
}

impl<'a> Name<'a> {
    /// Create a view of a name owned by something living for `'a`.
    ///
    /// A null `name` is taken as a failure reported by the library.
    ///
    /// # Safety
    ///
    /// `name` must be null or stay valid for `'a`.
    pub unsafe fn from_borrowed(name: *mut sys::X509_NAME) -> Result<Self, Error> {
        Ok(Self {
            name: unsafe { OwnedHandle::new(name, null_deleter::<sys::X509_NAME>) }?,
            _parent: marker::PhantomData,
        })
    }

    /// Number of relative distinguished name entries.
    pub fn entry_count(&self) -> usize {
        usize::try_from(unsafe { sys::X509_NAME_entry_count(self.as_ptr()) }).unwrap_or(0)
    }

    /// Compare the contents of two names.
    pub fn compare(&self, other: &Name<'_>) -> cmp::Ordering {
        unsafe { sys::X509_NAME_cmp(self.as_ptr(), other.as_ptr()) }.cmp(&0)
    }

    /// Render as RFC 2253 string, e.g. `CN=example.org,O=Example`.
    pub fn to_rfc2253(&self) -> Result<String, Error> {
        let out = bio::write_to_vec(|bio| {
            // Returns the number of bytes written, an empty name yields 0.
            let r = unsafe { sys::X509_NAME_print_ex(bio.as_ptr(), self.as_ptr(), 0, sys::XN_FLAG_RFC2253) };
            if r < 0 {
                return Err(crate::ossl_ffi::error::ossl_get_error());
            }
            Ok(())
        })?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// The raw `X509_NAME*`.
    ///
    /// Owned by the parent object.
    pub fn as_ptr(&self) -> *mut sys::X509_NAME {
        self.name.as_ptr()
    }
}

/// A view of a distinguished name which allows modifying it.
///
/// Obtained from an exclusive borrow of the parent, e.g. through
/// [`Certificate::subject_mut()`](super::Certificate::subject_mut).
/// Mutating the name mutates the parent.
#[derive(Debug)]
pub struct NameMut<'a> {
    name: Name<'a>,
}

impl<'a> NameMut<'a> {
    /// Create a mutable view of a name owned by something exclusively
    /// borrowed for `'a`.
    ///
    /// # Safety
    ///
    /// `name` must be null or stay valid for `'a`, and must not be accessed
    /// through anything else during `'a`.
    pub unsafe fn from_borrowed(name: *mut sys::X509_NAME) -> Result<Self, Error> {
        Ok(Self {
            name: unsafe { Name::from_borrowed(name) }?,
        })
    }

    /// Append an entry, e.g. `("CN", "example.org")`.
    ///
    /// # Errors:
    ///
    /// - [`InvalidArgument`](Error::InvalidArgument) - `field` contains a NUL
    ///   byte or `value` is too long.
    /// - [`Cryptographic`](Error::Cryptographic) - `field` is unknown to the
    ///   library or the entry could not be added.
    pub fn add_entry_by_text(&mut self, field: &str, value: &str) -> Result<(), Error> {
        let field = CString::new(field).map_err(|_| Error::InvalidArgument("field contains NUL"))?;
        let len = ffi::c_int::try_from(value.len()).map_err(|_| Error::InvalidArgument("value too long"))?;
        cvt(unsafe {
            sys::X509_NAME_add_entry_by_txt(
                self.as_ptr(),
                field.as_ptr(),
                sys::MBSTRING_UTF8,
                value.as_ptr(),
                len,
                -1,
                0,
            )
        })?;
        Ok(())
    }
}

impl<'a> ops::Deref for NameMut<'a> {
    type Target = Name<'a>;

    fn deref(&self) -> &Name<'a> {
        &self.name
    }
}

#[test]
fn test_compare_contents() {
    let mut a = super::Certificate::new().unwrap();
    let mut b = super::Certificate::new().unwrap();
    let mut name_a = a.subject_mut().unwrap();
    let mut name_b = b.subject_mut().unwrap();
    assert_ne!(*name_a, *name_b);
    assert_eq!(name_a.compare(&name_b), cmp::Ordering::Equal);

    name_a.add_entry_by_text("CN", "a.test").unwrap();
    name_b.add_entry_by_text("CN", "b.test").unwrap();
    assert_ne!(name_a.compare(&name_b), cmp::Ordering::Equal);
    assert_eq!(name_a.compare(&name_b), name_b.compare(&name_a).reverse());
}

#[test]
fn test_add_entry_errors() {
    let mut cert = super::Certificate::new().unwrap();
    let mut name = cert.subject_mut().unwrap();
    let e = name.add_entry_by_text("C\0N", "x").unwrap_err();
    assert!(e.is_invalid_argument());
    let e = name.add_entry_by_text("notAnAttributeType", "x").unwrap_err();
    assert!(e.is_cryptographic());
    assert_eq!(name.entry_count(), 0);
}

#[test]
fn test_null_view() {
    let e = unsafe { Name::from_borrowed(core::ptr::null_mut()) }.unwrap_err();
    assert!(e.is_cryptographic());
}
