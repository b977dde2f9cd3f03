// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Byte sources and sinks for the PEM layer.

use crate::Error;
use crate::ossl_ffi::{
    self,
    error::{cvt_p, ossl_get_error},
    sys,
};
use core::{ffi, marker, ptr};
use std::{io, slice};

/// An owned BIO chain.
///
/// Released with `BIO_free_all()`, i.e. together with every BIO pushed onto
/// it. BIOs are not safe for concurrent use, so a chain has exactly one owner
/// and is never shared.
#[derive(Debug, PartialEq, Eq)]
pub struct BioChain {
    bio: ptr::NonNull<sys::BIO>,
}

impl BioChain {
    /// Create a new read/write memory BIO.
    pub fn new_mem() -> Result<Self, Error> {
        ossl_ffi::init();
        let method = unsafe { sys::BIO_s_mem() };
        let bio = cvt_p(unsafe { sys::BIO_new(method) })?;
        Ok(Self { bio })
    }

    /// Take ownership of an existing BIO chain.
    ///
    /// # Safety
    ///
    /// `bio` must be null or a valid BIO chain not owned by anyone else.
    pub unsafe fn from_raw(bio: *mut sys::BIO) -> Result<Self, Error> {
        let bio = ptr::NonNull::new(bio).ok_or(Error::InvalidArgument("bio"))?;
        Ok(Self { bio })
    }

    /// The first BIO in the chain.
    ///
    /// The returned [`BioPtr`] borrows from `self`.
    pub fn first(&self) -> BioPtr<'_> {
        unsafe { BioPtr::from_raw(self.bio.as_ptr()) }
    }

    /// The bytes currently buffered in a memory BIO.
    ///
    /// The exclusive borrow keeps any [`BioPtr`] from touching the chain
    /// while the slice is alive.
    pub fn contents(&mut self) -> &[u8] {
        let mut data: *mut ffi::c_char = ptr::null_mut();
        let len = unsafe { sys::BIO_get_mem_data(self.bio.as_ptr(), &mut data) };
        if len <= 0 || data.is_null() {
            return &[];
        }
        unsafe { slice::from_raw_parts(data as *const u8, len as usize) }
    }
}

impl Drop for BioChain {
    fn drop(&mut self) {
        unsafe { sys::BIO_free_all(self.bio.as_ptr()) };
    }
}

// A chain has a single owner, handing it over to another thread is fine.
unsafe impl Send for BioChain {}

/// A non-owning BIO reference.
///
/// The caller keeps ownership of the BIO, the lifetime ties the reference to
/// whatever owns it.
#[derive(Clone, Copy, Debug)]
pub struct BioPtr<'a> {
    bio: *mut sys::BIO,
    _phantom: marker::PhantomData<&'a sys::BIO>,
}

impl<'a> BioPtr<'a> {
    /// Borrow a raw BIO.
    ///
    /// # Safety
    ///
    /// `bio` must be a valid BIO that outlives `'a`.
    pub unsafe fn from_raw(bio: *mut sys::BIO) -> Self {
        Self {
            bio,
            _phantom: marker::PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut sys::BIO {
        self.bio
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `0` at the end of data, and when no data is available right
    /// now, like for a drained memory BIO.
    ///
    /// # Errors:
    ///
    /// - [`Cryptographic`](Error::Cryptographic) - The BIO failed.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let len = ffi::c_int::try_from(buf.len()).unwrap_or(ffi::c_int::MAX);
        let r = unsafe { sys::BIO_read(self.bio, buf.as_mut_ptr() as *mut ffi::c_void, len) };
        if let Ok(n) = usize::try_from(r) {
            return Ok(n);
        }
        if unsafe { sys::BIO_should_retry(self.bio) } {
            return Ok(0);
        }
        Err(ossl_get_error())
    }

    /// Write all of `data`.
    pub fn write(&self, data: &[u8]) -> Result<(), Error> {
        let mut data = data;
        while !data.is_empty() {
            let len = ffi::c_int::try_from(data.len()).unwrap_or(ffi::c_int::MAX);
            let r = unsafe { sys::BIO_write(self.bio, data.as_ptr() as *const ffi::c_void, len) };
            if r <= 0 {
                return Err(ossl_get_error());
            }
            data = &data[r as usize..];
        }
        Ok(())
    }
}

/// A read-only memory BIO over borrowed bytes.
pub struct MemBioSlice<'a> {
    bio: BioChain,
    _phantom: marker::PhantomData<&'a [u8]>,
}

impl<'a> MemBioSlice<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, Error> {
        ossl_ffi::init();
        let len = ffi::c_int::try_from(buf.len()).map_err(|_| Error::InvalidArgument("buffer too large"))?;
        let bio = cvt_p(unsafe { sys::BIO_new_mem_buf(buf.as_ptr() as *const ffi::c_void, len) })?;
        Ok(Self {
            bio: BioChain { bio },
            _phantom: marker::PhantomData,
        })
    }

    pub fn as_bio(&self) -> BioPtr<'_> {
        self.bio.first()
    }
}

/// Run `f` against a fresh memory BIO and return what it wrote.
pub(crate) fn write_to_vec<F>(f: F) -> Result<Vec<u8>, Error>
where
    F: FnOnce(BioPtr<'_>) -> Result<(), Error>,
{
    let mut bio = BioChain::new_mem()?;
    f(bio.first())?;
    Ok(bio.contents().to_vec())
}

/// Run `f` against a fresh memory BIO and copy what it wrote to `w`.
pub(crate) fn write_to_writer<W, F>(w: &mut W, f: F) -> Result<(), Error>
where
    W: io::Write + ?Sized,
    F: FnOnce(BioPtr<'_>) -> Result<(), Error>,
{
    let mut bio = BioChain::new_mem()?;
    f(bio.first())?;
    w.write_all(bio.contents())?;
    w.flush()?;
    Ok(())
}

/// Buffer all of `r` and hand a read-only BIO over it to `f`.
pub(crate) fn read_from_reader<R, T, F>(r: &mut R, f: F) -> Result<T, Error>
where
    R: io::Read + ?Sized,
    F: FnOnce(BioPtr<'_>) -> Result<T, Error>,
{
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    let bio = MemBioSlice::new(&buf)?;
    f(bio.as_bio())
}

#[test]
fn test_mem_bio_write_read() {
    let mut chain = BioChain::new_mem().unwrap();
    let bio = chain.first();
    bio.write(b"hello ").unwrap();
    bio.write(b"world").unwrap();
    assert_eq!(chain.contents(), b"hello world");

    let mut buf = [0u8; 5];
    let bio = chain.first();
    assert_eq!(bio.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    assert_eq!(chain.contents(), b" world");
}

#[test]
fn test_mem_bio_slice_reads_borrowed() {
    let data = b"-----BEGIN NOTHING-----";
    let slice = MemBioSlice::new(data).unwrap();
    let mut buf = vec![0u8; 64];
    let n = slice.as_bio().read(&mut buf).unwrap();
    assert_eq!(&buf[..n], data);
    assert_eq!(slice.as_bio().read(&mut buf).unwrap(), 0);
}

#[test]
fn test_mem_bio_slice_is_read_only() {
    let data = b"abc";
    let slice = MemBioSlice::new(data).unwrap();
    let e = slice.as_bio().write(b"def").unwrap_err();
    assert!(e.is_cryptographic());
}

#[test]
fn test_mem_bio_contents_after_growth() {
    let mut chain = BioChain::new_mem().unwrap();
    chain.first().write(b"hello").unwrap();
    assert_eq!(chain.contents(), b"hello");

    // Forces the buffer to be reallocated.
    let big = vec![0xa5u8; 1 << 20];
    chain.first().write(&big).unwrap();
    let contents = chain.contents();
    assert_eq!(contents.len(), 5 + big.len());
    assert_eq!(&contents[..5], b"hello");
    assert_eq!(&contents[5..], &big[..]);
}

#[test]
fn test_mem_bio_drained_read() {
    let chain = BioChain::new_mem().unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(chain.first().read(&mut buf).unwrap(), 0);
}

#[test]
fn test_bio_read_failure() {
    // A file BIO without an attached file is uninitialized.
    let chain = unsafe { BioChain::from_raw(sys::BIO_new(sys::BIO_s_file())) }.unwrap();
    let mut buf = [0u8; 4];
    let e = chain.first().read(&mut buf).unwrap_err();
    assert!(e.is_cryptographic());
}

#[test]
fn test_bio_chain_identity() {
    let a = BioChain::new_mem().unwrap();
    assert_eq!(a.first().as_ptr(), a.first().as_ptr());
    assert_ne!(a, BioChain::new_mem().unwrap());
}

#[test]
fn test_bio_chain_from_null() {
    let e = unsafe { BioChain::from_raw(ptr::null_mut()) }.unwrap_err();
    assert!(e.is_invalid_argument());
}

#[test]
fn test_write_to_vec() {
    let out = write_to_vec(|bio| bio.write(b"pem")).unwrap();
    assert_eq!(out, b"pem");
}
