// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! X.509 certificate handle.

use super::{Name, NameMut};
use crate::Error;
use crate::bio::{self, BioPtr, MemBioSlice};
use crate::handle::OwnedHandle;
use crate::ossl_ffi::{
    self,
    callback::{PassphraseCallback, PassphraseState},
    error::cvt,
    sys,
};
use crate::pkey::PKey;
use core::{ffi, ptr, slice};
use std::io;

/// PEM envelope flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PemFlavor {
    /// `CERTIFICATE`. Reading a trusted certificate this way drops the
    /// auxiliary trust information.
    Plain,
    /// `TRUSTED CERTIFICATE`, carrying the auxiliary trust information.
    Trusted,
}

/// A X.509 certificate.
///
/// An instance has the semantics of a `X509*`: clones share the same
/// underlying certificate, and two instances compare equal iff they do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Certificate {
    x509: OwnedHandle<sys::X509>,
}

impl Certificate {
    /// Create a new empty certificate.
    pub fn new() -> Result<Self, Error> {
        ossl_ffi::init();
        let x509 = unsafe { OwnedHandle::new(sys::X509_new(), sys::X509_free) }?;
        Ok(Self { x509 })
    }

    /// Take ownership of an existing `X509*`.
    ///
    /// # Errors:
    ///
    /// - [`InvalidArgument`](Error::InvalidArgument) - `x509` is null.
    ///
    /// # Safety
    ///
    /// `x509` must be null or a valid `X509*` whose reference is transferred
    /// to the returned instance.
    pub unsafe fn from_raw(x509: *mut sys::X509) -> Result<Self, Error> {
        let x509 = ptr::NonNull::new(x509).ok_or(Error::InvalidArgument("certificate"))?;
        Ok(Self {
            x509: unsafe { OwnedHandle::from_non_null(x509, sys::X509_free) },
        })
    }

    fn read_pem(
        flavor: PemFlavor,
        bio: BioPtr<'_>,
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        ossl_ffi::init();
        let mut state = PassphraseState::new(passphrase);
        // PEM_read_bio_X509() refuses the TRUSTED CERTIFICATE envelope, the
        // _AUX variant takes both.
        let x509 =
            unsafe { sys::PEM_read_bio_X509_AUX(bio.as_ptr(), ptr::null_mut(), state.callback(), state.as_arg()) };
        // Bound to its deleter before anything else can fail.
        let x509 = unsafe { OwnedHandle::new(x509, sys::X509_free) };
        state.finish();
        let cert = Self { x509: x509? };
        match flavor {
            PemFlavor::Plain => cert.without_trust(),
            PemFlavor::Trusted => Ok(cert),
        }
    }

    /// A copy of the certificate with the auxiliary trust information
    /// stripped.
    ///
    /// The DER encoding of a plain certificate carries no trust information,
    /// so a round trip through it leaves exactly the certificate proper.
    fn without_trust(&self) -> Result<Self, Error> {
        let len = cvt(unsafe { sys::i2d_X509(self.x509.as_ptr(), ptr::null_mut()) })?;
        let mut der = vec![0u8; len as usize];
        let mut out = der.as_mut_ptr();
        cvt(unsafe { sys::i2d_X509(self.x509.as_ptr(), &mut out) })?;
        let mut input = der.as_ptr();
        let x509 = unsafe { sys::d2i_X509(ptr::null_mut(), &mut input, ffi::c_long::from(len)) };
        let x509 = unsafe { OwnedHandle::new(x509, sys::X509_free) }?;
        Ok(Self { x509 })
    }

    fn write_pem(&self, flavor: PemFlavor, bio: BioPtr<'_>) -> Result<(), Error> {
        let x509 = self.x509.as_ptr();
        cvt(unsafe {
            match flavor {
                PemFlavor::Plain => sys::PEM_write_bio_X509(bio.as_ptr(), x509),
                PemFlavor::Trusted => sys::PEM_write_bio_X509_AUX(bio.as_ptr(), x509),
            }
        })?;
        Ok(())
    }

    /// Load a PEM certificate.
    ///
    /// A trusted certificate is accepted as well, but its trust information
    /// is discarded.
    ///
    /// # Arguments:
    ///
    /// * `bio` - The source.
    /// * `passphrase` - Invoked whenever a passphrase is needed. If `None`, no
    ///   passphrase is supplied.
    pub fn from_certificate(bio: BioPtr<'_>, passphrase: Option<&mut PassphraseCallback<'_>>) -> Result<Self, Error> {
        Self::read_pem(PemFlavor::Plain, bio, passphrase)
    }

    /// Load a PEM trusted certificate, keeping its trust information.
    ///
    /// A plain certificate is accepted as well and ends up without trust
    /// information.
    pub fn from_trusted_certificate(
        bio: BioPtr<'_>,
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        Self::read_pem(PemFlavor::Trusted, bio, passphrase)
    }

    pub fn from_certificate_bytes(
        buf: &[u8],
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        let bio = MemBioSlice::new(buf)?;
        Self::read_pem(PemFlavor::Plain, bio.as_bio(), passphrase)
    }

    pub fn from_trusted_certificate_bytes(
        buf: &[u8],
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        let bio = MemBioSlice::new(buf)?;
        Self::read_pem(PemFlavor::Trusted, bio.as_bio(), passphrase)
    }

    /// Load a PEM certificate from a file or any other reader.
    pub fn from_certificate_reader<R: io::Read + ?Sized>(
        reader: &mut R,
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        bio::read_from_reader(reader, |bio| Self::read_pem(PemFlavor::Plain, bio, passphrase))
    }

    pub fn from_trusted_certificate_reader<R: io::Read + ?Sized>(
        reader: &mut R,
        passphrase: Option<&mut PassphraseCallback<'_>>,
    ) -> Result<Self, Error> {
        bio::read_from_reader(reader, |bio| Self::read_pem(PemFlavor::Trusted, bio, passphrase))
    }

    /// Write the certificate in PEM format.
    pub fn write_certificate(&self, bio: BioPtr<'_>) -> Result<(), Error> {
        self.write_pem(PemFlavor::Plain, bio)
    }

    /// Write the certificate and its trust information in PEM format.
    pub fn write_trusted_certificate(&self, bio: BioPtr<'_>) -> Result<(), Error> {
        self.write_pem(PemFlavor::Trusted, bio)
    }

    /// Write the certificate in PEM format to a file or any other writer.
    pub fn write_certificate_to<W: io::Write + ?Sized>(&self, writer: &mut W) -> Result<(), Error> {
        bio::write_to_writer(writer, |bio| self.write_pem(PemFlavor::Plain, bio))
    }

    pub fn write_trusted_certificate_to<W: io::Write + ?Sized>(&self, writer: &mut W) -> Result<(), Error> {
        bio::write_to_writer(writer, |bio| self.write_pem(PemFlavor::Trusted, bio))
    }

    pub fn to_pem(&self) -> Result<Vec<u8>, Error> {
        bio::write_to_vec(|bio| self.write_pem(PemFlavor::Plain, bio))
    }

    pub fn to_trusted_pem(&self) -> Result<Vec<u8>, Error> {
        bio::write_to_vec(|bio| self.write_pem(PemFlavor::Trusted, bio))
    }

    /// The public key.
    ///
    /// The returned key is an independent reference and stays valid after the
    /// certificate is gone.
    pub fn public_key(&self) -> Result<PKey, Error> {
        unsafe { PKey::from_library(sys::X509_get_pubkey(self.x509.as_ptr())) }
    }

    /// Read-only view of the subject name.
    ///
    /// Repeated calls refer to the same underlying name.
    pub fn subject(&self) -> Result<Name<'_>, Error> {
        unsafe { Name::from_borrowed(sys::X509_get_subject_name(self.as_ptr())) }
    }

    /// View of the subject name through which it can be modified.
    pub fn subject_mut(&mut self) -> Result<NameMut<'_>, Error> {
        unsafe { NameMut::from_borrowed(sys::X509_get_subject_name(self.as_mut_ptr())) }
    }

    /// Read-only view of the issuer name.
    pub fn issuer(&self) -> Result<Name<'_>, Error> {
        unsafe { Name::from_borrowed(sys::X509_get_issuer_name(self.as_ptr())) }
    }

    /// View of the issuer name through which it can be modified.
    pub fn issuer_mut(&mut self) -> Result<NameMut<'_>, Error> {
        unsafe { NameMut::from_borrowed(sys::X509_get_issuer_name(self.as_mut_ptr())) }
    }

    /// The alias (friendly name) from the auxiliary trust information.
    pub fn alias(&self) -> Option<Vec<u8>> {
        let mut len: ffi::c_int = 0;
        let alias = unsafe { sys::X509_alias_get0(self.x509.as_ptr(), &mut len) };
        if alias.is_null() {
            return None;
        }
        let len = usize::try_from(len).ok()?;
        Some(unsafe { slice::from_raw_parts(alias, len) }.to_vec())
    }

    /// Set the alias in the auxiliary trust information.
    ///
    /// Only preserved by the trusted PEM flavor.
    pub fn set_alias(&mut self, alias: &[u8]) -> Result<(), Error> {
        let len = ffi::c_int::try_from(alias.len()).map_err(|_| Error::InvalidArgument("alias too long"))?;
        cvt(unsafe { sys::X509_alias_set1(self.as_mut_ptr(), alias.as_ptr(), len) })?;
        Ok(())
    }

    /// The raw `X509*`.
    ///
    /// The instance keeps ownership: calling `X509_free()` on the returned
    /// value results in undefined behavior.
    pub fn as_ptr(&self) -> *const sys::X509 {
        self.x509.as_ptr()
    }

    /// The raw `X509*`, see [`as_ptr()`](Self::as_ptr).
    pub fn as_mut_ptr(&mut self) -> *mut sys::X509 {
        self.x509.as_ptr()
    }
}

#[cfg(test)]
const TEST_SELF_SIGNED: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/self_signed.pem"));

#[cfg(test)]
const TEST_SELF_SIGNED_TRUSTED: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/self_signed_trusted.pem"));

#[cfg(test)]
const TEST_LEAF: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/leaf.pem"));

#[cfg(test)]
fn test_canonical_pem(pem: &[u8]) -> String {
    String::from_utf8_lossy(pem)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_new_is_allocated_and_distinct() {
    let a = Certificate::new().unwrap();
    let b = Certificate::new().unwrap();
    assert!(!a.as_ptr().is_null());
    assert_ne!(a, b);
    let a2 = a.clone();
    assert_eq!(a, a2);
    assert_eq!(a.as_ptr(), a2.as_ptr());
}

#[test]
fn test_from_raw() {
    ossl_ffi::init();
    let raw = unsafe { sys::X509_new() };
    let cert = unsafe { Certificate::from_raw(raw) }.unwrap();
    assert_eq!(cert.as_ptr(), raw as *const sys::X509);
}

#[test]
fn test_from_raw_null() {
    let e = unsafe { Certificate::from_raw(ptr::null_mut()) }.unwrap_err();
    assert!(e.is_invalid_argument());
}

#[test]
fn test_load_garbage() {
    let e = Certificate::from_certificate_bytes(b"definitely not PEM", None).unwrap_err();
    assert!(e.is_cryptographic());
    let e = Certificate::from_trusted_certificate_bytes(b"", None).unwrap_err();
    assert!(e.is_cryptographic());
}

#[test]
fn test_round_trip() {
    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    assert_eq!(test_canonical_pem(&cert.to_pem().unwrap()), test_canonical_pem(TEST_SELF_SIGNED));
}

#[test]
fn test_trusted_round_trip() {
    let cert = Certificate::from_trusted_certificate_bytes(TEST_SELF_SIGNED_TRUSTED, None).unwrap();
    assert_eq!(cert.alias().as_deref(), Some(&b"cryptoplus test"[..]));
    let pem = cert.to_trusted_pem().unwrap();
    assert!(pem.starts_with(b"-----BEGIN TRUSTED CERTIFICATE-----"));
    assert_eq!(test_canonical_pem(&pem), test_canonical_pem(TEST_SELF_SIGNED_TRUSTED));
}

#[test]
fn test_plain_reader_drops_trust() {
    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED_TRUSTED, None).unwrap();
    assert_eq!(cert.alias(), None);
    let pem = cert.to_pem().unwrap();
    assert_eq!(test_canonical_pem(&pem), test_canonical_pem(TEST_SELF_SIGNED));

    // Nothing left to write out as trust information either.
    let trusted_pem = cert.to_trusted_pem().unwrap();
    let reloaded = Certificate::from_trusted_certificate_bytes(&trusted_pem, None).unwrap();
    assert_eq!(reloaded.alias(), None);

    let reloaded = Certificate::from_trusted_certificate_bytes(&pem, None).unwrap();
    assert_eq!(reloaded.alias(), None);
}

#[test]
fn test_plain_reader_drops_trust_from_reader() {
    let mut source = TEST_SELF_SIGNED_TRUSTED;
    let cert = Certificate::from_certificate_reader(&mut source, None).unwrap();
    assert_eq!(cert.alias(), None);
    assert_eq!(cert.subject().unwrap().to_rfc2253().unwrap(), "CN=self-signed.test,O=Cryptoplus Test,C=FR");
}

#[test]
fn test_trusted_reader_accepts_plain() {
    let cert = Certificate::from_trusted_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    assert_eq!(cert.alias(), None);
    assert_eq!(test_canonical_pem(&cert.to_pem().unwrap()), test_canonical_pem(TEST_SELF_SIGNED));
}

#[test]
fn test_set_alias_needs_trusted_flavor() {
    let mut cert = Certificate::from_certificate_bytes(TEST_LEAF, None).unwrap();
    cert.set_alias(b"leaf").unwrap();
    assert_eq!(cert.alias().as_deref(), Some(&b"leaf"[..]));

    let trusted = Certificate::from_trusted_certificate_bytes(&cert.to_trusted_pem().unwrap(), None).unwrap();
    assert_eq!(trusted.alias().as_deref(), Some(&b"leaf"[..]));
    let plain = Certificate::from_trusted_certificate_bytes(&cert.to_pem().unwrap(), None).unwrap();
    assert_eq!(plain.alias(), None);
}

#[test]
fn test_passphrase_not_needed() {
    let mut asked = 0usize;
    let mut passphrase = |_buf: &mut [u8]| {
        asked += 1;
        0usize
    };
    Certificate::from_certificate_bytes(TEST_SELF_SIGNED, Some(&mut passphrase)).unwrap();
    assert_eq!(asked, 0);
}

#[test]
fn test_bio_source_and_sink() {
    let source = MemBioSlice::new(TEST_LEAF).unwrap();
    let cert = Certificate::from_certificate(source.as_bio(), None).unwrap();

    let mut sink = bio::BioChain::new_mem().unwrap();
    cert.write_certificate(sink.first()).unwrap();
    assert_eq!(test_canonical_pem(sink.contents()), test_canonical_pem(TEST_LEAF));

    let mut sink = bio::BioChain::new_mem().unwrap();
    cert.write_trusted_certificate(sink.first()).unwrap();
    let reloaded = Certificate::from_trusted_certificate(sink.first(), None).unwrap();
    assert_ne!(reloaded, cert);
    assert_eq!(reloaded.to_pem().unwrap(), cert.to_pem().unwrap());
}

#[test]
fn test_file_source_and_sink() {
    use std::io::{Seek as _, SeekFrom};

    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    let mut file = tempfile::tempfile().unwrap();
    cert.write_certificate_to(&mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let reloaded = Certificate::from_certificate_reader(&mut file, None).unwrap();
    assert_eq!(reloaded.to_pem().unwrap(), cert.to_pem().unwrap());

    let cert = Certificate::from_trusted_certificate_bytes(TEST_SELF_SIGNED_TRUSTED, None).unwrap();
    let mut file = tempfile::tempfile().unwrap();
    cert.write_trusted_certificate_to(&mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let reloaded = Certificate::from_trusted_certificate_reader(&mut file, None).unwrap();
    assert_eq!(reloaded.alias(), cert.alias());
}

#[test]
fn test_self_signed_subject_is_issuer() {
    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    let subject = cert.subject().unwrap();
    let issuer = cert.issuer().unwrap();
    assert_eq!(subject.compare(&issuer), core::cmp::Ordering::Equal);
    // Distinct objects inside the certificate.
    assert_ne!(subject, issuer);
    assert_eq!(subject.to_rfc2253().unwrap(), "CN=self-signed.test,O=Cryptoplus Test,C=FR");
}

#[test]
fn test_leaf_subject_and_issuer() {
    let cert = Certificate::from_certificate_bytes(TEST_LEAF, None).unwrap();
    let subject = cert.subject().unwrap();
    let issuer = cert.issuer().unwrap();
    assert_ne!(subject.compare(&issuer), core::cmp::Ordering::Equal);
    assert_eq!(subject.to_rfc2253().unwrap(), "CN=leaf.test,O=Cryptoplus Test");
    assert_eq!(issuer.to_rfc2253().unwrap(), "CN=Test CA,O=Cryptoplus Test");
    assert_eq!(issuer.entry_count(), 2);
}

#[test]
fn test_subject_view_aliasing() {
    let cert = Certificate::from_certificate_bytes(TEST_LEAF, None).unwrap();
    let a = cert.subject().unwrap();
    let b = cert.subject().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.as_ptr(), b.as_ptr());
    let copy = cert.clone();
    assert_eq!(copy.subject().unwrap(), a);
}

#[test]
fn test_subject_view_mutates_parent() {
    let mut cert = Certificate::new().unwrap();
    let copy = cert.clone();
    let mut subject = cert.subject_mut().unwrap();
    assert_eq!(subject.entry_count(), 0);
    subject.add_entry_by_text("CN", "mutated.test").unwrap();
    drop(subject);
    assert_eq!(cert.subject().unwrap().entry_count(), 1);
    assert_eq!(cert.subject().unwrap().to_rfc2253().unwrap(), "CN=mutated.test");
    assert_eq!(copy.subject().unwrap().to_rfc2253().unwrap(), "CN=mutated.test");
    assert_eq!(cert.issuer().unwrap().entry_count(), 0);
}

#[test]
fn test_issuer_view_mutates_parent() {
    let mut cert = Certificate::new().unwrap();
    let mut issuer = cert.issuer_mut().unwrap();
    issuer.add_entry_by_text("O", "Cryptoplus Test").unwrap();
    issuer.add_entry_by_text("CN", "Test CA").unwrap();
    let address = issuer.as_ptr();
    drop(issuer);
    let issuer = cert.issuer().unwrap();
    assert_eq!(issuer.as_ptr(), address);
    assert_eq!(issuer.to_rfc2253().unwrap(), "CN=Test CA,O=Cryptoplus Test");
}

#[test]
fn test_public_key_outlives_certificate() {
    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    let copy = cert.clone();
    let pkey = cert.public_key().unwrap();
    drop(cert);
    drop(copy);
    let pem = pkey.to_public_key_pem().unwrap();
    assert!(pem.starts_with(b"-----BEGIN PUBLIC KEY-----"));
    #[cfg(feature = "rsa")]
    assert_eq!(pkey.rsa_key().unwrap().bits(), Some(2048));
}

#[test]
fn test_public_key_of_empty_certificate() {
    let cert = Certificate::new().unwrap();
    let e = cert.public_key().unwrap_err();
    assert!(e.is_cryptographic());
}

#[test]
fn test_shared_across_threads() {
    let cert = Certificate::from_certificate_bytes(TEST_SELF_SIGNED, None).unwrap();
    let addr = cert.as_ptr() as usize;
    let threads: Vec<_> = (0..4)
        .map(|_| {
            let cert = cert.clone();
            std::thread::spawn(move || cert.as_ptr() as usize)
        })
        .collect();
    for t in threads {
        assert_eq!(t.join().unwrap(), addr);
    }
}
