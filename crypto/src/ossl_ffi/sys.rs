// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Raw OpenSSL declarations.
//!
//! Everything `openssl-sys` binds is taken from there. Only the handful of
//! exported libcrypto symbols and constants it lacks are declared below.

#![allow(non_camel_case_types, non_snake_case)]

use core::ffi::{c_int, c_uchar, c_ulong, c_void};

pub use openssl_sys::{BIGNUM, BIO, BIO_METHOD, BN_CTX, BN_GENCB, BN_ULONG, EVP_PKEY, RSA, X509, X509_NAME};

pub use openssl_sys::{
    BIO_FLAGS_SHOULD_RETRY, BIO_free_all, BIO_get_mem_data, BIO_new, BIO_new_mem_buf, BIO_read, BIO_s_file,
    BIO_s_mem, BIO_write,
};
pub use openssl_sys::{BN_CTX_free, BN_CTX_new, BN_free, BN_new, BN_num_bits, BN_set_word};
pub use openssl_sys::{
    ERR_GET_LIB, ERR_GET_REASON, ERR_LIB_ASN1, ERR_LIB_PEM, ERR_LIB_SYS, ERR_clear_error, ERR_get_error,
    ERR_lib_error_string, ERR_reason_error_string,
};
pub use openssl_sys::{
    EVP_PKEY_free, EVP_PKEY_get1_RSA, EVP_PKEY_new, EVP_PKEY_set1_RSA, EVP_aes_256_cbc, PEM_read_bio_PUBKEY, PEM_write_bio_X509,
    PEM_write_bio_PUBKEY,
};
pub use openssl_sys::{
    PEM_read_bio_RSAPrivateKey, PEM_read_bio_RSAPublicKey, PEM_write_bio_RSAPrivateKey, PEM_write_bio_RSAPublicKey,
    RSA_check_key, RSA_free, RSA_generate_key_ex, RSA_get0_key, RSA_new,
};
pub use openssl_sys::{MBSTRING_UTF8, X509_NAME_add_entry_by_txt, X509_NAME_cmp, X509_NAME_entry_count};
pub use openssl_sys::{
    X509_alias_get0, X509_free, X509_get_issuer_name, X509_get_pubkey, X509_get_subject_name, X509_new, d2i_X509,
    i2d_X509, pem_password_cb,
};

pub type bn_gencb_cb = Option<unsafe extern "C" fn(p: c_int, n: c_int, cb: *mut BN_GENCB) -> c_int>;

// Library codes from err.h, as far as not provided by openssl-sys.
pub const ERR_LIB_NONE: c_int = 1;
pub const ERR_LIB_BN: c_int = 3;
pub const ERR_LIB_RSA: c_int = 4;
pub const ERR_LIB_EVP: c_int = 6;
pub const ERR_LIB_BUF: c_int = 7;
pub const ERR_LIB_OBJ: c_int = 8;
pub const ERR_LIB_X509: c_int = 11;
pub const ERR_LIB_CRYPTO: c_int = 15;
pub const ERR_LIB_BIO: c_int = 32;
pub const ERR_LIB_X509V3: c_int = 34;
pub const ERR_LIB_RAND: c_int = 36;
pub const ERR_LIB_OSSL_DECODER: c_int = 60;

// ASN1_STRFLGS_RFC2253 | XN_FLAG_SEP_COMMA_PLUS | XN_FLAG_DN_REV | XN_FLAG_FN_SN | XN_FLAG_DUMP_UNKNOWN_FIELDS
pub const XN_FLAG_RFC2253: c_ulong = 0x0111_0317;

unsafe extern "C" {
    pub fn BIO_test_flags(b: *const BIO, flags: c_int) -> c_int;

    pub fn BN_GENCB_new() -> *mut BN_GENCB;
    pub fn BN_GENCB_free(cb: *mut BN_GENCB);
    pub fn BN_GENCB_set(gencb: *mut BN_GENCB, callback: bn_gencb_cb, cb_arg: *mut c_void);
    pub fn BN_GENCB_get_arg(cb: *mut BN_GENCB) -> *mut c_void;

    pub fn RSA_blinding_on(rsa: *mut RSA, ctx: *mut BN_CTX) -> c_int;
    pub fn RSA_blinding_off(rsa: *mut RSA);

    pub fn X509_alias_set1(x: *mut X509, name: *const c_uchar, len: c_int) -> c_int;
    pub fn PEM_read_bio_X509_AUX(bp: *mut BIO, x: *mut *mut X509, cb: pem_password_cb, u: *mut c_void) -> *mut X509;
    pub fn PEM_write_bio_X509_AUX(bp: *mut BIO, x: *const X509) -> c_int;

    pub fn X509_NAME_print_ex(out: *mut BIO, nm: *const X509_NAME, indent: c_int, flags: c_ulong) -> c_int;
}

/// `BIO_should_retry()`
pub unsafe fn BIO_should_retry(b: *const BIO) -> bool {
    unsafe { BIO_test_flags(b, BIO_FLAGS_SHOULD_RETRY) != 0 }
}

#[test]
fn test_bio_should_retry() {
    super::init();
    let bio = unsafe { BIO_new(BIO_s_mem()) };
    assert!(!bio.is_null());
    let mut buf = [0u8; 1];
    let r = unsafe { BIO_read(bio, buf.as_mut_ptr() as *mut c_void, 1) };
    assert!(r < 0);
    assert!(unsafe { BIO_should_retry(bio) });
    unsafe { BIO_free_all(bio) };
}
