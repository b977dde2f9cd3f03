// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! OpenSSL FFI glue shared by all wrappers.

pub(crate) mod callback;
pub(crate) mod error;
pub(crate) mod sys;

/// Initialize the library once per process.
///
/// Cheap after the first call.
pub(crate) fn init() {
    openssl_sys::init();
}
