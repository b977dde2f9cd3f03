// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Asymmetric keys.

mod pkey;
#[cfg(feature = "rsa")]
mod rsa_key;

pub use pkey::*;
#[cfg(feature = "rsa")]
pub use rsa_key::*;
