// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! X.509 certificates and names.

mod certificate;
mod name;

pub use certificate::*;
pub use name::*;
