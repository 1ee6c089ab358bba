// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Client side of the BootZ zero-touch bootstrap protocol: the artifact
//! validator that establishes the server's ownership of the device, and the
//! TLS channel plumbing for the emulated device binary.

pub mod tls;
pub mod validator;

pub use validator::{validate_artifacts, OwnershipVoucher, ValidationError};
