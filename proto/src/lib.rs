// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Wire messages and gRPC stubs for the BootZ bootstrap protocol.
//!
//! The module below is committed in generated style so the workspace builds
//! without a protoc toolchain. Field tags are wire contract and must never be
//! renumbered across versions.

pub mod bootz;

pub use bootz::{
    control_card_state, report_status_request, BootConfig, BootstrapDataResponse,
    BootstrapDataSigned, ChassisDescriptor, ControlCard, ControlCardState, Credentials,
    EmptyResponse, GetBootstrapDataRequest, GetBootstrapDataResponse, ReportStatusRequest,
    SoftwareImage,
};
