// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client SDK for the metadata portal.
//!
//! The portal is the coordination center's metadata service: files,
//! experiments, and their audit state live there as JSON objects addressed
//! by `@id` paths. This crate wraps the handful of endpoints the harness
//! needs (authenticated search, edit frames with etags, upload
//! credentials, conflict queries, `If-Match` guarded PATCH) behind a
//! typed client.

mod client;
mod types;

pub use client::{PortalClient, PortalError};
pub use types::{
    AwardRecord, EditFrame, ExperimentRecord, FileRecord, FlowcellDetail, Md5FileFields,
    ReadNameDetails, ReplicateRecord, UploadCredentials,
};
