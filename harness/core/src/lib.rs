// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Core of the checkfiles validation harness.
//!
//! - `domain`: file metadata, check jobs, validator planning, fastq
//!   read-name signatures, audit policies, configuration.
//! - `application`: the per-file check pipeline, result reporting, the
//!   polling loop, and the auxiliary audits.
//! - `infrastructure`: checksum streaming, external tool invocation,
//!   Slack notification, report sinks, cloud deployment.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
