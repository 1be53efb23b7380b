// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! External validation tools.
//!
//! `validateFiles` and `samtools` are the format authorities; this module
//! only decides arguments and interprets exit status. Output is captured
//! with stderr folded in, since both tools report problems there.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Failed(String),

    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Launcher for the external tools the pipeline sequences.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    validate_files_bin: String,
    samtools_bin: String,
}

impl ToolRunner {
    pub fn new(validate_files_bin: impl Into<String>, samtools_bin: impl Into<String>) -> Self {
        Self {
            validate_files_bin: validate_files_bin.into(),
            samtools_bin: samtools_bin.into(),
        }
    }

    /// `validateFiles <args> <path>`; combined output either way.
    pub async fn validate_files(&self, args: &[String], path: &Path) -> Result<String, ToolError> {
        let mut command = Command::new(&self.validate_files_bin);
        command.args(args).arg(path);
        run_captured(&self.validate_files_bin, command).await
    }

    /// `samtools quickcheck <path>`: cheap truncation/header sanity check.
    pub async fn samtools_quickcheck(&self, path: &Path) -> Result<String, ToolError> {
        let mut command = Command::new(&self.samtools_bin);
        command.arg("quickcheck").arg(path);
        run_captured(&self.samtools_bin, command).await
    }

    /// Full `samtools stats` output for mapped-read extraction.
    pub async fn samtools_stats(&self, path: &Path) -> Result<String, ToolError> {
        let mut command = Command::new(&self.samtools_bin);
        command.arg("stats").arg(path);
        run_captured(&self.samtools_bin, command).await
    }

    /// Run an interpreter script (the CRISPR checks) and capture stdout.
    pub async fn run_script<I, S>(&self, interpreter: &str, args: I) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(interpreter);
        command.args(args);
        run_captured(interpreter, command).await
    }
}

async fn run_captured(program: &str, mut command: Command) -> Result<String, ToolError> {
    debug!(program, "running external tool");
    command.stdin(Stdio::null());
    let output = command.output().await.map_err(|source| ToolError::Spawn {
        program: program.to_owned(),
        source,
    })?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    let combined = combined.trim_end_matches('\n').to_owned();
    if output.status.success() {
        Ok(combined)
    } else {
        Err(ToolError::Failed(combined))
    }
}

impl ToolError {
    /// The tool's own words, for error keys shown to submitters.
    pub fn output(&self) -> String {
        self.to_string()
    }
}
