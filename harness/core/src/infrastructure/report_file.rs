// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Report sinks.
//!
//! Every run writes two line streams: all rows to `out`, error rows to
//! `err`. Lines are flushed as written so a crashed run still leaves a
//! usable log, and file-backed sinks remember their path so the finished
//! reports can be attached to the chat notification.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

enum Sink {
    Stdout,
    Stderr,
    File(File),
}

pub struct ReportSink {
    sink: Sink,
    path: Option<PathBuf>,
}

impl ReportSink {
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout,
            path: None,
        }
    }

    pub fn stderr() -> Self {
        Self {
            sink: Sink::Stderr,
            path: None,
        }
    }

    pub fn file(path: &Path) -> io::Result<Self> {
        Ok(Self {
            sink: Sink::File(File::create(path)?),
            path: Some(path.to_owned()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")?;
                out.flush()
            }
            Sink::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.write_all(b"\n")?;
                err.flush()
            }
            Sink::File(file) => {
                file.write_all(line.as_bytes())?;
                file.write_all(b"\n")?;
                file.flush()
            }
        }
    }
}

/// The out/err pair for one run.
pub struct RunReports {
    pub out: ReportSink,
    pub err: ReportSink,
}

impl RunReports {
    pub fn from_paths(out: Option<&Path>, err: Option<&Path>) -> io::Result<Self> {
        Ok(Self {
            out: match out {
                Some(path) => ReportSink::file(path)?,
                None => ReportSink::stdout(),
            },
            err: match err {
                Some(path) => ReportSink::file(path)?,
                None => ReportSink::stderr(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_remembers_path_and_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut sink = ReportSink::file(&path).unwrap();
        sink.write_line("first").unwrap();
        sink.write_line("second").unwrap();
        assert_eq!(sink.path(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn stdout_sink_has_no_path() {
        assert!(ReportSink::stdout().path().is_none());
    }
}
