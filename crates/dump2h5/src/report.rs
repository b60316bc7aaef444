//! Reporting fatal errors to the user.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

/// Formats diagnostics as `<program>: <message>` for the top-level run.
#[derive(Debug, Clone)]
pub struct Reporter {
    program: String,
}

impl Reporter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program name from `argv[0]`, without directories.
    pub fn from_argv0(argv0: Option<&str>) -> Self {
        let name = argv0
            .and_then(|a| Path::new(a).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        Self::new(name)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self, error: &dyn Display) -> String {
        format!("{}: {error}", self.program)
    }

    /// Print `error` to `out` and return the failure exit code.
    pub fn fail_to(&self, out: &mut dyn Write, error: &dyn Display) -> ExitCode {
        // Nothing sensible remains if stderr itself is gone.
        let _ = writeln!(out, "{}", self.format(error));
        ExitCode::FAILURE
    }

    /// Print `error` to stderr and return the failure exit code.
    pub fn fail(&self, error: &dyn Display) -> ExitCode {
        self.fail_to(&mut io::stderr().lock(), error)
    }
}
