//! CLI-level error reporting, grounded in `hash/src/error.rs`'s
//! `ErrorType`/`report_error`: a small enum distinguishing the ways the
//! driver itself (not the shader compiler) can fail, printed and turned
//! into a process exit code.

use std::fmt;
use std::process::exit;

use glsl_pipeline::ArgumentError;

#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Argument(ArgumentError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(err) => write!(f, "failed to read input: {err}"),
            CliError::Argument(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<ArgumentError> for CliError {
    fn from(err: ArgumentError) -> Self {
        CliError::Argument(err)
    }
}

impl CliError {
    pub fn report_and_exit(self) -> ! {
        eprintln!("\x1b[31m\x1b[1merror\x1b[0m: {self}");
        exit(1)
    }
}
