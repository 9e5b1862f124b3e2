//! Compiler settings and argument parsing errors, grounded in
//! `hash-pipeline`'s `settings.rs`/`args.rs`: a small settings struct with
//! builder-style setters plus an `OptimisationLevel` enum, and a typed
//! error enum for the CLI layer that converts into a diagnostic `Report`
//! rather than a bare string.

use std::fmt;
use std::str::FromStr;

use glsl_reporting::{DiagnosticCode, Report};

/// Mirrors `hash-pipeline::settings::OptimisationLevel`: three levels, only
/// `is_release` distinguishing codegen behaviour in this front end (the IL
/// writer does not itself optimize; `spec.md` §1 scopes "optimization
/// passes beyond trivial constant folding" out entirely).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisationLevel {
    Debug,
    Release,
    Size,
}

impl OptimisationLevel {
    pub fn is_release(self) -> bool {
        matches!(self, OptimisationLevel::Release | OptimisationLevel::Size)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptimisationLevel::Debug => "debug",
            OptimisationLevel::Release => "release",
            OptimisationLevel::Size => "size",
        }
    }
}

impl Default for OptimisationLevel {
    fn default() -> Self {
        OptimisationLevel::Debug
    }
}

impl fmt::Display for OptimisationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimisationLevel {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(OptimisationLevel::Debug),
            "release" => Ok(OptimisationLevel::Release),
            "size" => Ok(OptimisationLevel::Size),
            other => Err(ArgumentError::InvalidValue("optimisation-level".into(), other.into())),
        }
    }
}

/// Which pipeline stage to stop after (`glsl-compiler`'s subcommands).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Tokenize,
    AstGen,
    IrGen,
}

/// Settings a `Compiler` is created with. Only `debug`/`optimisation_level`
/// are consulted by `compile_shader` itself (`pragma_debug`/
/// `pragma_optimize` mutate the former at runtime); `stage` and
/// `skip_prelude` exist for `glsl-compiler`'s early-exit subcommands.
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    debug: bool,
    optimisation_level: OptimisationLevel,
    skip_prelude: bool,
    stage: PipelineStage,
}

impl CompilerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn optimisation_level(&self) -> OptimisationLevel {
        self.optimisation_level
    }

    pub fn set_optimisation_level(&mut self, level: OptimisationLevel) -> &mut Self {
        self.optimisation_level = level;
        self
    }

    pub fn skip_prelude(&self) -> bool {
        self.skip_prelude
    }

    pub fn set_skip_prelude(&mut self, skip: bool) -> &mut Self {
        self.skip_prelude = skip;
        self
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn set_stage(&mut self, stage: PipelineStage) -> &mut Self {
        self.stage = stage;
        self
    }
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            debug: false,
            optimisation_level: OptimisationLevel::default(),
            skip_prelude: false,
            stage: PipelineStage::IrGen,
        }
    }
}

/// CLI-layer argument errors, mirroring `hash-pipeline::args::ArgumentError`
/// (`MissingEntryPoint`/`UnknownStage`/`InvalidValue` etc.) but converting
/// into this crate's own `glsl_reporting::Report` rather than the older
/// builder API the teacher's `args.rs` uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    MissingInputFile,
    Io(String),
    UnknownStage(String),
    InvalidValue(String, String),
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::MissingInputFile => write!(f, "no input file given"),
            ArgumentError::Io(msg) => write!(f, "could not read input: {msg}"),
            ArgumentError::UnknownStage(stage) => write!(f, "unknown pipeline stage `{stage}`"),
            ArgumentError::InvalidValue(key, value) => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl std::error::Error for ArgumentError {}

impl From<ArgumentError> for Report {
    fn from(err: ArgumentError) -> Self {
        Report::new(DiagnosticCode::I0000, 0).with_detail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimisation_level_round_trips_through_display() {
        for level in [OptimisationLevel::Debug, OptimisationLevel::Release, OptimisationLevel::Size] {
            assert_eq!(level.as_str().parse::<OptimisationLevel>().unwrap(), level);
        }
    }

    #[test]
    fn unknown_optimisation_level_is_an_error() {
        assert!("turbo".parse::<OptimisationLevel>().is_err());
    }

    #[test]
    fn default_settings_stop_after_ir_gen() {
        assert_eq!(CompilerSettings::new().stage(), PipelineStage::IrGen);
    }
}
