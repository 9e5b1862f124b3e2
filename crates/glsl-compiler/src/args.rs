//! CLI argument parsing, grounded in `hash/src/args.rs`'s modern
//! `clap::Parser`-derived `CompilerOptions`/`SubCmd`: a flat option struct
//! for an ordinary full build, plus a subcommand per early pipeline exit
//! (`tokenize`, `ast-gen`, `ir-gen`), each converted into a
//! [`glsl_pipeline::CompilerSettings`] via `TryFrom`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use glsl_pipeline::{ArgumentError, CompilerSettings, OptimisationLevel, PipelineStage};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OptLevelArg {
    Debug,
    Release,
    Size,
}

impl From<OptLevelArg> for OptimisationLevel {
    fn from(level: OptLevelArg) -> Self {
        match level {
            OptLevelArg::Debug => OptimisationLevel::Debug,
            OptLevelArg::Release => OptimisationLevel::Release,
            OptLevelArg::Size => OptimisationLevel::Size,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ShaderKindArg {
    Vertex,
    Fragment,
}

impl From<ShaderKindArg> for glsl_pipeline::ShaderKind {
    fn from(kind: ShaderKindArg) -> Self {
        match kind {
            ShaderKindArg::Vertex => glsl_pipeline::ShaderKind::Vertex,
            ShaderKindArg::Fragment => glsl_pipeline::ShaderKind::Fragment,
        }
    }
}

/// Mirrors `hash::args::CompilerOptions`: top-level flags for an ordinary
/// run, plus an optional subcommand that stops the pipeline early.
#[derive(Parser, Debug)]
#[command(
    name = "glsl-compiler",
    version,
    author = "Hash Language Authors",
    about = "Compile GLSL ES 2.0 shaders to ARB-style intermediate language",
    disable_colored_help = true
)]
pub struct CompilerOptions {
    /// Shader source file to compile
    pub filename: Option<String>,

    /// Vertex or fragment; inferred from the file extension
    /// (`.vert`/`.frag`) when omitted.
    #[arg(long, value_enum)]
    pub kind: Option<ShaderKindArg>,

    /// Run the compiler in debug mode (stage timings, block counts logged
    /// at `debug` level).
    #[arg(long)]
    pub debug: bool,

    /// The optimisation level the compiler should run at.
    #[arg(long, value_enum, default_value = "debug")]
    pub optimisation_level: OptLevelArg,

    /// Skip prepending the built-in prelude (used to compile the prelude
    /// itself in isolation).
    #[arg(long)]
    pub skip_prelude: bool,

    #[command(subcommand)]
    pub mode: Option<SubCmd>,
}

#[derive(Subcommand, Debug)]
pub enum SubCmd {
    /// Stop after tokenizing and report lexical diagnostics only
    Tokenize(StageArgs),
    /// Stop after parsing and report syntax diagnostics only
    AstGen(StageArgs),
    /// Run the full pipeline, same as no subcommand, but explicit
    IrGen(StageArgs),
}

#[derive(Args, Debug)]
pub struct StageArgs {
    #[arg(required = true)]
    pub filename: String,

    #[arg(long, value_enum)]
    pub kind: Option<ShaderKindArg>,
}

impl CompilerOptions {
    /// Resolves the settings and the file to compile for this invocation,
    /// whichever of the flat options or a subcommand was used.
    pub fn resolve(&self) -> Result<(CompilerSettings, String, Option<ShaderKindArg>), ArgumentError> {
        let mut settings = CompilerSettings::new();
        settings.set_debug(self.debug);
        settings.set_optimisation_level(self.optimisation_level.into());
        settings.set_skip_prelude(self.skip_prelude);

        if let Some(mode) = &self.mode {
            let (stage, args) = match mode {
                SubCmd::Tokenize(a) => (PipelineStage::Tokenize, a),
                SubCmd::AstGen(a) => (PipelineStage::AstGen, a),
                SubCmd::IrGen(a) => (PipelineStage::IrGen, a),
            };
            settings.set_stage(stage);
            return Ok((settings, args.filename.clone(), args.kind));
        }

        let filename = self.filename.clone().ok_or(ArgumentError::MissingInputFile)?;
        Ok((settings, filename, self.kind))
    }
}

/// Infers the shader kind from a `.vert`/`.frag` extension when the CLI
/// didn't specify one explicitly.
pub fn infer_kind(explicit: Option<ShaderKindArg>, filename: &str) -> Result<glsl_pipeline::ShaderKind, ArgumentError> {
    if let Some(kind) = explicit {
        return Ok(kind.into());
    }
    if filename.ends_with(".vert") {
        return Ok(glsl_pipeline::ShaderKind::Vertex);
    }
    if filename.ends_with(".frag") {
        return Ok(glsl_pipeline::ShaderKind::Fragment);
    }
    Err(ArgumentError::InvalidValue("kind".into(), filename.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_vertex_kind_from_extension() {
        assert_eq!(infer_kind(None, "shader.vert").unwrap(), glsl_pipeline::ShaderKind::Vertex);
    }

    #[test]
    fn infers_fragment_kind_from_extension() {
        assert_eq!(infer_kind(None, "shader.frag").unwrap(), glsl_pipeline::ShaderKind::Fragment);
    }

    #[test]
    fn explicit_kind_overrides_extension() {
        let kind = infer_kind(Some(ShaderKindArg::Fragment), "shader.vert").unwrap();
        assert_eq!(kind, glsl_pipeline::ShaderKind::Fragment);
    }

    #[test]
    fn unrecognised_extension_is_an_error() {
        assert!(infer_kind(None, "shader.glsl").is_err());
    }

    #[test]
    fn resolve_without_subcommand_requires_a_filename() {
        let opts = CompilerOptions {
            filename: None,
            kind: None,
            debug: false,
            optimisation_level: OptLevelArg::Debug,
            skip_prelude: false,
            mode: None,
        };
        assert!(matches!(opts.resolve(), Err(ArgumentError::MissingInputFile)));
    }

    #[test]
    fn resolve_with_flat_filename_defaults_to_ir_gen_stage() {
        let opts = CompilerOptions {
            filename: Some("a.vert".into()),
            kind: None,
            debug: false,
            optimisation_level: OptLevelArg::Release,
            skip_prelude: false,
            mode: None,
        };
        let (settings, filename, kind) = opts.resolve().unwrap();
        assert_eq!(filename, "a.vert");
        assert_eq!(kind, None);
        assert_eq!(settings.stage(), PipelineStage::IrGen);
        assert_eq!(settings.optimisation_level(), OptimisationLevel::Release);
    }

    #[test]
    fn resolve_with_tokenize_subcommand_uses_its_own_filename() {
        let opts = CompilerOptions {
            filename: None,
            kind: None,
            debug: false,
            optimisation_level: OptLevelArg::Debug,
            skip_prelude: false,
            mode: Some(SubCmd::Tokenize(StageArgs { filename: "b.frag".into(), kind: Some(ShaderKindArg::Fragment) })),
        };
        let (settings, filename, kind) = opts.resolve().unwrap();
        assert_eq!(filename, "b.frag");
        assert_eq!(kind, Some(ShaderKindArg::Fragment));
        assert_eq!(settings.stage(), PipelineStage::Tokenize);
    }
}
