//! Compiler driver and public entry points (`spec.md` §5, §6): wires the
//! tokenizer, parser and lowering stages behind the `compiler_create`/
//! `compile_shader` surface a host embeds, the way `hash-pipeline::Workspace`
//! sits above `hash-parser`/`hash-lower`/`hash-codegen` without any of them
//! depending back on it.

pub mod prelude;
pub mod settings;

use glsl_reporting::ShaderLog;

pub use glsl_lower::ShaderKind;
pub use settings::{ArgumentError, CompilerSettings, OptimisationLevel, PipelineStage};

/// A shader source object (`spec.md` §6.2): kind, concatenated source, an
/// appendable log, and the IL slot the core fills on success.
pub struct Shader {
    kind: ShaderKind,
    source: String,
    log: ShaderLog,
    il: Option<String>,
}

impl Shader {
    pub fn new(kind: ShaderKind, source: impl Into<String>) -> Self {
        Self { kind, source: source.into(), log: ShaderLog::new(), il: None }
    }

    pub fn log_text(&self) -> String {
        self.log.render()
    }

    pub fn has_errors(&self) -> bool {
        self.log.has_errors()
    }

    /// The rendered IL, if the last `compile_shader` call succeeded.
    pub fn il(&self) -> Option<&str> {
        self.il.as_deref()
    }
}

/// Seam a real GL driver's own `Shader` object model would implement
/// instead of using [`Shader`] directly (`spec.md` §1's "GL driver object
/// model" Non-goal excludes building that model here, not the seam a
/// caller needs to embed this front end against its own types).
pub trait ShaderHost {
    fn kind(&self) -> ShaderKind;
    fn source(&self) -> &str;
    fn set_il(&mut self, il: String);
    fn log_mut(&mut self) -> &mut ShaderLog;
}

impl ShaderHost for Shader {
    fn kind(&self) -> ShaderKind {
        self.kind
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_il(&mut self, il: String) {
        self.il = Some(il);
    }

    fn log_mut(&mut self) -> &mut ShaderLog {
        &mut self.log
    }
}

/// Owns the pragma state a sequence of `compile_shader` calls shares
/// (`spec.md` §6.1). Not reentrant on the same value; distinct values may
/// run concurrently on distinct threads (`spec.md` §5).
pub struct Compiler {
    settings: CompilerSettings,
}

pub fn compiler_create(settings: CompilerSettings) -> Compiler {
    Compiler { settings }
}

/// No-op beyond dropping `compiler`: every per-compilation arena lives
/// inside `compile_shader`'s own locals and is already released by the
/// time it returns (`spec.md` §5's scoped-acquisition discipline), so
/// there is nothing left for an explicit destroy step to release.
pub fn compiler_destroy(compiler: Compiler) {
    drop(compiler);
}

pub fn pragma_debug(compiler: &mut Compiler, on: bool) {
    compiler.settings.set_debug(on);
}

pub fn pragma_optimize(compiler: &mut Compiler, on: bool) {
    let level = if on { OptimisationLevel::Release } else { OptimisationLevel::Debug };
    compiler.settings.set_optimisation_level(level);
}

/// Runs the full pipeline over `shader` (`spec.md` §4.9, §6.1): prepend the
/// built-in prelude, tokenize, parse, lower, then render IL text. Returns
/// `true` and fills the IL slot on success; on failure the log carries at
/// least one diagnostic and no partial IL is ever attached, matching §7's
/// "no partial IL is ever returned to the caller" contract.
pub fn compile_shader<S: ShaderHost>(compiler: &Compiler, shader: &mut S) -> bool {
    let kind = shader.kind();
    let full_source = if compiler.settings.skip_prelude() {
        shader.source().to_string()
    } else {
        format!("{}{}", prelude::text(kind), shader.source())
    };

    let mut log = ShaderLog::new();
    let tokens = glsl_lexer::tokenize(&full_source, &mut log);

    if compiler.settings.stage() == PipelineStage::Tokenize {
        *shader.log_mut() = log;
        return true;
    }

    let unit = match glsl_parser::Parser::new(&tokens, &mut log).parse_translation_unit() {
        Ok(unit) => unit,
        Err(()) => {
            *shader.log_mut() = log;
            return false;
        }
    };

    if compiler.settings.stage() == PipelineStage::AstGen {
        *shader.log_mut() = log;
        return true;
    }

    let Some((mut program, types)) = glsl_lower::decl::lower_translation_unit(kind, &unit, &mut log) else {
        *shader.log_mut() = log;
        return false;
    };

    if compiler.settings.debug() {
        log::debug!("lowered {} reachable block(s)", program.blocks().len());
    }

    let il = glsl_ir::render(&mut program, &types);
    shader.set_il(il);
    *shader.log_mut() = log;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(kind: ShaderKind, src: &str) -> Shader {
        let compiler = compiler_create(CompilerSettings::new());
        let mut shader = Shader::new(kind, src);
        compile_shader(&compiler, &mut shader);
        shader
    }

    #[test]
    fn trivial_vertex_shader_compiles() {
        let shader = compile(ShaderKind::Vertex, "void main() { gl_Position = vec4(0.0, 0.0, 0.0, 1.0); }");
        assert!(!shader.has_errors(), "{}", shader.log_text());
        assert!(shader.il().unwrap().contains("IL Output"));
    }

    #[test]
    fn trivial_fragment_shader_compiles() {
        let shader = compile(ShaderKind::Fragment, "void main() { gl_FragColor = vec4(1.0); }");
        assert!(!shader.has_errors(), "{}", shader.log_text());
    }

    #[test]
    fn fragment_shader_missing_main_fails() {
        let shader = compile(ShaderKind::Fragment, "float unused() { return 1.0; }");
        assert!(shader.has_errors());
        assert!(shader.il().is_none());
    }

    #[test]
    fn vertex_shader_not_writing_gl_position_warns_not_errors() {
        let shader = compile(ShaderKind::Vertex, "void main() { }");
        assert!(!shader.has_errors(), "{}", shader.log_text());
        assert!(shader.log_text().contains("S0030"));
    }

    #[test]
    fn prelude_math_helpers_are_reachable() {
        let shader = compile(
            ShaderKind::Fragment,
            "varying vec3 vNormal;\n\
             void main() { gl_FragColor = vec4(normalize(vNormal) * 0.5 + 0.5, 1.0); }",
        );
        assert!(!shader.has_errors(), "{}", shader.log_text());
    }

    #[test]
    fn tokenize_stage_stops_before_parsing() {
        let mut settings = CompilerSettings::new();
        settings.set_stage(PipelineStage::Tokenize);
        let compiler = compiler_create(settings);
        let mut shader = Shader::new(ShaderKind::Fragment, "this is not { valid GLSL !!");
        let ok = compile_shader(&compiler, &mut shader);
        assert!(ok);
        assert!(shader.il().is_none());
    }
}
