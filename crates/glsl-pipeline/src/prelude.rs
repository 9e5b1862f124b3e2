//! Built-in prelude text (`spec.md` §6.3): prepended to user source before
//! tokenizing. `gl_*` built-in *variables* are not declared here — they are
//! registered directly into the symbol table by
//! `glsl_lower::decl::register_builtins` before parsing even starts (see
//! `DESIGN.md`), so only the first two of the spec's four prelude pieces
//! are real GLSL text: default precisions, then common function/vector
//! helpers. Everything here is ordinary source, parsed and lowered exactly
//! like anything the caller writes.

use glsl_lower::ShaderKind;

/// Default precision statements for `kind`. Fragment shaders get no
/// default `float` precision (`spec.md` §6.3 item 1; `original_source`'s
/// `symbols.c` leaves `defaultFltPrec` undefined at the global scope and
/// relies on exactly this kind of prelude declaration to fill it in for
/// vertex shaders, and on `S0032` to catch unqualified float use in
/// fragment shaders that never declare one themselves).
fn precision_prelude(kind: ShaderKind) -> &'static str {
    match kind {
        ShaderKind::Vertex => {
            "precision highp float;\n\
             precision highp int;\n\
             precision lowp sampler2D;\n\
             precision lowp sampler3D;\n\
             precision lowp samplerCube;\n"
        }
        ShaderKind::Fragment => {
            "precision mediump int;\n\
             precision lowp sampler2D;\n\
             precision lowp sampler3D;\n\
             precision lowp samplerCube;\n"
        }
    }
}

/// Common built-in function declarations (`spec.md` §6.3 item 2): the
/// handful of GLSL ES 1.00 math and vector built-ins implemented as real
/// GLSL bodies over `__asmOP` intrinsics, grounded in the ARB-style
/// opcodes `original_source/src/gl/frontend/il.h` defines. Not the whole
/// built-in function library — `smoothstep`, the `Lod`/`Proj` texture
/// variants, and the matrix inverse/transpose functions are not declared
/// (documented gap, `DESIGN.md`); `texture2D`/`textureCube` are not
/// declared as GLSL at all, since they lower through a dedicated path in
/// `glsl_lower::expr` that reads the sampler symbol directly rather than
/// through a fetched register.
const COMMON_BUILTINS: &str = "\
float abs(float x) { return __asmABS(x); }
vec2 abs(vec2 x) { return __asmABS(x); }
vec3 abs(vec3 x) { return __asmABS(x); }
vec4 abs(vec4 x) { return __asmABS(x); }

float sign(float x) { return __asmSSG(x); }
vec2 sign(vec2 x) { return __asmSSG(x); }
vec3 sign(vec3 x) { return __asmSSG(x); }
vec4 sign(vec4 x) { return __asmSSG(x); }

float floor(float x) { return __asmFLR(x); }
vec2 floor(vec2 x) { return __asmFLR(x); }
vec3 floor(vec3 x) { return __asmFLR(x); }
vec4 floor(vec4 x) { return __asmFLR(x); }

float fract(float x) { return __asmFRC(x); }
vec2 fract(vec2 x) { return __asmFRC(x); }
vec3 fract(vec3 x) { return __asmFRC(x); }
vec4 fract(vec4 x) { return __asmFRC(x); }

float min(float a, float b) { return __asmMIN(a, b); }
vec2 min(vec2 a, vec2 b) { return __asmMIN(a, b); }
vec3 min(vec3 a, vec3 b) { return __asmMIN(a, b); }
vec4 min(vec4 a, vec4 b) { return __asmMIN(a, b); }

float max(float a, float b) { return __asmMAX(a, b); }
vec2 max(vec2 a, vec2 b) { return __asmMAX(a, b); }
vec3 max(vec3 a, vec3 b) { return __asmMAX(a, b); }
vec4 max(vec4 a, vec4 b) { return __asmMAX(a, b); }

float clamp(float x, float minVal, float maxVal) { return min(max(x, minVal), maxVal); }
vec2 clamp(vec2 x, vec2 minVal, vec2 maxVal) { return min(max(x, minVal), maxVal); }
vec3 clamp(vec3 x, vec3 minVal, vec3 maxVal) { return min(max(x, minVal), maxVal); }
vec4 clamp(vec4 x, vec4 minVal, vec4 maxVal) { return min(max(x, minVal), maxVal); }

float mix(float x, float y, float a) { return __asmLRP(a, y, x); }
vec2 mix(vec2 x, vec2 y, float a) { return __asmLRP(vec2(a, a), y, x); }
vec3 mix(vec3 x, vec3 y, float a) { return __asmLRP(vec3(a, a, a), y, x); }
vec4 mix(vec4 x, vec4 y, float a) { return __asmLRP(vec4(a, a, a, a), y, x); }

float step(float edge, float x) { return __asmSGE(x, edge); }
vec2 step(vec2 edge, vec2 x) { return __asmSGE(x, edge); }
vec3 step(vec3 edge, vec3 x) { return __asmSGE(x, edge); }
vec4 step(vec4 edge, vec4 x) { return __asmSGE(x, edge); }

float pow(float x, float y) { return __asmPOW(x, y); }
float exp2(float x) { return __asmEX2(x); }
float log2(float x) { return __asmLG2(x); }
float inversesqrt(float x) { return __asmRSQ(x); }
float sqrt(float x) { return x * __asmRSQ(x); }

float dot(vec2 a, vec2 b) { return __asmDP2(a, b); }
float dot(vec3 a, vec3 b) { return __asmDP3(a, b); }
float dot(vec4 a, vec4 b) { return __asmDP4(a, b); }

vec3 cross(vec3 a, vec3 b) { return __asmXPD(a, b); }

float length(vec2 v) { return sqrt(dot(v, v)); }
float length(vec3 v) { return sqrt(dot(v, v)); }
float length(vec4 v) { return sqrt(dot(v, v)); }

float distance(vec2 a, vec2 b) { return length(a - b); }
float distance(vec3 a, vec3 b) { return length(a - b); }
float distance(vec4 a, vec4 b) { return length(a - b); }

vec2 normalize(vec2 v) { return v * inversesqrt(dot(v, v)); }
vec3 normalize(vec3 v) { return v * inversesqrt(dot(v, v)); }
vec4 normalize(vec4 v) { return v * inversesqrt(dot(v, v)); }

vec3 reflect(vec3 i, vec3 n) { return i - 2.0 * dot(n, i) * n; }
";

/// Full prelude for `kind`: precision defaults followed by the common
/// built-in declarations, in the order `spec.md` §6.3 lists them.
pub fn text(kind: ShaderKind) -> String {
    let mut out = String::with_capacity(precision_prelude(kind).len() + COMMON_BUILTINS.len());
    out.push_str(precision_prelude(kind));
    out.push_str(COMMON_BUILTINS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_prelude_has_no_default_float_precision() {
        let text = precision_prelude(ShaderKind::Fragment);
        assert!(!text.contains("precision mediump float") && !text.contains("precision highp float"));
    }

    #[test]
    fn vertex_prelude_defaults_float_to_high() {
        assert!(precision_prelude(ShaderKind::Vertex).contains("precision highp float;"));
    }
}
