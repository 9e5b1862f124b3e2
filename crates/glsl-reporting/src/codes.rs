//! Diagnostic code taxonomy (`spec.md` §6.4), carried over one-to-one from
//! `original_source/src/gl/frontend/compiler.h`'s `CompileError` enum.
//!
//! Codes are grouped the same way the original groups them: internal (`I`),
//! preprocessor (`P`), lexical/parser (`L`), semantic (`S`), implementation
//! limits (`X`), and warnings (`W`). There is no `S0036`; the original skips
//! that number and this enum preserves the gap for fidelity with emitted
//! diagnostics anyone has already seen in the wild.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum DiagnosticCode {
    I0000,
    I0001,

    P0001,
    P0002,
    P0003,
    P0004,
    P0005,
    P0006,
    P0007,
    P0008,
    P0009,
    P0010,
    P0011,
    P0012,
    P0013,

    L0001,
    L0002,
    L0003,

    S0001,
    S0002,
    S0003,
    S0004,
    S0005,
    S0006,
    S0007,
    S0008,
    S0009,
    S0010,
    S0011,
    S0012,
    S0013,
    S0014,
    S0015,
    S0016,
    S0017,
    S0018,
    S0019,
    S0020,
    S0021,
    S0022,
    S0023,
    S0024,
    S0025,
    S0026,
    S0027,
    S0028,
    S0029,
    S0030,
    S0031,
    S0032,
    S0033,
    S0034,
    S0035,
    S0037,
    S0038,
    S0039,
    S0040,
    S0041,
    S0042,
    S0043,
    S0044,
    S0045,
    S0046,
    S0047,
    S0048,
    S0049,
    S0050,
    S0051,
    S0052,
    S0053,
    S0054,
    S0055,
    S0100,

    X0001,
    X0002,
    X0003,
    X0004,
    X0005,
    X0006,
    X0007,
    X0008,
    X0009,

    W0001,
    W0002,
}

impl DiagnosticCode {
    /// The fixed code string, e.g. `"S0055"`.
    pub fn as_str(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            I0000 => "I0000",
            I0001 => "I0001",
            P0001 => "P0001",
            P0002 => "P0002",
            P0003 => "P0003",
            P0004 => "P0004",
            P0005 => "P0005",
            P0006 => "P0006",
            P0007 => "P0007",
            P0008 => "P0008",
            P0009 => "P0009",
            P0010 => "P0010",
            P0011 => "P0011",
            P0012 => "P0012",
            P0013 => "P0013",
            L0001 => "L0001",
            L0002 => "L0002",
            L0003 => "L0003",
            S0001 => "S0001",
            S0002 => "S0002",
            S0003 => "S0003",
            S0004 => "S0004",
            S0005 => "S0005",
            S0006 => "S0006",
            S0007 => "S0007",
            S0008 => "S0008",
            S0009 => "S0009",
            S0010 => "S0010",
            S0011 => "S0011",
            S0012 => "S0012",
            S0013 => "S0013",
            S0014 => "S0014",
            S0015 => "S0015",
            S0016 => "S0016",
            S0017 => "S0017",
            S0018 => "S0018",
            S0019 => "S0019",
            S0020 => "S0020",
            S0021 => "S0021",
            S0022 => "S0022",
            S0023 => "S0023",
            S0024 => "S0024",
            S0025 => "S0025",
            S0026 => "S0026",
            S0027 => "S0027",
            S0028 => "S0028",
            S0029 => "S0029",
            S0030 => "S0030",
            S0031 => "S0031",
            S0032 => "S0032",
            S0033 => "S0033",
            S0034 => "S0034",
            S0035 => "S0035",
            S0037 => "S0037",
            S0038 => "S0038",
            S0039 => "S0039",
            S0040 => "S0040",
            S0041 => "S0041",
            S0042 => "S0042",
            S0043 => "S0043",
            S0044 => "S0044",
            S0045 => "S0045",
            S0046 => "S0046",
            S0047 => "S0047",
            S0048 => "S0048",
            S0049 => "S0049",
            S0050 => "S0050",
            S0051 => "S0051",
            S0052 => "S0052",
            S0053 => "S0053",
            S0054 => "S0054",
            S0055 => "S0055",
            S0100 => "S0100",
            X0001 => "X0001",
            X0002 => "X0002",
            X0003 => "X0003",
            X0004 => "X0004",
            X0005 => "X0005",
            X0006 => "X0006",
            X0007 => "X0007",
            X0008 => "X0008",
            X0009 => "X0009",
            W0001 => "W0001",
            W0002 => "W0002",
        }
    }

    /// The fixed single-line message text associated with the code
    /// (`spec.md` §6.4). `S0055`/`S0100` additionally append the offending
    /// symbol name at the call site; `P0002` additionally appends the
    /// caller-provided `#error` text.
    pub fn message(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            I0000 => "internal compiler error",
            I0001 => "out of memory",
            P0001 => "preprocessor syntax error",
            P0002 => "#error directive",
            P0003 => "extension is not supported or `all` was specified with `enable`/`require`",
            P0004 => "high precision is not supported on this target",
            P0005 => "#version must be the first directive in a program",
            P0006 => "#line has the wrong number of parameters",
            P0007 => "unsupported shading language version",
            P0008 => "extension directives must be specified before any non-preprocessor token",
            P0009 => "duplicate macro definition",
            P0010 => "too many parameters for macro definition",
            P0011 => "maximum nesting depth of conditionals exceeded",
            P0012 => "maximum nesting depth of macro expansion exceeded",
            P0013 => "floating point arithmetic is not allowed in preprocessor expressions",
            L0001 => "syntax error",
            L0002 => "undefined identifier",
            L0003 => "use of reserved keyword",
            S0001 => "type mismatch in expression",
            S0002 => "array size parameter must be an integer",
            S0003 => "if condition must be a bool",
            S0004 => "operator not supported for operand types",
            S0005 => "?: condition must be a bool",
            S0006 => "2nd and 3rd operands of ?: must have the same type",
            S0007 => "wrong arguments for constructor",
            S0008 => "argument unused in constructor",
            S0009 => "too few arguments for constructor",
            S0010 => "cannot construct matrices from matrices",
            S0011 => "arguments in wrong order for struct constructor",
            S0012 => "expression must be a constant expression",
            S0013 => "initializer for const value must be a constant expression",
            S0014 => "initializer for global variable must be a constant expression",
            S0015 => "expression must be an integral constant expression",
            S0016 => "non-constant index used to access unsized array",
            S0017 => "array size must be greater than zero",
            S0018 => "use of an array as an actual parameter before its size has been declared",
            S0019 => "indexing an array with a non-constant expression before its size has been declared",
            S0020 => "indexing an array with a constant expression greater than its declared size",
            S0021 => "indexing an array with a negative constant expression",
            S0022 => "redefinition of variable in same scope",
            S0023 => "redefinition of function in same scope",
            S0024 => "redefinition of name in same scope",
            S0025 => "field selectors must be from the same set (xyzw, rgba, stpq)",
            S0026 => "illegal field selector",
            S0027 => "target of assignment is not an lvalue",
            S0028 => "precision qualifier used with a type other than int, float or sampler",
            S0029 => "main function declared with the wrong signature or return type",
            S0030 => "vertex shader does not compute gl_Position",
            S0031 => "const variable does not have an initializer",
            S0032 => "use of float or int without a precision qualifier where the default precision is not defined",
            S0033 => "expression without an intrinsic precision where the default precision is not defined",
            S0034 => "only output variables can be declared invariant",
            S0035 => "all uses of invariant must be at global scope",
            S0037 => "l-value contains duplicate components",
            S0038 => "function declared with a return value but return statement has no argument",
            S0039 => "function declared void but return statement has an argument",
            S0040 => "function declared with a return value but not all paths return a value",
            S0041 => "function return type cannot be an array",
            S0042 => "return type of function definition must match the declared return type",
            S0043 => "parameter qualifiers of function definition must match function declaration",
            S0044 => "declaring an attribute outside of a vertex shader",
            S0045 => "declaring an attribute inside a function",
            S0046 => "declaring a uniform inside a function",
            S0047 => "declaring a varying inside a function",
            S0048 => "illegal data type for varying",
            S0049 => "illegal data type for attribute",
            S0050 => "attribute declarations cannot have an initializer",
            S0051 => "varying declarations cannot have an initializer",
            S0052 => "uniform declarations cannot have an initializer",
            S0053 => "invalid type for conditional expression",
            S0054 => "type mismatch for conditional expression",
            S0055 => "recursive function calls are not allowed",
            S0100 => "incomplete shader source: function declared but never defined",
            X0001 => "`while` and `do`-`while` loops are not supported",
            X0002 => "`continue` is only supported within a bounded `for` loop",
            X0003 => "loop index can be incremented or decremented only once",
            X0004 => "loop index must be of type int or float",
            X0005 => "dynamic indexing of vectors and matrices is not supported",
            X0006 => "loop index variable must be initialized with a constant expression",
            X0007 => "loop index variable must be incremented by a compile-time constant amount",
            X0008 => "loop must have a statically computable, strictly positive trip count",
            X0009 => "maximum function call nesting depth exceeded",
            W0001 => "potentially unreachable statement",
            W0002 => "function is not guaranteed to return a value on every path",
        }
    }

    /// `S0030` is semantic-family by numbering but raised through
    /// `Lowerer::warn`, not `Lowerer::error` — a vertex shader that never
    /// writes `gl_Position` still produces usable (if meaningless) IL, so
    /// it does not abort compilation the way every other `S`-family code
    /// does (`DESIGN.md`).
    pub fn is_warning(self) -> bool {
        matches!(self, DiagnosticCode::W0001 | DiagnosticCode::W0002 | DiagnosticCode::S0030)
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
