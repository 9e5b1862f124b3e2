//! Tokenizer and preprocessor (`spec.md` §4.5): a hand-rolled character
//! scanner (`scanner.rs`) feeding a macro-expanding, conditional-aware
//! preprocessor (`preprocessor.rs`) that yields the flat [`Token`] stream
//! the parser consumes.

pub mod preprocessor;
pub mod scanner;
pub mod token;

pub use preprocessor::{Preprocessor, PragmaState};
pub use scanner::Scanner;
pub use token::{Keyword, Operator, Token, TokenKind};

use glsl_reporting::ShaderLog;

/// Runs the full pipeline over `src` and collects every token up to and
/// including `Eof`. Convenience wrapper around [`Preprocessor::next_token`]
/// for callers (parser, tests) that want a materialized stream.
pub fn tokenize(src: &str, log: &mut ShaderLog) -> Vec<Token> {
    let mut pp = Preprocessor::new(src);
    let mut out = Vec::new();
    loop {
        let t = pp.next_token(log);
        let is_eof = matches!(t.kind, TokenKind::Eof);
        out.push(t);
        if is_eof {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> (Vec<TokenKind>, ShaderLog) {
        let mut log = ShaderLog::new();
        let toks = tokenize(src, &mut log);
        (toks.into_iter().map(|t| t.kind).collect(), log)
    }

    #[test]
    fn object_like_macro_expands() {
        let (ks, log) = kinds("#define N 4\nN + 1\n");
        assert!(!log.has_errors());
        assert_eq!(
            ks,
            vec![
                TokenKind::IntConstant(4),
                TokenKind::Operator(Operator::Plus),
                TokenKind::IntConstant(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn function_like_macro_substitutes_arguments() {
        let (ks, log) = kinds("#define ADD(a, b) a + b\nADD(1, 2)\n");
        assert!(!log.has_errors());
        assert_eq!(
            ks,
            vec![
                TokenKind::IntConstant(1),
                TokenKind::Operator(Operator::Plus),
                TokenKind::IntConstant(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn conditional_compilation_skips_false_branch() {
        let (ks, log) = kinds("#define FLAG 1\n#if FLAG\n1\n#else\n2\n#endif\n");
        assert!(!log.has_errors());
        assert_eq!(ks, vec![TokenKind::IntConstant(1), TokenKind::Eof]);
    }

    #[test]
    fn elif_chain_picks_matching_branch() {
        let (ks, _log) = kinds("#if 0\n1\n#elif 1\n2\n#else\n3\n#endif\n");
        assert_eq!(ks, vec![TokenKind::IntConstant(2), TokenKind::Eof]);
    }

    #[test]
    fn defined_operator_reflects_macro_table() {
        let (ks, log) = kinds("#define X\n#if defined(X)\n10\n#endif\n#if defined Y\n20\n#endif\n");
        assert!(!log.has_errors());
        assert_eq!(ks, vec![TokenKind::IntConstant(10), TokenKind::Eof]);
    }

    #[test]
    fn if_expression_respects_precedence() {
        // `2 + 3 * 4 == 14` must take the `*`-before-`+` branch.
        let (ks, _log) = kinds("#if 2 + 3 * 4 == 14\n99\n#endif\n");
        assert_eq!(ks, vec![TokenKind::IntConstant(99), TokenKind::Eof]);
    }

    #[test]
    fn unresolved_endif_is_reported() {
        let (_ks, log) = kinds("#endif\n1\n");
        assert!(log.has_errors());
    }

    #[test]
    fn undef_removes_macro() {
        let (ks, _log) = kinds("#define N 1\n#undef N\nN\n");
        assert_eq!(
            ks,
            vec![TokenKind::Identifier("N".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn asm_and_retval_tokens_recognized() {
        let (ks, _log) = kinds("__asmADD_SAT __retval\n");
        assert_eq!(
            ks,
            vec![TokenKind::AsmOp("ADD_SAT".to_string()), TokenKind::Retval, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comments_and_block_comments_are_skipped() {
        let (ks, _log) = kinds("1 // trailing\n/* block\nspanning */2\n");
        assert_eq!(ks, vec![TokenKind::IntConstant(1), TokenKind::IntConstant(2), TokenKind::Eof]);
    }

    #[test]
    fn recursive_macro_does_not_expand_itself() {
        let (ks, _log) = kinds("#define A A 1\nA\n");
        assert_eq!(
            ks,
            vec![TokenKind::Identifier("A".to_string()), TokenKind::IntConstant(1), TokenKind::Eof]
        );
    }
}
