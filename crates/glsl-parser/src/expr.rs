//! Expression parsing (`spec.md` §4.7.1): precedence-climbing binary
//! operators, right-associative `?:` and assignment, then unary/postfix/
//! primary.

use glsl_ast::{AssignOp, BinOp, Expr, PostfixOp, UnOp};
use glsl_lexer::{Keyword, Operator, TokenKind};
use glsl_reporting::DiagnosticCode;

use crate::ty::primitive_name;
use crate::{PResult, Parser};

/// Precedence table from `spec.md` §4.7.1, low→high. `?:` and assignment
/// are handled outside this table (§4.7.1: "binds between `||` and
/// assignment"; assignment parses only when the left side is a unary).
fn binop_for(op: Operator) -> Option<(BinOp, u8)> {
    use Operator::*;
    Some(match op {
        OrOr => (BinOp::Or, 14),
        XorXor => (BinOp::Xor, 13),
        AndAnd => (BinOp::And, 12),
        EqEq => (BinOp::Eq, 8),
        NotEq => (BinOp::Ne, 8),
        Lt => (BinOp::Lt, 7),
        Gt => (BinOp::Gt, 7),
        Le => (BinOp::Le, 7),
        Ge => (BinOp::Ge, 7),
        Plus => (BinOp::Add, 5),
        Minus => (BinOp::Sub, 5),
        Star => (BinOp::Mul, 4),
        Slash => (BinOp::Div, 4),
        _ => return None,
    })
}

fn assign_op_for(op: Operator) -> Option<AssignOp> {
    use Operator::*;
    Some(match op {
        Assign => AssignOp::Assign,
        StarEq => AssignOp::MulAssign,
        SlashEq => AssignOp::DivAssign,
        PlusEq => AssignOp::AddAssign,
        MinusEq => AssignOp::SubAssign,
        _ => return None,
    })
}

/// An expression is a unary expression (possibly parsed as the start of a
/// larger binary/conditional/assignment chain) per `spec.md` §4.7.1.
fn is_lvalue_shaped(e: &Expr) -> bool {
    matches!(e, Expr::Ident { .. } | Expr::Field { .. } | Expr::Index { .. })
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let lhs = self.parse_conditional()?;
        if is_lvalue_shaped(&lhs) {
            if let TokenKind::Operator(op) = *self.peek() {
                if let Some(assign_op) = assign_op_for(op) {
                    self.bump();
                    let rhs = self.parse_assignment()?;
                    let span = lhs.span().to(rhs.span());
                    return Ok(Expr::Assign {
                        op: assign_op,
                        target: Box::new(lhs),
                        value: Box::new(rhs),
                        span,
                    });
                }
            }
        }
        Ok(lhs)
    }

    /// `cond ? then : else`, right-associative, binding between `||` and
    /// assignment.
    fn parse_conditional(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary(14)?;
        if self.eat_operator(Operator::Question) {
            let then_expr = self.parse_assignment()?;
            self.expect_operator(Operator::Colon)?;
            let else_expr = self.parse_assignment()?;
            let span = cond.span().to(else_expr.span());
            Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                span,
            })
        } else {
            Ok(cond)
        }
    }

    fn parse_binary(&mut self, max_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((bin_op, prec)) = (match *self.peek() {
                TokenKind::Operator(op) => binop_for(op),
                _ => None,
            }) else {
                break;
            };
            if prec > max_prec {
                break;
            }
            self.bump();
            // Left-associative: the right operand only climbs to
            // `prec - 1` so operators of the same precedence group left.
            let rhs = self.parse_binary(prec - 1)?;
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary { op: bin_op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.current_span();
        let op = match *self.peek() {
            TokenKind::Operator(Operator::Minus) => Some(UnOp::Neg),
            TokenKind::Operator(Operator::Not) => Some(UnOp::Not),
            TokenKind::Operator(Operator::PlusPlus) => Some(UnOp::PreInc),
            TokenKind::Operator(Operator::MinusMinus) => Some(UnOp::PreDec),
            TokenKind::Operator(Operator::Plus) => {
                self.bump();
                return self.parse_unary();
            }
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let span = start.to(operand.span());
            return Ok(Expr::Unary { op, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_operator(Operator::Dot) {
                let start = expr.span();
                let name = self.expect_identifier()?;
                let span = start.to(self.current_span());
                expr = Expr::Field { base: Box::new(expr), name, span };
            } else if self.eat_operator(Operator::LBracket) {
                let start = expr.span();
                let index = self.parse_expr()?;
                self.expect_operator(Operator::RBracket)?;
                let span = start.to(self.current_span());
                expr = Expr::Index { base: Box::new(expr), index: Box::new(index), span };
            } else if self.is_operator(Operator::PlusPlus) || self.is_operator(Operator::MinusMinus) {
                let op =
                    if self.eat_operator(Operator::PlusPlus) { PostfixOp::Inc } else { self.bump(); PostfixOp::Dec };
                let span = expr.span().to(self.current_span());
                expr = Expr::Postfix { op, operand: Box::new(expr), span };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect_operator(Operator::LParen)?;
        let mut args = Vec::new();
        if !self.is_operator(Operator::RParen) {
            args.push(self.parse_assignment()?);
            while self.eat_operator(Operator::Comma) {
                args.push(self.parse_assignment()?);
            }
        }
        self.expect_operator(Operator::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::IntConstant(value) => {
                self.bump();
                Ok(Expr::IntLiteral { value, span: start })
            }
            TokenKind::FloatConstant(value) => {
                self.bump();
                Ok(Expr::FloatLiteral { value, span: start })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(Expr::BoolLiteral { value: true, span: start })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(Expr::BoolLiteral { value: false, span: start })
            }
            TokenKind::Retval => {
                self.bump();
                Ok(Expr::Retval { span: start })
            }
            TokenKind::AsmOp(opcode) => {
                self.bump();
                let args = self.parse_call_args()?;
                let span = start.to(self.current_span());
                Ok(Expr::AsmCall { opcode, args, span })
            }
            TokenKind::Operator(Operator::LParen) => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect_operator(Operator::RParen)?;
                Ok(inner)
            }
            TokenKind::Keyword(kw) if primitive_name(kw).is_some() => {
                let specifier = self.parse_type_specifier()?;
                let args = self.parse_call_args()?;
                let span = start.to(self.current_span());
                Ok(Expr::Constructor { ty: specifier, args, span })
            }
            TokenKind::Identifier(name) => {
                self.bump();
                if self.is_operator(Operator::LParen) {
                    let args = self.parse_call_args()?;
                    let span = start.to(self.current_span());
                    Ok(Expr::Call { callee: name, args, span })
                } else {
                    Ok(Expr::Ident { name, span: start })
                }
            }
            _ => self.error(DiagnosticCode::L0001),
        }
    }
}

#[cfg(test)]
mod tests {
    use glsl_lexer::tokenize;
    use glsl_reporting::ShaderLog;

    use super::*;

    fn parse_expr(src: &str) -> Expr {
        let full = format!("void main() {{ __retval = {src}; }}");
        let mut lex_log = ShaderLog::new();
        let tokens = tokenize(&full, &mut lex_log);
        assert!(!lex_log.has_errors(), "lexing failed: {}", lex_log.render());
        let mut log = ShaderLog::new();
        let mut p = Parser::new(&tokens, &mut log);
        let unit = p.parse_translation_unit().unwrap_or_else(|_| panic!("parse failed: {}", log.render()));
        let glsl_ast::ExternalDecl::Function(f) = &unit.decls[0] else { panic!("expected a function") };
        let glsl_ast::Stmt::Compound { statements, .. } = f.body.as_ref().unwrap() else {
            panic!("expected a compound body")
        };
        let glsl_ast::Stmt::Expr { expr, .. } = &statements[0] else { panic!("expected an expression statement") };
        let Expr::Assign { value, .. } = expr else { panic!("expected the __retval assignment") };
        (**value).clone()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = parse_expr("1.0 + 2.0 * 3.0");
        let Expr::Binary { op: BinOp::Add, rhs, .. } = e else { panic!("expected a top-level +") };
        assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn same_precedence_binary_ops_are_left_associative() {
        // `a - b - c` must parse as `(a - b) - c`, not `a - (b - c)`.
        let e = parse_expr("a - b - c");
        let Expr::Binary { op: BinOp::Sub, lhs, rhs, .. } = e else { panic!("expected a top-level -") };
        assert!(matches!(*rhs, Expr::Ident { .. }));
        assert!(matches!(*lhs, Expr::Binary { op: BinOp::Sub, .. }));
    }

    #[test]
    fn conditional_is_right_associative_and_binds_below_or() {
        let e = parse_expr("a || b ? c : d ? e : f");
        let Expr::Conditional { cond, else_expr, .. } = e else { panic!("expected a conditional") };
        assert!(matches!(*cond, Expr::Binary { op: BinOp::Or, .. }));
        assert!(matches!(*else_expr, Expr::Conditional { .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = parse_expr("a = b = c");
        let Expr::Assign { value, .. } = e else { panic!("expected an assignment") };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn postfix_field_and_call_compose() {
        let e = parse_expr("normalize(n).xyz");
        let Expr::Field { base, name, .. } = e else { panic!("expected a field access") };
        assert_eq!(name, "xyz");
        assert!(matches!(*base, Expr::Call { .. }));
    }

    #[test]
    fn constructor_call_is_distinguished_from_function_call() {
        let e = parse_expr("vec3(1.0, 2.0, 3.0)");
        assert!(matches!(e, Expr::Constructor { .. }));
    }
}
