//! Statement lowering (`spec.md` §4.8).
//!
//! `for` trip counts are computed by bounded simulation of the init/cond/
//! increment triple over plain `f64` arithmetic rather than deriving a
//! closed form per relational-operator/sign combination — a deliberate
//! simplification (documented in `DESIGN.md`) that accepts the same loops
//! the closed-form version would but does more work to get there.
//!
//! `continue` is modeled with a per-loop boolean flag reset every
//! iteration: once a statement that might set it has been lowered, every
//! later statement in the same list is wrapped in `IF !continueFlag`.
//! `lower_stmt_list` applies this at every nesting level reachable while a
//! loop is active (`self.loops` non-empty), so a `continue` buried under
//! further `if`s/compounds still skips the rest of the iteration once
//! control returns to an enclosing list — not just the loop's own
//! immediate body.

use glsl_ast::{AssignOp, BinOp, Expr, ForInit, LocalVarDecl, Stmt, UnOp};
use glsl_const::{Channel, Constant};
use glsl_ir::{Guard, InstrKind, Instruction, Opcode, Reg};
use glsl_reporting::DiagnosticCode;
use glsl_symbols::Qualifier;
use glsl_types::{ArrayLength, BaseKind, Precision};

use crate::{LResult, LoopCtx, Lowerer, Value};

type Builder<'p> = glsl_ir::ProgramBuilder<'p>;

const MAX_STATIC_TRIP_COUNT: i64 = 1024;

impl<'a> Lowerer<'a> {
    pub fn lower_stmt(&mut self, b: &mut Builder, s: &Stmt) -> LResult<()> {
        match s {
            Stmt::Compound { statements, .. } => {
                let saved = self.push_scope();
                let r = self.lower_stmt_list(b, statements);
                self.pop_scope(saved);
                r
            }
            Stmt::Expr { expr, .. } => {
                self.lower_expr(b, expr)?;
                Ok(())
            }
            Stmt::Empty { .. } => Ok(()),
            Stmt::VarDecl(decl) => self.lower_local_var_decl(b, decl),
            Stmt::If { cond, then_branch, else_branch, .. } => self.lower_if(b, cond, then_branch, else_branch.as_deref()),
            Stmt::For { init, cond, increment, body, .. } => self.lower_for(b, init, cond.as_ref(), increment.as_ref(), body),
            Stmt::UnsupportedLoop { .. } => self.error(DiagnosticCode::X0001),
            Stmt::Return { value, .. } => self.lower_return(b, value.as_ref()),
            Stmt::Discard { .. } => self.lower_discard(b),
            Stmt::Break { .. } => self.lower_break(b),
            Stmt::Continue { .. } => self.lower_continue(b),
            Stmt::AsmStmt { call, .. } => {
                self.lower_expr(b, call)?;
                Ok(())
            }
        }
    }

    /// Lowers a statement list, warning once (`W0001`) the first time a
    /// sibling follows an unconditionally-terminating statement.
    ///
    /// While inside the dynamic extent of a `for` loop (`self.loops` is
    /// non-empty), also wraps every sibling that follows one that may run
    /// `continue` in `IF !continueFlag`. This is checked at every level a
    /// statement list is lowered at — not just the loop's own immediate
    /// body — so a `continue` buried under further `if`s/compounds still
    /// skips the remainder of the iteration once control returns to an
    /// enclosing list (`spec.md` §4.8).
    fn lower_stmt_list(&mut self, b: &mut Builder, statements: &[Stmt]) -> LResult<()> {
        let mut terminated = false;
        let mut warned = false;
        let mut guarded = false;
        for stmt in statements {
            if terminated && !warned {
                self.warn(DiagnosticCode::W0001);
                warned = true;
            }
            if guarded {
                let flag = self.loops.last().expect("guarded implies an active loop").continue_flag;
                b.emit(Instruction::new(Opcode::Scc, InstrKind::Cond { guard: Guard { cond: glsl_ir::Cond::Eq, selectors: [0, 1, 2, 3] } }));
                let flag_reg = Reg::simple(flag);
                let _ = flag_reg;
                b.emit(Instruction::new(Opcode::If, InstrKind::Cond { guard: Guard::default() }));
                self.lower_stmt(b, stmt)?;
                b.emit(Instruction::new(Opcode::Endif, InstrKind::Base));
            } else {
                self.lower_stmt(b, stmt)?;
            }
            if stmt_always_terminates(stmt) {
                terminated = true;
            }
            if !self.loops.is_empty() && stmt_contains_continue(stmt) {
                guarded = true;
            }
        }
        Ok(())
    }

    fn lower_local_var_decl(&mut self, b: &mut Builder, decl: &LocalVarDecl) -> LResult<()> {
        let base_ty = self.resolve_type_specifier(&decl.specifier.specifier)?;
        let is_const = decl.specifier.qualifier == glsl_ast::TypeQualifier::Const;
        for (declarator, initializer) in decl.declarators.iter().zip(&decl.initializers) {
            let ty = match &declarator.array_len {
                Some(len_expr) => {
                    let len = self.const_array_len(b, len_expr)?;
                    self.types.array(base_ty, ArrayLength::Sized(len))
                }
                None => base_ty,
            };
            let init_val = match initializer {
                Some(e) => Some(self.lower_expr(b, e)?),
                None => None,
            };
            if is_const {
                let Some(Value::Const(slots, _)) = init_val else {
                    return self.error(DiagnosticCode::S0013);
                };
                let sym = self.symbols.create_symbol(self.scope(), declarator.name.clone(), ty, Qualifier::Constant { initializer: slots });
                let _ = sym;
                continue;
            }
            let sym = self.symbols.create_symbol(self.scope(), declarator.name.clone(), ty, Qualifier::Variable);
            if let Some(v) = init_val {
                if !self.types.matches(ty, self.value_ty(&v)) {
                    return self.error(DiagnosticCode::S0001);
                }
                let var = self.symbol_reg(b, sym)?;
                let src = self.fetch(b, &v);
                let place = crate::Place { var, offset: 0, addr: None, kind: crate::PlaceKind::Whole, ty };
                self.store(b, &place, src);
            }
        }
        Ok(())
    }

    fn lower_if(&mut self, b: &mut Builder, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> LResult<()> {
        let c = self.lower_expr(b, cond)?;
        if self.types.get(self.value_ty(&c)).base() != Some(BaseKind::Bool) {
            return self.error(DiagnosticCode::S0005);
        }
        if let Value::Const(slots, _) = &c {
            return if matches!(slots[0].channels[0], Channel::Bool(true)) {
                self.lower_stmt(b, then_branch)
            } else if let Some(e) = else_branch {
                self.lower_stmt(b, e)
            } else {
                Ok(())
            };
        }
        let c_reg = self.fetch(b, &c);
        b.emit(Instruction::new(Opcode::Scc, InstrKind::Cond { guard: Guard { cond: glsl_ir::Cond::Ne, selectors: [0, 1, 2, 3] } }));
        let _ = c_reg;
        b.emit(Instruction::new(Opcode::If, InstrKind::Cond { guard: Guard::default() }));
        self.lower_stmt(b, then_branch)?;
        if let Some(e) = else_branch {
            b.emit(Instruction::new(Opcode::Else, InstrKind::Base));
            self.lower_stmt(b, e)?;
        }
        b.emit(Instruction::new(Opcode::Endif, InstrKind::Base));
        Ok(())
    }

    fn lower_discard(&mut self, b: &mut Builder) -> LResult<()> {
        if self.kind != crate::ShaderKind::Fragment {
            return self.error(DiagnosticCode::L0001);
        }
        b.emit(Instruction::new(Opcode::Kil, InstrKind::Base));
        Ok(())
    }

    fn lower_break(&mut self, b: &mut Builder) -> LResult<()> {
        if self.loops.is_empty() {
            return self.error(DiagnosticCode::S0001);
        }
        b.emit(Instruction::new(Opcode::Brk, InstrKind::Base));
        Ok(())
    }

    fn lower_continue(&mut self, b: &mut Builder) -> LResult<()> {
        let Some(ctx) = self.loops.last() else {
            return self.error(DiagnosticCode::S0001);
        };
        let flag = ctx.continue_flag;
        let bool_ty = self.types.scalar(BaseKind::Bool, Precision::Undefined);
        let true_val = Value::Const(vec![Constant::scalar(Channel::Bool(true))], bool_ty);
        let src = self.fetch(b, &true_val);
        b.emit(Instruction::new(Opcode::Mov, InstrKind::Unary { dst: Reg::simple(flag), src }));
        Ok(())
    }

    fn lower_return(&mut self, b: &mut Builder, value: Option<&Expr>) -> LResult<()> {
        let Some(func) = self.current_function else {
            return self.error(DiagnosticCode::I0000);
        };
        let return_ty = match self.types.get(self.symbols.symbol(func).ty).clone() {
            glsl_types::TypeKind::Function(sig) => sig.return_type,
            _ => return self.error(DiagnosticCode::I0000),
        };
        let is_void = self.types.matches(return_ty, self.types.void());
        match (value, is_void) {
            (Some(_), true) | (None, false) => return self.error(DiagnosticCode::S0001),
            (Some(e), false) => {
                let v = self.lower_expr(b, e)?;
                if !self.types.matches(return_ty, self.value_ty(&v)) {
                    return self.error(DiagnosticCode::S0001);
                }
                let result_temp = match &self.symbols.symbol(func).qualifier {
                    Qualifier::Function(info) => info.result_temp,
                    _ => None,
                };
                let result_var = match result_temp {
                    Some(raw) => glsl_ir::ProgVarId::from_raw(raw),
                    None => {
                        let var = self.new_temp(b, return_ty);
                        if let Qualifier::Function(info) = &mut self.symbols.symbol_mut(func).qualifier {
                            info.result_temp = Some(var.raw());
                        }
                        var
                    }
                };
                let src = self.fetch(b, &v);
                self.mov(b, result_var, 0, src);
            }
            (None, true) => {}
        }
        b.emit(Instruction::new(Opcode::Ret, InstrKind::Base));
        Ok(())
    }

    fn lower_for(&mut self, b: &mut Builder, init: &ForInit, cond: Option<&Expr>, increment: Option<&Expr>, body: &Stmt) -> LResult<()> {
        let trip_count = match simulate_trip_count(init, cond, increment) {
            Ok(n) => n,
            Err(TripCountError::NonTerminating) => return self.error(DiagnosticCode::X0007),
            Err(TripCountError::Indeterminate) => return self.error(DiagnosticCode::X0008),
        };

        let saved_scope = self.push_scope();
        if let Some(decl) = &init.decl {
            self.lower_local_var_decl(b, decl)?;
        } else if let Some(e) = &init.expr {
            self.lower_expr(b, e)?;
        }

        let bool_ty = self.types.scalar(BaseKind::Bool, Precision::Undefined);
        let continue_flag = self.new_temp(b, bool_ty);
        self.loops.push(LoopCtx { continue_flag });

        let int_ty = self.types.scalar(BaseKind::Int, Precision::High);
        let count_val = Value::Const(vec![Constant::scalar(Channel::Int(trip_count as i32))], int_ty);
        let count_reg = self.fetch(b, &count_val);
        b.emit(Instruction::new(Opcode::Rep, InstrKind::Src { src: count_reg }));

        let false_val = Value::Const(vec![Constant::scalar(Channel::Bool(false))], bool_ty);
        let false_reg = self.fetch(b, &false_val);
        b.emit(Instruction::new(Opcode::Mov, InstrKind::Unary { dst: Reg::simple(continue_flag), src: false_reg }));

        match body {
            Stmt::Compound { statements, .. } => self.lower_stmt_list(b, statements)?,
            other => self.lower_stmt_list(b, std::slice::from_ref(other))?,
        }

        if let Some(e) = increment {
            self.lower_expr(b, e)?;
        }

        b.emit(Instruction::new(Opcode::Endrep, InstrKind::Base));
        self.loops.pop();
        self.pop_scope(saved_scope);
        Ok(())
    }
}

/// Unconditional `return`/`discard`/`break`/`continue` at the top level
/// of a statement — not recursing into nested blocks, since those don't
/// guarantee control reaches their end (`spec.md` §4.8, `W0001`).
fn stmt_always_terminates(s: &Stmt) -> bool {
    matches!(s, Stmt::Return { .. } | Stmt::Discard { .. } | Stmt::Break { .. } | Stmt::Continue { .. })
}

/// Whether every control-flow path through `s` returns a value
/// (`spec.md` §4.8, `W0002`).
pub(crate) fn stmt_guarantees_return(s: &Stmt) -> bool {
    match s {
        Stmt::Return { .. } => true,
        Stmt::Compound { statements, .. } => statements.iter().any(stmt_guarantees_return),
        Stmt::If { then_branch, else_branch: Some(e), .. } => stmt_guarantees_return(then_branch) && stmt_guarantees_return(e),
        _ => false,
    }
}

/// Whether `s` may reach a `continue` without crossing a nested loop
/// boundary (a nested `for` owns its own continuation flag).
fn stmt_contains_continue(s: &Stmt) -> bool {
    match s {
        Stmt::Continue { .. } => true,
        Stmt::Compound { statements, .. } => statements.iter().any(stmt_contains_continue),
        Stmt::If { then_branch, else_branch, .. } => {
            stmt_contains_continue(then_branch) || else_branch.as_deref().is_some_and(stmt_contains_continue)
        }
        Stmt::For { .. } | Stmt::UnsupportedLoop { .. } => false,
        _ => false,
    }
}

/// Pure-AST evaluator used only to compute static `for`-loop trip
/// counts; entirely separate from register lowering (`spec.md` §4.8).
fn eval_pure(e: &Expr, env: &std::collections::HashMap<String, f64>) -> Option<f64> {
    match e {
        Expr::IntLiteral { value, .. } => Some(*value as f64),
        Expr::FloatLiteral { value, .. } => Some(*value),
        Expr::BoolLiteral { value, .. } => Some(if *value { 1.0 } else { 0.0 }),
        Expr::Ident { name, .. } => env.get(name).copied(),
        Expr::Unary { op: UnOp::Neg, operand, .. } => eval_pure(operand, env).map(|v| -v),
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = eval_pure(lhs, env)?;
            let r = eval_pure(rhs, env)?;
            Some(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r == 0.0 {
                        return None;
                    }
                    l / r
                }
                BinOp::Lt => bool_f64(l < r),
                BinOp::Gt => bool_f64(l > r),
                BinOp::Le => bool_f64(l <= r),
                BinOp::Ge => bool_f64(l >= r),
                BinOp::Eq => bool_f64(l == r),
                BinOp::Ne => bool_f64(l != r),
                _ => return None,
            })
        }
        _ => None,
    }
}

fn bool_f64(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

/// Names the loop counter from `init`, so the simulator can track its
/// value across simulated iterations.
fn counter_name(init: &ForInit) -> Option<String> {
    if let Some(decl) = &init.decl {
        return decl.declarators.first().map(|d| d.name.clone());
    }
    if let Some(Expr::Assign { target, .. }) = &init.expr {
        if let Expr::Ident { name, .. } = target.as_ref() {
            return Some(name.clone());
        }
    }
    None
}

fn counter_init_value(init: &ForInit) -> Option<f64> {
    if let Some(decl) = &init.decl {
        return decl.initializers.first().and_then(|i| i.as_ref()).and_then(|e| eval_pure(e, &Default::default()));
    }
    if let Some(Expr::Assign { op: AssignOp::Assign, value, .. }) = &init.expr {
        return eval_pure(value, &Default::default());
    }
    None
}

fn apply_increment(name: &str, increment: &Expr, env: &mut std::collections::HashMap<String, f64>) -> Option<()> {
    match increment {
        Expr::Postfix { op, operand, .. } => {
            let Expr::Ident { name: n, .. } = operand.as_ref() else { return None };
            if n != name {
                return None;
            }
            let delta = if matches!(op, glsl_ast::PostfixOp::Inc) { 1.0 } else { -1.0 };
            *env.get_mut(name)? += delta;
            Some(())
        }
        Expr::Unary { op, operand, .. } if matches!(op, UnOp::PreInc | UnOp::PreDec) => {
            let Expr::Ident { name: n, .. } = operand.as_ref() else { return None };
            if n != name {
                return None;
            }
            let delta = if matches!(op, UnOp::PreInc) { 1.0 } else { -1.0 };
            *env.get_mut(name)? += delta;
            Some(())
        }
        Expr::Assign { op, target, value, .. } => {
            let Expr::Ident { name: n, .. } = target.as_ref() else { return None };
            if n != name {
                return None;
            }
            let rhs = eval_pure(value, env)?;
            let cur = *env.get(name)?;
            let new = match op {
                AssignOp::Assign => rhs,
                AssignOp::AddAssign => cur + rhs,
                AssignOp::SubAssign => cur - rhs,
                AssignOp::MulAssign => cur * rhs,
                AssignOp::DivAssign => {
                    if rhs == 0.0 {
                        return None;
                    }
                    cur / rhs
                }
            };
            env.insert(name.to_string(), new);
            Some(())
        }
        _ => None,
    }
}

/// Why [`simulate_trip_count`] couldn't produce a statically computable,
/// strictly positive trip count (`spec.md` §8.3 E5): either nothing in
/// the loop header pins the count down at all — non-constant init/bound,
/// a bound the counter can never even approach, or a simulation that
/// still hasn't terminated after [`MAX_STATIC_TRIP_COUNT`] iterations
/// (`X0008`) — or the header *does* determine a constant counter and
/// step, but stepping by that constant amount can provably never land
/// exactly on an equality bound (`X0007`).
enum TripCountError {
    Indeterminate,
    NonTerminating,
}

fn simulate_trip_count(init: &ForInit, cond: Option<&Expr>, increment: Option<&Expr>) -> Result<i64, TripCountError> {
    let name = counter_name(init).ok_or(TripCountError::Indeterminate)?;
    let start = counter_init_value(init).ok_or(TripCountError::Indeterminate)?;
    let cond = cond.ok_or(TripCountError::Indeterminate)?;
    let increment = increment.ok_or(TripCountError::Indeterminate)?;

    if let Some(result) = closed_form_ne_trip_count(&name, start, cond, increment) {
        return result;
    }

    let mut env = std::collections::HashMap::new();
    env.insert(name.clone(), start);
    let mut count = 0i64;
    loop {
        let c = eval_pure(cond, &env).ok_or(TripCountError::Indeterminate)?;
        if c == 0.0 {
            return if count > 0 { Ok(count) } else { Err(TripCountError::Indeterminate) };
        }
        count += 1;
        if count > MAX_STATIC_TRIP_COUNT {
            return Err(TripCountError::Indeterminate);
        }
        apply_increment(&name, increment, &mut env).ok_or(TripCountError::Indeterminate)?;
    }
}

/// Closed-form check for `counter != bound` conditions (`i != 10`):
/// stepping by a constant amount can walk straight past an equality
/// bound without ever satisfying it (e.g. starting at `0`, stepping by
/// `3`, bound `10`), which bounded simulation alone can't distinguish
/// from a genuinely unknowable loop without running to
/// [`MAX_STATIC_TRIP_COUNT`] first. Returns `None` when `cond` isn't
/// this shape, so the caller falls back to simulation.
fn closed_form_ne_trip_count(name: &str, start: f64, cond: &Expr, increment: &Expr) -> Option<Result<i64, TripCountError>> {
    let Expr::Binary { op: BinOp::Ne, lhs, rhs, .. } = cond else { return None };
    let bound = match (lhs.as_ref(), rhs.as_ref()) {
        (Expr::Ident { name: n, .. }, other) if n == name => eval_pure(other, &Default::default())?,
        (other, Expr::Ident { name: n, .. }) if n == name => eval_pure(other, &Default::default())?,
        _ => return None,
    };

    let mut env = std::collections::HashMap::new();
    env.insert(name.to_string(), start);
    apply_increment(name, increment, &mut env)?;
    let delta = env[name] - start;
    if delta == 0.0 {
        return Some(Err(TripCountError::NonTerminating));
    }

    let ratio = (bound - start) / delta;
    if ratio < 0.0 {
        return Some(Err(TripCountError::Indeterminate));
    }
    let rounded = ratio.round();
    if (ratio - rounded).abs() > 1e-6 {
        return Some(Err(TripCountError::NonTerminating));
    }
    let trip_count = rounded as i64;
    if trip_count <= 0 || trip_count > MAX_STATIC_TRIP_COUNT {
        return Some(Err(TripCountError::Indeterminate));
    }
    Some(Ok(trip_count))
}
