//! Top-level driver (`spec.md` §4.9): registers every global declaration,
//! discovers the call graph reachable from `main`, compiles each reachable
//! function once into a single shared [`glsl_ir::ShaderProgram`], then
//! patches every deferred `CAL` target.
//!
//! Call-graph discovery (`discover_call_graph`) works over function
//! *names*, not individual overloads — two overloads of the same name are
//! treated as one graph node for recursion/depth/reachability purposes.
//! Resolving the exact overload a call site binds to needs argument
//! types, which only the real expression lowering in `expr.rs` computes;
//! redoing that resolution here just to build the graph would duplicate
//! it for no benefit, since every overload sharing a reachable name is
//! compiled anyway. This is a documented simplification (`DESIGN.md`).

use std::collections::{HashMap, HashSet};

use glsl_ast::{Expr, ExternalDecl, ParamDirection, PrecisionDecl, Stmt, TranslationUnit};
use glsl_ir::{Guard, InstrKind, Instruction, Opcode, ProgramBuilder, ShaderProgram};
use glsl_reporting::{DiagnosticCode, ShaderLog};
use glsl_symbols::{BuiltinSlot, FunctionInfo, Qualifier, SymbolId};
use glsl_types::{ArrayLength, Direction, Precision, SamplerKind, TypeStore};

use crate::stmt::stmt_guarantees_return;
use crate::{LResult, Lowerer, ShaderKind};

const MAX_CALL_DEPTH: usize = 64;

pub fn lower_translation_unit(
    kind: ShaderKind,
    unit: &TranslationUnit,
    log: &mut ShaderLog,
) -> Option<(ShaderProgram, TypeStore)> {
    let mut lowerer = Lowerer::new(kind, log);
    register_builtins(&mut lowerer);

    let bodies = match register_top_level(&mut lowerer, unit) {
        Ok(bodies) => bodies,
        Err(()) => return None,
    };

    let order = match discover_call_graph(&mut lowerer, &bodies) {
        Ok(order) => order,
        Err(()) => return None,
    };

    let mut program = ShaderProgram::empty();
    {
        let mut builder = ProgramBuilder::new(&mut program);
        if compile_functions(&mut lowerer, &order, &bodies, &mut builder).is_err() {
            return None;
        }
    }
    patch_calls(&mut lowerer, &mut program);

    if verify_main(&mut lowerer).is_err() {
        return None;
    }
    if kind == ShaderKind::Vertex && !lowerer.wrote_gl_position {
        lowerer.warn(DiagnosticCode::S0030);
    }

    Some((program, lowerer.types))
}

fn register_builtins(l: &mut Lowerer) {
    let vec4 = l.types.vector(glsl_types::BaseKind::Float, Precision::High, 4);
    let vec2 = l.types.vector(glsl_types::BaseKind::Float, Precision::High, 2);
    let float = l.types.scalar(glsl_types::BaseKind::Float, Precision::High);
    let boolean = l.types.scalar(glsl_types::BaseKind::Bool, Precision::Undefined);
    let scope = l.global_scope;
    match l.kind {
        ShaderKind::Vertex => {
            l.symbols.create_symbol(scope, "gl_Position".into(), vec4, Qualifier::Builtin(BuiltinSlot::Position));
            l.symbols.create_symbol(scope, "gl_PointSize".into(), float, Qualifier::Builtin(BuiltinSlot::PointSize));
        }
        ShaderKind::Fragment => {
            l.symbols.create_symbol(scope, "gl_FragCoord".into(), vec4, Qualifier::Builtin(BuiltinSlot::FragCoord));
            l.symbols.create_symbol(scope, "gl_FrontFacing".into(), boolean, Qualifier::Builtin(BuiltinSlot::FrontFacing));
            l.symbols.create_symbol(scope, "gl_FragColor".into(), vec4, Qualifier::Builtin(BuiltinSlot::FragColor));
            l.symbols.create_symbol(scope, "gl_PointCoord".into(), vec2, Qualifier::Builtin(BuiltinSlot::PointCoord));
        }
    }
}

/// First pass: walks every [`ExternalDecl`] in source order and populates
/// `glsl-symbols`/`glsl-types`, without touching `glsl-ir` (`spec.md`
/// §4.9 step 1-3). Returns each defined function's body, keyed by the
/// symbol registered for it.
fn register_top_level(l: &mut Lowerer, unit: &TranslationUnit) -> LResult<HashMap<SymbolId, Stmt>> {
    let mut scratch = ShaderProgram::empty();
    let mut scratch_builder = ProgramBuilder::new(&mut scratch);
    let mut bodies = HashMap::new();

    for decl in &unit.decls {
        match decl {
            ExternalDecl::Precision(p) => register_precision(l, p),
            ExternalDecl::Invariant(inv) => {
                for name in &inv.names {
                    if let Some(sym) = l.symbols.find_nested(l.scope(), name) {
                        if let Qualifier::Varying { invariant } = &mut l.symbols.symbol_mut(sym).qualifier {
                            *invariant = true;
                        }
                    }
                }
            }
            ExternalDecl::StructOnly(spec) => {
                register_struct(l, spec)?;
            }
            ExternalDecl::Variable(global) => {
                register_global_var(l, &mut scratch_builder, global)?;
            }
            ExternalDecl::Function(f) => {
                let sym = register_function(l, f)?;
                if let Some(body) = &f.body {
                    bodies.insert(sym, body.clone());
                }
            }
        }
    }
    Ok(bodies)
}

fn register_precision(l: &mut Lowerer, p: &PrecisionDecl) {
    let precision = match p.precision {
        glsl_ast::PrecisionQualifier::Highp => Precision::High,
        glsl_ast::PrecisionQualifier::Mediump => Precision::Medium,
        glsl_ast::PrecisionQualifier::Lowp => Precision::Low,
    };
    let scope = l.global_scope;
    let precisions = &mut l.symbols.scope_mut(scope).precisions;
    match p.ty {
        glsl_ast::PrimitiveName::Int => precisions.int = precision,
        glsl_ast::PrimitiveName::Float => precisions.float = precision,
        glsl_ast::PrimitiveName::Sampler2D => *precisions.sampler_mut(SamplerKind::Sampler2D) = precision,
        glsl_ast::PrimitiveName::Sampler3D => *precisions.sampler_mut(SamplerKind::Sampler3D) = precision,
        glsl_ast::PrimitiveName::SamplerCube => *precisions.sampler_mut(SamplerKind::SamplerCube) = precision,
        _ => {}
    }
}

fn register_struct(l: &mut Lowerer, spec: &glsl_ast::StructSpecifier) -> LResult<()> {
    let mut fields = Vec::new();
    let mut offset = 0u32;
    for field_decl in &spec.fields {
        let base_ty = l.resolve_type_specifier(&field_decl.specifier)?;
        for declarator in &field_decl.declarators {
            let ty = match &declarator.array_len {
                Some(len_expr) => {
                    let len = const_len_literal(l, len_expr)?;
                    l.types.array(base_ty, ArrayLength::Sized(len))
                }
                None => base_ty,
            };
            let size = l.types.size_of(ty).max(1);
            fields.push(glsl_types::StructField { name: declarator.name.clone(), ty, offset });
            offset += size;
        }
    }
    let ty = l.types.struct_type(spec.name.clone(), fields);
    if let Some(name) = &spec.name {
        l.symbols.create_symbol(l.scope(), name.clone(), ty, Qualifier::TypeName);
    }
    Ok(())
}

/// Struct-field array lengths must be literal, mirroring the parser's own
/// literal-only simplification for parameter array sizes.
fn const_len_literal(l: &mut Lowerer, e: &Expr) -> LResult<u32> {
    match e {
        Expr::IntLiteral { value, .. } => Ok((*value).max(0) as u32),
        _ => l.error(DiagnosticCode::S0002),
    }
}

fn register_global_var(l: &mut Lowerer, b: &mut ProgramBuilder, decl: &glsl_ast::GlobalVarDecl) -> LResult<()> {
    let base_ty = l.resolve_type_specifier(&decl.specifier.specifier)?;
    for (declarator, initializer) in decl.declarators.iter().zip(&decl.initializers) {
        let ty = match &declarator.array_len {
            Some(len_expr) => {
                let len = l.const_array_len(b, len_expr)?;
                l.types.array(base_ty, ArrayLength::Sized(len))
            }
            None => base_ty,
        };
        let qualifier = match decl.specifier.qualifier {
            glsl_ast::TypeQualifier::Attribute => {
                if l.kind != ShaderKind::Vertex {
                    return l.error(DiagnosticCode::S0001);
                }
                Qualifier::Attribute
            }
            glsl_ast::TypeQualifier::Varying => Qualifier::Varying { invariant: false },
            glsl_ast::TypeQualifier::InvariantVarying => Qualifier::Varying { invariant: true },
            glsl_ast::TypeQualifier::Uniform => Qualifier::Uniform,
            glsl_ast::TypeQualifier::Const => {
                let Some(init) = initializer else {
                    return l.error(DiagnosticCode::S0013);
                };
                let v = l.lower_expr(b, init)?;
                let crate::Value::Const(slots, _) = v else {
                    return l.error(DiagnosticCode::S0013);
                };
                Qualifier::Constant { initializer: slots }
            }
            glsl_ast::TypeQualifier::None => Qualifier::Variable,
        };
        l.symbols.create_symbol(l.scope(), declarator.name.clone(), ty, qualifier);
    }
    Ok(())
}

fn register_function(l: &mut Lowerer, f: &glsl_ast::FunctionDecl) -> LResult<SymbolId> {
    let return_type = l.resolve_type_specifier(&f.return_type)?;
    let param_scope = l.symbols.create_scope(Some(l.global_scope));
    let mut param_syms = smallvec::SmallVec::new();
    let mut param_types = Vec::new();
    for p in &f.params {
        let base_ty = l.resolve_type_specifier(&p.specifier)?;
        let ty = match p.array_len {
            Some(len) => l.types.array(base_ty, ArrayLength::Sized(len)),
            None => base_ty,
        };
        let direction = match p.direction {
            ParamDirection::In => Direction::In,
            ParamDirection::Out => Direction::Out,
            ParamDirection::InOut => Direction::InOut,
        };
        let sym = l.symbols.create_symbol(
            param_scope,
            p.name.clone(),
            ty,
            Qualifier::Parameter { index: param_types.len() as u32, direction, is_const: p.is_const },
        );
        param_syms.push(sym);
        param_types.push((ty, direction));
    }
    let func_ty = l.types.function(return_type, param_types);
    let info = FunctionInfo {
        param_scope: Some(param_scope),
        params: param_syms,
        defined: f.body.is_some(),
        ..Default::default()
    };
    Ok(l.symbols.create_symbol(l.global_scope, f.name.clone(), func_ty, Qualifier::Function(info)))
}

/// Post-order list of function names reachable from `main`, each
/// appearing once. Detects recursion (`S0055`) and excessive call depth
/// (`X0009`); an unreachable or wholly-undefined callee is left for
/// `expr.rs`'s normal call lowering to report (`L0002`).
fn discover_call_graph(l: &mut Lowerer, bodies: &HashMap<SymbolId, Stmt>) -> LResult<Vec<String>> {
    if l.symbols.find_nested(l.global_scope, "main").is_none() {
        return l.error(DiagnosticCode::S0029);
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    visit(l, bodies, "main", &mut order, &mut visited, &mut stack)?;
    Ok(order)
}

fn visit(
    l: &mut Lowerer,
    bodies: &HashMap<SymbolId, Stmt>,
    name: &str,
    order: &mut Vec<String>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> LResult<()> {
    if stack.iter().any(|s| s == name) {
        return l.error(DiagnosticCode::S0055);
    }
    if visited.contains(name) {
        return Ok(());
    }
    if stack.len() >= MAX_CALL_DEPTH {
        return l.error(DiagnosticCode::X0009);
    }
    let candidates = l.symbols.find_all(l.global_scope, name);
    let is_function = candidates.iter().any(|&s| matches!(l.symbols.symbol(s).qualifier, Qualifier::Function(_)));
    if !is_function {
        return Ok(());
    }
    let bodies_present = candidates.iter().any(|s| bodies.contains_key(s));
    if !bodies_present {
        return l.error(DiagnosticCode::S0100);
    }

    stack.push(name.to_string());
    let mut callees = Vec::new();
    for sym in &candidates {
        if let Some(body) = bodies.get(sym) {
            collect_calls_stmt(body, &mut callees);
        }
    }
    for callee in callees {
        visit(l, bodies, &callee, order, visited, stack)?;
    }
    stack.pop();
    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}

/// Collects every `Expr::Call` callee name reachable from a statement,
/// skipping into nested compounds/branches/loops but not into nested
/// function literals (the language has none).
fn collect_calls_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Compound { statements, .. } => {
            for s in statements {
                collect_calls_stmt(s, out);
            }
        }
        Stmt::Expr { expr, .. } => collect_calls_expr(expr, out),
        Stmt::Empty { .. } | Stmt::UnsupportedLoop { .. } | Stmt::Discard { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::VarDecl(decl) => {
            for init in decl.initializers.iter().flatten() {
                collect_calls_expr(init, out);
            }
        }
        Stmt::If { cond, then_branch, else_branch, .. } => {
            collect_calls_expr(cond, out);
            collect_calls_stmt(then_branch, out);
            if let Some(e) = else_branch {
                collect_calls_stmt(e, out);
            }
        }
        Stmt::For { init, cond, increment, body, .. } => {
            if let Some(decl) = &init.decl {
                for initializer in decl.initializers.iter().flatten() {
                    collect_calls_expr(initializer, out);
                }
            }
            if let Some(e) = &init.expr {
                collect_calls_expr(e, out);
            }
            if let Some(c) = cond {
                collect_calls_expr(c, out);
            }
            if let Some(i) = increment {
                collect_calls_expr(i, out);
            }
            collect_calls_stmt(body, out);
        }
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_calls_expr(v, out);
            }
        }
        Stmt::AsmStmt { call, .. } => collect_calls_expr(call, out),
    }
}

fn collect_calls_expr(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::IntLiteral { .. } | Expr::FloatLiteral { .. } | Expr::BoolLiteral { .. } | Expr::Retval { .. } | Expr::Ident { .. } => {}
        Expr::Field { base, .. } => collect_calls_expr(base, out),
        Expr::Index { base, index, .. } => {
            collect_calls_expr(base, out);
            collect_calls_expr(index, out);
        }
        Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } => collect_calls_expr(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_calls_expr(lhs, out);
            collect_calls_expr(rhs, out);
        }
        Expr::Conditional { cond, then_expr, else_expr, .. } => {
            collect_calls_expr(cond, out);
            collect_calls_expr(then_expr, out);
            collect_calls_expr(else_expr, out);
        }
        Expr::Assign { target, value, .. } => {
            collect_calls_expr(target, out);
            collect_calls_expr(value, out);
        }
        Expr::Call { callee, args, .. } => {
            out.push(callee.clone());
            for a in args {
                collect_calls_expr(a, out);
            }
        }
        Expr::Constructor { args, .. } => {
            for a in args {
                collect_calls_expr(a, out);
            }
        }
        Expr::AsmCall { args, .. } => {
            for a in args {
                collect_calls_expr(a, out);
            }
        }
    }
}

fn compile_functions(
    l: &mut Lowerer,
    order: &[String],
    bodies: &HashMap<SymbolId, Stmt>,
    b: &mut ProgramBuilder,
) -> LResult<()> {
    for name in order {
        let candidates = l.symbols.find_all(l.global_scope, name);
        for sym in candidates {
            if l.compiled_functions.contains_key(&sym) {
                continue;
            }
            let Some(body) = bodies.get(&sym) else { continue };
            let (param_scope, return_type) = match &l.symbols.symbol(sym).qualifier {
                Qualifier::Function(info) => {
                    let glsl_types::TypeKind::Function(sig) =
                        l.types.get(l.symbols.symbol(sym).ty).clone()
                    else {
                        return l.error(DiagnosticCode::I0000);
                    };
                    (info.param_scope.unwrap_or(l.global_scope), sig.return_type)
                }
                _ => continue,
            };

            let saved = l.enter_scope(param_scope);
            l.current_function = Some(sym);
            let entry = b.start_block();
            l.compiled_functions.insert(sym, entry);
            if let Qualifier::Function(info) = &mut l.symbols.symbol_mut(sym).qualifier {
                info.entry_label = Some(entry.raw());
            }

            l.lower_stmt(b, body)?;

            if !l.types.matches(return_type, l.types.void()) && !stmt_guarantees_return(body) {
                l.warn(DiagnosticCode::W0002);
            }
            b.emit(Instruction::new(Opcode::Ret, InstrKind::Base));

            l.current_function = None;
            l.enter_scope(saved);
        }
    }
    Ok(())
}

fn patch_calls(l: &mut Lowerer, program: &mut ShaderProgram) {
    let patches = std::mem::take(&mut l.call_patches);
    for (block, index, callee) in patches {
        if let Some(&entry) = l.compiled_functions.get(&callee) {
            program.block_mut(block).instructions[index] =
                Instruction::new(Opcode::Cal, InstrKind::Branch { target: entry, guard: Guard::default() });
        }
    }
}

/// `spec.md` §4.9 step 5: `main` must exist, have signature `void main()`,
/// and have no overloads. `register_function` has no uniqueness check of
/// its own (nothing stops a stray `void main(int x)` alongside the real
/// `main`), so the overload count is checked here via the same
/// `find_all` used by `discover_call_graph`/`compile_functions`.
fn verify_main(l: &mut Lowerer) -> LResult<()> {
    let candidates = l.symbols.find_all(l.global_scope, "main");
    if candidates.len() > 1 {
        return l.error(DiagnosticCode::S0029);
    }
    let Some(&sym) = candidates.first() else {
        return l.error(DiagnosticCode::S0029);
    };
    let glsl_types::TypeKind::Function(sig) = l.types.get(l.symbols.symbol(sym).ty).clone() else {
        return l.error(DiagnosticCode::S0029);
    };
    if !sig.params.is_empty() || !l.types.matches(sig.return_type, l.types.void()) {
        return l.error(DiagnosticCode::S0029);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(kind: ShaderKind, src: &str) -> (ShaderLog, Option<(ShaderProgram, TypeStore)>) {
        let mut log = ShaderLog::new();
        let tokens = glsl_lexer::tokenize(src, &mut log);
        let unit = glsl_parser::Parser::new(&tokens, &mut log).parse_translation_unit().expect("valid GLSL");
        let result = lower_translation_unit(kind, &unit, &mut log);
        (log, result)
    }

    #[test]
    fn single_main_with_no_params_is_accepted() {
        let (log, result) = lower(ShaderKind::Vertex, "void main() { gl_Position = vec4(0.0); }");
        assert!(!log.has_errors(), "{}", log.render());
        assert!(result.is_some());
    }

    #[test]
    fn overloaded_main_is_rejected() {
        let (log, result) = lower(
            ShaderKind::Vertex,
            "void main(int x) { }\nvoid main() { gl_Position = vec4(0.0); }",
        );
        assert!(result.is_none());
        assert!(log.render().contains("S0029"));
    }

    #[test]
    fn for_loop_with_unreachable_ne_bound_is_x0007() {
        let (log, result) = lower(
            ShaderKind::Fragment,
            "void main() {\n\
             float x = 0.0;\n\
             for (int i = 0; i != 10; i += 3) { x += 1.0; }\n\
             gl_FragColor = vec4(x);\n\
             }",
        );
        assert!(result.is_none());
        assert!(log.render().contains("X0007"), "{}", log.render());
    }

    #[test]
    fn for_loop_with_non_constant_bound_is_x0008() {
        let (log, result) = lower(
            ShaderKind::Fragment,
            "void main() {\n\
             float x = 0.0;\n\
             for (int i = 0; i < x; i++) { x += 1.0; }\n\
             gl_FragColor = vec4(x);\n\
             }",
        );
        assert!(result.is_none());
        assert!(log.render().contains("X0008"), "{}", log.render());
    }

    #[test]
    fn continue_guard_reaches_statements_nested_under_if() {
        let (log, result) = lower(
            ShaderKind::Fragment,
            "void main() {\n\
             float x = 0.0;\n\
             for (int i = 0; i < 4; i++) {\n\
               if (x < 1.0) {\n\
                 if (x < 0.5) { continue; }\n\
                 x += 1.0;\n\
               }\n\
               x += 2.0;\n\
             }\n\
             gl_FragColor = vec4(x);\n\
             }",
        );
        assert!(!log.has_errors(), "{}", log.render());
        let (mut program, types) = result.expect("compiles");
        let il = glsl_ir::render(&mut program, &types);
        // one `IF` per `if` condition (2), plus one continue-flag guard per
        // statement following a continue anywhere in the body, however
        // deeply nested: `x += 1.0` inside the outer `if`, and `x += 2.0`
        // after it.
        assert_eq!(il.matches("\tIF;\n").count(), 4, "{il}");
    }
}
