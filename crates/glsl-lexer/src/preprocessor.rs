//! Preprocessor (`spec.md` §4.5.3): macro expansion, conditional
//! compilation, and the pragma/extension/version/line directives, layered
//! over the raw [`Scanner`].

use glsl_reporting::{DiagnosticCode, Report, ShaderLog};
use glsl_utils::FxHashMap;

use crate::scanner::Scanner;
use crate::token::{Operator, Token, TokenKind};

const MAX_EXPANSION_DEPTH: usize = 64;
const MAX_CONDITIONAL_DEPTH: usize = 32;

#[derive(Debug, Clone)]
struct MacroDef {
    params: Option<Vec<String>>,
    body: Vec<Token>,
    disabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    in_else: bool,
    currently_true: bool,
    was_true: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PragmaState {
    pub debug: bool,
    pub optimize: bool,
}

impl Default for PragmaState {
    fn default() -> Self {
        Self { debug: false, optimize: true }
    }
}

pub struct Preprocessor<'src> {
    scanner: Scanner<'src>,
    macros: FxHashMap<String, MacroDef>,
    conditional_stack: Vec<CondFrame>,
    /// Tokens queued from macro expansion or conditional handling, drained
    /// before asking the scanner for more.
    queue: std::collections::VecDeque<Token>,
    pub pragmas: PragmaState,
    seen_token: bool,
    seen_version: bool,
    source_string: u32,
    line_offset: i64,
}

impl<'src> Preprocessor<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            scanner: Scanner::new(src),
            macros: FxHashMap::default(),
            conditional_stack: Vec::new(),
            queue: std::collections::VecDeque::new(),
            pragmas: PragmaState::default(),
            seen_token: false,
            seen_version: false,
            source_string: 0,
            line_offset: 0,
        }
    }

    fn at_top_visible(&self) -> bool {
        self.conditional_stack.iter().all(|f| f.currently_true)
    }

    fn raw_line(&self) -> u32 {
        (self.scanner.line() as i64 + self.line_offset) as u32
    }

    fn raw_next(&mut self) -> Token {
        if let Some(t) = self.queue.pop_front() {
            return t;
        }
        self.scanner.next_token()
    }

    /// Reads tokens up to (not including) the next EOL/EOF, used for
    /// directive lines and macro replacement-list capture.
    fn read_line_tokens(&mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let t = self.raw_next();
            match t.kind {
                TokenKind::Eol | TokenKind::Eof => {
                    self.queue.push_front(t);
                    break;
                }
                _ => out.push(t),
            }
        }
        out
    }

    fn skip_to_eol(&mut self) {
        loop {
            match self.raw_next().kind {
                TokenKind::Eol | TokenKind::Eof => break,
                _ => {}
            }
        }
    }

    /// Public entry point: yields the next fully macro-expanded,
    /// conditional-filtered token.
    pub fn next_token(&mut self, log: &mut ShaderLog) -> Token {
        loop {
            let t = self.raw_next();
            match &t.kind {
                TokenKind::Eof => return t,
                TokenKind::Eol => continue,
                TokenKind::Hash => {
                    self.handle_directive(log);
                    continue;
                }
                TokenKind::Identifier(name) if self.at_top_visible() => {
                    self.seen_token = true;
                    if name == "__LINE__" {
                        return Token { kind: TokenKind::IntConstant(self.raw_line() as i64), ..t };
                    }
                    if name == "__FILE__" {
                        // ESSL `__FILE__` is the current source-string number
                        // (set by `#line line, source`), not a path.
                        return Token { kind: TokenKind::IntConstant(self.source_string as i64), ..t };
                    }
                    if name == "__VERSION__" {
                        return Token { kind: TokenKind::IntConstant(100), ..t };
                    }
                    if let Some(expanded) = self.try_expand(name.clone(), log) {
                        for tok in expanded.into_iter().rev() {
                            self.queue.push_front(tok);
                        }
                        continue;
                    }
                    return t;
                }
                _ if self.at_top_visible() => {
                    self.seen_token = true;
                    return t;
                }
                _ => continue,
            }
        }
    }

    fn try_expand(&mut self, name: String, log: &mut ShaderLog) -> Option<Vec<Token>> {
        let is_function_like = self.macros.get(&name).map(|m| m.params.is_some())?;
        if self.macros.get(&name)?.disabled {
            return None;
        }
        let args = if is_function_like {
            match self.collect_call_args(&name) {
                Some(a) => Some(a),
                // No following `(`: not a macro invocation here.
                None => return None,
            }
        } else {
            None
        };

        let def = self.macros.get(&name).cloned()?;
        let substituted = match (&def.params, args) {
            (Some(params), Some(args)) => self.substitute(&def.body, params, &args, log),
            _ => def.body.clone(),
        };

        self.macros.get_mut(&name).unwrap().disabled = true;
        let expanded = self.expand_fully(substituted, 0, log);
        self.macros.get_mut(&name).unwrap().disabled = false;
        Some(expanded)
    }

    fn expand_fully(&mut self, tokens: Vec<Token>, depth: usize, log: &mut ShaderLog) -> Vec<Token> {
        if depth > MAX_EXPANSION_DEPTH {
            log.push(Report::new(DiagnosticCode::P0012, self.raw_line() as u32));
            return tokens;
        }
        let mut out = Vec::new();
        let mut iter = tokens.into_iter().peekable();
        while let Some(tok) = iter.next() {
            if let TokenKind::Identifier(name) = &tok.kind {
                let name = name.clone();
                if let Some(def) = self.macros.get(&name).cloned() {
                    if !def.disabled {
                        let args = if def.params.is_some() {
                            self.collect_call_args_from_iter(&mut iter)
                        } else {
                            None
                        };
                        if def.params.is_none() || args.is_some() {
                            let body = match (&def.params, args) {
                                (Some(params), Some(args)) => self.substitute(&def.body, params, &args, log),
                                _ => def.body.clone(),
                            };
                            self.macros.get_mut(&name).unwrap().disabled = true;
                            let expanded = self.expand_fully(body, depth + 1, log);
                            self.macros.get_mut(&name).unwrap().disabled = false;
                            out.extend(expanded);
                            continue;
                        }
                    }
                }
            }
            out.push(tok);
        }
        out
    }

    fn collect_call_args_from_iter(
        &mut self,
        iter: &mut std::iter::Peekable<std::vec::IntoIter<Token>>,
    ) -> Option<Vec<Vec<Token>>> {
        if !matches!(iter.peek().map(|t| &t.kind), Some(TokenKind::Operator(Operator::LParen))) {
            return None;
        }
        iter.next();
        let mut args = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0i32;
        for tok in iter.by_ref() {
            match &tok.kind {
                TokenKind::Operator(Operator::LParen) => {
                    depth += 1;
                    current.push(tok);
                }
                TokenKind::Operator(Operator::RParen) => {
                    if depth == 0 {
                        args.push(std::mem::take(&mut current));
                        break;
                    }
                    depth -= 1;
                    current.push(tok);
                }
                TokenKind::Operator(Operator::Comma) if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                }
                _ => current.push(tok),
            }
        }
        Some(args)
    }

    fn collect_call_args(&mut self, _name: &str) -> Option<Vec<Vec<Token>>> {
        // Function-like macros require a following `(` (skipping
        // whitespace/EOL), per `spec.md` §4.5.3.
        loop {
            let t = self.raw_next();
            match t.kind {
                TokenKind::Eol => continue,
                TokenKind::Operator(Operator::LParen) => break,
                _ => {
                    self.queue.push_front(t);
                    return None;
                }
            }
        }
        let mut args = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0i32;
        loop {
            let t = self.raw_next();
            match t.kind {
                TokenKind::Eof => break,
                TokenKind::Eol => continue,
                TokenKind::Operator(Operator::LParen) => {
                    depth += 1;
                    current.push(t);
                }
                TokenKind::Operator(Operator::RParen) => {
                    if depth == 0 {
                        args.push(std::mem::take(&mut current));
                        break;
                    }
                    depth -= 1;
                    current.push(t);
                }
                TokenKind::Operator(Operator::Comma) if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                }
                _ => current.push(t),
            }
        }
        Some(args)
    }

    /// Arguments are fully macro-expanded, then substituted for parameter
    /// names in the replacement text (`spec.md` §4.5.3).
    fn substitute(
        &mut self,
        body: &[Token],
        params: &[String],
        args: &[Vec<Token>],
        log: &mut ShaderLog,
    ) -> Vec<Token> {
        let expanded_args: Vec<Vec<Token>> =
            args.iter().map(|a| self.expand_fully(a.clone(), 0, log)).collect();
        let mut out = Vec::new();
        for tok in body {
            if let TokenKind::Identifier(name) = &tok.kind {
                if let Some(idx) = params.iter().position(|p| p == name) {
                    if let Some(replacement) = expanded_args.get(idx) {
                        out.extend(replacement.clone());
                        continue;
                    }
                }
            }
            out.push(tok.clone());
        }
        out
    }

    fn require_first_token(&mut self, code: DiagnosticCode, log: &mut ShaderLog) -> bool {
        if self.seen_token {
            log.push(Report::new(code, self.raw_line() as u32));
            false
        } else {
            true
        }
    }

    fn handle_directive(&mut self, log: &mut ShaderLog) {
        let name_tok = self.raw_next();
        let name = match &name_tok.kind {
            TokenKind::Identifier(s) => s.clone(),
            TokenKind::Eol | TokenKind::Eof => {
                self.queue.push_front(name_tok);
                return;
            }
            _ => {
                self.skip_to_eol();
                return;
            }
        };

        let visible = self.at_top_visible();

        match name.as_str() {
            "define" if visible => self.handle_define(log),
            "undef" if visible => {
                let line = self.read_line_tokens();
                if let Some(Token { kind: TokenKind::Identifier(n), .. }) = line.first() {
                    self.macros.remove(n);
                }
            }
            "if" => self.handle_if(log),
            "ifdef" => {
                let line = self.read_line_tokens();
                let defined = matches!(line.first().map(|t| &t.kind), Some(TokenKind::Identifier(n)) if self.macros.contains_key(n));
                self.push_conditional(defined, log);
            }
            "ifndef" => {
                let line = self.read_line_tokens();
                let defined = matches!(line.first().map(|t| &t.kind), Some(TokenKind::Identifier(n)) if self.macros.contains_key(n));
                self.push_conditional(!defined, log);
            }
            "elif" => self.handle_elif(log),
            "else" => self.handle_else(log),
            "endif" => {
                if self.conditional_stack.pop().is_none() {
                    log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
                }
            }
            "error" if visible => {
                let line = self.read_line_tokens();
                let text = render_tokens(&line);
                log.push(Report::new(DiagnosticCode::P0002, self.raw_line() as u32).with_detail(text));
            }
            "pragma" if visible => self.handle_pragma(),
            "extension" if visible => self.handle_extension(log),
            "version" if visible => self.handle_version(log),
            "line" if visible => self.handle_line(log),
            _ if visible => {
                self.skip_to_eol();
            }
            _ => self.skip_to_eol(),
        }
    }

    fn push_conditional(&mut self, condition: bool, log: &mut ShaderLog) {
        if self.conditional_stack.len() >= MAX_CONDITIONAL_DEPTH {
            log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
            return;
        }
        let outer_true = self.at_top_visible();
        let currently_true = outer_true && condition;
        self.conditional_stack.push(CondFrame { in_else: false, currently_true, was_true: condition });
    }

    fn handle_elif(&mut self, log: &mut ShaderLog) {
        let condition = self.eval_if_expression(log);
        let Some(frame) = self.conditional_stack.last_mut() else {
            log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
            return;
        };
        if frame.in_else {
            log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
            return;
        }
        let outer_true = self.conditional_stack[..self.conditional_stack.len() - 1].iter().all(|f| f.currently_true);
        let frame = self.conditional_stack.last_mut().unwrap();
        if frame.was_true {
            frame.currently_true = false;
        } else {
            frame.currently_true = outer_true && condition;
            frame.was_true = frame.was_true || condition;
        }
    }

    fn handle_else(&mut self, log: &mut ShaderLog) {
        let Some(idx) = self.conditional_stack.len().checked_sub(1) else {
            log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
            return;
        };
        let outer_true = self.conditional_stack[..idx].iter().all(|f| f.currently_true);
        let frame = &mut self.conditional_stack[idx];
        if frame.in_else {
            log.push(Report::new(DiagnosticCode::P0011, self.raw_line() as u32));
            return;
        }
        frame.in_else = true;
        frame.currently_true = outer_true && !frame.was_true;
        frame.was_true = true;
    }

    fn handle_define(&mut self, log: &mut ShaderLog) {
        let name_tok = self.raw_next();
        let name = match name_tok.kind {
            TokenKind::Identifier(n) => n,
            _ => {
                self.skip_to_eol();
                return;
            }
        };
        // Function-like iff `(` immediately follows the name with no space;
        // the scanner has already discarded whitespace, so peek the very
        // next raw token.
        let maybe_paren = self.raw_next();
        let params = if matches!(maybe_paren.kind, TokenKind::Operator(Operator::LParen)) {
            let mut params = Vec::new();
            loop {
                let t = self.raw_next();
                match t.kind {
                    TokenKind::Identifier(p) => params.push(p),
                    TokenKind::Operator(Operator::Comma) => continue,
                    TokenKind::Operator(Operator::RParen) => break,
                    TokenKind::Eof | TokenKind::Eol => break,
                    _ => continue,
                }
            }
            Some(params)
        } else {
            self.queue.push_front(maybe_paren);
            None
        };
        let body = self.read_line_tokens();
        let _ = log;
        self.macros.insert(name, MacroDef { params, body, disabled: false });
    }

    /// `#if` expressions are evaluated on integer values only
    /// (`spec.md` §4.5.3).
    fn eval_if_expression(&mut self, log: &mut ShaderLog) -> bool {
        let mut line = self.read_line_tokens();
        resolve_defined(&mut line, &self.macros);
        let expanded = self.expand_fully(line, 0, log);
        let mut eval = IfEval::new(&expanded);
        match eval.parse_expr(0) {
            Some(v) => v != 0,
            None => {
                log.push(Report::new(DiagnosticCode::P0013, self.raw_line() as u32));
                false
            }
        }
    }

    fn handle_if(&mut self, log: &mut ShaderLog) {
        let condition = self.eval_if_expression(log);
        self.push_conditional(condition, log);
    }

    fn handle_pragma(&mut self) {
        let line = self.read_line_tokens();
        let text = render_tokens(&line);
        if let Some(rest) = text.strip_prefix("debug") {
            self.pragmas.debug = rest.contains("on");
        } else if let Some(rest) = text.strip_prefix("optimize") {
            self.pragmas.optimize = rest.contains("on");
        }
        // Unknown pragmas are silently ignored.
    }

    fn handle_extension(&mut self, log: &mut ShaderLog) {
        if !self.require_first_token(DiagnosticCode::P0008, log) {
            self.skip_to_eol();
            return;
        }
        let line = self.read_line_tokens();
        let text = render_tokens(&line);
        let (_name, behavior) = text.split_once(':').unwrap_or((text.as_str(), ""));
        let behavior = behavior.trim();
        // No extension is supported, so only `warn`/`disable` are accepted
        // for any extension name, including `all`.
        if matches!(behavior, "enable" | "require") {
            log.push(Report::new(DiagnosticCode::P0003, self.raw_line() as u32));
        }
    }

    fn handle_version(&mut self, log: &mut ShaderLog) {
        let first_token_ok = self.require_first_token(DiagnosticCode::P0005, log);
        if self.seen_version {
            log.push(Report::new(DiagnosticCode::P0005, self.raw_line() as u32));
        }
        if self.seen_version || !first_token_ok {
            self.skip_to_eol();
            return;
        }
        self.seen_version = true;
        let line = self.read_line_tokens();
        let ok = matches!(line.first().map(|t| &t.kind), Some(TokenKind::IntConstant(100)));
        if !ok {
            log.push(Report::new(DiagnosticCode::P0007, self.raw_line() as u32));
        }
    }

    fn handle_line(&mut self, log: &mut ShaderLog) {
        let line = self.read_line_tokens();
        let mut nums = line.iter().filter_map(|t| match t.kind {
            TokenKind::IntConstant(v) => Some(v),
            _ => None,
        });
        let Some(new_line) = nums.next() else {
            log.push(Report::new(DiagnosticCode::P0013, self.raw_line() as u32));
            return;
        };
        if let Some(source_string) = nums.next() {
            self.source_string = source_string as u32;
        }
        self.line_offset = new_line - self.scanner.line() as i64;
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.kind.to_string()).collect::<Vec<_>>().join(" ")
}

/// Resolves `defined X` / `defined(X)` to `0`/`1` before full macro
/// expansion runs over a `#if` line (`spec.md` §4.5.3).
fn resolve_defined(tokens: &mut Vec<Token>, macros: &FxHashMap<String, MacroDef>) {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let TokenKind::Identifier(name) = &tokens[i].kind {
            if name == "defined" {
                let mut j = i + 1;
                let paren = matches!(tokens.get(j).map(|t| &t.kind), Some(TokenKind::Operator(Operator::LParen)));
                if paren {
                    j += 1;
                }
                if let Some(Token { kind: TokenKind::Identifier(target), .. }) = tokens.get(j) {
                    let defined = macros.contains_key(target);
                    let mut end = j + 1;
                    if paren {
                        if matches!(tokens.get(end).map(|t| &t.kind), Some(TokenKind::Operator(Operator::RParen))) {
                            end += 1;
                        }
                    }
                    out.push(Token {
                        kind: TokenKind::IntConstant(defined as i64),
                        span: tokens[i].span,
                        line: tokens[i].line,
                    });
                    i = end;
                    continue;
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    *tokens = out;
}

/// Precedence-climbing evaluator for `#if` integer expressions
/// (`spec.md` §4.5.3 precedence table, tight→loose):
/// unary `- ~ !`; `* / %`; `+ -`; `<< >>`; `< <= > >=`; `== !=`; `&`; `^`;
/// `|`; `&&`; `||`; `? :`. Unknown identifiers evaluate to 0.
struct IfEval<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> IfEval<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&TokenKind> {
        let t = self.tokens.get(self.pos).map(|t| &t.kind);
        self.pos += 1;
        t
    }

    fn parse_expr(&mut self, min_prec: u8) -> Option<i64> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((prec, op)) = self.peek_binop() else { break };
            if prec < min_prec {
                break;
            }
            if op == "?:" {
                self.pos += 1;
                let then_v = self.parse_expr(0)?;
                if !matches!(self.bump(), Some(TokenKind::Operator(Operator::Colon))) {
                    return None;
                }
                let else_v = self.parse_expr(prec)?;
                lhs = if lhs != 0 { then_v } else { else_v };
                continue;
            }
            self.pos += 1;
            let rhs = self.parse_expr(prec + 1)?;
            lhs = apply_binop(op, lhs, rhs);
        }
        Some(lhs)
    }

    fn peek_binop(&self) -> Option<(u8, &'static str)> {
        use Operator::*;
        match self.peek()? {
            TokenKind::Operator(OrOr) => Some((1, "||")),
            TokenKind::Operator(AndAnd) => Some((2, "&&")),
            TokenKind::Operator(Pipe) => Some((3, "|")),
            TokenKind::Operator(Caret) => Some((4, "^")),
            TokenKind::Operator(Amp) => Some((5, "&")),
            TokenKind::Operator(EqEq) => Some((6, "==")),
            TokenKind::Operator(NotEq) => Some((6, "!=")),
            TokenKind::Operator(Lt) => Some((7, "<")),
            TokenKind::Operator(Le) => Some((7, "<=")),
            TokenKind::Operator(Gt) => Some((7, ">")),
            TokenKind::Operator(Ge) => Some((7, ">=")),
            TokenKind::Operator(Shl) => Some((8, "<<")),
            TokenKind::Operator(Shr) => Some((8, ">>")),
            TokenKind::Operator(Plus) => Some((9, "+")),
            TokenKind::Operator(Minus) => Some((9, "-")),
            TokenKind::Operator(Star) => Some((10, "*")),
            TokenKind::Operator(Slash) => Some((10, "/")),
            TokenKind::Operator(Percent) => Some((10, "%")),
            TokenKind::Operator(Question) => Some((0, "?:")),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Option<i64> {
        match self.peek()? {
            TokenKind::Operator(Operator::Minus) => {
                self.pos += 1;
                Some(-self.parse_unary()?)
            }
            TokenKind::Operator(Operator::Not) => {
                self.pos += 1;
                Some((self.parse_unary()? == 0) as i64)
            }
            TokenKind::Operator(Operator::Tilde) => {
                self.pos += 1;
                Some(!self.parse_unary()?)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Option<i64> {
        match self.bump()?.clone() {
            TokenKind::IntConstant(v) => Some(v),
            TokenKind::Identifier(_) => Some(0),
            TokenKind::Operator(Operator::LParen) => {
                let v = self.parse_expr(0)?;
                if !matches!(self.bump(), Some(TokenKind::Operator(Operator::RParen))) {
                    return None;
                }
                Some(v)
            }
            _ => None,
        }
    }
}

fn apply_binop(op: &str, l: i64, r: i64) -> i64 {
    match op {
        "||" => ((l != 0) || (r != 0)) as i64,
        "&&" => ((l != 0) && (r != 0)) as i64,
        "==" => (l == r) as i64,
        "!=" => (l != r) as i64,
        "<" => (l < r) as i64,
        "<=" => (l <= r) as i64,
        ">" => (l > r) as i64,
        ">=" => (l >= r) as i64,
        "+" => l + r,
        "-" => l - r,
        "*" => l * r,
        "/" => if r == 0 { 0 } else { l / r },
        "%" => if r == 0 { 0 } else { l % r },
        "&" => l & r,
        "|" => l | r,
        "^" => l ^ r,
        "<<" => l << (r & 63),
        ">>" => l >> (r & 63),
        _ => 0,
    }
}
