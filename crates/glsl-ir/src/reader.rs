//! IL text reader (`spec.md` §4.10.5): a complete re-parser for the
//! format `writer.rs` produces. Builds temporary variable/address/label
//! tables, accepts forward label references, and rejects any program
//! left with an unresolved label at end of input.

use glsl_utils::FxHashMap;

use crate::instr::{Guard, InstrKind, Mask, Reg, Swizzle};
use crate::opcode::{Cond, Opcode};
use crate::program::ShaderProgram;
use crate::progvar::{AddrId, BlockId, ProgVarId};

#[derive(Debug)]
pub struct ReadError(pub String);

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IL read error: {}", self.0)
    }
}

impl std::error::Error for ReadError {}

fn err(msg: impl Into<String>) -> ReadError {
    ReadError(msg.into())
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parses a decimal variable reference like `$12` or `a3`, returning the
/// numeric id.
fn parse_id(token: &str, prefix: char) -> Result<u32, ReadError> {
    let token = token.trim();
    let token = token.strip_prefix(prefix).ok_or_else(|| err(format!("expected `{prefix}` id in `{token}`")))?;
    token.parse().map_err(|_| err(format!("bad numeric id `{token}`")))
}

fn parse_swizzle(s: &str) -> Result<[u8; 4], ReadError> {
    let mut out = [0u8, 1, 2, 3];
    for (i, ch) in s.chars().enumerate().take(4) {
        out[i] = match ch {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            'w' => 3,
            _ => return Err(err(format!("bad swizzle component `{ch}`"))),
        };
    }
    Ok(out)
}

fn parse_mask(s: &str) -> Mask {
    let mut m = 0u8;
    for ch in s.chars() {
        let bit = match ch {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            'w' => 3,
            _ => continue,
        };
        m |= 1 << bit;
    }
    Mask(m)
}

/// Parses a source register `-$<id>[<offset>|a<addr>+<offset>].<swizzle>`.
fn parse_src_reg(text: &str, map: &FxHashMap<u32, ProgVarId>) -> Result<Reg, ReadError> {
    let text = text.trim();
    let (negate, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (base, rest) = split_base(text)?;
    let id = parse_id(base, '$')?;
    let var = *map.get(&id).ok_or_else(|| err(format!("undeclared register ${id}")))?;

    let mut offset = 0u32;
    let mut addr = None;
    let mut rest = rest;
    if let Some(bracket_end) = rest.find(']') {
        if rest.starts_with('[') {
            let inner = &rest[1..bracket_end];
            if let Some(plus) = inner.find('+') {
                let a = parse_id(&inner[..plus], 'a')?;
                let o: u32 = inner[plus + 1..].parse().map_err(|_| err("bad offset"))?;
                addr = Some(AddrId::from_raw(a));
                offset = o;
            } else {
                offset = inner.parse().map_err(|_| err("bad offset"))?;
            }
            rest = &rest[bracket_end + 1..];
        }
    }
    let swizzle = if let Some(sw) = rest.strip_prefix('.') {
        Swizzle(parse_swizzle(sw)?)
    } else {
        Swizzle::IDENTITY
    };
    Ok(Reg { var, offset, addr, swizzle, mask: Mask::XYZW, negate })
}

fn parse_dst_reg(text: &str, map: &FxHashMap<u32, ProgVarId>) -> Result<Reg, ReadError> {
    let text = text.trim();
    let (base, rest) = split_base(text)?;
    let id = parse_id(base, '$')?;
    let var = *map.get(&id).ok_or_else(|| err(format!("undeclared register ${id}")))?;
    let mut offset = 0;
    let mut rest = rest;
    if let Some(bracket_end) = rest.find(']') {
        if rest.starts_with('[') {
            offset = rest[1..bracket_end].parse().map_err(|_| err("bad offset"))?;
            rest = &rest[bracket_end + 1..];
        }
    }
    let mask = if let Some(m) = rest.strip_prefix('.') { parse_mask(m) } else { Mask::XYZW };
    Ok(Reg { var, offset, addr: None, swizzle: Swizzle::IDENTITY, mask, negate: false })
}

fn split_base(text: &str) -> Result<(&str, &str), ReadError> {
    let bracket = text.find(['[', '.']).unwrap_or(text.len());
    Ok((&text[..bracket], &text[bracket..]))
}

fn parse_guard(text: &str) -> Result<Guard, ReadError> {
    let text = text.trim().trim_start_matches('(').trim_end_matches(')');
    let (cond, mask) = text.split_once('.').unwrap_or((text, "xyzw"));
    let cond: Cond = cond.parse().map_err(|_| err(format!("bad condition `{cond}`")))?;
    let selectors = parse_swizzle(mask)?;
    Ok(Guard { cond, selectors })
}

/// Re-parses IL text previously produced by [`crate::writer::render`]
/// into an equivalent [`ShaderProgram`].
pub fn read_program(text: &str) -> Result<(ShaderProgram, glsl_types::TypeStore), ReadError> {
    let mut program = ShaderProgram::empty();
    let mut types = glsl_types::TypeStore::new();
    let mut var_map: FxHashMap<u32, ProgVarId> = FxHashMap::default();
    let mut label_map: FxHashMap<u32, usize> = FxHashMap::default();
    let mut pending_labels: Vec<(u32, usize)> = Vec::new();
    let mut forward_patches: Vec<(BlockId, usize, usize)> = Vec::new();
    let mut entered_body = false;
    let mut current_block: Option<BlockId> = None;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(block_id_str) = line.strip_suffix(':') {
            entered_body = true;
            let id: u32 = block_id_str
                .strip_prefix('b')
                .ok_or_else(|| err(format!("bad block label `{line}`")))?
                .parse()
                .map_err(|_| err("bad block id"))?;
            let label = *label_map.entry(id).or_insert_with(|| program.new_label());
            let block = program.bind_label(label);
            current_block = Some(block);
            continue;
        }
        if entered_body {
            if let Some(patch) = parse_instruction(
                line,
                &var_map,
                &mut label_map,
                &mut pending_labels,
                &mut program,
                current_block,
            )? {
                forward_patches.push(patch);
            }
            continue;
        }
        parse_decl(line, &mut program, &mut var_map, &mut types)?;
    }

    for &(target, label) in &pending_labels {
        if program.label_target(label).is_none() {
            return Err(err(format!("unresolved label reference to b{target}")));
        }
    }

    for (block, index, label) in forward_patches {
        let resolved = program.label_target(label).expect("checked above");
        if let InstrKind::Branch { target, .. } = &mut program.block_mut(block).instructions[index].kind {
            *target = resolved;
        }
    }

    Ok((program, types))
}

fn parse_precision(word: &str) -> Option<glsl_types::Precision> {
    use glsl_types::Precision::*;
    match word {
        "low" => Some(Low),
        "medium" => Some(Medium),
        "high" => Some(High),
        _ => None,
    }
}

fn parse_type_keyword(types: &mut glsl_types::TypeStore, word: &str, precision: glsl_types::Precision) -> Option<glsl_types::TypeId> {
    use glsl_types::{BaseKind, SamplerKind};
    Some(match word {
        "void" => types.void(),
        "bool" => types.scalar(BaseKind::Bool, precision),
        "bvec2" => types.vector(BaseKind::Bool, precision, 2),
        "bvec3" => types.vector(BaseKind::Bool, precision, 3),
        "bvec4" => types.vector(BaseKind::Bool, precision, 4),
        "int" => types.scalar(BaseKind::Int, precision),
        "ivec2" => types.vector(BaseKind::Int, precision, 2),
        "ivec3" => types.vector(BaseKind::Int, precision, 3),
        "ivec4" => types.vector(BaseKind::Int, precision, 4),
        "float" => types.scalar(BaseKind::Float, precision),
        "vec2" => types.vector(BaseKind::Float, precision, 2),
        "vec3" => types.vector(BaseKind::Float, precision, 3),
        "vec4" => types.vector(BaseKind::Float, precision, 4),
        "mat2" => types.matrix(precision, 2),
        "mat3" => types.matrix(precision, 3),
        "mat4" => types.matrix(precision, 4),
        "sampler2D" => types.sampler(SamplerKind::Sampler2D, precision),
        "samplerCube" => types.sampler(SamplerKind::SamplerCube, precision),
        "sampler3D" => types.sampler(SamplerKind::Sampler3D, precision),
        _ => return None,
    })
}

/// Parses the constant literal after `=` in a `PARAM $id:type=...;` line
/// into one [`glsl_const::Constant`] per slot.
fn parse_const_literal(text: &str, n: u8) -> Vec<glsl_const::Constant> {
    use glsl_const::{Channel, Constant};
    let text = text.trim();
    let parse_channel = |s: &str| -> Channel {
        let s = s.trim();
        if let Ok(i) = s.parse::<i32>() {
            Channel::Int(i)
        } else if let Ok(f) = s.parse::<f32>() {
            Channel::Float(f)
        } else {
            Channel::Float(0.0)
        }
    };
    if !text.starts_with('{') {
        let mut channels = [Channel::Unused; 4];
        channels[0] = parse_channel(text);
        return vec![Constant::from_channels(channels)];
    }
    let inner = text.trim_start_matches('{').trim_end_matches('}');
    if inner.contains('{') {
        inner
            .split("},")
            .map(|slot| {
                let slot = slot.trim().trim_start_matches('{').trim_end_matches('}');
                let mut channels = [Channel::Unused; 4];
                for (i, part) in slot.split(',').enumerate().take(4) {
                    channels[i] = parse_channel(part);
                }
                Constant::from_channels(channels)
            })
            .collect()
    } else {
        let mut channels = [Channel::Unused; 4];
        for (i, part) in inner.split(',').enumerate().take(n as usize) {
            channels[i] = parse_channel(part);
        }
        vec![Constant::from_channels(channels)]
    }
}

fn parse_decl(
    line: &str,
    program: &mut ShaderProgram,
    var_map: &mut FxHashMap<u32, ProgVarId>,
    types: &mut glsl_types::TypeStore,
) -> Result<(), ReadError> {
    if let Some(rest) = line.strip_prefix("ADDRESS") {
        let _ = parse_id(rest.trim().trim_end_matches(';'), 'a')?;
        program.vars.create_addr();
        return Ok(());
    }
    let (kind, rest) = line.split_once(char::is_whitespace).ok_or_else(|| err("empty declaration"))?;
    let rest = rest.trim().trim_end_matches(';');
    let (id_part, remainder) = rest.split_once(':').ok_or_else(|| err("declaration missing `:`"))?;
    let id_part = id_part.trim();
    let size: u32 = match id_part.find('[') {
        Some(b) => id_part[b + 1..].trim_end_matches(']').parse().unwrap_or(1),
        None => 1,
    };
    let id_token = id_part.find('[').map(|b| &id_part[..b]).unwrap_or(id_part);
    let id = parse_id(id_token, '$')?;

    let (before_eq, external) = remainder.split_once('=').unwrap_or((remainder, ""));
    let words: Vec<&str> = before_eq.split_whitespace().collect();
    let (precision, type_word) = match words.as_slice() {
        [p, t] => (parse_precision(p).unwrap_or(glsl_types::Precision::Undefined), *t),
        [t] => (glsl_types::Precision::Undefined, *t),
        _ => (glsl_types::Precision::Undefined, "float"),
    };
    // `PARAM $id:type={...}` constants embed the type right before `=`;
    // strip any trailing `@BINDING[n]` annotation first.
    let type_word = type_word.split('@').next().unwrap_or(type_word);
    let ty = parse_type_keyword(types, type_word, precision).unwrap_or_else(|| types.void());

    let is_param_constant = kind == "PARAM" && !before_eq.contains('@');
    let name = external.to_string();
    let var_id = match kind {
        "INPUT" => program.vars.create_in(ty, precision, size, name, crate::progvar::Binding::None),
        "OUTPUT" => program.vars.create_out(ty, precision, size, name, crate::progvar::Binding::None),
        "PARAM" if is_param_constant => {
            let n = glsl_const::significant_channels(match types.get(ty) {
                glsl_types::TypeKind::Primitive(desc) => desc.shape,
                _ => glsl_types::Shape::Scalar,
            });
            let value = parse_const_literal(external, n);
            program.vars.create_const(value.clone(), ty, 0, move |a, b| {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(*y, n))
            })
        }
        "PARAM" => program.vars.create_param(ty, precision, size, name, crate::progvar::Binding::None),
        "TEMP" => program.vars.create_temp(ty, precision, size),
        other => return Err(err(format!("unknown declaration keyword `{other}`"))),
    };
    var_map.insert(id, var_id);
    Ok(())
}

fn resolve_label(
    target: u32,
    label_map: &mut FxHashMap<u32, usize>,
    pending: &mut Vec<(u32, usize)>,
    program: &mut ShaderProgram,
) -> usize {
    if let Some(&l) = label_map.get(&target) {
        return l;
    }
    let label = program.new_label();
    label_map.insert(target, label);
    pending.push((target, label));
    label
}

fn parse_instruction(
    line: &str,
    var_map: &FxHashMap<u32, ProgVarId>,
    label_map: &mut FxHashMap<u32, usize>,
    pending: &mut Vec<(u32, usize)>,
    program: &mut ShaderProgram,
    current_block: Option<BlockId>,
) -> Result<Option<(BlockId, usize, usize)>, ReadError> {
    let line = line.trim_end_matches(';').trim();
    let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let (mnemonic, _dot_prec) = mnemonic.split_once('.').unwrap_or((mnemonic, ""));
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| err(format!("unknown opcode `{mnemonic}`")))?;
    let block = current_block.ok_or_else(|| err("instruction before any block label"))?;
    let mut forward_patch = None;

    let kind = if matches!(opcode, Opcode::Bra | Opcode::Cal) {
        let (target, guard_text) =
            rest.split_once('(').map(|(t, g)| (t.trim(), Some(g.trim_end_matches(')')))).unwrap_or((rest.trim(), None));
        let target_id: u32 = target
            .strip_prefix('b')
            .ok_or_else(|| err("branch target must be bNN"))?
            .parse()
            .map_err(|_| err("bad branch target"))?;
        let label = resolve_label(target_id, label_map, pending, program);
        let guard = match guard_text {
            Some(g) => parse_guard(g)?,
            None => Guard::default(),
        };
        let resolved_target = match program.label_target(label) {
            Some(t) => t,
            None => {
                forward_patch = Some(label);
                BlockId::from_raw(0)
            }
        };
        InstrKind::Branch { target: resolved_target, guard }
    } else if matches!(opcode, Opcode::If | Opcode::Scc) {
        let guard = if rest.trim().is_empty() { Guard::default() } else { parse_guard(rest)? };
        InstrKind::Cond { guard }
    } else if matches!(opcode, Opcode::Arl) {
        let (dst, src) = rest.split_once(',').ok_or_else(|| err("ARL needs dst, src"))?;
        let dst_id = parse_id(dst.trim(), 'a')?;
        InstrKind::Arl { dst: AddrId::from_raw(dst_id), src: parse_src_reg(src, var_map)? }
    } else {
        let parts: Vec<&str> = rest.split(',').collect();
        match parts.len() {
            0 | 1 if parts[0].trim().is_empty() => InstrKind::Base,
            1 => InstrKind::Src { src: parse_src_reg(parts[0], var_map)? },
            2 => InstrKind::Unary { dst: parse_dst_reg(parts[0], var_map)?, src: parse_src_reg(parts[1], var_map)? },
            3 => InstrKind::Binary {
                dst: parse_dst_reg(parts[0], var_map)?,
                l: parse_src_reg(parts[1], var_map)?,
                r: parse_src_reg(parts[2], var_map)?,
            },
            4 => InstrKind::Ternary {
                dst: parse_dst_reg(parts[0], var_map)?,
                a: parse_src_reg(parts[1], var_map)?,
                b: parse_src_reg(parts[2], var_map)?,
                c: parse_src_reg(parts[3], var_map)?,
            },
            _ => return Err(err(format!("unsupported operand count for `{mnemonic}`"))),
        }
    };
    let index = program.block(block).instructions.len();
    program.block_mut(block).instructions.push(crate::instr::Instruction::new(opcode, kind));
    Ok(forward_patch.map(|label| (block, index, label)))
}
