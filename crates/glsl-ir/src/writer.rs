//! Bit-exact IL text writer (`spec.md` §4.10.4).

use std::fmt::Write as _;

use glsl_const::Channel;
use glsl_types::{BaseKind, Precision, Shape, TypeKind, TypeStore};

use crate::instr::{InstrKind, Mask, Reg};
use crate::progvar::{Binding, ProgVarTable, Segment};
use crate::program::ShaderProgram;

const HEADER: &str = "\
# ------------------------------------------------------------
# IL Output
# ------------------------------------------------------------
";

fn precision_prefix(p: Precision) -> &'static str {
    match p {
        Precision::Low => "low ",
        Precision::Medium => "medium ",
        Precision::High => "high ",
        Precision::Undefined => "",
    }
}

fn type_keyword(types: &TypeStore, ty: glsl_types::TypeId) -> String {
    match types.get(ty) {
        TypeKind::Void => "void".to_string(),
        TypeKind::Primitive(desc) => {
            let base = match (desc.base, desc.shape) {
                (BaseKind::Bool, Shape::Scalar) => "bool",
                (BaseKind::Bool, Shape::Vector(2)) => "bvec2",
                (BaseKind::Bool, Shape::Vector(3)) => "bvec3",
                (BaseKind::Bool, Shape::Vector(4)) => "bvec4",
                (BaseKind::Int, Shape::Scalar) => "int",
                (BaseKind::Int, Shape::Vector(2)) => "ivec2",
                (BaseKind::Int, Shape::Vector(3)) => "ivec3",
                (BaseKind::Int, Shape::Vector(4)) => "ivec4",
                (BaseKind::Float, Shape::Scalar) => "float",
                (BaseKind::Float, Shape::Vector(2)) => "vec2",
                (BaseKind::Float, Shape::Vector(3)) => "vec3",
                (BaseKind::Float, Shape::Vector(4)) => "vec4",
                (_, Shape::Matrix(2)) => "mat2",
                (_, Shape::Matrix(3)) => "mat3",
                (_, Shape::Matrix(4)) => "mat4",
                _ => "float",
            };
            base.to_string()
        }
        TypeKind::Sampler { kind, .. } => match kind {
            glsl_types::SamplerKind::Sampler2D => "sampler2D".to_string(),
            glsl_types::SamplerKind::Sampler3D => "sampler3D".to_string(),
            glsl_types::SamplerKind::SamplerCube => "samplerCube".to_string(),
        },
        _ => "void".to_string(),
    }
}

fn size_suffix(size: u32) -> String {
    if size <= 1 {
        String::new()
    } else {
        format!("[{size}]")
    }
}

fn binding_suffix(binding: &Binding, segment: Segment, name: &str) -> String {
    match (segment, binding) {
        (Segment::In, Binding::Attrib { location }) => format!("@ATTRIB[{location}]={name}"),
        (Segment::In, Binding::Varying { location }) => format!("@VARYING[{location}]={name}"),
        (Segment::Out, Binding::Varying { location }) => format!("@VARYING[{location}]={name}"),
        (Segment::Param, Binding::Param { location }) => format!("@PARAM[{location}]={name}"),
        _ => format!("={name}"),
    }
}

fn write_const_value(out: &mut String, values: &[glsl_const::Constant], n: u8) {
    let fmt_channel = |c: Channel| -> String {
        match c {
            Channel::Bool(b) => if b { "1".into() } else { "0".into() },
            Channel::Int(i) => i.to_string(),
            Channel::Float(f) => format!("{f}"),
            Channel::Sampler(s) => s.to_string(),
            Channel::Unused => "0".into(),
        }
    };
    if values.len() == 1 {
        let c = values[0];
        if n <= 1 {
            out.push_str(&fmt_channel(c.channels[0]));
        } else {
            out.push('{');
            for i in 0..n as usize {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&fmt_channel(c.channels[i]));
            }
            out.push('}');
        }
    } else {
        out.push('{');
        for (i, c) in values.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push('{');
            for j in 0..n as usize {
                if j > 0 {
                    out.push(',');
                }
                out.push_str(&fmt_channel(c.channels[j]));
            }
            out.push('}');
        }
        out.push('}');
    }
}

fn write_reg(out: &mut String, reg: &Reg, is_dst: bool) {
    if !is_dst && reg.negate {
        out.push('-');
    }
    write!(out, "${}", reg.var.raw()).unwrap();
    if let Some(addr) = reg.addr {
        write!(out, "[a{}+{}]", addr.raw(), reg.offset).unwrap();
    } else if reg.offset != 0 {
        write!(out, "[{}]", reg.offset).unwrap();
    }
    if is_dst {
        if reg.mask != Mask::XYZW {
            write!(out, ".{}", reg.mask.to_string()).unwrap();
        }
    } else if reg.swizzle != crate::instr::Swizzle::IDENTITY {
        let letters = "xyzw";
        out.push('.');
        for idx in reg.swizzle.0 {
            out.push(letters.as_bytes()[idx as usize] as char);
        }
    }
}

/// Walks every emitted instruction, marking `used` on every `ProgVarId`
/// it references (`spec.md` §4.10.4).
fn mark_used(blocks: &index_vec::IndexVec<crate::progvar::BlockId, crate::block::Block>, vars: &mut ProgVarTable) {
    let mark_reg = |vars: &mut ProgVarTable, reg: &Reg| {
        vars.get_mut(reg.var).used = true;
    };
    for block in blocks.iter() {
        for instr in &block.instructions {
            match &instr.kind {
                InstrKind::Base | InstrKind::Phi | InstrKind::Cond { .. } | InstrKind::Branch { .. } => {}
                InstrKind::Unary { dst, src } => {
                    mark_reg(vars, dst);
                    mark_reg(vars, src);
                }
                InstrKind::Binary { dst, l, r } => {
                    mark_reg(vars, dst);
                    mark_reg(vars, l);
                    mark_reg(vars, r);
                }
                InstrKind::Ternary { dst, a, b, c } => {
                    mark_reg(vars, dst);
                    mark_reg(vars, a);
                    mark_reg(vars, b);
                    mark_reg(vars, c);
                }
                InstrKind::Src { src } => mark_reg(vars, src),
                InstrKind::Swz { dst, src, .. } => {
                    mark_reg(vars, dst);
                    vars.get_mut(*src).used = true;
                }
                InstrKind::Tex { dst, coords, sampler, offset, .. } => {
                    mark_reg(vars, dst);
                    mark_reg(vars, coords);
                    vars.get_mut(*sampler).used = true;
                    if let Some(offset) = offset {
                        mark_reg(vars, offset);
                    }
                }
                InstrKind::Arl { src, .. } => mark_reg(vars, src),
            }
        }
    }
}

fn write_instruction(out: &mut String, instr: &crate::instr::Instruction) {
    out.push('\t');
    match &instr.kind {
        InstrKind::Base => {
            write!(out, "{};\n", instr.opcode).unwrap();
        }
        InstrKind::Unary { dst, src } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, dst, true);
            out.push_str(", ");
            write_reg(out, src, false);
            out.push_str(";\n");
        }
        InstrKind::Binary { dst, l, r } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, dst, true);
            out.push_str(", ");
            write_reg(out, l, false);
            out.push_str(", ");
            write_reg(out, r, false);
            out.push_str(";\n");
        }
        InstrKind::Ternary { dst, a, b, c } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, dst, true);
            out.push_str(", ");
            write_reg(out, a, false);
            out.push_str(", ");
            write_reg(out, b, false);
            out.push_str(", ");
            write_reg(out, c, false);
            out.push_str(";\n");
        }
        InstrKind::Src { src } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, src, false);
            out.push_str(";\n");
        }
        InstrKind::Swz { dst, src, options } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, dst, true);
            write!(out, ", ${}", src.raw()).unwrap();
            for opt in options {
                write!(out, ",{opt}").unwrap();
            }
            out.push_str(";\n");
        }
        InstrKind::Tex { dst, coords, sampler, target, .. } => {
            write!(out, "{} ", instr.opcode).unwrap();
            write_reg(out, dst, true);
            out.push_str(", ");
            write_reg(out, coords, false);
            write!(out, ", ${}, ({});\n", sampler.raw(), target).unwrap();
        }
        InstrKind::Arl { dst, src } => {
            write!(out, "ARL a{}, ", dst.raw()).unwrap();
            write_reg(out, src, false);
            out.push_str(";\n");
        }
        InstrKind::Branch { target, guard } => {
            write!(out, "{} b{}", instr.opcode, target.raw()).unwrap();
            write_guard(out, guard);
            out.push_str(";\n");
        }
        InstrKind::Cond { guard } => {
            write!(out, "{}", instr.opcode).unwrap();
            write_guard(out, guard);
            out.push_str(";\n");
        }
        InstrKind::Phi => {
            out.push_str("PHI;\n");
        }
    }
}

fn write_guard(out: &mut String, guard: &crate::instr::Guard) {
    if guard.cond == crate::opcode::Cond::T && guard.selectors == [0, 1, 2, 3] {
        return;
    }
    let letters = "xyzw";
    out.push_str(" (");
    write!(out, "{}", guard.cond).unwrap();
    out.push('.');
    for idx in guard.selectors {
        out.push(letters.as_bytes()[idx as usize] as char);
    }
    out.push(')');
}

/// Renders `program` to the exact IL text format described in `spec.md`
/// §4.10.4. Recomputes the `used` liveness flags from a fresh all-unused
/// state before writing the header.
pub fn render(program: &mut ShaderProgram, types: &TypeStore) -> String {
    let count = program.vars.iter().count();
    for i in 0..count {
        let id = crate::progvar::ProgVarId::from_raw(i as u32);
        program.vars.get_mut(id).used = false;
    }
    mark_used(&program.blocks, &mut program.vars);

    let mut out = String::new();
    out.push_str(HEADER);

    for var in program.vars.iter().filter(|v| v.used) {
        let name = var.external_name.clone().unwrap_or_default();
        match var.segment {
            Segment::In => {
                write!(
                    out,
                    "INPUT  ${}{}:{}{}{};\n",
                    var.id.raw(),
                    size_suffix(var.size),
                    precision_prefix(var.precision),
                    type_keyword(types, var.ty),
                    binding_suffix(&var.binding, var.segment, &name)
                )
                .unwrap();
            }
            Segment::Out => {
                write!(
                    out,
                    "OUTPUT ${}{}:{}{}{};\n",
                    var.id.raw(),
                    size_suffix(var.size),
                    precision_prefix(var.precision),
                    type_keyword(types, var.ty),
                    binding_suffix(&var.binding, var.segment, &name)
                )
                .unwrap();
            }
            Segment::Param => {
                if let Some(values) = &var.constant {
                    write!(out, "PARAM  ${}:{}=", var.id.raw(), type_keyword(types, var.ty)).unwrap();
                    let n = glsl_const::significant_channels(type_shape(types, var.ty));
                    write_const_value(&mut out, values, n);
                    out.push_str(";\n");
                } else {
                    write!(
                        out,
                        "PARAM  ${}{}:{}{}{};\n",
                        var.id.raw(),
                        size_suffix(var.size),
                        precision_prefix(var.precision),
                        type_keyword(types, var.ty),
                        binding_suffix(&var.binding, var.segment, &name)
                    )
                    .unwrap();
                }
            }
            Segment::Temp => {
                write!(
                    out,
                    "TEMP   ${}{}:{}{};\n",
                    var.id.raw(),
                    size_suffix(var.size),
                    precision_prefix(var.precision),
                    type_keyword(types, var.ty)
                )
                .unwrap();
            }
            Segment::Const => {
                if let Some(values) = &var.constant {
                    write!(out, "PARAM  ${}:{}=", var.id.raw(), type_keyword(types, var.ty)).unwrap();
                    let n = glsl_const::significant_channels(type_shape(types, var.ty));
                    write_const_value(&mut out, values, n);
                    out.push_str(";\n");
                }
            }
        }
    }
    for a in 0..program.vars.addr_count() {
        writeln!(out, "ADDRESS a{a};").unwrap();
    }

    for (id, block) in program.blocks().iter_enumerated() {
        writeln!(out, "b{}:", id.raw()).unwrap();
        for instr in &block.instructions {
            write_instruction(&mut out, instr);
        }
        out.push('\n');
    }
    out
}

fn type_shape(types: &TypeStore, ty: glsl_types::TypeId) -> Shape {
    match types.get(ty) {
        TypeKind::Primitive(desc) => desc.shape,
        _ => Shape::Scalar,
    }
}

