//! The target instruction set.
//!
//! A closed enum of the Jasmin instructions this backend emits, with a
//! `Display` impl producing the textual mnemonics. Register-addressed
//! instructions render the compact `_0`..`_3` suffix for low slots and the
//! spaced indexed form for slot 4 and above; labels render as pseudo
//! instructions (`name:`) since the output is resolved by the assembler,
//! not by byte offsets.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
}

impl InvokeKind {
    fn mnemonic(&self) -> &'static str {
        match self {
            InvokeKind::Static => "invokestatic",
            InvokeKind::Virtual => "invokevirtual",
            InvokeKind::Special => "invokespecial",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    // Constant loads, one variant per encoding width.
    Iconst(i32),
    Bipush(i32),
    Sipush(i32),
    Ldc(i32),

    // Register transfers.
    Iload(u16),
    Aload(u16),
    Istore(u16),
    Astore(u16),
    Iinc { slot: u16, delta: i32 },

    // Integer arithmetic and logic.
    Iadd,
    Isub,
    Imul,
    Idiv,
    Iand,

    // Arrays.
    Iaload,
    Iastore,
    Arraylength,
    NewarrayInt,

    // Objects and stack shape.
    New(String),
    Dup,
    Pop,

    // Calls and fields.
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        params: Vec<String>,
        ret: String,
    },
    Getfield {
        owner: String,
        name: String,
        desc: String,
    },
    Putfield {
        owner: String,
        name: String,
        desc: String,
    },

    // Control flow.
    Ifeq(String),
    Ifne(String),
    Iflt(String),
    Ifle(String),
    Ifgt(String),
    Ifge(String),
    IfIcmplt(String),
    IfIcmpge(String),
    Goto(String),
    Label(String),

    // Returns.
    Ireturn,
    Areturn,
    Return,
}

/// Register suffix selection: slots 0-3 have dedicated compact opcodes,
/// higher slots take an explicit index operand.
fn slot_suffix(slot: u16) -> String {
    if slot <= 3 {
        format!("_{}", slot)
    } else {
        format!(" {}", slot)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Iconst(-1) => write!(f, "iconst_m1"),
            Instr::Iconst(v) => write!(f, "iconst_{}", v),
            Instr::Bipush(v) => write!(f, "bipush {}", v),
            Instr::Sipush(v) => write!(f, "sipush {}", v),
            Instr::Ldc(v) => write!(f, "ldc {}", v),

            Instr::Iload(slot) => write!(f, "iload{}", slot_suffix(*slot)),
            Instr::Aload(slot) => write!(f, "aload{}", slot_suffix(*slot)),
            Instr::Istore(slot) => write!(f, "istore{}", slot_suffix(*slot)),
            Instr::Astore(slot) => write!(f, "astore{}", slot_suffix(*slot)),
            Instr::Iinc { slot, delta } => write!(f, "iinc {} {}", slot, delta),

            Instr::Iadd => write!(f, "iadd"),
            Instr::Isub => write!(f, "isub"),
            Instr::Imul => write!(f, "imul"),
            Instr::Idiv => write!(f, "idiv"),
            Instr::Iand => write!(f, "iand"),

            Instr::Iaload => write!(f, "iaload"),
            Instr::Iastore => write!(f, "iastore"),
            Instr::Arraylength => write!(f, "arraylength"),
            Instr::NewarrayInt => write!(f, "newarray int"),

            Instr::New(name) => write!(f, "new {}", name),
            Instr::Dup => write!(f, "dup"),
            Instr::Pop => write!(f, "pop"),

            Instr::Invoke {
                kind,
                owner,
                name,
                params,
                ret,
            } => write!(
                f,
                "{} {}/{}({}){}",
                kind.mnemonic(),
                owner,
                name,
                params.concat(),
                ret
            ),
            Instr::Getfield { owner, name, desc } => {
                write!(f, "getfield {}/{} {}", owner, name, desc)
            }
            Instr::Putfield { owner, name, desc } => {
                write!(f, "putfield {}/{} {}", owner, name, desc)
            }

            Instr::Ifeq(label) => write!(f, "ifeq {}", label),
            Instr::Ifne(label) => write!(f, "ifne {}", label),
            Instr::Iflt(label) => write!(f, "iflt {}", label),
            Instr::Ifle(label) => write!(f, "ifle {}", label),
            Instr::Ifgt(label) => write!(f, "ifgt {}", label),
            Instr::Ifge(label) => write!(f, "ifge {}", label),
            Instr::IfIcmplt(label) => write!(f, "if_icmplt {}", label),
            Instr::IfIcmpge(label) => write!(f, "if_icmpge {}", label),
            Instr::Goto(label) => write!(f, "goto {}", label),
            Instr::Label(label) => write!(f, "{}:", label),

            Instr::Ireturn => write!(f, "ireturn"),
            Instr::Areturn => write!(f, "areturn"),
            Instr::Return => write!(f, "return"),
        }
    }
}
