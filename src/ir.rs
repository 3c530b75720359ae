//! Input model for the backend: a typed, three-address style representation
//! of one class, produced by an upstream lowering pass and read-only here.
//!
//! The backend assumes the usual structural invariants hold: every operand
//! referenced in a method body has an entry in that method's variable table,
//! slot 0 belongs to `this` in instance methods, arrays carry `int` elements,
//! and literal text parses as its declared type.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;

bitflags! {
    /// Access markers for fields and methods, folded JVM-style into one set.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
    }
}

impl AccessFlags {
    /// Declaration keyword prefix, trailing space included ("public static ").
    /// Default access renders as no keyword at all.
    pub fn keywords(&self) -> String {
        let mut out = String::new();
        if self.contains(AccessFlags::PUBLIC) {
            out.push_str("public ");
        }
        if self.contains(AccessFlags::PRIVATE) {
            out.push_str("private ");
        }
        if self.contains(AccessFlags::PROTECTED) {
            out.push_str("protected ");
        }
        if self.contains(AccessFlags::STATIC) {
            out.push_str("static ");
        }
        if self.contains(AccessFlags::FINAL) {
            out.push_str("final ");
        }
        out
    }

    pub fn is_static(&self) -> bool {
        self.contains(AccessFlags::STATIC)
    }
}

/// Source position carried from the upstream pass, used in error reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

/// The closed set of source-level types the backend can lower.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Boolean,
    Str,
    Void,
    Array(Box<Type>),
    Object(String),
    This,
}

impl Type {
    /// Types held in integer registers (`iload`/`istore` family).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Boolean)
    }

    /// Types held as references (`aload`/`astore` family).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Str | Type::Array(_) | Type::Object(_) | Type::This
        )
    }
}

/// An operand position inside an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Literal {
        text: String,
        ty: Type,
    },
    Operand {
        name: String,
        ty: Type,
    },
    ArrayOperand {
        name: String,
        index: Box<Element>,
        ty: Type,
    },
}

impl Element {
    pub fn ty(&self) -> &Type {
        match self {
            Element::Literal { ty, .. }
            | Element::Operand { ty, .. }
            | Element::ArrayOperand { ty, .. } => ty,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    And,
    LessThan,
    GreaterEq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
}

/// Invocation form of a `Call` instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Static,
    Virtual,
    Special,
    NewObject,
    NewArray,
    ArrayLength,
    Constant,
}

/// One IR instruction with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub span: Span,
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Self {
        Instruction {
            kind,
            span: Span::default(),
        }
    }

    pub fn with_span(kind: InstructionKind, span: Span) -> Self {
        Instruction { kind, span }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstructionKind {
    Assign {
        dest: Element,
        rhs: Box<Instruction>,
    },
    SingleOp {
        operand: Element,
    },
    BinaryOp {
        op: BinaryOpKind,
        left: Element,
        right: Element,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Element,
    },
    Call {
        kind: CallKind,
        target: Element,
        method: Option<String>,
        args: Vec<Element>,
        return_type: Type,
    },
    GetField {
        object: Element,
        field: Element,
    },
    PutField {
        object: Element,
        field: Element,
        value: Element,
    },
    Goto {
        label: String,
    },
    CondBranch {
        condition: Box<Instruction>,
        label: String,
    },
    Return {
        operand: Option<Element>,
    },
    NoOp {
        operand: Element,
    },
}

/// Variable-table entry: the pre-assigned frame slot and declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct VarEntry {
    pub slot: u16,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub flags: AccessFlags,
}

#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    pub flags: AccessFlags,
    pub is_constructor: bool,
    pub params: Vec<Element>,
    pub return_type: Type,
    pub instructions: Vec<Instruction>,
    /// Label name paired with the index of the instruction it precedes.
    pub labels: Vec<(String, usize)>,
    pub var_table: HashMap<String, VarEntry>,
}

#[derive(Clone, Debug)]
pub struct ClassUnit {
    pub name: String,
    /// Internal (slash-separated) superclass name; `None` means the
    /// default superclass.
    pub super_name: Option<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    /// Import table: simple name to fully qualified (dot-separated) name.
    pub imports: BTreeMap<String, String>,
}
