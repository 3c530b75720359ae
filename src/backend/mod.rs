//! Lowering of the typed class IR into textual Jasmin assembly.
//!
//! The entry point is [`generate_class`]: one call lowers one class, either
//! producing the complete assembly text or failing with a [`GenError`]. No
//! partial output is produced. Generation holds no state outside the call,
//! so independent classes may be lowered concurrently.

pub mod class;
pub mod codegen;
pub mod constants;
pub mod instr;
pub mod stack;

use std::fmt;

use crate::ir::{ClassUnit, Span};

pub(crate) const TAB: &str = "    ";

/// Fatal generation errors. The backend performs no semantic re-validation;
/// these cover structural defects in the IR it was handed.
#[derive(Clone, Debug, PartialEq)]
pub enum GenError {
    /// An instruction, operator, or element the backend has no lowering for.
    UnsupportedConstruct {
        what: String,
        line: u32,
        column: u32,
    },
    /// An operand name absent from the current method's variable table.
    MissingBinding {
        name: String,
        line: u32,
        column: u32,
    },
    /// A type that cannot be rendered as a descriptor.
    MalformedDescriptor { message: String },
}

impl GenError {
    pub(crate) fn unsupported(what: impl Into<String>, span: Span) -> Self {
        GenError::UnsupportedConstruct {
            what: what.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub(crate) fn missing(name: impl Into<String>, span: Span) -> Self {
        GenError::MissingBinding {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub(crate) fn descriptor(message: impl Into<String>) -> Self {
        GenError::MalformedDescriptor {
            message: message.into(),
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::UnsupportedConstruct { what, line, column } => {
                write!(f, "unsupported construct at {}:{}: {}", line, column, what)
            }
            GenError::MissingBinding { name, line, column } => {
                write!(
                    f,
                    "missing binding at {}:{}: '{}' has no slot in the variable table",
                    line, column, name
                )
            }
            GenError::MalformedDescriptor { message } => {
                write!(f, "malformed descriptor: {}", message)
            }
        }
    }
}

/// Lower one class into Jasmin assembly text.
pub fn generate_class(unit: &ClassUnit) -> Result<String, GenError> {
    class::ClassEmitter::new(unit).emit()
}
