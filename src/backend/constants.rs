//! Minimal-width constant loads.

use crate::ir::{Span, Type};

use super::instr::Instr;
use super::GenError;

/// Pick the narrowest load instruction for an integer constant.
pub fn int_const(value: i32) -> Instr {
    if (-1..=5).contains(&value) {
        Instr::Iconst(value)
    } else if (-128..=127).contains(&value) {
        Instr::Bipush(value)
    } else if (-32768..=32767).contains(&value) {
        Instr::Sipush(value)
    } else {
        Instr::Ldc(value)
    }
}

/// Lower a literal element to its load instruction.
///
/// Booleans reuse the integer encodings for 0 and 1. String literals have
/// no load form in this backend and are rejected rather than silently
/// dropped.
pub fn literal(text: &str, ty: &Type, span: Span) -> Result<Instr, GenError> {
    match ty {
        Type::Int => match text.trim().parse::<i32>() {
            Ok(value) => Ok(int_const(value)),
            Err(_) => Err(GenError::unsupported(
                format!("integer literal '{}'", text),
                span,
            )),
        },
        Type::Boolean => match text.trim() {
            "true" | "1" => Ok(int_const(1)),
            "false" | "0" => Ok(int_const(0)),
            other => Err(GenError::unsupported(
                format!("boolean literal '{}'", other),
                span,
            )),
        },
        other => Err(GenError::unsupported(
            format!("literal of type {:?}", other),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recover the constant value from the emitted instruction.
    fn decode(instr: &Instr) -> i32 {
        match instr {
            Instr::Iconst(v) | Instr::Bipush(v) | Instr::Sipush(v) | Instr::Ldc(v) => *v,
            other => panic!("not a constant load: {:?}", other),
        }
    }

    #[test]
    fn quick_form_covers_minus_one_to_five() {
        assert_eq!(int_const(-1), Instr::Iconst(-1));
        assert_eq!(int_const(0), Instr::Iconst(0));
        assert_eq!(int_const(5), Instr::Iconst(5));
    }

    #[test]
    fn byte_width_outside_quick_range() {
        assert_eq!(int_const(-2), Instr::Bipush(-2));
        assert_eq!(int_const(6), Instr::Bipush(6));
        assert_eq!(int_const(-128), Instr::Bipush(-128));
        assert_eq!(int_const(127), Instr::Bipush(127));
    }

    #[test]
    fn short_width_outside_byte_range() {
        assert_eq!(int_const(-129), Instr::Sipush(-129));
        assert_eq!(int_const(128), Instr::Sipush(128));
        assert_eq!(int_const(200), Instr::Sipush(200));
        assert_eq!(int_const(-32768), Instr::Sipush(-32768));
        assert_eq!(int_const(32767), Instr::Sipush(32767));
    }

    #[test]
    fn constant_pool_beyond_short_range() {
        assert_eq!(int_const(32768), Instr::Ldc(32768));
        assert_eq!(int_const(-32769), Instr::Ldc(-32769));
        assert_eq!(int_const(i32::MAX), Instr::Ldc(i32::MAX));
    }

    #[test]
    fn emitted_instruction_round_trips_the_value() {
        for v in [
            i32::MIN,
            -32769,
            -32768,
            -129,
            -128,
            -1,
            0,
            5,
            6,
            127,
            128,
            32767,
            32768,
            i32::MAX,
        ] {
            assert_eq!(decode(&int_const(v)), v);
        }
    }

    #[test]
    fn boolean_literals_use_quick_constants() {
        let t = literal("true", &Type::Boolean, Span::default()).unwrap();
        let f = literal("0", &Type::Boolean, Span::default()).unwrap();
        assert_eq!(t, Instr::Iconst(1));
        assert_eq!(f, Instr::Iconst(0));
    }

    #[test]
    fn string_literal_is_rejected() {
        let err = literal("hi", &Type::Str, Span::new(3, 7)).unwrap_err();
        assert!(matches!(
            err,
            GenError::UnsupportedConstruct { line: 3, column: 7, .. }
        ));
    }
}
