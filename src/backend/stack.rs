//! Operand stack accounting.
//!
//! Every emitted instruction has an exact, statically known net effect on
//! the operand stack; invoke effects come from the argument count, the
//! receiver (virtual/special), and whether the call returns a value. The
//! reported `.limit stack` is the maximum depth a linear walk over the
//! emitted sequence reaches. The walk counts both arms of a boolean
//! materialization, which can only over-estimate the true maximum, never
//! under-estimate it.

use super::instr::{Instr, InvokeKind};

/// Net operand-stack change for one emitted instruction.
pub fn stack_delta(instr: &Instr) -> i32 {
    match instr {
        // Constant loads and register loads push one value.
        Instr::Iconst(_) | Instr::Bipush(_) | Instr::Sipush(_) | Instr::Ldc(_) => 1,
        Instr::Iload(_) | Instr::Aload(_) => 1,

        Instr::Istore(_) | Instr::Astore(_) => -1,
        Instr::Iinc { .. } => 0,

        // Binary arithmetic pops two, pushes the result.
        Instr::Iadd | Instr::Isub | Instr::Imul | Instr::Idiv | Instr::Iand => -1,

        // Element load pops reference + index, pushes the value; element
        // store also pops the value being written.
        Instr::Iaload => -1,
        Instr::Iastore => -3,
        Instr::Arraylength => 0,
        Instr::NewarrayInt => 0,

        Instr::New(_) => 1,
        Instr::Dup => 1,
        Instr::Pop => -1,

        Instr::Invoke {
            kind, params, ret, ..
        } => {
            let receiver = match kind {
                InvokeKind::Static => 0,
                InvokeKind::Virtual | InvokeKind::Special => 1,
            };
            let pushed = if ret == "V" { 0 } else { 1 };
            pushed - receiver - params.len() as i32
        }
        Instr::Getfield { .. } => 0,
        Instr::Putfield { .. } => -2,

        // A branch consumes its test operands and pushes nothing.
        Instr::Ifeq(_)
        | Instr::Ifne(_)
        | Instr::Iflt(_)
        | Instr::Ifle(_)
        | Instr::Ifgt(_)
        | Instr::Ifge(_) => -1,
        Instr::IfIcmplt(_) | Instr::IfIcmpge(_) => -2,
        Instr::Goto(_) | Instr::Label(_) => 0,

        Instr::Ireturn | Instr::Areturn => -1,
        Instr::Return => 0,
    }
}

/// Compute the `.limit stack` value for an emitted instruction sequence.
///
/// Negative depth (code following an unconditional return) clamps to zero.
/// The floor of 1 leaves room for the return path of an otherwise empty
/// method.
pub fn compute_max_stack(instructions: &[Instr]) -> u16 {
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;

    for instr in instructions {
        depth += stack_delta(instr);
        if depth > max_depth {
            max_depth = depth;
        }
        if depth < 0 {
            depth = 0;
        }
    }

    max_depth.max(1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_invoke_delta_is_exact() {
        let call = Instr::Invoke {
            kind: InvokeKind::Static,
            owner: "Foo".into(),
            name: "bar".into(),
            params: vec!["I".into(), "I".into()],
            ret: "I".into(),
        };
        assert_eq!(stack_delta(&call), -1);
    }

    #[test]
    fn virtual_invoke_accounts_for_the_receiver() {
        let call = Instr::Invoke {
            kind: InvokeKind::Virtual,
            owner: "A".into(),
            name: "go".into(),
            params: vec!["I".into()],
            ret: "V".into(),
        };
        assert_eq!(stack_delta(&call), -2);
    }

    #[test]
    fn init_invoke_consumes_only_the_duplicate() {
        let call = Instr::Invoke {
            kind: InvokeKind::Special,
            owner: "A".into(),
            name: "<init>".into(),
            params: vec![],
            ret: "V".into(),
        };
        assert_eq!(stack_delta(&call), -1);
    }

    #[test]
    fn array_store_pops_three() {
        assert_eq!(stack_delta(&Instr::Iastore), -3);
        assert_eq!(stack_delta(&Instr::Iaload), -1);
    }

    #[test]
    fn max_depth_tracks_the_high_water_mark() {
        let instrs = vec![
            Instr::Iload(1),
            Instr::Iload(2),
            Instr::Iload(3),
            Instr::Iadd,
            Instr::Iadd,
            Instr::Istore(1),
        ];
        assert_eq!(compute_max_stack(&instrs), 3);
    }

    #[test]
    fn unreachable_tail_does_not_underflow() {
        let instrs = vec![
            Instr::Iload(1),
            Instr::Ireturn,
            Instr::Pop,
            Instr::Pop,
            Instr::Iload(1),
            Instr::Ireturn,
        ];
        assert_eq!(compute_max_stack(&instrs), 1);
    }

    #[test]
    fn empty_body_still_reserves_one_slot() {
        assert_eq!(compute_max_stack(&[Instr::Return]), 1);
    }
}
