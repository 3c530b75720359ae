//! Per-method lowering.
//!
//! A [`MethodGenerator`] is created fresh for each method, owns all mutable
//! per-method state, and is consumed when the method text is assembled, so
//! nothing can leak between methods. The boolean-materialization label
//! counter is the one piece of class-scoped state; it is borrowed from the
//! class emitter so label names stay unique across the whole class.
//!
//! Lowering is two-pass: the body is first selected into a flat `Vec<Instr>`,
//! then the stack and locals limits are computed from that sequence and the
//! final text is assembled.

use std::collections::HashSet;

use crate::ir::{
    BinaryOpKind, CallKind, Element, Instruction, InstructionKind, Method, Span, Type, UnaryOpKind,
};

use super::class::ClassContext;
use super::constants;
use super::instr::{Instr, InvokeKind};
use super::{stack, GenError, TAB};

pub(crate) struct MethodGenerator<'a, 'c> {
    ctx: ClassContext<'a>,
    method: &'a Method,
    instrs: Vec<Instr>,
    jump_index: &'c mut u32,
}

impl<'a, 'c> MethodGenerator<'a, 'c> {
    pub fn new(ctx: ClassContext<'a>, method: &'a Method, jump_index: &'c mut u32) -> Self {
        MethodGenerator {
            ctx,
            method,
            instrs: Vec::new(),
            jump_index,
        }
    }

    /// Lower the method to its complete `.method` block.
    pub fn generate(mut self) -> Result<String, GenError> {
        let header = self.header()?;
        self.lower_body()?;
        Ok(self.assemble(header))
    }

    fn header(&self) -> Result<String, GenError> {
        let mut out = String::from("\n.method ");
        out.push_str(&self.method.flags.keywords());
        out.push_str(&self.method.name);
        out.push('(');
        for param in &self.method.params {
            out.push_str(&self.ctx.descriptor(param.ty())?);
        }
        out.push(')');
        out.push_str(&self.ctx.descriptor(&self.method.return_type)?);
        out.push('\n');
        Ok(out)
    }

    fn lower_body(&mut self) -> Result<(), GenError> {
        for (idx, instruction) in self.method.instructions.iter().enumerate() {
            for (label, target) in &self.method.labels {
                if *target == idx {
                    self.instrs.push(Instr::Label(label.clone()));
                }
            }
            self.lower_statement(instruction)?;
        }
        Ok(())
    }

    /// Lower an instruction in statement position. A statement whose value
    /// nothing consumes gets an explicit discard, keeping the stack balanced
    /// at every statement boundary.
    fn lower_statement(&mut self, instruction: &Instruction) -> Result<(), GenError> {
        self.lower_instruction(instruction)?;
        let leftover = match &instruction.kind {
            InstructionKind::Call { return_type, .. } => *return_type != Type::Void,
            InstructionKind::SingleOp { .. }
            | InstructionKind::NoOp { .. }
            | InstructionKind::BinaryOp { .. }
            | InstructionKind::UnaryOp { .. }
            | InstructionKind::GetField { .. } => true,
            _ => false,
        };
        if leftover {
            self.instrs.push(Instr::Pop);
        }
        Ok(())
    }

    /// Lower an instruction in value position: its result (if any) is left
    /// on the operand stack.
    fn lower_instruction(&mut self, instruction: &Instruction) -> Result<(), GenError> {
        let span = instruction.span;
        match &instruction.kind {
            InstructionKind::Assign { dest, rhs } => self.lower_assign(dest, rhs, span),
            InstructionKind::SingleOp { operand } | InstructionKind::NoOp { operand } => {
                self.load_element(operand, span)
            }
            InstructionKind::BinaryOp { op, left, right } => {
                self.lower_binary_value(*op, left, right, span)
            }
            InstructionKind::UnaryOp { op, operand } => {
                self.lower_unary_value(*op, operand, span)
            }
            InstructionKind::Call { .. } => self.lower_call(instruction),
            InstructionKind::GetField { object, field } => {
                self.lower_get_field(object, field, span)
            }
            InstructionKind::PutField {
                object,
                field,
                value,
            } => self.lower_put_field(object, field, value, span),
            InstructionKind::Goto { label } => {
                self.instrs.push(Instr::Goto(label.clone()));
                Ok(())
            }
            InstructionKind::CondBranch { condition, label } => {
                self.lower_cond_branch(condition, label)
            }
            InstructionKind::Return { operand } => self.lower_return(operand.as_ref(), span),
        }
    }

    // --- Assignment ---

    fn lower_assign(
        &mut self,
        dest: &Element,
        rhs: &Instruction,
        span: Span,
    ) -> Result<(), GenError> {
        match dest {
            Element::ArrayOperand { name, index, .. } => {
                let slot = self.slot_of(name, span)?;
                self.instrs.push(Instr::Aload(slot));
                self.load_element(index, span)?;
                self.lower_instruction(rhs)?;
                self.instrs.push(Instr::Iastore);
                Ok(())
            }
            Element::Operand { name, ty } => {
                if let Some(fused) = self.try_increment(name, rhs)? {
                    self.instrs.push(fused);
                    return Ok(());
                }
                if let InstructionKind::Call {
                    kind: CallKind::NewObject,
                    target,
                    ..
                } = &rhs.kind
                {
                    // Allocation must be followed by a duplicate and the
                    // constructor call before the reference is stored.
                    let owner = self.ctx.resolve_owner(element_name(target, rhs.span)?);
                    self.instrs.push(Instr::New(owner.clone()));
                    self.instrs.push(Instr::Dup);
                    self.instrs.push(Instr::Invoke {
                        kind: InvokeKind::Special,
                        owner,
                        name: "<init>".into(),
                        params: Vec::new(),
                        ret: "V".into(),
                    });
                } else {
                    self.lower_instruction(rhs)?;
                }
                self.store_variable(name, ty, span)
            }
            Element::Literal { .. } => {
                Err(GenError::unsupported("assignment to a literal", span))
            }
        }
    }

    /// `x := x + k` (or `k + x`) with a byte-range literal fuses into one
    /// `iinc`; anything else falls back to the general lowering.
    fn try_increment(&mut self, dest: &str, rhs: &Instruction) -> Result<Option<Instr>, GenError> {
        let (left, right) = match &rhs.kind {
            InstructionKind::BinaryOp {
                op: BinaryOpKind::Add,
                left,
                right,
            } => (left, right),
            _ => return Ok(None),
        };
        let (var, text) = match (left, right) {
            (Element::Operand { name, .. }, Element::Literal { text, .. }) => (name, text),
            (Element::Literal { text, .. }, Element::Operand { name, .. }) => (name, text),
            _ => return Ok(None),
        };
        if var != dest {
            return Ok(None);
        }
        let delta = match text.trim().parse::<i32>() {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        if !(-128..=127).contains(&delta) {
            return Ok(None);
        }
        let slot = self.slot_of(var, rhs.span)?;
        Ok(Some(Instr::Iinc { slot, delta }))
    }

    fn store_variable(&mut self, name: &str, ty: &Type, span: Span) -> Result<(), GenError> {
        let slot = self.slot_of(name, span)?;
        if ty.is_numeric() {
            self.instrs.push(Instr::Istore(slot));
            Ok(())
        } else if ty.is_reference() {
            self.instrs.push(Instr::Astore(slot));
            Ok(())
        } else {
            Err(GenError::unsupported("store of a void value", span))
        }
    }

    // --- Operand loading ---

    fn load_element(&mut self, element: &Element, span: Span) -> Result<(), GenError> {
        match element {
            Element::Literal { text, ty } => {
                let load = constants::literal(text, ty, span)?;
                self.instrs.push(load);
                Ok(())
            }
            Element::Operand { name, ty } => match ty {
                Type::This => {
                    self.instrs.push(Instr::Aload(0));
                    Ok(())
                }
                Type::Int | Type::Boolean => {
                    let slot = self.slot_of(name, span)?;
                    self.instrs.push(Instr::Iload(slot));
                    Ok(())
                }
                Type::Str | Type::Array(_) | Type::Object(_) => {
                    let slot = self.slot_of(name, span)?;
                    self.instrs.push(Instr::Aload(slot));
                    Ok(())
                }
                Type::Void => Err(GenError::unsupported("load of a void operand", span)),
            },
            Element::ArrayOperand { name, index, .. } => {
                let slot = self.slot_of(name, span)?;
                self.instrs.push(Instr::Aload(slot));
                self.load_element(index, span)?;
                self.instrs.push(Instr::Iaload);
                Ok(())
            }
        }
    }

    /// Map an operand name to its pre-assigned frame slot. `this` is always
    /// slot 0; everything else must be in the variable table.
    fn slot_of(&self, name: &str, span: Span) -> Result<u16, GenError> {
        if name == "this" {
            return Ok(0);
        }
        match self.method.var_table.get(name) {
            Some(entry) => Ok(entry.slot),
            None => Err(GenError::missing(name, span)),
        }
    }

    // --- Operators in value position ---

    fn lower_binary_value(
        &mut self,
        op: BinaryOpKind,
        left: &Element,
        right: &Element,
        span: Span,
    ) -> Result<(), GenError> {
        self.load_element(left, span)?;
        self.load_element(right, span)?;
        match op {
            BinaryOpKind::Add => self.instrs.push(Instr::Iadd),
            BinaryOpKind::Sub => self.instrs.push(Instr::Isub),
            BinaryOpKind::Mul => self.instrs.push(Instr::Imul),
            BinaryOpKind::Div => self.instrs.push(Instr::Idiv),
            BinaryOpKind::And => self.instrs.push(Instr::Iand),
            // A comparison used as a value has no single instruction on a
            // stack machine; materialize 0/1 through a label pair.
            BinaryOpKind::LessThan => self.materialize_bool(Instr::IfIcmplt),
            BinaryOpKind::GreaterEq => self.materialize_bool(Instr::IfIcmpge),
        }
        Ok(())
    }

    fn lower_unary_value(
        &mut self,
        op: UnaryOpKind,
        operand: &Element,
        span: Span,
    ) -> Result<(), GenError> {
        match op {
            UnaryOpKind::Not => {
                self.load_element(operand, span)?;
                self.materialize_bool(Instr::Ifeq);
                Ok(())
            }
        }
    }

    /// Turn a branch condition already on the stack into an explicit 0/1.
    /// The label counter is class-scoped, so the `true{n}`/`jump{n}` pair
    /// never collides with any other materialization in the class.
    fn materialize_bool(&mut self, branch: fn(String) -> Instr) {
        let n = *self.jump_index;
        *self.jump_index += 1;
        let true_label = format!("true{}", n);
        let join_label = format!("jump{}", n);
        self.instrs.push(branch(true_label.clone()));
        self.instrs.push(Instr::Iconst(0));
        self.instrs.push(Instr::Goto(join_label.clone()));
        self.instrs.push(Instr::Label(true_label));
        self.instrs.push(Instr::Iconst(1));
        self.instrs.push(Instr::Label(join_label));
    }

    // --- Conditional branches ---

    fn lower_cond_branch(
        &mut self,
        condition: &Instruction,
        label: &str,
    ) -> Result<(), GenError> {
        let span = condition.span;
        match &condition.kind {
            InstructionKind::BinaryOp {
                op: BinaryOpKind::LessThan,
                left,
                right,
            } => {
                if is_zero_literal(left) {
                    self.load_element(right, span)?;
                    self.instrs.push(Instr::Ifgt(label.to_string()));
                } else if is_zero_literal(right) {
                    self.load_element(left, span)?;
                    self.instrs.push(Instr::Iflt(label.to_string()));
                } else {
                    self.load_element(left, span)?;
                    self.load_element(right, span)?;
                    self.instrs.push(Instr::IfIcmplt(label.to_string()));
                }
                Ok(())
            }
            InstructionKind::BinaryOp {
                op: BinaryOpKind::GreaterEq,
                left,
                right,
            } => {
                if is_zero_literal(left) {
                    self.load_element(right, span)?;
                    self.instrs.push(Instr::Ifge(label.to_string()));
                } else if is_zero_literal(right) {
                    self.load_element(left, span)?;
                    self.instrs.push(Instr::Ifle(label.to_string()));
                } else {
                    self.load_element(left, span)?;
                    self.load_element(right, span)?;
                    self.instrs.push(Instr::IfIcmpge(label.to_string()));
                }
                Ok(())
            }
            InstructionKind::BinaryOp {
                op: BinaryOpKind::And,
                ..
            } => {
                self.lower_instruction(condition)?;
                self.instrs.push(Instr::Ifne(label.to_string()));
                Ok(())
            }
            InstructionKind::UnaryOp {
                op: UnaryOpKind::Not,
                operand,
            } => {
                self.load_element(operand, span)?;
                self.instrs.push(Instr::Ifeq(label.to_string()));
                Ok(())
            }
            _ => {
                // Any other boolean-valued instruction: evaluate it and
                // branch on the materialized value.
                self.lower_instruction(condition)?;
                self.instrs.push(Instr::Ifne(label.to_string()));
                Ok(())
            }
        }
    }

    // --- Calls ---

    fn lower_call(&mut self, instruction: &Instruction) -> Result<(), GenError> {
        let span = instruction.span;
        let (kind, target, method, args, return_type) = match &instruction.kind {
            InstructionKind::Call {
                kind,
                target,
                method,
                args,
                return_type,
            } => (*kind, target, method, args, return_type),
            _ => return Err(GenError::unsupported("call dispatch on a non-call", span)),
        };

        match kind {
            CallKind::Static => {
                for arg in args {
                    self.load_element(arg, span)?;
                }
                let owner = self.ctx.resolve_owner(element_name(target, span)?);
                let name = method_name(method, span)?;
                self.push_invoke(InvokeKind::Static, owner, name, args, return_type)
            }
            CallKind::Virtual => {
                self.load_element(target, span)?;
                for arg in args {
                    self.load_element(arg, span)?;
                }
                let owner = self.receiver_owner(target, span)?;
                let name = method_name(method, span)?;
                self.push_invoke(InvokeKind::Virtual, owner, name, args, return_type)
            }
            CallKind::Special => {
                self.load_element(target, span)?;
                for arg in args {
                    self.load_element(arg, span)?;
                }
                let owner = self.receiver_owner(target, span)?;
                let name = method.as_deref().unwrap_or("<init>");
                self.push_invoke(InvokeKind::Special, owner, name, args, return_type)
            }
            CallKind::NewObject => {
                let owner = self.ctx.resolve_owner(element_name(target, span)?);
                self.instrs.push(Instr::New(owner));
                Ok(())
            }
            CallKind::NewArray => {
                for arg in args {
                    self.load_element(arg, span)?;
                }
                self.instrs.push(Instr::NewarrayInt);
                Ok(())
            }
            CallKind::ArrayLength => {
                self.load_element(target, span)?;
                self.instrs.push(Instr::Arraylength);
                Ok(())
            }
            CallKind::Constant => self.load_element(target, span),
        }
    }

    fn push_invoke(
        &mut self,
        kind: InvokeKind,
        owner: String,
        name: &str,
        args: &[Element],
        return_type: &Type,
    ) -> Result<(), GenError> {
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            params.push(self.ctx.descriptor(arg.ty())?);
        }
        let ret = self.ctx.descriptor(return_type)?;
        self.instrs.push(Instr::Invoke {
            kind,
            owner,
            name: name.to_string(),
            params,
            ret,
        });
        Ok(())
    }

    /// Owner class of an instance call or field access, from the receiver's
    /// declared type.
    fn receiver_owner(&self, target: &Element, span: Span) -> Result<String, GenError> {
        match target.ty() {
            Type::This => Ok(self.ctx.unit.name.clone()),
            Type::Object(name) => Ok(self.ctx.resolve_owner(name)),
            Type::Str => Ok("java/lang/String".to_string()),
            other => Err(GenError::unsupported(
                format!("receiver of type {:?}", other),
                span,
            )),
        }
    }

    // --- Fields ---

    fn lower_get_field(
        &mut self,
        object: &Element,
        field: &Element,
        span: Span,
    ) -> Result<(), GenError> {
        self.load_element(object, span)?;
        let owner = self.receiver_owner(object, span)?;
        let (name, ty) = field_operand(field, span)?;
        let desc = self.ctx.descriptor(ty)?;
        self.instrs.push(Instr::Getfield {
            owner,
            name: name.to_string(),
            desc,
        });
        Ok(())
    }

    fn lower_put_field(
        &mut self,
        object: &Element,
        field: &Element,
        value: &Element,
        span: Span,
    ) -> Result<(), GenError> {
        self.load_element(object, span)?;
        self.load_element(value, span)?;
        let owner = self.receiver_owner(object, span)?;
        let (name, ty) = field_operand(field, span)?;
        let desc = self.ctx.descriptor(ty)?;
        self.instrs.push(Instr::Putfield {
            owner,
            name: name.to_string(),
            desc,
        });
        Ok(())
    }

    // --- Returns ---

    fn lower_return(&mut self, operand: Option<&Element>, span: Span) -> Result<(), GenError> {
        match operand {
            None => {
                self.instrs.push(Instr::Return);
                Ok(())
            }
            Some(element) => {
                self.load_element(element, span)?;
                if element.ty().is_numeric() {
                    self.instrs.push(Instr::Ireturn);
                } else {
                    self.instrs.push(Instr::Areturn);
                }
                Ok(())
            }
        }
    }

    // --- Finalization ---

    /// `.limit locals`: distinct slots in the variable table, with slot 0
    /// always counted (`this`, or the first parameter).
    fn locals_limit(&self) -> u16 {
        let mut slots: HashSet<u16> = self.method.var_table.values().map(|v| v.slot).collect();
        slots.insert(0);
        slots.len() as u16
    }

    fn assemble(self, header: String) -> String {
        let max_stack = stack::compute_max_stack(&self.instrs);
        let max_locals = self.locals_limit();

        let mut out = header;
        out.push_str(TAB);
        out.push_str(&format!(".limit stack {}\n", max_stack));
        out.push_str(TAB);
        out.push_str(&format!(".limit locals {}\n", max_locals));
        for instr in &self.instrs {
            out.push_str(TAB);
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        out.push_str(".end method\n");
        out
    }
}

fn is_zero_literal(element: &Element) -> bool {
    match element {
        Element::Literal { text, .. } => text.trim().parse::<i32>() == Ok(0),
        _ => false,
    }
}

fn element_name(element: &Element, span: Span) -> Result<&str, GenError> {
    match element {
        Element::Operand { name, .. } | Element::ArrayOperand { name, .. } => Ok(name),
        Element::Literal { .. } => Err(GenError::unsupported(
            "literal where an operand was expected",
            span,
        )),
    }
}

fn method_name<'m>(method: &'m Option<String>, span: Span) -> Result<&'m str, GenError> {
    match method {
        Some(name) => Ok(name),
        None => Err(GenError::unsupported("call without a method name", span)),
    }
}

fn field_operand(field: &Element, span: Span) -> Result<(&str, &Type), GenError> {
    match field {
        Element::Operand { name, ty } => Ok((name, ty)),
        _ => Err(GenError::unsupported(
            "field access without a field operand",
            span,
        )),
    }
}
