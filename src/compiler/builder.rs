//! BytecodeBuilder - helper for emitting bytecode instructions
//!
//! Forward jumps are emitted against opaque [`Label`]s. Every label used by a
//! function must be bound before the function is finished; `resolve_labels`
//! then rewrites the label ids into absolute offsets in a single pass.

use super::bytecode::{Instruction, JumpTarget, Op};
use crate::error::JsError;

/// Opaque jump destination, valid only inside the function that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

impl Label {
    pub fn id(self) -> JumpTarget {
        self.0
    }
}

/// Builder for the instruction stream of one compilation unit
pub struct BytecodeBuilder {
    instrs: Vec<Instruction>,

    /// Offset bound to each label of the current function
    labels: Vec<Option<u32>>,

    /// Source byte offset attached to emitted instructions
    current_loc: u32,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self {
            instrs: Vec::new(),
            labels: Vec::new(),
            current_loc: 0,
        }
    }

    /// Set the source offset recorded for following instructions
    pub fn set_loc(&mut self, offset: usize) {
        self.current_loc = offset as u32;
    }

    pub fn loc(&self) -> u32 {
        self.current_loc
    }

    /// Offset the next instruction will get
    pub fn offset(&self) -> u32 {
        self.instrs.len() as u32
    }

    /// Emit an instruction and return its offset
    pub fn emit(&mut self, op: Op) -> u32 {
        let offset = self.offset();
        self.instrs.push(Instruction {
            op,
            loc: self.current_loc,
        });
        offset
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Bind `label` to the next instruction
    pub fn bind_label(&mut self, label: Label) {
        let offset = self.offset();
        if let Some(slot) = self.labels.get_mut(label.0 as usize) {
            *slot = Some(offset);
        }
    }

    /// Replace the label ids in jump operands emitted since `start` with
    /// their offsets, then forget all labels.
    pub fn resolve_labels(&mut self, start: u32) -> Result<(), JsError> {
        let labels = std::mem::take(&mut self.labels);
        let end = self.offset();
        for instr in self.instrs.iter_mut().skip(start as usize) {
            for target in instr.op.targets_mut().into_iter().flatten() {
                let offset = labels
                    .get(*target as usize)
                    .copied()
                    .flatten()
                    .filter(|offset| *offset <= end)
                    .ok_or_else(|| {
                        JsError::internal_error(format!("unresolved jump label {}", target))
                    })?;
                *target = offset;
            }
        }
        Ok(())
    }

    /// Number of labels created since the last resolution
    pub fn pending_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.instrs
    }
}

impl Default for BytecodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_backward_labels() {
        let mut b = BytecodeBuilder::new();
        let top = b.new_label();
        let end = b.new_label();
        b.bind_label(top);
        b.emit(Op::Bool(true));
        b.emit(Op::JmpZ { target: end.id() });
        b.emit(Op::Jmp { target: top.id() });
        b.bind_label(end);
        b.emit(Op::Ret);
        b.resolve_labels(0).unwrap();
        assert_eq!(b.pending_labels(), 0);

        let instrs = b.finish();
        assert_eq!(instrs[1].op, Op::JmpZ { target: 3 });
        assert_eq!(instrs[2].op, Op::Jmp { target: 0 });
    }

    #[test]
    fn test_unbound_label_is_an_error() {
        let mut b = BytecodeBuilder::new();
        let missing = b.new_label();
        b.emit(Op::Jmp {
            target: missing.id(),
        });
        assert!(matches!(b.resolve_labels(0), Err(JsError::Internal(_))));
    }

    #[test]
    fn test_resolution_is_per_function() {
        let mut b = BytecodeBuilder::new();
        let first = b.new_label();
        b.emit(Op::Jmp { target: first.id() });
        b.bind_label(first);
        b.emit(Op::Ret);
        b.resolve_labels(0).unwrap();

        // Label ids restart for the next function and only its code is rewritten
        let start = b.offset();
        let second = b.new_label();
        assert_eq!(second.id(), 0);
        b.bind_label(second);
        b.emit(Op::Jmp {
            target: second.id(),
        });
        b.resolve_labels(start).unwrap();

        let instrs = b.finish();
        assert_eq!(instrs[0].op, Op::Jmp { target: 1 });
        assert_eq!(instrs[2].op, Op::Jmp { target: 2 });
    }

    #[test]
    fn test_instructions_carry_source_offset() {
        let mut b = BytecodeBuilder::new();
        b.set_loc(12);
        b.emit(Op::Null);
        let instrs = b.finish();
        assert_eq!(instrs[0].loc, 12);
    }
}
