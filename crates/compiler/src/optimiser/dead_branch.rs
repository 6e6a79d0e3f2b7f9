use scroll_bytecode::CoreOpcode;

use crate::codegen::{BinaryScript, InstrOp, Instruction, Operand};

use super::OptimisationResult;

/// Constant-folds conditional branches whose operands are integer-constant
/// pushes. A decided-true branch becomes unconditional (and strands the
/// rest of the block, which is dropped); a decided-false branch disappears
/// along with its operand pushes.
pub fn remove_dead_branches(script: &mut BinaryScript) -> OptimisationResult {
    let mut result = OptimisationResult::DidNothing;
    for block in &mut script.blocks {
        let mut out: Vec<Instruction> = Vec::with_capacity(block.instructions.len());
        let mut ended = false;
        for instruction in block.instructions.drain(..) {
            if ended {
                result = OptimisationResult::DidSomething;
                continue;
            }
            match try_fold(&mut out, &instruction) {
                Fold::Untouched => {
                    if matches!(instruction.op, InstrOp::Core(CoreOpcode::Branch)) {
                        ended = true;
                    }
                    out.push(instruction);
                }
                Fold::AlwaysTaken(target) => {
                    result = OptimisationResult::DidSomething;
                    out.push(Instruction {
                        op: InstrOp::Core(CoreOpcode::Branch),
                        operand: Operand::Label(target),
                    });
                    ended = true;
                }
                Fold::NeverTaken => {
                    result = OptimisationResult::DidSomething;
                }
            }
        }
        block.instructions = out;
    }
    result
}

enum Fold {
    Untouched,
    AlwaysTaken(crate::codegen::Label),
    NeverTaken,
}

/// Pops the constant operands of a foldable branch off `out` and decides it.
fn try_fold(out: &mut Vec<Instruction>, instruction: &Instruction) -> Fold {
    let InstrOp::Core(opcode) = instruction.op else {
        return Fold::Untouched;
    };
    if !opcode.is_conditional_branch() {
        return Fold::Untouched;
    }
    let Operand::Label(target) = instruction.operand else {
        return Fold::Untouched;
    };

    if opcode == CoreOpcode::BranchIfTrue {
        let Some(value) = int_constant(out.last()) else {
            return Fold::Untouched;
        };
        out.pop();
        return if value != 0 {
            Fold::AlwaysTaken(target)
        } else {
            Fold::NeverTaken
        };
    }

    let (Some(right), Some(left)) = (
        int_constant(out.last()),
        int_constant(out.len().checked_sub(2).and_then(|i| out.get(i))),
    ) else {
        return Fold::Untouched;
    };
    let taken = match opcode {
        CoreOpcode::BranchEquals => left == right,
        CoreOpcode::BranchLessThan => left < right,
        CoreOpcode::BranchGreaterThan => left > right,
        CoreOpcode::BranchLessThanOrEquals => left <= right,
        CoreOpcode::BranchGreaterThanOrEquals => left >= right,
        _ => return Fold::Untouched,
    };
    out.pop();
    out.pop();
    if taken {
        Fold::AlwaysTaken(target)
    } else {
        Fold::NeverTaken
    }
}

fn int_constant(instruction: Option<&Instruction>) -> Option<i32> {
    match instruction {
        Some(Instruction {
            op: InstrOp::Core(CoreOpcode::PushIntConstant),
            operand: Operand::Int(value),
        }) => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Block, Label, StackCounts};
    use crate::symbol::ScriptInfo;
    use crate::types::Type;

    fn push(value: i32) -> Instruction {
        Instruction {
            op: InstrOp::Core(CoreOpcode::PushIntConstant),
            operand: Operand::Int(value),
        }
    }

    fn core(opcode: CoreOpcode, target: Label) -> Instruction {
        Instruction {
            op: InstrOp::Core(opcode),
            operand: Operand::Label(target),
        }
    }

    fn script(instructions: Vec<Instruction>) -> BinaryScript {
        let mut block = Block::new(Label(0));
        block.instructions = instructions;
        BinaryScript {
            extension: "scroll".to_owned(),
            name: "[proc,test]".to_owned(),
            blocks: vec![block],
            parameters: StackCounts::default(),
            locals: StackCounts::default(),
            switch_tables: vec![],
            info: ScriptInfo {
                trigger: "proc".to_owned(),
                name: "test".to_owned(),
                return_type: Type::VOID,
                parameter_types: vec![],
                predefined_id: None,
            },
        }
    }

    #[test]
    fn folds_true_comparison_to_unconditional() {
        let mut subject = script(vec![
            push(1),
            push(3),
            core(CoreOpcode::BranchLessThan, Label(1)),
            core(CoreOpcode::Branch, Label(2)),
        ]);
        assert_eq!(
            remove_dead_branches(&mut subject),
            OptimisationResult::DidSomething
        );
        assert_eq!(
            subject.blocks[0].instructions,
            vec![core(CoreOpcode::Branch, Label(1))]
        );
    }

    #[test]
    fn folds_false_comparison_away() {
        let mut subject = script(vec![
            push(5),
            push(3),
            core(CoreOpcode::BranchLessThan, Label(1)),
            core(CoreOpcode::Branch, Label(2)),
        ]);
        remove_dead_branches(&mut subject);
        assert_eq!(
            subject.blocks[0].instructions,
            vec![core(CoreOpcode::Branch, Label(2))]
        );
    }

    #[test]
    fn leaves_dynamic_conditions_alone() {
        let mut subject = script(vec![
            Instruction {
                op: InstrOp::Core(CoreOpcode::PushIntLocal),
                operand: Operand::Local(0),
            },
            push(3),
            core(CoreOpcode::BranchLessThan, Label(1)),
        ]);
        assert_eq!(
            remove_dead_branches(&mut subject),
            OptimisationResult::DidNothing
        );
        assert_eq!(subject.blocks[0].instructions.len(), 3);
    }

    #[test]
    fn folds_branch_if_true() {
        let mut subject = script(vec![
            push(0),
            core(CoreOpcode::BranchIfTrue, Label(1)),
            core(CoreOpcode::Branch, Label(2)),
        ]);
        remove_dead_branches(&mut subject);
        assert_eq!(
            subject.blocks[0].instructions,
            vec![core(CoreOpcode::Branch, Label(2))]
        );
    }
}
