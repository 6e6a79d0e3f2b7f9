use scroll_bytecode::CoreOpcode;

use crate::codegen::{BinaryScript, InstrOp, Instruction, Operand};

use super::OptimisationResult;

/// Drops a trailing unconditional branch when its target is the textually
/// next block: the fall-through already goes there.
pub fn remove_natural_flow(script: &mut BinaryScript) -> OptimisationResult {
    let mut result = OptimisationResult::DidNothing;
    let next_labels: Vec<_> = script.blocks.iter().skip(1).map(|b| b.label).collect();
    for (block, next_label) in script.blocks.iter_mut().zip(next_labels) {
        if let Some(Instruction {
            op: InstrOp::Core(CoreOpcode::Branch),
            operand: Operand::Label(target),
        }) = block.instructions.last()
        {
            if *target == next_label {
                block.instructions.pop();
                result = OptimisationResult::DidSomething;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Block, Label, StackCounts};
    use crate::symbol::ScriptInfo;
    use crate::types::Type;

    fn branch(target: Label) -> Instruction {
        Instruction {
            op: InstrOp::Core(CoreOpcode::Branch),
            operand: Operand::Label(target),
        }
    }

    fn script(blocks: Vec<Block>) -> BinaryScript {
        BinaryScript {
            extension: "scroll".to_owned(),
            name: "[proc,test]".to_owned(),
            blocks,
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
    fn drops_branch_to_next_block() {
        let mut first = Block::new(Label(0));
        first.instructions.push(branch(Label(1)));
        let second = Block::new(Label(1));
        let mut subject = script(vec![first, second]);

        assert_eq!(
            remove_natural_flow(&mut subject),
            OptimisationResult::DidSomething
        );
        assert!(subject.blocks[0].instructions.is_empty());
        assert_eq!(
            remove_natural_flow(&mut subject),
            OptimisationResult::DidNothing
        );
    }

    #[test]
    fn keeps_branch_over_a_block() {
        let mut first = Block::new(Label(0));
        first.instructions.push(branch(Label(2)));
        let second = Block::new(Label(1));
        let third = Block::new(Label(2));
        let mut subject = script(vec![first, second, third]);

        assert_eq!(
            remove_natural_flow(&mut subject),
            OptimisationResult::DidNothing
        );
        assert_eq!(subject.blocks[0].instructions.len(), 1);
    }
}
