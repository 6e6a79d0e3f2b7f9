use std::collections::HashSet;

use petgraph::prelude::DiGraphMap;
use petgraph::visit::Dfs;

use crate::codegen::{BinaryScript, Operand};

use super::OptimisationResult;

/// Removes blocks unreachable from the entry block. Edges come from label
/// operands plus the implicit fall-through of every block that does not end
/// in an unconditional branch or return.
pub fn remove_dead_blocks(script: &mut BinaryScript) -> OptimisationResult {
    let Some(entry) = script.blocks.first() else {
        return OptimisationResult::DidNothing;
    };
    let entry = entry.label.0;

    let mut graph = DiGraphMap::<u32, ()>::new();
    for block in &script.blocks {
        graph.add_node(block.label.0);
    }
    for (index, block) in script.blocks.iter().enumerate() {
        for instruction in &block.instructions {
            if let Operand::Label(target) = instruction.operand {
                graph.add_edge(block.label.0, target.0, ());
            }
        }
        if !block.is_terminated() {
            if let Some(next) = script.blocks.get(index + 1) {
                graph.add_edge(block.label.0, next.label.0, ());
            }
        }
    }

    let mut reachable = HashSet::new();
    let mut dfs = Dfs::new(&graph, entry);
    while let Some(node) = dfs.next(&graph) {
        reachable.insert(node);
    }

    let before = script.blocks.len();
    script.blocks.retain(|block| reachable.contains(&block.label.0));
    if script.blocks.len() == before {
        OptimisationResult::DidNothing
    } else {
        OptimisationResult::DidSomething
    }
}

#[cfg(test)]
mod tests {
    use scroll_bytecode::CoreOpcode;

    use super::*;
    use crate::codegen::{Block, InstrOp, Instruction, Label, StackCounts};
    use crate::symbol::ScriptInfo;
    use crate::types::Type;

    fn terminated(label: Label, branch_to: Option<Label>) -> Block {
        let mut block = Block::new(label);
        let operand = match branch_to {
            Some(target) => Operand::Label(target),
            None => Operand::Int(0),
        };
        let opcode = if branch_to.is_some() {
            CoreOpcode::Branch
        } else {
            CoreOpcode::Return
        };
        block.instructions.push(Instruction {
            op: InstrOp::Core(opcode),
            operand,
        });
        block
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
    fn removes_unreachable_block() {
        // Block 1 is skipped over by an explicit branch and never targeted.
        let subject_blocks = vec![
            terminated(Label(0), Some(Label(2))),
            terminated(Label(1), None),
            terminated(Label(2), None),
        ];
        let mut subject = script(subject_blocks);
        assert_eq!(
            remove_dead_blocks(&mut subject),
            OptimisationResult::DidSomething
        );
        let labels: Vec<_> = subject.blocks.iter().map(|b| b.label).collect();
        assert_eq!(labels, vec![Label(0), Label(2)]);
        assert_eq!(
            remove_dead_blocks(&mut subject),
            OptimisationResult::DidNothing
        );
    }

    #[test]
    fn fall_through_keeps_blocks_alive() {
        let open = Block::new(Label(0));
        let next = terminated(Label(1), None);
        let mut subject = script(vec![open, next]);
        assert_eq!(
            remove_dead_blocks(&mut subject),
            OptimisationResult::DidNothing
        );
        assert_eq!(subject.blocks.len(), 2);
    }
}
