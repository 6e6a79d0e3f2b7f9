use std::ops::{BitOr, BitOrAssign};

use crate::codegen::BinaryScript;

mod dead_block;
mod dead_branch;
mod natural_flow;

pub use dead_block::remove_dead_blocks;
pub use dead_branch::remove_dead_branches;
pub use natural_flow::remove_natural_flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisationResult {
    DidSomething,
    DidNothing,
}

impl BitOrAssign for OptimisationResult {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl BitOr for OptimisationResult {
    type Output = OptimisationResult;

    fn bitor(self, rhs: Self) -> Self::Output {
        if self == OptimisationResult::DidSomething || rhs == OptimisationResult::DidSomething {
            OptimisationResult::DidSomething
        } else {
            OptimisationResult::DidNothing
        }
    }
}

/// The pipeline, in its required order. Each pass is idempotent on its own
/// and the set runs exactly once per script; no fixed point is needed.
static OPTIMISATIONS: &[(&str, fn(&mut BinaryScript) -> OptimisationResult)] = &[
    ("natural_flow", natural_flow::remove_natural_flow),
    ("dead_branch", dead_branch::remove_dead_branches),
    ("dead_block", dead_block::remove_dead_blocks),
];

pub fn optimise(script: &mut BinaryScript) -> OptimisationResult {
    let mut result = OptimisationResult::DidNothing;
    for (name, pass) in OPTIMISATIONS {
        let pass_result = pass(script);
        if pass_result == OptimisationResult::DidSomething {
            log::trace!("{} rewrote {}", name, script.name);
        }
        result |= pass_result;
    }
    result
}
