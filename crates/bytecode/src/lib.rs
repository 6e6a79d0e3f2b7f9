#![no_std]
#![deny(clippy::all)]

use enumn::N;

/// The abstract opcode set the script code generator emits.
///
/// These are not on-disk opcodes: the driver resolves each one to a concrete
/// numeric opcode (and an operand width) through its instruction map before
/// anything is serialized. The enum is closed on purpose — an instruction map
/// is only *ready* once every variant here has a concrete mapping.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, N)]
pub enum CoreOpcode {
    PushIntConstant,
    PushLongConstant,
    PushStringConstant,

    PushIntLocal,
    PushLongLocal,
    PushStringLocal,
    PopIntLocal,
    PopLongLocal,
    PopStringLocal,

    PushVarp,
    PopVarp,
    PushVarpBit,
    PopVarpBit,
    PushVarcInt,
    PopVarcInt,
    PushVarcString,
    PopVarcString,

    Branch,
    BranchIfTrue,
    BranchEquals,
    BranchLessThan,
    BranchGreaterThan,
    BranchLessThanOrEquals,
    BranchGreaterThanOrEquals,

    JoinString,
    GosubWithParams,
    Return,

    Add,
    Sub,
    Multiply,
    Divide,
    Modulo,
}

impl CoreOpcode {
    const LEN: u8 = CoreOpcode::Modulo as u8 + 1;

    /// Every core opcode, in declaration order.
    pub fn all() -> impl Iterator<Item = CoreOpcode> {
        (0..Self::LEN).filter_map(CoreOpcode::n)
    }

    /// The stable key used for this opcode in instruction map files.
    pub fn name(self) -> &'static str {
        match self {
            CoreOpcode::PushIntConstant => "push_int_constant",
            CoreOpcode::PushLongConstant => "push_long_constant",
            CoreOpcode::PushStringConstant => "push_string_constant",
            CoreOpcode::PushIntLocal => "push_int_local",
            CoreOpcode::PushLongLocal => "push_long_local",
            CoreOpcode::PushStringLocal => "push_string_local",
            CoreOpcode::PopIntLocal => "pop_int_local",
            CoreOpcode::PopLongLocal => "pop_long_local",
            CoreOpcode::PopStringLocal => "pop_string_local",
            CoreOpcode::PushVarp => "push_varp",
            CoreOpcode::PopVarp => "pop_varp",
            CoreOpcode::PushVarpBit => "push_varp_bit",
            CoreOpcode::PopVarpBit => "pop_varp_bit",
            CoreOpcode::PushVarcInt => "push_varc_int",
            CoreOpcode::PopVarcInt => "pop_varc_int",
            CoreOpcode::PushVarcString => "push_varc_string",
            CoreOpcode::PopVarcString => "pop_varc_string",
            CoreOpcode::Branch => "branch",
            CoreOpcode::BranchIfTrue => "branch_if_true",
            CoreOpcode::BranchEquals => "branch_equals",
            CoreOpcode::BranchLessThan => "branch_less_than",
            CoreOpcode::BranchGreaterThan => "branch_greater_than",
            CoreOpcode::BranchLessThanOrEquals => "branch_less_than_or_equals",
            CoreOpcode::BranchGreaterThanOrEquals => "branch_greater_than_or_equals",
            CoreOpcode::JoinString => "join_string",
            CoreOpcode::GosubWithParams => "gosub_with_params",
            CoreOpcode::Return => "return",
            CoreOpcode::Add => "add",
            CoreOpcode::Sub => "sub",
            CoreOpcode::Multiply => "multiply",
            CoreOpcode::Divide => "divide",
            CoreOpcode::Modulo => "modulo",
        }
    }

    /// Inverse of [`CoreOpcode::name`].
    pub fn from_name(name: &str) -> Option<CoreOpcode> {
        Self::all().find(|op| op.name() == name)
    }

    /// Whether this opcode transfers control when its condition holds.
    /// The unconditional [`CoreOpcode::Branch`] is not part of this family.
    pub fn is_conditional_branch(self) -> bool {
        matches!(
            self,
            CoreOpcode::BranchIfTrue
                | CoreOpcode::BranchEquals
                | CoreOpcode::BranchLessThan
                | CoreOpcode::BranchGreaterThan
                | CoreOpcode::BranchLessThanOrEquals
                | CoreOpcode::BranchGreaterThanOrEquals
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in CoreOpcode::all() {
            assert_eq!(CoreOpcode::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn decode_from_byte() {
        assert_eq!(CoreOpcode::n(0), Some(CoreOpcode::PushIntConstant));
        assert_eq!(
            CoreOpcode::n(CoreOpcode::Modulo as u8),
            Some(CoreOpcode::Modulo)
        );
        assert_eq!(CoreOpcode::n(CoreOpcode::Modulo as u8 + 1), None);
    }

    #[test]
    fn branch_family() {
        assert!(CoreOpcode::BranchEquals.is_conditional_branch());
        assert!(CoreOpcode::BranchIfTrue.is_conditional_branch());
        assert!(!CoreOpcode::Branch.is_conditional_branch());
        assert!(!CoreOpcode::Return.is_conditional_branch());
    }
}
