use std::fmt;

use scroll_bytecode::CoreOpcode;

use crate::symbol::ScriptInfo;
use crate::types::{PrimitiveType, StackType};

mod config;
mod script;

pub use config::ConfigGenerator;
pub use script::ScriptGenerator;

/// A symbolic branch target, unique within one script. Blocks are ordered
/// by label: the writer concatenates them in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// Either an abstract core opcode or the concrete opcode of a native
/// command. Core opcodes stay abstract until the bytecode writer maps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrOp {
    Core(CoreOpcode),
    Command(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Long(i64),
    Str(String),
    Label(Label),
    /// A local slot index within the operand's stack type.
    Local(u16),
    /// A name resolved to a numeric id by the writer via the id provider.
    Symbol { group: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: InstrOp,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: Label,
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            instructions: Vec::new(),
        }
    }

    /// Whether control cannot fall out of the end of this block.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.instructions.last(),
            Some(Instruction {
                op: InstrOp::Core(CoreOpcode::Branch | CoreOpcode::Return),
                ..
            })
        )
    }
}

/// Per-stack-type slot counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackCounts {
    pub int: u16,
    pub long: u16,
    pub string: u16,
}

impl StackCounts {
    pub fn get(&self, stack: StackType) -> u16 {
        match stack {
            StackType::Int => self.int,
            StackType::Long => self.long,
            StackType::String => self.string,
        }
    }

    pub fn bump(&mut self, stack: StackType) -> u16 {
        let slot = self.get(stack);
        match stack {
            StackType::Int => self.int += 1,
            StackType::Long => self.long += 1,
            StackType::String => self.string += 1,
        }
        slot
    }
}

/// A `switch_<type>` jump table. The surface statement is not part of this
/// language revision, but the table is part of the binary layout and the
/// writer always records the count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SwitchTable {
    pub cases: Vec<(i32, Label)>,
}

/// A lowered, optimizable script: block-structured instructions with
/// symbolic branch targets plus the header data the writer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryScript {
    pub extension: String,
    /// The full `[trigger,name]` form.
    pub name: String,
    pub blocks: Vec<Block>,
    pub parameters: StackCounts,
    pub locals: StackCounts,
    pub switch_tables: Vec<SwitchTable>,
    pub info: ScriptInfo,
}

impl fmt::Display for BinaryScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for instruction in &block.instructions {
                let name = match instruction.op {
                    InstrOp::Core(core) => core.name().to_owned(),
                    InstrOp::Command(opcode) => format!("command_{opcode}"),
                };
                match &instruction.operand {
                    Operand::Int(value) => writeln!(f, "    {name} {value}")?,
                    Operand::Long(value) => writeln!(f, "    {name} {value}L")?,
                    Operand::Str(value) => writeln!(f, "    {name} {value:?}")?,
                    Operand::Label(label) => writeln!(f, "    {name} {label}")?,
                    Operand::Local(slot) => writeln!(f, "    {name} local_{slot}")?,
                    Operand::Symbol { group, name: symbol } => {
                        writeln!(f, "    {name} {group}:{symbol}")?
                    }
                }
            }
        }
        Ok(())
    }
}

/// A lowered config: ordered binary properties, each knowing its opcode and
/// payload shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryConfig {
    pub group: String,
    pub name: String,
    pub properties: Vec<BinaryProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryValue {
    Int(i32),
    Long(i64),
    Str(String),
    Bool(bool),
    TypeId(PrimitiveType),
    Coord(i32),
    Graphic(u16),
    ConfigId(i32),
}

impl BinaryValue {
    /// The zero value a missing aggregate component serializes as.
    pub fn default_for(ty: PrimitiveType) -> BinaryValue {
        match ty {
            PrimitiveType::Long => BinaryValue::Long(0),
            PrimitiveType::String => BinaryValue::Str(String::new()),
            PrimitiveType::Bool => BinaryValue::Bool(false),
            PrimitiveType::Type => BinaryValue::TypeId(PrimitiveType::Int),
            PrimitiveType::CoordGrid => BinaryValue::Coord(0),
            PrimitiveType::Graphic => BinaryValue::Graphic(0),
            PrimitiveType::Obj | PrimitiveType::Param => BinaryValue::ConfigId(0),
            PrimitiveType::Int => BinaryValue::Int(0),
        }
    }

    /// The stack tag written ahead of self-describing values (params).
    pub fn stack_tag(&self) -> u8 {
        match self {
            BinaryValue::Long(_) => 1,
            BinaryValue::Str(_) => 2,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryProperty {
    /// Opcode plus a fixed tuple of typed values; `values: None` encodes an
    /// empty payload (the `EMIT_EMPTY_*` rules).
    Basic {
        opcode: u8,
        types: Vec<PrimitiveType>,
        values: Option<Vec<BinaryValue>>,
    },
    /// The aggregate record several split-array source properties fill.
    SplitArray {
        opcode: u8,
        size_type: PrimitiveType,
        component_types: Vec<PrimitiveType>,
        elements: Vec<Vec<BinaryValue>>,
    },
    /// Parameter map: id/value pairs, values self-describing.
    ParamMap {
        opcode: u8,
        entries: Vec<(i32, BinaryValue)>,
    },
    /// Key/value map with a fixed key type and a dispatched value type.
    Map {
        opcode: u8,
        key_type: PrimitiveType,
        value_type: PrimitiveType,
        entries: Vec<(BinaryValue, BinaryValue)>,
    },
}

impl BinaryProperty {
    pub fn opcode(&self) -> u8 {
        match self {
            BinaryProperty::Basic { opcode, .. }
            | BinaryProperty::SplitArray { opcode, .. }
            | BinaryProperty::ParamMap { opcode, .. }
            | BinaryProperty::Map { opcode, .. } => *opcode,
        }
    }
}
