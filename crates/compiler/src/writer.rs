//! The single authority for on-disk layouts: the script bytecode writer and
//! the binary-config writer/reader pair.
//!
//! Script layout: `u2` name length + UTF-8 name, `u2` instruction count,
//! the flat instruction stream (blocks concatenated in label order, labels
//! resolved to instruction-relative offsets), then per-stack local and
//! parameter counts, then a `u2` switch-table count. Large opcodes write a
//! `u2` opcode and a 4-byte immediate, small ones a `u1` opcode and a 1-byte
//! immediate; long operands are always 8 bytes and string operands are UTF-8
//! followed by NUL. Command opcodes are written in the large form.
//!
//! Config layout: per property a `u1` opcode and its typed payload, with a
//! closing `0x00`. Aggregates serialize as a count followed by that many
//! entries.

use std::collections::HashMap;

use crate::binding::{Binding, ConfigRule, PropertyDescriptor};
use crate::catalog::{InstructionMap, MappedOpcode};
use crate::codegen::{
    BinaryConfig, BinaryProperty, BinaryScript, BinaryValue, InstrOp, Label, Operand,
};
use crate::error::CompilerError;
use crate::idmap::IdProvider;
use crate::types::PrimitiveType;

pub struct BytecodeWriter<'a> {
    instruction_map: &'a InstructionMap,
    id_provider: &'a dyn IdProvider,
}

impl<'a> BytecodeWriter<'a> {
    pub fn new(instruction_map: &'a InstructionMap, id_provider: &'a dyn IdProvider) -> Self {
        Self {
            instruction_map,
            id_provider,
        }
    }

    pub fn write(&self, script: &BinaryScript) -> Result<Vec<u8>, CompilerError> {
        let mut buf = Vec::new();
        let name = script.name.as_bytes();
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name);

        let mut blocks: Vec<_> = script.blocks.iter().collect();
        blocks.sort_by_key(|block| block.label);

        let mut offsets: HashMap<Label, i32> = HashMap::new();
        let mut total = 0i32;
        for block in &blocks {
            offsets.insert(block.label, total);
            total += block.instructions.len() as i32;
        }
        buf.extend_from_slice(&(total as u16).to_be_bytes());

        let mut index = 0i32;
        for block in &blocks {
            for instruction in &block.instructions {
                let mapped = self.mapped(&instruction.op);
                if mapped.large {
                    buf.extend_from_slice(&mapped.opcode.to_be_bytes());
                } else {
                    buf.push(mapped.opcode as u8);
                }
                self.operand(&mut buf, instruction, mapped, &offsets, index)?;
                index += 1;
            }
        }

        buf.push(script.locals.int as u8);
        buf.push(script.parameters.int as u8);
        buf.push(script.locals.string as u8);
        buf.push(script.parameters.string as u8);
        buf.push(script.locals.long as u8);
        buf.push(script.parameters.long as u8);
        buf.extend_from_slice(&(script.switch_tables.len() as u16).to_be_bytes());
        Ok(buf)
    }

    fn mapped(&self, op: &InstrOp) -> MappedOpcode {
        match op {
            InstrOp::Core(core) => self.instruction_map.lookup(*core),
            InstrOp::Command(opcode) => MappedOpcode {
                opcode: *opcode,
                large: true,
            },
        }
    }

    fn operand(
        &self,
        buf: &mut Vec<u8>,
        instruction: &crate::codegen::Instruction,
        mapped: MappedOpcode,
        offsets: &HashMap<Label, i32>,
        index: i32,
    ) -> Result<(), CompilerError> {
        let immediate = match &instruction.operand {
            Operand::Long(value) => {
                buf.extend_from_slice(&value.to_be_bytes());
                return Ok(());
            }
            Operand::Str(value) => {
                buf.extend_from_slice(value.as_bytes());
                buf.push(0);
                return Ok(());
            }
            Operand::Int(value) => *value,
            Operand::Local(slot) => *slot as i32,
            Operand::Label(target) => offsets[target] - (index + 1),
            Operand::Symbol { group, name } => self
                .id_provider
                .find_config(group, name)
                .ok_or_else(|| CompilerError::UnresolvedId {
                    group: group.clone(),
                    name: name.clone(),
                })?,
        };
        if mapped.large {
            buf.extend_from_slice(&immediate.to_be_bytes());
        } else {
            buf.push(immediate as u8);
        }
        Ok(())
    }
}

/// Serializes a binary config to the property-record layout.
pub fn write_config(config: &BinaryConfig) -> Vec<u8> {
    let mut buf = Vec::new();
    for property in &config.properties {
        buf.push(property.opcode());
        match property {
            BinaryProperty::Basic { values, .. } => {
                if let Some(values) = values {
                    for value in values {
                        write_value(&mut buf, value);
                    }
                }
            }
            BinaryProperty::SplitArray {
                size_type,
                elements,
                ..
            } => {
                write_value(
                    &mut buf,
                    &count_value(*size_type, elements.len()),
                );
                for element in elements {
                    for component in element {
                        write_value(&mut buf, component);
                    }
                }
            }
            BinaryProperty::ParamMap { entries, .. } => {
                buf.push(entries.len() as u8);
                for (id, value) in entries {
                    buf.extend_from_slice(&id.to_be_bytes());
                    buf.push(value.stack_tag());
                    write_value(&mut buf, value);
                }
            }
            BinaryProperty::Map { entries, .. } => {
                buf.extend_from_slice(&(entries.len() as u16).to_be_bytes());
                for (key, value) in entries {
                    write_value(&mut buf, key);
                    write_value(&mut buf, value);
                }
            }
        }
    }
    buf.push(0);
    buf
}

fn count_value(size_type: PrimitiveType, count: usize) -> BinaryValue {
    match size_type {
        PrimitiveType::Long => BinaryValue::Long(count as i64),
        _ => BinaryValue::Int(count as i32),
    }
}

fn write_value(buf: &mut Vec<u8>, value: &BinaryValue) {
    match value {
        BinaryValue::Int(value) | BinaryValue::ConfigId(value) | BinaryValue::Coord(value) => {
            buf.extend_from_slice(&value.to_be_bytes());
        }
        BinaryValue::Long(value) => buf.extend_from_slice(&value.to_be_bytes()),
        BinaryValue::Str(value) => {
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }
        BinaryValue::Bool(value) => buf.push(*value as u8),
        BinaryValue::TypeId(ty) => buf.push(ty.type_id()),
        BinaryValue::Graphic(id) => buf.extend_from_slice(&id.to_be_bytes()),
    }
}

/// Reads a binary config back using the payload shapes the binding implies.
///
/// Two normalizations are inherent to the format: a graphic-typed payload is
/// always read as a graphic id (an unregistered name that fell back to a
/// string cannot be told apart), and type-dispatched payloads read as `int`
/// or `long` by opcode since the companion type is not serialized.
pub fn read_config(
    group: &str,
    name: &str,
    bytes: &[u8],
    binding: &Binding,
) -> Result<BinaryConfig, CompilerError> {
    let shapes = ShapeIndex::from_binding(binding);
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut properties = Vec::new();
    loop {
        let opcode = cursor.u8()?;
        if opcode == 0 {
            break;
        }
        let shape = shapes
            .map
            .get(&opcode)
            .ok_or_else(|| CompilerError::MalformedBinary(format!("unknown opcode {opcode}")))?;
        properties.push(read_property(opcode, shape, &mut cursor)?);
    }
    Ok(BinaryConfig {
        group: group.to_owned(),
        name: name.to_owned(),
        properties,
    })
}

enum Shape {
    Basic {
        types: Vec<PrimitiveType>,
        empty: bool,
    },
    SplitArray {
        size_type: PrimitiveType,
        component_types: Vec<PrimitiveType>,
    },
    Param,
    Map {
        key_type: PrimitiveType,
        value_type: PrimitiveType,
    },
}

struct ShapeIndex {
    map: HashMap<u8, Shape>,
}

impl ShapeIndex {
    fn from_binding(binding: &Binding) -> Self {
        let mut map = HashMap::new();
        for entry in binding.entries() {
            match &entry.descriptor {
                PropertyDescriptor::Basic { opcode, components } => {
                    let empty = entry.rules.iter().any(|rule| {
                        matches!(
                            rule,
                            ConfigRule::EmitEmptyIfTrue | ConfigRule::EmitEmptyIfFalse
                        )
                    });
                    map.insert(
                        *opcode,
                        Shape::Basic {
                            types: components.clone(),
                            empty,
                        },
                    );
                }
                PropertyDescriptor::TypeDispatched { opcodes, .. } => {
                    for (opcode, ty) in opcodes.iter().zip([PrimitiveType::Int, PrimitiveType::Long])
                    {
                        map.insert(
                            *opcode,
                            Shape::Basic {
                                types: vec![ty],
                                empty: false,
                            },
                        );
                    }
                }
                PropertyDescriptor::SplitArray {
                    opcode, size_type, ..
                } => {
                    map.insert(
                        *opcode,
                        Shape::SplitArray {
                            size_type: *size_type,
                            component_types: binding.split_array_components(*opcode),
                        },
                    );
                }
                PropertyDescriptor::Param { opcode } => {
                    map.insert(*opcode, Shape::Param);
                }
                PropertyDescriptor::Map {
                    opcodes, key_type, ..
                } => {
                    for (opcode, ty) in
                        opcodes.iter().zip([PrimitiveType::Int, PrimitiveType::String])
                    {
                        map.insert(
                            *opcode,
                            Shape::Map {
                                key_type: *key_type,
                                value_type: ty,
                            },
                        );
                    }
                }
            }
        }
        Self { map }
    }
}

fn read_property(
    opcode: u8,
    shape: &Shape,
    cursor: &mut Cursor<'_>,
) -> Result<BinaryProperty, CompilerError> {
    Ok(match shape {
        Shape::Basic { types, empty } => BinaryProperty::Basic {
            opcode,
            types: types.clone(),
            values: if *empty {
                None
            } else {
                Some(
                    types
                        .iter()
                        .map(|ty| read_value(cursor, *ty))
                        .collect::<Result<_, _>>()?,
                )
            },
        },
        Shape::SplitArray {
            size_type,
            component_types,
        } => {
            let count = match read_value(cursor, *size_type)? {
                BinaryValue::Long(count) => count as usize,
                BinaryValue::Int(count) => count as usize,
                _ => return Err(CompilerError::MalformedBinary("bad aggregate size".into())),
            };
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                let element = component_types
                    .iter()
                    .map(|ty| read_value(cursor, *ty))
                    .collect::<Result<_, _>>()?;
                elements.push(element);
            }
            BinaryProperty::SplitArray {
                opcode,
                size_type: *size_type,
                component_types: component_types.clone(),
                elements,
            }
        }
        Shape::Param => {
            let count = cursor.u8()? as usize;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let id = cursor.i32()?;
                let value = match cursor.u8()? {
                    0 => BinaryValue::Int(cursor.i32()?),
                    1 => BinaryValue::Long(cursor.i64()?),
                    2 => BinaryValue::Str(cursor.string()?),
                    tag => {
                        return Err(CompilerError::MalformedBinary(format!(
                            "unknown param tag {tag}"
                        )))
                    }
                };
                entries.push((id, value));
            }
            BinaryProperty::ParamMap { opcode, entries }
        }
        Shape::Map {
            key_type,
            value_type,
        } => {
            let count = cursor.u16()? as usize;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                let key = read_value(cursor, *key_type)?;
                let value = read_value(cursor, *value_type)?;
                entries.push((key, value));
            }
            BinaryProperty::Map {
                opcode,
                key_type: *key_type,
                value_type: *value_type,
                entries,
            }
        }
    })
}

fn read_value(cursor: &mut Cursor<'_>, ty: PrimitiveType) -> Result<BinaryValue, CompilerError> {
    Ok(match ty {
        PrimitiveType::Int => BinaryValue::Int(cursor.i32()?),
        PrimitiveType::Bool => BinaryValue::Bool(cursor.u8()? != 0),
        PrimitiveType::Long => BinaryValue::Long(cursor.i64()?),
        PrimitiveType::String => BinaryValue::Str(cursor.string()?),
        PrimitiveType::Type => {
            let id = cursor.u8()?;
            BinaryValue::TypeId(PrimitiveType::from_type_id(id).ok_or_else(|| {
                CompilerError::MalformedBinary(format!("unknown type id {id}"))
            })?)
        }
        PrimitiveType::CoordGrid => BinaryValue::Coord(cursor.i32()?),
        PrimitiveType::Graphic => BinaryValue::Graphic(cursor.u16()?),
        PrimitiveType::Obj | PrimitiveType::Param => BinaryValue::ConfigId(cursor.i32()?),
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn slice(&mut self, len: usize) -> Result<&[u8], CompilerError> {
        if self.pos + len > self.bytes.len() {
            return Err(CompilerError::MalformedBinary("unexpected end".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CompilerError> {
        Ok(self.slice(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CompilerError> {
        Ok(u16::from_be_bytes(self.slice(2)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, CompilerError> {
        Ok(i32::from_be_bytes(self.slice(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, CompilerError> {
        Ok(i64::from_be_bytes(self.slice(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, CompilerError> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(CompilerError::MalformedBinary("unterminated string".into()));
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(text)
    }
}
