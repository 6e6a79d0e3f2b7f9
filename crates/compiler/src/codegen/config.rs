use std::collections::HashMap;

use crate::ast::{ConfigNode, PropertyNode, ValueKind, ValueNode};
use crate::binding::{Binding, ConfigRule, PropertyDescriptor};
use crate::error::CompilerError;
use crate::idmap::IdProvider;
use crate::symbol::{ConstantValue, SymbolTable};
use crate::types::{PrimitiveType, StackType};

use super::{BinaryConfig, BinaryProperty, BinaryValue};

/// Lowers one checked config to its binary properties. One property record
/// per source property, except the aggregate kinds which find-or-create a
/// single record per opcode and accumulate; the record keeps the position
/// its first contributor claimed, so output order is
/// source-order-of-first-component.
pub struct ConfigGenerator<'a, 'p> {
    symbols: &'a SymbolTable<'p>,
    binding: &'a Binding,
    id_provider: &'a dyn IdProvider,
}

impl<'a, 'p> ConfigGenerator<'a, 'p> {
    pub fn new(
        symbols: &'a SymbolTable<'p>,
        binding: &'a Binding,
        id_provider: &'a dyn IdProvider,
    ) -> Self {
        Self {
            symbols,
            binding,
            id_provider,
        }
    }

    pub fn generate(&self, config: &ConfigNode) -> Result<BinaryConfig, CompilerError> {
        let mut properties: Vec<BinaryProperty> = Vec::new();
        let mut aggregates: HashMap<u8, usize> = HashMap::new();

        for property in &config.properties {
            let key = &property.key.text;
            if self.binding.is_companion(key) {
                continue;
            }
            let Some(entry) = self.binding.entry(key) else {
                continue;
            };

            match &entry.descriptor {
                PropertyDescriptor::Basic { opcode, components } => {
                    let values = property
                        .values
                        .iter()
                        .zip(components)
                        .map(|(value, ty)| self.lower_value(value, *ty))
                        .collect::<Result<Vec<_>, _>>()?;
                    let values = match self.empty_emission(&entry.rules, &values) {
                        Emission::Keep => Some(values),
                        Emission::Empty => None,
                        Emission::Omit => continue,
                    };
                    properties.push(BinaryProperty::Basic {
                        opcode: *opcode,
                        types: components.clone(),
                        values,
                    });
                }
                PropertyDescriptor::TypeDispatched {
                    opcodes,
                    type_property,
                } => {
                    let ty = self.companion_type(config, type_property);
                    let opcode = dispatch_opcode(*opcodes, ty);
                    let value = self.lower_value(&property.values[0], ty)?;
                    properties.push(BinaryProperty::Basic {
                        opcode,
                        types: vec![ty],
                        values: Some(vec![value]),
                    });
                }
                PropertyDescriptor::SplitArray {
                    opcode,
                    size_type,
                    element,
                    component,
                    ty,
                    ..
                } => {
                    let value = self.lower_value(&property.values[0], *ty)?;
                    let position = *aggregates.entry(*opcode).or_insert_with(|| {
                        properties.push(BinaryProperty::SplitArray {
                            opcode: *opcode,
                            size_type: *size_type,
                            component_types: self.binding.split_array_components(*opcode),
                            elements: Vec::new(),
                        });
                        properties.len() - 1
                    });
                    let BinaryProperty::SplitArray {
                        component_types,
                        elements,
                        ..
                    } = &mut properties[position]
                    else {
                        unreachable!("aggregate index always points at its own kind");
                    };
                    if elements.len() <= *element {
                        let defaults: Vec<BinaryValue> = component_types
                            .iter()
                            .map(|ty| BinaryValue::default_for(*ty))
                            .collect();
                        elements.resize(*element + 1, defaults);
                    }
                    elements[*element][*component] = value;
                }
                PropertyDescriptor::Param { opcode } => {
                    let id = self.reference_id(&property.values[0], PrimitiveType::Param)?;
                    let value = self.lower_param_value(&property.values[1])?;
                    let position = *aggregates.entry(*opcode).or_insert_with(|| {
                        properties.push(BinaryProperty::ParamMap {
                            opcode: *opcode,
                            entries: Vec::new(),
                        });
                        properties.len() - 1
                    });
                    let BinaryProperty::ParamMap { entries, .. } = &mut properties[position]
                    else {
                        unreachable!("aggregate index always points at its own kind");
                    };
                    entries.push((id, value));
                }
                PropertyDescriptor::Map {
                    opcodes,
                    type_property,
                    key_type,
                } => {
                    let value_type = self.companion_type(config, type_property);
                    let opcode = dispatch_opcode(*opcodes, value_type);
                    let key_value = self.lower_value(&property.values[0], *key_type)?;
                    let value = self.lower_value(&property.values[1], value_type)?;
                    let position = *aggregates.entry(opcode).or_insert_with(|| {
                        properties.push(BinaryProperty::Map {
                            opcode,
                            key_type: *key_type,
                            value_type,
                            entries: Vec::new(),
                        });
                        properties.len() - 1
                    });
                    let BinaryProperty::Map { entries, .. } = &mut properties[position] else {
                        unreachable!("aggregate index always points at its own kind");
                    };
                    entries.push((key_value, value));
                }
            }
        }

        Ok(BinaryConfig {
            group: self.binding.group().to_owned(),
            name: config.name.text.clone(),
            properties,
        })
    }

    fn companion_type(&self, config: &ConfigNode, type_property: &str) -> PrimitiveType {
        let companion = config
            .property(type_property)
            .expect("semantic checking required the companion property");
        match companion.values[0].kind {
            ValueKind::TypeLiteral(ty) => ty,
            _ => unreachable!("semantic checking shaped the companion property"),
        }
    }

    fn empty_emission(&self, rules: &[ConfigRule], values: &[BinaryValue]) -> Emission {
        let rule = rules.iter().find_map(|rule| match rule {
            ConfigRule::EmitEmptyIfTrue => Some(true),
            ConfigRule::EmitEmptyIfFalse => Some(false),
            _ => None,
        });
        match (rule, values) {
            (Some(rule), [BinaryValue::Bool(value)]) => {
                if *value == rule {
                    Emission::Empty
                } else {
                    Emission::Omit
                }
            }
            _ => Emission::Keep,
        }
    }

    fn lower_value(
        &self,
        value: &ValueNode,
        expected: PrimitiveType,
    ) -> Result<BinaryValue, CompilerError> {
        Ok(match &value.kind {
            ValueKind::Integer(number) if expected == PrimitiveType::Long => {
                BinaryValue::Long(i64::from(*number))
            }
            ValueKind::Integer(number) => BinaryValue::Int(*number),
            ValueKind::Long(number) => BinaryValue::Long(*number),
            ValueKind::Bool(flag) => BinaryValue::Bool(*flag),
            ValueKind::CoordGrid(packed) => BinaryValue::Coord(*packed),
            ValueKind::TypeLiteral(ty) => BinaryValue::TypeId(*ty),
            ValueKind::Str(text) => {
                if expected == PrimitiveType::Graphic {
                    if let Some(id) = self.symbols.lookup_graphic(text) {
                        return Ok(BinaryValue::Graphic(id as u16));
                    }
                }
                BinaryValue::Str(text.clone())
            }
            ValueKind::ConstantRef(name) => {
                let constant = self
                    .symbols
                    .lookup_constant(&name.text)
                    .expect("semantic checking resolved every constant");
                match &constant.value {
                    ConstantValue::Int(number) => BinaryValue::Int(*number),
                    ConstantValue::Long(number) => BinaryValue::Long(*number),
                    ConstantValue::Str(text) => BinaryValue::Str(text.clone()),
                }
            }
            ValueKind::Reference(name) => {
                if expected == PrimitiveType::Graphic {
                    if let Some(id) = self.symbols.lookup_graphic(&name.text) {
                        return Ok(BinaryValue::Graphic(id as u16));
                    }
                }
                BinaryValue::ConfigId(self.reference_id(value, expected)?)
            }
            ValueKind::Error => unreachable!("erroneous configs are never generated"),
        })
    }

    /// Resolves a reference value to its numeric id through the id provider.
    fn reference_id(
        &self,
        value: &ValueNode,
        expected: PrimitiveType,
    ) -> Result<i32, CompilerError> {
        let ValueKind::Reference(name) = &value.kind else {
            unreachable!("semantic checking shaped reference values");
        };
        let group = expected
            .config_group()
            .expect("only config-typed components hold references");
        self.id_provider
            .find_config(group, &name.text)
            .ok_or_else(|| CompilerError::UnresolvedId {
                group: group.to_owned(),
                name: name.text.clone(),
            })
    }

    fn lower_param_value(&self, value: &ValueNode) -> Result<BinaryValue, CompilerError> {
        Ok(match &value.kind {
            ValueKind::Integer(number) => BinaryValue::Int(*number),
            ValueKind::Long(number) => BinaryValue::Long(*number),
            ValueKind::Str(text) => BinaryValue::Str(text.clone()),
            ValueKind::ConstantRef(name) => {
                let constant = self
                    .symbols
                    .lookup_constant(&name.text)
                    .expect("semantic checking resolved every constant");
                match &constant.value {
                    ConstantValue::Int(number) => BinaryValue::Int(*number),
                    ConstantValue::Long(number) => BinaryValue::Long(*number),
                    ConstantValue::Str(text) => BinaryValue::Str(text.clone()),
                }
            }
            _ => unreachable!("semantic checking shaped param values"),
        })
    }
}

enum Emission {
    Keep,
    Empty,
    Omit,
}

/// Int-stack companion types pick the first opcode; long and string stacks
/// pick the second.
fn dispatch_opcode(opcodes: [u8; 2], ty: PrimitiveType) -> u8 {
    match ty.stack_type() {
        StackType::Int => opcodes[0],
        StackType::Long | StackType::String => opcodes[1],
    }
}
