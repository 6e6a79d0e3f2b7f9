use crate::ast::{ConfigNode, PropertyNode, ValueKind, ValueNode};
use crate::binding::{Binding, ConfigRule, PropertyDescriptor};
use crate::reporting::{Diagnostics, SemanticError};
use crate::types::{PrimitiveType, Type};

use super::SemanticChecker;

impl<'a, 'p> SemanticChecker<'a, 'p> {
    /// Main pass over one config: every key must be bound, value shapes and
    /// primitive types must match the binding, and rules must hold.
    pub fn check_config(
        &mut self,
        node: &ConfigNode,
        binding: &Binding,
        diagnostics: &mut Diagnostics,
    ) {
        for property in &node.properties {
            let key = &property.key.text;
            if binding.is_companion(key) {
                self.check_companion(property, diagnostics);
                continue;
            }
            let Some(entry) = binding.entry(key) else {
                diagnostics.report(
                    property.key.span,
                    SemanticError::UnknownProperty { key: key.clone() },
                );
                continue;
            };

            for rule in &entry.rules {
                if let ConfigRule::Require(required) = rule {
                    if node.property(required).is_none() {
                        diagnostics.report(
                            property.span,
                            SemanticError::MissingRequiredProperty {
                                key: key.clone(),
                                required: required.clone(),
                            },
                        );
                    }
                }
            }

            match &entry.descriptor {
                PropertyDescriptor::Basic { components, .. } => {
                    if property.values.len() != components.len() {
                        diagnostics.report(
                            property.span,
                            SemanticError::ComponentCountMismatch {
                                key: key.clone(),
                                expected: components.len(),
                                actual: property.values.len(),
                            },
                        );
                        continue;
                    }
                    for (value, component) in property.values.iter().zip(components) {
                        self.check_value(value, *component, &entry.rules, diagnostics);
                    }
                }
                PropertyDescriptor::TypeDispatched { type_property, .. } => {
                    if !self.expect_value_count(property, 1, diagnostics) {
                        continue;
                    }
                    if let Some(ty) =
                        self.resolve_companion(node, property, type_property, diagnostics)
                    {
                        self.check_value(&property.values[0], ty, &entry.rules, diagnostics);
                    }
                }
                PropertyDescriptor::SplitArray { ty, .. } => {
                    if !self.expect_value_count(property, 1, diagnostics) {
                        continue;
                    }
                    self.check_value(&property.values[0], *ty, &entry.rules, diagnostics);
                }
                PropertyDescriptor::Param { .. } => {
                    if !self.expect_value_count(property, 2, diagnostics) {
                        continue;
                    }
                    self.check_value(
                        &property.values[0],
                        PrimitiveType::Param,
                        &entry.rules,
                        diagnostics,
                    );
                    self.check_param_value(&property.values[1], diagnostics);
                }
                PropertyDescriptor::Map {
                    type_property,
                    key_type,
                    ..
                } => {
                    if !self.expect_value_count(property, 2, diagnostics) {
                        continue;
                    }
                    self.check_value(&property.values[0], *key_type, &entry.rules, diagnostics);
                    if let Some(ty) =
                        self.resolve_companion(node, property, type_property, diagnostics)
                    {
                        self.check_value(&property.values[1], ty, &entry.rules, diagnostics);
                    }
                }
            }
        }
    }

    /// A companion type property holds exactly one type literal.
    fn check_companion(&self, property: &PropertyNode, diagnostics: &mut Diagnostics) {
        let well_formed = property.values.len() == 1
            && matches!(
                property.values[0].kind,
                ValueKind::TypeLiteral(_) | ValueKind::Error
            );
        if !well_formed {
            diagnostics.report(
                property.span,
                SemanticError::NotATypeProperty {
                    companion: property.key.text.clone(),
                },
            );
        }
    }

    /// Finds the companion type property of a type-dispatched or map
    /// property and yields the primitive it names.
    fn resolve_companion(
        &self,
        node: &ConfigNode,
        property: &PropertyNode,
        type_property: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrimitiveType> {
        let Some(companion) = node.property(type_property) else {
            diagnostics.report(
                property.span,
                SemanticError::MissingTypeProperty {
                    key: property.key.text.clone(),
                    companion: type_property.to_owned(),
                },
            );
            return None;
        };
        match companion.values.first().map(|value| &value.kind) {
            Some(ValueKind::TypeLiteral(ty)) => Some(*ty),
            _ => None,
        }
    }

    fn expect_value_count(
        &self,
        property: &PropertyNode,
        expected: usize,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        if property.values.len() == expected {
            return true;
        }
        diagnostics.report(
            property.span,
            SemanticError::ComponentCountMismatch {
                key: property.key.text.clone(),
                expected,
                actual: property.values.len(),
            },
        );
        false
    }

    /// Param values carry their own type; only stack-bearing literals and
    /// constants may appear.
    fn check_param_value(&self, value: &ValueNode, diagnostics: &mut Diagnostics) {
        match &value.kind {
            ValueKind::Integer(_) | ValueKind::Long(_) | ValueKind::Str(_) | ValueKind::Error => {}
            ValueKind::ConstantRef(name) => {
                if self.symbols().lookup_constant(&name.text).is_none() {
                    diagnostics.report(
                        value.span,
                        SemanticError::UnknownConstant(name.text.clone()),
                    );
                }
            }
            other => {
                diagnostics.report(
                    value.span,
                    SemanticError::TypeMismatch {
                        expected: Type::of(PrimitiveType::Int),
                        actual: value_type(other),
                    },
                );
            }
        }
    }

    fn check_value(
        &self,
        value: &ValueNode,
        expected: PrimitiveType,
        rules: &[ConfigRule],
        diagnostics: &mut Diagnostics,
    ) {
        match &value.kind {
            ValueKind::Error => {}
            ValueKind::Integer(number) if expected == PrimitiveType::Int => {
                self.check_range(*number, value, rules, diagnostics);
            }
            ValueKind::Long(_) if expected == PrimitiveType::Long => {}
            // Bare integer literals widen to long components.
            ValueKind::Integer(_) if expected == PrimitiveType::Long => {}
            ValueKind::Bool(_) if expected == PrimitiveType::Bool => {}
            ValueKind::CoordGrid(_) if expected == PrimitiveType::CoordGrid => {}
            ValueKind::TypeLiteral(_) if expected == PrimitiveType::Type => {}
            // Strings satisfy the graphic type; unregistered names fall back
            // to plain string payloads at generation time.
            ValueKind::Str(_)
                if expected == PrimitiveType::String || expected == PrimitiveType::Graphic => {}
            ValueKind::ConstantRef(name) => {
                let Some(constant) = self.symbols().lookup_constant(&name.text) else {
                    diagnostics.report(
                        value.span,
                        SemanticError::UnknownConstant(name.text.clone()),
                    );
                    return;
                };
                let actual = constant.value.ty();
                if actual != expected {
                    diagnostics.report(
                        value.span,
                        SemanticError::TypeMismatch {
                            expected: Type::of(expected),
                            actual: Type::of(actual),
                        },
                    );
                    return;
                }
                if let crate::symbol::ConstantValue::Int(number) = constant.value {
                    self.check_range(number, value, rules, diagnostics);
                }
            }
            ValueKind::Reference(name) => {
                if expected == PrimitiveType::Graphic
                    && self.symbols().lookup_graphic(&name.text).is_some()
                {
                    return;
                }
                match expected.config_group() {
                    Some(group) => {
                        if self.symbols().lookup_config(group, &name.text).is_none() {
                            diagnostics.report(
                                value.span,
                                SemanticError::UnresolvedName(name.text.clone()),
                            );
                        }
                    }
                    None => {
                        diagnostics.report(
                            value.span,
                            SemanticError::UnresolvedName(name.text.clone()),
                        );
                    }
                }
            }
            other => {
                diagnostics.report(
                    value.span,
                    SemanticError::TypeMismatch {
                        expected: Type::of(expected),
                        actual: value_type(other),
                    },
                );
            }
        }
    }

    fn check_range(
        &self,
        number: i32,
        value: &ValueNode,
        rules: &[ConfigRule],
        diagnostics: &mut Diagnostics,
    ) {
        for rule in rules {
            if let ConfigRule::Range { min, max } = rule {
                if number < *min || number > *max {
                    diagnostics.report(
                        value.span,
                        SemanticError::ValueOutOfRange {
                            value: number,
                            min: *min,
                            max: *max,
                        },
                    );
                }
            }
        }
    }
}

/// The syntactic type of a literal value, for mismatch messages.
fn value_type(kind: &ValueKind) -> Type {
    match kind {
        ValueKind::Str(_) => Type::of(PrimitiveType::String),
        ValueKind::Integer(_) => Type::of(PrimitiveType::Int),
        ValueKind::Long(_) => Type::of(PrimitiveType::Long),
        ValueKind::Bool(_) => Type::of(PrimitiveType::Bool),
        ValueKind::TypeLiteral(_) => Type::of(PrimitiveType::Type),
        ValueKind::CoordGrid(_) => Type::of(PrimitiveType::CoordGrid),
        ValueKind::ConstantRef(_) | ValueKind::Reference(_) | ValueKind::Error => Type::Error,
    }
}
