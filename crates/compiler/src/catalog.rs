//! Loaders for the driver's collaborator configuration: the instruction map,
//! the trigger and command catalogs, and binding schemas. All of them are
//! TOML documents deserialized into raw shapes first and validated into the
//! typed forms second, so a bad file fails the driver loudly instead of
//! miscompiling quietly.

use std::collections::HashMap;

use scroll_bytecode::CoreOpcode;
use serde::Deserialize;

use crate::binding::{Binding, ConfigRule, PropertyBinding, PropertyDescriptor};
use crate::error::CompilerError;
use crate::symbol::CommandInfo;
use crate::types::{PrimitiveType, Type};

/// A concrete opcode assignment for one [`CoreOpcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedOpcode {
    pub opcode: u16,
    /// Large opcodes are written as `u16` and take 32-bit immediates.
    pub large: bool,
}

/// Resolves abstract core opcodes to the concrete opcodes of the target
/// runtime. Must be *ready* (every core opcode mapped) before the driver
/// accepts code-generation work.
#[derive(Debug, Clone, Default)]
pub struct InstructionMap {
    entries: HashMap<CoreOpcode, MappedOpcode>,
}

impl InstructionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, core: CoreOpcode, opcode: u16, large: bool) {
        self.entries.insert(core, MappedOpcode { opcode, large });
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CompilerError> {
        #[derive(Deserialize)]
        struct RawEntry {
            opcode: u16,
            #[serde(default)]
            large: bool,
        }

        let raw: HashMap<String, RawEntry> = toml::from_str(text)?;
        let mut map = Self::new();
        for (name, entry) in raw {
            let core = CoreOpcode::from_name(&name)
                .ok_or_else(|| CompilerError::UnknownCoreOpcode(name.clone()))?;
            map.register(core, entry.opcode, entry.large);
        }
        Ok(map)
    }

    /// A ready map assigning each core opcode its declaration index, all
    /// large. Handy for hosts that control both ends of the pipeline.
    pub fn sequential() -> Self {
        let mut map = Self::new();
        for (index, core) in CoreOpcode::all().enumerate() {
            map.register(core, index as u16, true);
        }
        map
    }

    pub fn is_ready(&self) -> bool {
        self.first_unmapped().is_none()
    }

    pub fn first_unmapped(&self) -> Option<CoreOpcode> {
        CoreOpcode::all().find(|core| !self.entries.contains_key(core))
    }

    /// Panics when unmapped: the driver refuses construction for maps that
    /// are not ready, so a miss here is an internal invariant violation.
    pub fn lookup(&self, core: CoreOpcode) -> MappedOpcode {
        *self
            .entries
            .get(&core)
            .unwrap_or_else(|| panic!("core opcode `{}` is unmapped", core.name()))
    }
}

/// One invocation context a script may be declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerInfo {
    pub name: String,
    pub opcode: Option<u16>,
    pub sigil: Option<char>,
    pub support_arguments: bool,
    pub support_returns: bool,
    pub argument_types: Vec<PrimitiveType>,
    pub return_types: Vec<PrimitiveType>,
}

#[derive(Debug, Clone, Default)]
pub struct TriggerCatalog {
    map: HashMap<String, TriggerInfo>,
}

impl TriggerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: TriggerInfo) {
        self.map.insert(info.name.clone(), info);
    }

    pub fn lookup(&self, name: &str) -> Option<&TriggerInfo> {
        self.map.get(name)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CompilerError> {
        #[derive(Deserialize)]
        struct RawTrigger {
            #[serde(default)]
            opcode: Option<u16>,
            #[serde(default)]
            sigil: Option<String>,
            #[serde(default)]
            support_arguments: bool,
            #[serde(default)]
            support_returns: bool,
            #[serde(default)]
            arguments: Vec<String>,
            #[serde(default)]
            returns: Vec<String>,
        }

        let raw: HashMap<String, RawTrigger> = toml::from_str(text)?;
        let mut catalog = Self::new();
        for (name, entry) in raw {
            let sigil = match entry.sigil.as_deref() {
                None => None,
                Some(text) if text.chars().count() == 1 => text.chars().next(),
                Some(text) => {
                    return Err(CompilerError::Catalog(format!(
                        "trigger `{name}` has a multi-character sigil `{text}`"
                    )))
                }
            };
            catalog.insert(TriggerInfo {
                opcode: entry.opcode,
                sigil,
                support_arguments: entry.support_arguments,
                support_returns: entry.support_returns,
                argument_types: parse_types(&entry.arguments)?,
                return_types: parse_types(&entry.returns)?,
                name,
            });
        }
        Ok(catalog)
    }
}

/// Parses a command catalog into the symbols the driver seeds its root
/// symbol table with.
pub fn commands_from_toml_str(text: &str) -> Result<Vec<CommandInfo>, CompilerError> {
    #[derive(Deserialize)]
    struct RawCommand {
        opcode: u16,
        #[serde(default)]
        returns: Vec<String>,
        #[serde(default)]
        arguments: Vec<String>,
        #[serde(default)]
        alternative: bool,
        #[serde(default)]
        hook: bool,
        #[serde(default)]
        hook_type: Option<String>,
        #[serde(default)]
        tag: Option<String>,
    }

    let raw: HashMap<String, RawCommand> = toml::from_str(text)?;
    let mut commands: Vec<CommandInfo> = raw
        .into_iter()
        .map(|(name, entry)| {
            let hook_type = entry
                .hook_type
                .as_deref()
                .map(|text| parse_type(text))
                .transpose()?;
            Ok(CommandInfo {
                opcode: entry.opcode,
                return_type: Type::from_prims(parse_types(&entry.returns)?),
                argument_types: parse_types(&entry.arguments)?,
                alternative: entry.alternative,
                hook: entry.hook,
                hook_type,
                tag: entry.tag,
                name,
            })
        })
        .collect::<Result<_, CompilerError>>()?;
    commands.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(commands)
}

/// Parses a binding schema file: one table per file extension, holding the
/// target group and a `properties` table of descriptors.
pub fn bindings_from_toml_str(text: &str) -> Result<Vec<(String, Binding)>, CompilerError> {
    #[derive(Deserialize)]
    struct RawBindingFile {
        group: String,
        #[serde(default)]
        properties: HashMap<String, RawProperty>,
    }

    #[derive(Deserialize)]
    struct RawProperty {
        kind: String,
        #[serde(default)]
        opcode: Option<u8>,
        #[serde(default)]
        opcodes: Option<[u8; 2]>,
        #[serde(default)]
        components: Option<Vec<String>>,
        #[serde(default)]
        type_property: Option<String>,
        #[serde(default)]
        size_type: Option<String>,
        #[serde(default)]
        max_size: Option<usize>,
        #[serde(default)]
        element: Option<usize>,
        #[serde(default)]
        component: Option<usize>,
        #[serde(default)]
        component_count: Option<usize>,
        #[serde(default, rename = "type")]
        ty: Option<String>,
        #[serde(default)]
        key_type: Option<String>,
        #[serde(default)]
        rules: Vec<String>,
    }

    fn require<T>(value: Option<T>, key: &str, field: &str) -> Result<T, CompilerError> {
        value.ok_or_else(|| {
            CompilerError::Catalog(format!("property `{key}` is missing `{field}`"))
        })
    }

    let raw: HashMap<String, RawBindingFile> = toml::from_str(text)?;
    let mut bindings = Vec::new();
    for (extension, file) in raw {
        let mut binding = Binding::new(&file.group);
        for (key, property) in file.properties {
            let descriptor = match property.kind.as_str() {
                "basic" => PropertyDescriptor::Basic {
                    opcode: require(property.opcode, &key, "opcode")?,
                    components: parse_types(&require(property.components, &key, "components")?)?,
                },
                "type_dispatched" => PropertyDescriptor::TypeDispatched {
                    opcodes: require(property.opcodes, &key, "opcodes")?,
                    type_property: require(property.type_property, &key, "type_property")?,
                },
                "split_array" => PropertyDescriptor::SplitArray {
                    opcode: require(property.opcode, &key, "opcode")?,
                    size_type: parse_type(&require(property.size_type, &key, "size_type")?)?,
                    max_size: require(property.max_size, &key, "max_size")?,
                    element: require(property.element, &key, "element")?,
                    component: require(property.component, &key, "component")?,
                    component_count: require(property.component_count, &key, "component_count")?,
                    ty: parse_type(&require(property.ty, &key, "type")?)?,
                },
                "param" => PropertyDescriptor::Param {
                    opcode: require(property.opcode, &key, "opcode")?,
                },
                "map" => PropertyDescriptor::Map {
                    opcodes: require(property.opcodes, &key, "opcodes")?,
                    type_property: require(property.type_property, &key, "type_property")?,
                    key_type: parse_type(&require(property.key_type, &key, "key_type")?)?,
                },
                other => {
                    return Err(CompilerError::Catalog(format!(
                        "property `{key}` has unknown kind `{other}`"
                    )))
                }
            };
            let rules = property
                .rules
                .iter()
                .map(|rule| parse_rule(rule, &key))
                .collect::<Result<_, _>>()?;
            binding.put(PropertyBinding {
                name: key,
                descriptor,
                rules,
            });
        }
        bindings.push((extension, binding));
    }
    bindings.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(bindings)
}

fn parse_rule(rule: &str, key: &str) -> Result<ConfigRule, CompilerError> {
    if rule == "emit_empty_if_true" {
        return Ok(ConfigRule::EmitEmptyIfTrue);
    }
    if rule == "emit_empty_if_false" {
        return Ok(ConfigRule::EmitEmptyIfFalse);
    }
    if let Some(arguments) = rule
        .strip_prefix("range(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        if let Some((min, max)) = arguments.split_once(',') {
            if let (Ok(min), Ok(max)) = (min.trim().parse(), max.trim().parse()) {
                return Ok(ConfigRule::Range { min, max });
            }
        }
    }
    if let Some(name) = rule
        .strip_prefix("require(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Ok(ConfigRule::Require(name.trim().to_owned()));
    }
    Err(CompilerError::Catalog(format!(
        "property `{key}` has unknown rule `{rule}`"
    )))
}

fn parse_type(text: &str) -> Result<PrimitiveType, CompilerError> {
    PrimitiveType::from_representation(text)
        .ok_or_else(|| CompilerError::UnknownPrimitive(text.to_owned()))
}

fn parse_types(texts: &[String]) -> Result<Vec<PrimitiveType>, CompilerError> {
    texts.iter().map(|text| parse_type(text)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_map_is_ready() {
        let map = InstructionMap::sequential();
        assert!(map.is_ready());
        assert!(map.lookup(CoreOpcode::Return).large);
    }

    #[test]
    fn instruction_map_from_toml() {
        let map = InstructionMap::from_toml_str(
            "push_int_constant = { opcode = 0, large = true }\nreturn = { opcode = 21 }\n",
        )
        .unwrap();
        assert!(!map.is_ready());
        assert_eq!(
            map.lookup(CoreOpcode::PushIntConstant),
            MappedOpcode {
                opcode: 0,
                large: true
            }
        );
        assert_eq!(
            map.lookup(CoreOpcode::Return),
            MappedOpcode {
                opcode: 21,
                large: false
            }
        );
    }

    #[test]
    fn instruction_map_rejects_unknown_names() {
        let result = InstructionMap::from_toml_str("fly_to_the_moon = { opcode = 1 }\n");
        assert!(matches!(result, Err(CompilerError::UnknownCoreOpcode(_))));
    }

    #[test]
    fn trigger_catalog_from_toml() {
        let catalog = TriggerCatalog::from_toml_str(
            r#"
            [proc]
            support_arguments = true
            support_returns = true

            [clientscript]
            opcode = 76
            arguments = ["int"]
            "#,
        )
        .unwrap();
        let proc = catalog.lookup("proc").unwrap();
        assert!(proc.support_arguments && proc.support_returns);
        let clientscript = catalog.lookup("clientscript").unwrap();
        assert_eq!(clientscript.opcode, Some(76));
        assert_eq!(clientscript.argument_types, vec![PrimitiveType::Int]);
    }

    #[test]
    fn commands_from_toml() {
        let commands = commands_from_toml_str(
            r#"
            [mes]
            opcode = 3100
            arguments = ["string"]

            [random]
            opcode = 3120
            arguments = ["int"]
            returns = ["int"]
            "#,
        )
        .unwrap();
        assert_eq!(commands.len(), 2);
        let mes = commands.iter().find(|c| c.name == "mes").unwrap();
        assert_eq!(mes.argument_types, vec![PrimitiveType::String]);
        assert!(mes.return_type.is_void());
    }

    #[test]
    fn bindings_from_toml() {
        let bindings = bindings_from_toml_str(
            r#"
            [obj]
            group = "obj"

            [obj.properties.members]
            kind = "basic"
            opcode = 10
            components = ["bool"]
            rules = ["emit_empty_if_true"]

            [obj.properties.cost]
            kind = "basic"
            opcode = 11
            components = ["int"]
            rules = ["range(0,10000)", "require(members)"]
            "#,
        )
        .unwrap();
        assert_eq!(bindings.len(), 1);
        let (extension, binding) = &bindings[0];
        assert_eq!(extension, "obj");
        assert_eq!(binding.group(), "obj");
        let cost = binding.entry("cost").unwrap();
        assert_eq!(
            cost.rules,
            vec![
                ConfigRule::Range {
                    min: 0,
                    max: 10000
                },
                ConfigRule::Require("members".to_owned())
            ]
        );
    }
}
