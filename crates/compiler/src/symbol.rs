use std::collections::HashMap;

use crate::types::{PrimitiveType, Type};

/// A declared script: fully named by `[trigger,name]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInfo {
    pub trigger: String,
    pub name: String,
    pub return_type: Type,
    pub parameter_types: Vec<PrimitiveType>,
    /// Set for engine scripts whose id is fixed ahead of id generation.
    pub predefined_id: Option<i32>,
}

impl ScriptInfo {
    pub fn full_name(&self) -> String {
        format!("[{},{}]", self.trigger, self.name)
    }
}

/// A native command, loaded from the command catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    pub opcode: u16,
    pub name: String,
    pub return_type: Type,
    pub argument_types: Vec<PrimitiveType>,
    /// Hook commands accept one trailing string argument naming the hook.
    pub hook: bool,
    pub hook_type: Option<PrimitiveType>,
    pub alternative: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Str(String),
}

impl ConstantValue {
    pub fn ty(&self) -> PrimitiveType {
        match self {
            ConstantValue::Int(_) => PrimitiveType::Int,
            ConstantValue::Long(_) => PrimitiveType::Long,
            ConstantValue::Str(_) => PrimitiveType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantInfo {
    pub name: String,
    pub value: ConstantValue,
}

/// A configuration entry: its group, name, and (after id generation) its
/// resolved numeric id.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigInfo {
    pub group: String,
    pub name: String,
    pub id: Option<i32>,
}

/// Hierarchical symbol storage. A table holds an immutable handle to its
/// parent and a mutable set of maps of its own; lookups walk the chain,
/// definitions only ever touch the child. The driver creates one child per
/// batch so a failed batch leaves the root untouched.
#[derive(Debug, Default)]
pub struct SymbolTable<'p> {
    parent: Option<&'p SymbolTable<'p>>,
    scripts: HashMap<(String, String), ScriptInfo>,
    commands: HashMap<String, CommandInfo>,
    constants: HashMap<String, ConstantInfo>,
    configs: HashMap<(String, String), ConfigInfo>,
    graphics: HashMap<String, i32>,
}

impl<'p> SymbolTable<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh child table layered over this one.
    pub fn child(&'p self) -> SymbolTable<'p> {
        SymbolTable {
            parent: Some(self),
            ..SymbolTable::default()
        }
    }

    pub fn define_script(&mut self, info: ScriptInfo) {
        self.scripts
            .insert((info.trigger.clone(), info.name.clone()), info);
    }

    pub fn lookup_script(&self, trigger: &str, name: &str) -> Option<&ScriptInfo> {
        match self
            .scripts
            .get(&(trigger.to_owned(), name.to_owned()))
        {
            Some(info) => Some(info),
            None => self.parent.and_then(|p| p.lookup_script(trigger, name)),
        }
    }

    pub fn define_command(&mut self, info: CommandInfo) {
        self.commands.insert(info.name.clone(), info);
    }

    pub fn lookup_command(&self, name: &str) -> Option<&CommandInfo> {
        match self.commands.get(name) {
            Some(info) => Some(info),
            None => self.parent.and_then(|p| p.lookup_command(name)),
        }
    }

    pub fn define_constant(&mut self, info: ConstantInfo) {
        self.constants.insert(info.name.clone(), info);
    }

    pub fn lookup_constant(&self, name: &str) -> Option<&ConstantInfo> {
        match self.constants.get(name) {
            Some(info) => Some(info),
            None => self.parent.and_then(|p| p.lookup_constant(name)),
        }
    }

    pub fn define_config(&mut self, info: ConfigInfo) {
        self.configs
            .insert((info.group.clone(), info.name.clone()), info);
    }

    pub fn lookup_config(&self, group: &str, name: &str) -> Option<&ConfigInfo> {
        match self.configs.get(&(group.to_owned(), name.to_owned())) {
            Some(info) => Some(info),
            None => self.parent.and_then(|p| p.lookup_config(group, name)),
        }
    }

    /// Finds a config entry by bare name, trying each group in the given
    /// order. Used to resolve sigil-less references and `%` globals.
    pub fn find_config_in_groups(&self, groups: &[&str], name: &str) -> Option<&ConfigInfo> {
        groups
            .iter()
            .find_map(|group| self.lookup_config(group, name))
    }

    pub fn set_config_id(&mut self, group: &str, name: &str, id: i32) {
        if let Some(info) = self.configs.get_mut(&(group.to_owned(), name.to_owned())) {
            info.id = Some(id);
        }
    }

    pub fn define_graphic(&mut self, name: &str, id: i32) {
        self.graphics.insert(name.to_owned(), id);
    }

    pub fn lookup_graphic(&self, name: &str) -> Option<i32> {
        match self.graphics.get(name) {
            Some(id) => Some(*id),
            None => self.parent.and_then(|p| p.lookup_graphic(name)),
        }
    }
}
