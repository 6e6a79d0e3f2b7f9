use crate::ast::{ConfigNode, ScriptNode, VariableScope};
use crate::catalog::TriggerCatalog;
use crate::reporting::{Diagnostics, SemanticError};
use crate::symbol::{ConfigInfo, ScriptInfo, SymbolTable};
use crate::types::{PrimitiveType, Type};

mod config;
mod script;

/// Which storage a resolved variable lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDomain {
    Local,
    Player,
    PlayerBit,
    ClientInt,
    ClientString,
}

/// The config groups a bare `%name` global is resolved against, in order.
/// `%%name` always means the player-bit group.
const GLOBAL_GROUPS: &[&str] = &["varp", "varcint", "varcstring"];

/// Resolves a global variable reference to its domain and value type.
pub(crate) fn resolve_global<'s>(
    symbols: &'s SymbolTable<'_>,
    scope: VariableScope,
    name: &str,
) -> Option<(VariableDomain, PrimitiveType, &'s ConfigInfo)> {
    match scope {
        VariableScope::Local => None,
        VariableScope::Global => {
            let info = symbols.find_config_in_groups(GLOBAL_GROUPS, name)?;
            let (domain, ty) = match info.group.as_str() {
                "varp" => (VariableDomain::Player, PrimitiveType::Int),
                "varcint" => (VariableDomain::ClientInt, PrimitiveType::Int),
                _ => (VariableDomain::ClientString, PrimitiveType::String),
            };
            Some((domain, ty, info))
        }
        VariableScope::GlobalBit => {
            let info = symbols.lookup_config("varpbit", name)?;
            Some((VariableDomain::PlayerBit, PrimitiveType::Int, info))
        }
    }
}

/// Two-phase checker over one batch: a pre-pass that declares every symbol
/// (enabling forward references) and a main pass that resolves names and
/// checks types. Both write to the child table only.
pub struct SemanticChecker<'a, 'p> {
    symbols: &'a mut SymbolTable<'p>,
    triggers: &'a TriggerCatalog,
    allow_override: bool,
}

impl<'a, 'p> SemanticChecker<'a, 'p> {
    pub fn new(
        symbols: &'a mut SymbolTable<'p>,
        triggers: &'a TriggerCatalog,
        allow_override: bool,
    ) -> Self {
        Self {
            symbols,
            triggers,
            allow_override,
        }
    }

    /// Pre-pass for one script: declare it so later files can call it.
    /// With `allow_override` the newer declaration silently replaces the
    /// older one; otherwise the first declaration wins and the duplicate is
    /// diagnosed.
    pub fn declare_script(&mut self, node: &ScriptNode, diagnostics: &mut Diagnostics) {
        let trigger = &node.trigger.text;
        let name = &node.name.text;
        if !self.allow_override && self.symbols.lookup_script(trigger, name).is_some() {
            diagnostics.report(
                node.name.span,
                SemanticError::DuplicateDeclaration {
                    name: node.full_name(),
                },
            );
            return;
        }
        self.symbols.define_script(ScriptInfo {
            trigger: trigger.clone(),
            name: name.clone(),
            return_type: Type::from_prims(node.returns.iter().flatten().map(|r| r.ty)),
            parameter_types: node.parameters.iter().map(|p| p.ty.ty).collect(),
            predefined_id: None,
        });
    }

    /// Pre-pass for one config entry.
    pub fn declare_config(&mut self, node: &ConfigNode, group: &str, diagnostics: &mut Diagnostics) {
        let name = &node.name.text;
        if !self.allow_override && self.symbols.lookup_config(group, name).is_some() {
            diagnostics.report(
                node.name.span,
                SemanticError::DuplicateDeclaration { name: name.clone() },
            );
            return;
        }
        self.symbols.define_config(ConfigInfo {
            group: group.to_owned(),
            name: name.clone(),
            id: None,
        });
    }

    pub(crate) fn symbols(&self) -> &SymbolTable<'p> {
        self.symbols
    }
}
