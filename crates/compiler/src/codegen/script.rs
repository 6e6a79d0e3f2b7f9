use std::collections::HashMap;

use scroll_bytecode::CoreOpcode;

use crate::ast::{
    Expression, ExpressionKind, Operator, ScriptNode, Statement, StatementKind, VariableRef,
    VariableScope,
};
use crate::semantic::{resolve_global, VariableDomain};
use crate::symbol::{ConstantValue, SymbolTable};
use crate::types::{PrimitiveType, StackType};

use super::{
    BinaryScript, Block, InstrOp, Instruction, Label, Operand, StackCounts,
};

/// Variable-name to local-slot mapping, partitioned by stack type.
/// Parameters claim the low slots of each stack; declared variables follow.
#[derive(Debug, Default)]
struct LocalMap {
    slots: HashMap<String, (StackType, u16)>,
    parameters: StackCounts,
    variables: StackCounts,
}

impl LocalMap {
    fn register_parameter(&mut self, name: &str, ty: PrimitiveType) -> u16 {
        let stack = ty.stack_type();
        let slot = self.parameters.bump(stack);
        self.slots.insert(name.to_owned(), (stack, slot));
        slot
    }

    fn register_variable(&mut self, name: &str, ty: PrimitiveType) -> u16 {
        let stack = ty.stack_type();
        let slot = self.parameters.get(stack) + self.variables.bump(stack);
        self.slots.insert(name.to_owned(), (stack, slot));
        slot
    }

    fn lookup(&self, name: &str) -> (StackType, u16) {
        *self
            .slots
            .get(name)
            .expect("semantic checking resolved every local")
    }
}

/// Lowers one type-checked script to block-structured instructions. Erroneous
/// scripts never reach this point, so unresolved names are internal bugs.
pub struct ScriptGenerator<'a, 'p> {
    symbols: &'a SymbolTable<'p>,
    blocks: Vec<Block>,
    positions: HashMap<Label, usize>,
    locals: LocalMap,
    next_label: u32,
    working: Label,
}

impl<'a, 'p> ScriptGenerator<'a, 'p> {
    pub fn new(symbols: &'a SymbolTable<'p>) -> Self {
        let mut generator = Self {
            symbols,
            blocks: Vec::new(),
            positions: HashMap::new(),
            locals: LocalMap::default(),
            next_label: 0,
            working: Label(0),
        };
        generator.working = generator.generate_block();
        generator
    }

    pub fn generate(mut self, script: &ScriptNode, extension: &str) -> BinaryScript {
        for parameter in &script.parameters {
            self.locals
                .register_parameter(&parameter.name.text, parameter.ty.ty);
        }
        for statement in &script.body {
            self.statement(statement);
        }
        if !self.working_block().is_terminated() {
            // Fall off the end: synthesize the default return values.
            for ty in script.returns.iter().flatten().map(|r| r.ty) {
                self.default_push(ty);
            }
            self.emit(CoreOpcode::Return, Operand::Int(0));
        }

        let info = self
            .symbols
            .lookup_script(&script.trigger.text, &script.name.text)
            .expect("the pre-pass declared every script")
            .clone();
        BinaryScript {
            extension: extension.to_owned(),
            name: script.full_name(),
            blocks: self.blocks,
            parameters: self.locals.parameters,
            locals: self.locals.variables,
            switch_tables: Vec::new(),
            info,
        }
    }

    fn generate_block(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        self.positions.insert(label, self.blocks.len());
        self.blocks.push(Block::new(label));
        label
    }

    fn bind(&mut self, label: Label) {
        self.working = label;
    }

    fn working_block(&self) -> &Block {
        &self.blocks[self.positions[&self.working]]
    }

    fn emit(&mut self, opcode: CoreOpcode, operand: Operand) {
        self.emit_to(self.working, opcode, operand);
    }

    fn emit_to(&mut self, block: Label, opcode: CoreOpcode, operand: Operand) {
        let position = self.positions[&block];
        self.blocks[position].instructions.push(Instruction {
            op: InstrOp::Core(opcode),
            operand,
        });
    }

    fn emit_command(&mut self, opcode: u16, operand: Operand) {
        let position = self.positions[&self.working];
        self.blocks[position].instructions.push(Instruction {
            op: InstrOp::Command(opcode),
            operand,
        });
    }

    /// Branches to `target` unless the working block already ended.
    fn branch_if_open(&mut self, target: Label) {
        if !self.working_block().is_terminated() {
            self.emit(CoreOpcode::Branch, Operand::Label(target));
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Block(statements) => {
                for statement in statements {
                    self.statement(statement);
                }
            }
            StatementKind::If {
                condition,
                true_branch,
                false_branch,
            } => self.if_statement(condition, true_branch, false_branch.as_deref()),
            StatementKind::While { condition, body } => self.while_statement(condition, body),
            StatementKind::Return(values) => {
                for value in values {
                    self.expression(value);
                }
                self.emit(CoreOpcode::Return, Operand::Int(0));
            }
            StatementKind::VariableDeclaration {
                ty,
                name,
                initializer,
            } => {
                match initializer {
                    Some(initializer) => self.expression(initializer),
                    None => self.default_push(ty.ty),
                }
                let slot = self.locals.register_variable(&name.text, ty.ty);
                let opcode = match ty.ty.stack_type() {
                    StackType::Int => CoreOpcode::PopIntLocal,
                    StackType::Long => CoreOpcode::PopLongLocal,
                    StackType::String => CoreOpcode::PopStringLocal,
                };
                self.emit(opcode, Operand::Local(slot));
            }
            StatementKind::Assignment { target, value } => {
                self.expression(value);
                self.pop_variable(target);
            }
            StatementKind::Expression(expression) => {
                self.expression(expression);
            }
            StatementKind::Error => {}
        }
    }

    /// Spec-shaped if lowering: the condition branches the source block to
    /// the true block, with an unconditional fall to the false/else block.
    fn if_statement(
        &mut self,
        condition: &Expression,
        true_branch: &Statement,
        false_branch: Option<&Statement>,
    ) {
        let source = self.working;
        let opcode = self.condition(condition);
        let true_block = self.generate_block();

        match false_branch {
            None => {
                let false_block = self.generate_block();
                self.emit_to(source, opcode, Operand::Label(true_block));
                self.emit_to(source, CoreOpcode::Branch, Operand::Label(false_block));
                self.bind(true_block);
                self.statement(true_branch);
                self.branch_if_open(false_block);
                self.bind(false_block);
            }
            Some(false_branch) => {
                let else_block = self.generate_block();
                self.emit_to(source, opcode, Operand::Label(true_block));
                self.emit_to(source, CoreOpcode::Branch, Operand::Label(else_block));
                self.bind(true_block);
                self.statement(true_branch);
                let continue_block = self.generate_block();
                self.branch_if_open(continue_block);
                self.bind(else_block);
                self.statement(false_branch);
                self.branch_if_open(continue_block);
                self.bind(continue_block);
            }
        }
    }

    /// While lowering mirrors if through a pre-header so the condition is
    /// re-evaluated on every iteration.
    fn while_statement(&mut self, condition: &Expression, body: &Statement) {
        let header = self.generate_block();
        self.branch_if_open(header);
        self.bind(header);
        let opcode = self.condition(condition);
        let body_block = self.generate_block();
        let exit_block = self.generate_block();
        self.emit_to(header, opcode, Operand::Label(body_block));
        self.emit_to(header, CoreOpcode::Branch, Operand::Label(exit_block));
        self.bind(body_block);
        self.statement(body);
        self.branch_if_open(header);
        self.bind(exit_block);
    }

    /// Generates a condition's operand pushes and yields the branch opcode
    /// that consumes them.
    fn condition(&mut self, condition: &Expression) -> CoreOpcode {
        if let ExpressionKind::BinaryOperation {
            left,
            operator,
            right,
        } = &condition.kind
        {
            if operator.is_comparison() {
                self.expression(left);
                self.expression(right);
                return match operator {
                    Operator::Equal => CoreOpcode::BranchEquals,
                    Operator::LessThan => CoreOpcode::BranchLessThan,
                    Operator::GreaterThan => CoreOpcode::BranchGreaterThan,
                    Operator::LessThanOrEquals => CoreOpcode::BranchLessThanOrEquals,
                    Operator::GreaterThanOrEquals => CoreOpcode::BranchGreaterThanOrEquals,
                    _ => unreachable!("is_comparison covered the operator"),
                };
            }
        }
        self.expression(condition);
        CoreOpcode::BranchIfTrue
    }

    fn expression(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Bool(value) => {
                self.emit(CoreOpcode::PushIntConstant, Operand::Int(*value as i32));
            }
            ExpressionKind::Integer(value) => {
                self.emit(CoreOpcode::PushIntConstant, Operand::Int(*value));
            }
            ExpressionKind::CoordGrid(value) => {
                self.emit(CoreOpcode::PushIntConstant, Operand::Int(*value));
            }
            ExpressionKind::Long(value) => {
                self.emit(CoreOpcode::PushLongConstant, Operand::Long(*value));
            }
            ExpressionKind::Str(value) => {
                self.emit(CoreOpcode::PushStringConstant, Operand::Str(value.clone()));
            }
            ExpressionKind::Concat(parts) => {
                for part in parts {
                    self.expression(part);
                }
                self.emit(CoreOpcode::JoinString, Operand::Int(parts.len() as i32));
            }
            ExpressionKind::Variable(variable) => self.push_variable(variable),
            ExpressionKind::Constant(name) => {
                let constant = self
                    .symbols
                    .lookup_constant(&name.text)
                    .expect("semantic checking resolved every constant");
                match &constant.value {
                    ConstantValue::Int(value) => {
                        self.emit(CoreOpcode::PushIntConstant, Operand::Int(*value));
                    }
                    ConstantValue::Long(value) => {
                        self.emit(CoreOpcode::PushLongConstant, Operand::Long(*value));
                    }
                    ConstantValue::Str(value) => {
                        self.emit(CoreOpcode::PushStringConstant, Operand::Str(value.clone()));
                    }
                }
            }
            ExpressionKind::Dynamic(name) => {
                if let Some(info) = self
                    .symbols
                    .find_config_in_groups(&["obj", "param"], &name.text)
                {
                    let operand = Operand::Symbol {
                        group: info.group.clone(),
                        name: info.name.clone(),
                    };
                    self.emit(CoreOpcode::PushIntConstant, operand);
                    return;
                }
                let id = self
                    .symbols
                    .lookup_graphic(&name.text)
                    .expect("semantic checking resolved every dynamic reference");
                self.emit(CoreOpcode::PushIntConstant, Operand::Int(id));
            }
            ExpressionKind::Command {
                name,
                arguments,
                alternative,
            } => {
                let opcode = self
                    .symbols
                    .lookup_command(&name.text)
                    .expect("semantic checking resolved every command")
                    .opcode;
                for argument in arguments {
                    self.expression(argument);
                }
                self.emit_command(opcode, Operand::Int(*alternative as i32));
            }
            ExpressionKind::Gosub { name, arguments } => {
                for argument in arguments {
                    self.expression(argument);
                }
                let script = self
                    .symbols
                    .lookup_script("proc", &name.text)
                    .expect("semantic checking resolved every gosub");
                self.emit(
                    CoreOpcode::GosubWithParams,
                    Operand::Symbol {
                        group: "script".to_owned(),
                        name: script.full_name(),
                    },
                );
            }
            ExpressionKind::Calc(inner) => self.expression(inner),
            ExpressionKind::BinaryOperation {
                left,
                operator,
                right,
            } => {
                self.expression(left);
                self.expression(right);
                let opcode = match operator {
                    Operator::Add => CoreOpcode::Add,
                    Operator::Subtract => CoreOpcode::Sub,
                    Operator::Multiply => CoreOpcode::Multiply,
                    Operator::Divide => CoreOpcode::Divide,
                    Operator::Modulo => CoreOpcode::Modulo,
                    _ => unreachable!("comparisons lower through condition()"),
                };
                self.emit(opcode, Operand::Int(0));
            }
            ExpressionKind::Error => {
                unreachable!("erroneous scripts are never generated")
            }
        }
    }

    fn push_variable(&mut self, variable: &VariableRef) {
        if variable.scope == VariableScope::Local {
            let (stack, slot) = self.locals.lookup(&variable.name.text);
            let opcode = match stack {
                StackType::Int => CoreOpcode::PushIntLocal,
                StackType::Long => CoreOpcode::PushLongLocal,
                StackType::String => CoreOpcode::PushStringLocal,
            };
            self.emit(opcode, Operand::Local(slot));
            return;
        }
        let (domain, _, info) =
            resolve_global(self.symbols, variable.scope, &variable.name.text)
                .expect("semantic checking resolved every global");
        let opcode = match domain {
            VariableDomain::Player => CoreOpcode::PushVarp,
            VariableDomain::PlayerBit => CoreOpcode::PushVarpBit,
            VariableDomain::ClientInt => CoreOpcode::PushVarcInt,
            VariableDomain::ClientString => CoreOpcode::PushVarcString,
            VariableDomain::Local => unreachable!("locals handled above"),
        };
        let operand = Operand::Symbol {
            group: info.group.clone(),
            name: info.name.clone(),
        };
        self.emit(opcode, operand);
    }

    fn pop_variable(&mut self, variable: &VariableRef) {
        if variable.scope == VariableScope::Local {
            let (stack, slot) = self.locals.lookup(&variable.name.text);
            let opcode = match stack {
                StackType::Int => CoreOpcode::PopIntLocal,
                StackType::Long => CoreOpcode::PopLongLocal,
                StackType::String => CoreOpcode::PopStringLocal,
            };
            self.emit(opcode, Operand::Local(slot));
            return;
        }
        let (domain, _, info) =
            resolve_global(self.symbols, variable.scope, &variable.name.text)
                .expect("semantic checking resolved every global");
        let opcode = match domain {
            VariableDomain::Player => CoreOpcode::PopVarp,
            VariableDomain::PlayerBit => CoreOpcode::PopVarpBit,
            VariableDomain::ClientInt => CoreOpcode::PopVarcInt,
            VariableDomain::ClientString => CoreOpcode::PopVarcString,
            VariableDomain::Local => unreachable!("locals handled above"),
        };
        let operand = Operand::Symbol {
            group: info.group.clone(),
            name: info.name.clone(),
        };
        self.emit(opcode, operand);
    }

    fn default_push(&mut self, ty: PrimitiveType) {
        match ty.stack_type() {
            StackType::Int => self.emit(CoreOpcode::PushIntConstant, Operand::Int(0)),
            StackType::Long => self.emit(CoreOpcode::PushLongConstant, Operand::Long(0)),
            StackType::String => {
                self.emit(CoreOpcode::PushStringConstant, Operand::Str(String::new()))
            }
        }
    }
}
