use std::collections::HashMap;

use crate::ast::{
    Expression, ExpressionKind, Operator, ScriptNode, Statement, StatementKind, VariableRef,
    VariableScope,
};
use crate::reporting::{Diagnostics, SemanticError};
use crate::tokens::Span;
use crate::types::{PrimitiveType, Type};

use super::{resolve_global, SemanticChecker, VariableDomain};

/// Script-scoped state for the main pass. Locals are script-scoped, not
/// block-scoped: a declaration anywhere in the body claims the name for the
/// whole script, matching the flat local slots of the target machine.
struct ScriptScope {
    locals: HashMap<String, PrimitiveType>,
    /// `None` when the script declared no return list: returns go unchecked.
    return_type: Option<Type>,
}

impl<'a, 'p> SemanticChecker<'a, 'p> {
    /// Main pass over one script: trigger validation, parameter scope, and
    /// a bottom-up type check of every statement.
    pub fn check_script(&mut self, node: &ScriptNode, diagnostics: &mut Diagnostics) {
        match self.triggers.lookup(&node.trigger.text) {
            None => {
                diagnostics.report(
                    node.trigger.span,
                    SemanticError::UnknownTrigger(node.trigger.text.clone()),
                );
            }
            Some(trigger) => {
                if !trigger.support_arguments && !node.parameters.is_empty() {
                    diagnostics.report(
                        node.parameters[0].span,
                        SemanticError::TriggerHasNoParameters {
                            trigger: trigger.name.clone(),
                        },
                    );
                }
                if !trigger.support_returns {
                    if let Some(first) = node.returns.iter().flatten().next() {
                        diagnostics.report(
                            first.span,
                            SemanticError::TriggerHasNoReturns {
                                trigger: trigger.name.clone(),
                            },
                        );
                    }
                }
            }
        }

        let mut scope = ScriptScope {
            locals: HashMap::new(),
            return_type: node
                .returns
                .as_ref()
                .map(|returns| Type::from_prims(returns.iter().map(|r| r.ty))),
        };
        for parameter in &node.parameters {
            let name = &parameter.name.text;
            if scope.locals.contains_key(name) {
                diagnostics.report(
                    parameter.name.span,
                    SemanticError::DuplicateParameter { name: name.clone() },
                );
                continue;
            }
            scope.locals.insert(name.clone(), parameter.ty.ty);
        }

        for statement in &node.body {
            self.check_statement(statement, &mut scope, diagnostics);
        }
    }

    fn check_statement(
        &self,
        statement: &Statement,
        scope: &mut ScriptScope,
        diagnostics: &mut Diagnostics,
    ) {
        match &statement.kind {
            StatementKind::Block(statements) => {
                for statement in statements {
                    self.check_statement(statement, scope, diagnostics);
                }
            }
            StatementKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.check_condition(condition, scope, diagnostics);
                self.check_statement(true_branch, scope, diagnostics);
                if let Some(false_branch) = false_branch {
                    self.check_statement(false_branch, scope, diagnostics);
                }
            }
            StatementKind::While { condition, body } => {
                self.check_condition(condition, scope, diagnostics);
                self.check_statement(body, scope, diagnostics);
            }
            StatementKind::Return(values) => {
                let actual = Type::tuple(
                    values
                        .iter()
                        .map(|value| self.infer_expression(value, scope, diagnostics)),
                );
                if let Some(expected) = &scope.return_type {
                    if !actual.is_error() && actual != *expected {
                        diagnostics.report(
                            statement.span,
                            SemanticError::ReturnMismatch {
                                expected: expected.clone(),
                                actual,
                            },
                        );
                    }
                }
            }
            StatementKind::VariableDeclaration {
                ty,
                name,
                initializer,
            } => {
                if let Some(initializer) = initializer {
                    let actual = self.infer_expression(initializer, scope, diagnostics);
                    self.expect_prim(initializer.span, &actual, ty.ty, diagnostics);
                }
                scope.locals.insert(name.text.clone(), ty.ty);
            }
            StatementKind::Assignment { target, value } => {
                let actual = self.infer_expression(value, scope, diagnostics);
                if let Some((_, expected)) = self.resolve_variable(target, scope, diagnostics) {
                    self.expect_prim(value.span, &actual, expected, diagnostics);
                }
            }
            StatementKind::Expression(expression) => {
                self.infer_expression(expression, scope, diagnostics);
            }
            StatementKind::Error => {}
        }
    }

    fn check_condition(
        &self,
        condition: &Expression,
        scope: &mut ScriptScope,
        diagnostics: &mut Diagnostics,
    ) {
        let actual = self.infer_expression(condition, scope, diagnostics);
        if !actual.is_error() && actual != Type::Prim(PrimitiveType::Bool) {
            diagnostics.report(condition.span, SemanticError::ConditionNotBoolean { actual });
        }
    }

    fn resolve_variable(
        &self,
        variable: &VariableRef,
        scope: &ScriptScope,
        diagnostics: &mut Diagnostics,
    ) -> Option<(VariableDomain, PrimitiveType)> {
        if variable.scope == VariableScope::Local {
            return match scope.locals.get(&variable.name.text) {
                Some(ty) => Some((VariableDomain::Local, *ty)),
                None => {
                    diagnostics.report(
                        variable.span,
                        SemanticError::UnresolvedVariable(variable.name.text.clone()),
                    );
                    None
                }
            };
        }
        match resolve_global(self.symbols(), variable.scope, &variable.name.text) {
            Some((domain, ty, _)) => Some((domain, ty)),
            None => {
                diagnostics.report(
                    variable.span,
                    SemanticError::UnresolvedVariable(variable.name.text.clone()),
                );
                None
            }
        }
    }

    fn infer_expression(
        &self,
        expression: &Expression,
        scope: &ScriptScope,
        diagnostics: &mut Diagnostics,
    ) -> Type {
        match &expression.kind {
            ExpressionKind::Bool(_) => Type::of(PrimitiveType::Bool),
            ExpressionKind::Integer(_) => Type::of(PrimitiveType::Int),
            ExpressionKind::Long(_) => Type::of(PrimitiveType::Long),
            ExpressionKind::Str(_) => Type::of(PrimitiveType::String),
            ExpressionKind::CoordGrid(_) => Type::of(PrimitiveType::CoordGrid),
            ExpressionKind::Concat(parts) => {
                for part in parts {
                    let actual = self.infer_expression(part, scope, diagnostics);
                    self.expect_prim(part.span, &actual, PrimitiveType::String, diagnostics);
                }
                Type::of(PrimitiveType::String)
            }
            ExpressionKind::Variable(variable) => {
                match self.resolve_variable(variable, scope, diagnostics) {
                    Some((_, ty)) => Type::of(ty),
                    None => Type::Error,
                }
            }
            ExpressionKind::Constant(name) => {
                match self.symbols().lookup_constant(&name.text) {
                    Some(constant) => Type::of(constant.value.ty()),
                    None => {
                        diagnostics.report(
                            expression.span,
                            SemanticError::UnknownConstant(name.text.clone()),
                        );
                        Type::Error
                    }
                }
            }
            ExpressionKind::Dynamic(name) => {
                if let Some(info) = self
                    .symbols()
                    .find_config_in_groups(&["obj", "param"], &name.text)
                {
                    let ty = match info.group.as_str() {
                        "obj" => PrimitiveType::Obj,
                        _ => PrimitiveType::Param,
                    };
                    return Type::of(ty);
                }
                if self.symbols().lookup_graphic(&name.text).is_some() {
                    return Type::of(PrimitiveType::Graphic);
                }
                diagnostics.report(
                    expression.span,
                    SemanticError::UnresolvedName(name.text.clone()),
                );
                Type::Error
            }
            ExpressionKind::Command {
                name, arguments, ..
            } => {
                let Some(command) = self.symbols().lookup_command(&name.text) else {
                    for argument in arguments {
                        self.infer_expression(argument, scope, diagnostics);
                    }
                    diagnostics.report(
                        name.span,
                        SemanticError::UnknownCommand(name.text.clone()),
                    );
                    return Type::Error;
                };
                let command = command.clone();
                let hook_argument = command.hook && arguments.len() == command.argument_types.len() + 1;
                if !hook_argument && arguments.len() != command.argument_types.len() {
                    diagnostics.report(
                        expression.span,
                        SemanticError::ArityMismatch {
                            name: command.name.clone(),
                            expected: command.argument_types.len(),
                            actual: arguments.len(),
                        },
                    );
                }
                for (index, argument) in arguments.iter().enumerate() {
                    let actual = self.infer_expression(argument, scope, diagnostics);
                    let expected = match command.argument_types.get(index) {
                        Some(expected) => *expected,
                        None if hook_argument => PrimitiveType::String,
                        None => continue,
                    };
                    self.expect_prim(argument.span, &actual, expected, diagnostics);
                }
                command.return_type
            }
            ExpressionKind::Gosub { name, arguments } => {
                let Some(script) = self.symbols().lookup_script("proc", &name.text) else {
                    for argument in arguments {
                        self.infer_expression(argument, scope, diagnostics);
                    }
                    diagnostics.report(
                        name.span,
                        SemanticError::UnknownScript(name.text.clone()),
                    );
                    return Type::Error;
                };
                let script = script.clone();
                if arguments.len() != script.parameter_types.len() {
                    diagnostics.report(
                        expression.span,
                        SemanticError::ArityMismatch {
                            name: script.full_name(),
                            expected: script.parameter_types.len(),
                            actual: arguments.len(),
                        },
                    );
                }
                for (index, argument) in arguments.iter().enumerate() {
                    let actual = self.infer_expression(argument, scope, diagnostics);
                    if let Some(expected) = script.parameter_types.get(index) {
                        self.expect_prim(argument.span, &actual, *expected, diagnostics);
                    }
                }
                script.return_type
            }
            ExpressionKind::Calc(inner) => {
                let actual = self.infer_expression(inner, scope, diagnostics);
                self.expect_prim(inner.span, &actual, PrimitiveType::Int, diagnostics);
                Type::of(PrimitiveType::Int)
            }
            ExpressionKind::BinaryOperation {
                left,
                operator,
                right,
            } => {
                let left_type = self.infer_expression(left, scope, diagnostics);
                let right_type = self.infer_expression(right, scope, diagnostics);
                if operator.is_comparison() {
                    // Relational operators compare int-stack values; `==`
                    // additionally compares booleans.
                    let bools_allowed = *operator == Operator::Equal
                        && left_type == Type::of(PrimitiveType::Bool)
                        && right_type == Type::of(PrimitiveType::Bool);
                    if !bools_allowed {
                        self.expect_prim(left.span, &left_type, PrimitiveType::Int, diagnostics);
                        self.expect_prim(right.span, &right_type, PrimitiveType::Int, diagnostics);
                    }
                    Type::of(PrimitiveType::Bool)
                } else {
                    self.expect_prim(left.span, &left_type, PrimitiveType::Int, diagnostics);
                    self.expect_prim(right.span, &right_type, PrimitiveType::Int, diagnostics);
                    Type::of(PrimitiveType::Int)
                }
            }
            ExpressionKind::Error => Type::Error,
        }
    }

    /// Reports when `actual` is not exactly the expected primitive. Error
    /// types pass silently so one mistake is diagnosed once.
    pub(crate) fn expect_prim(
        &self,
        span: Span,
        actual: &Type,
        expected: PrimitiveType,
        diagnostics: &mut Diagnostics,
    ) {
        match actual {
            Type::Error => {}
            Type::Prim(prim) if *prim == expected => {}
            Type::Prim(_) => {
                diagnostics.report(
                    span,
                    SemanticError::TypeMismatch {
                        expected: Type::of(expected),
                        actual: actual.clone(),
                    },
                );
            }
            Type::Tuple(_) => {
                diagnostics.report(
                    span,
                    SemanticError::TupleNotAllowedHere {
                        actual: actual.clone(),
                    },
                );
            }
        }
    }
}
