use crate::ast::{
    Expression, ExpressionKind, Identifier, Operator, Parameter, ScriptNode, Statement,
    StatementKind, TypeRef, VariableRef, VariableScope,
};
use crate::lexer::{Lexer, LexicalTable, Tokenizer};
use crate::reporting::{Diagnostics, SyntaxError};
use crate::tokens::{Kind, Segment, Span, TokenValue};

use super::ParserCore;

/// Recursive-descent parser for the script dialect. Re-entrant per file; a
/// parse failure inside a statement resynchronizes on `;`, `}` or the next
/// script header and leaves an `Error` statement behind.
pub struct ScriptParser<'a, 'd> {
    core: ParserCore<'a, 'd>,
    table: &'a LexicalTable,
}

impl<'a, 'd> ScriptParser<'a, 'd> {
    pub fn new(table: &'a LexicalTable, lexer: Lexer<'a>, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            core: ParserCore::new(lexer, diagnostics),
            table,
        }
    }

    pub fn parse_file(mut self) -> Vec<ScriptNode> {
        let mut scripts = Vec::new();
        loop {
            match self.core.peek_kind() {
                Kind::Eof => break,
                Kind::LBracket => {
                    if let Some(script) = self.parse_script() {
                        scripts.push(script);
                    }
                }
                found => {
                    let span = self.core.peek_span();
                    self.core.report(span, SyntaxError::ExpectedScript { found });
                    self.skip_to_header();
                }
            }
        }
        self.core.finish();
        scripts
    }

    fn skip_to_header(&mut self) {
        while !matches!(self.core.peek_kind(), Kind::LBracket | Kind::Eof) {
            self.core.take();
        }
    }

    fn parse_script(&mut self) -> Option<ScriptNode> {
        let open = self.core.expect(Kind::LBracket)?;
        let header = (|| {
            let trigger = self.identifier()?;
            self.core.expect(Kind::Comma)?;
            let name = self.identifier()?;
            self.core.expect(Kind::RBracket)?;
            Some((trigger, name))
        })();
        let Some((trigger, name)) = header else {
            self.skip_to_header();
            return None;
        };

        let mut parameters = Vec::new();
        if self.core.at(Kind::LParen) && self.is_parameter_group() {
            self.parse_parameters(&mut parameters);
        }
        let mut returns = None;
        if self.core.at(Kind::LParen) {
            returns = Some(self.parse_returns());
        }

        let mut body = Vec::new();
        while !matches!(self.core.peek_kind(), Kind::LBracket | Kind::Eof) {
            body.push(self.parse_statement());
        }

        Some(ScriptNode {
            span: self.core.close_span(open.span),
            trigger,
            name,
            parameters,
            returns,
            body,
        })
    }

    /// A `(` after the header opens parameters when a `$` follows the first
    /// type, and a return-type list otherwise. `()` reads as empty
    /// parameters.
    fn is_parameter_group(&mut self) -> bool {
        match self.core.peek_nth_kind(1) {
            Kind::RParen => true,
            Kind::Type => self.core.peek_nth_kind(2) == Kind::Dollar,
            _ => true,
        }
    }

    fn parse_parameters(&mut self, parameters: &mut Vec<Parameter>) {
        self.core.take();
        if self.core.take_if(Kind::RParen).is_some() {
            return;
        }
        loop {
            let Some(parameter) = self.parse_parameter() else {
                self.skip_group();
                return;
            };
            parameters.push(parameter);
            if self.core.take_if(Kind::Comma).is_none() {
                break;
            }
        }
        if self.core.expect(Kind::RParen).is_none() {
            self.skip_group();
        }
    }

    fn parse_parameter(&mut self) -> Option<Parameter> {
        let ty = self.type_ref()?;
        self.core.expect(Kind::Dollar)?;
        let name = self.identifier()?;
        Some(Parameter {
            span: ty.span.merge(name.span),
            ty,
            name,
        })
    }

    fn parse_returns(&mut self) -> Vec<TypeRef> {
        let mut returns = Vec::new();
        self.core.take();
        if self.core.take_if(Kind::RParen).is_some() {
            return returns;
        }
        loop {
            let Some(ty) = self.type_ref() else {
                self.skip_group();
                return returns;
            };
            returns.push(ty);
            if self.core.take_if(Kind::Comma).is_none() {
                break;
            }
        }
        if self.core.expect(Kind::RParen).is_none() {
            self.skip_group();
        }
        returns
    }

    /// Discards the remainder of a parenthesized group after an error.
    fn skip_group(&mut self) {
        let mut depth = 1usize;
        loop {
            match self.core.peek_kind() {
                Kind::Eof | Kind::LBracket => return,
                Kind::LParen => depth += 1,
                Kind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.core.take();
                        return;
                    }
                }
                _ => {}
            }
            self.core.take();
        }
    }

    fn identifier(&mut self) -> Option<Identifier> {
        let token = self.core.expect(Kind::Identifier)?;
        Some(Identifier {
            span: token.span,
            text: token.lexeme,
        })
    }

    fn type_ref(&mut self) -> Option<TypeRef> {
        let token = self.core.expect(Kind::Type)?;
        let TokenValue::Type(ty) = token.value else {
            unreachable!("type tokens always carry a primitive type");
        };
        Some(TypeRef {
            span: token.span,
            ty,
        })
    }

    fn parse_statement(&mut self) -> Statement {
        let start = self.core.peek_span();
        match self.try_statement() {
            Some(statement) => statement,
            None => self.recover_statement(start),
        }
    }

    /// Panic-mode recovery: discard through the next `;`, stopping short of
    /// `}` and the next script header.
    fn recover_statement(&mut self, start: Span) -> Statement {
        loop {
            match self.core.peek_kind() {
                Kind::Eof | Kind::LBracket | Kind::RBrace => break,
                Kind::Semicolon => {
                    self.core.take();
                    break;
                }
                _ => {
                    self.core.take();
                }
            }
        }
        Statement {
            span: self.core.close_span(start),
            kind: StatementKind::Error,
        }
    }

    fn try_statement(&mut self) -> Option<Statement> {
        let start = self.core.peek_span();
        let kind = match self.core.peek_kind() {
            Kind::LBrace => {
                self.core.take();
                let mut statements = Vec::new();
                while !matches!(self.core.peek_kind(), Kind::RBrace | Kind::Eof | Kind::LBracket)
                {
                    statements.push(self.parse_statement());
                }
                self.core.expect(Kind::RBrace)?;
                StatementKind::Block(statements)
            }
            Kind::If => {
                self.core.take();
                self.core.expect(Kind::LParen)?;
                let condition = self.parse_condition()?;
                self.core.expect(Kind::RParen)?;
                let true_branch = Box::new(self.parse_statement());
                let false_branch = if self.core.take_if(Kind::Else).is_some() {
                    Some(Box::new(self.parse_statement()))
                } else {
                    None
                };
                StatementKind::If {
                    condition,
                    true_branch,
                    false_branch,
                }
            }
            Kind::While => {
                self.core.take();
                self.core.expect(Kind::LParen)?;
                let condition = self.parse_condition()?;
                self.core.expect(Kind::RParen)?;
                let body = Box::new(self.parse_statement());
                StatementKind::While { condition, body }
            }
            Kind::Return => {
                self.core.take();
                let mut values = Vec::new();
                if self.core.take_if(Kind::LParen).is_some() {
                    if !self.core.at(Kind::RParen) {
                        loop {
                            values.push(self.parse_expression()?);
                            if self.core.take_if(Kind::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    self.core.expect(Kind::RParen)?;
                }
                self.core.expect(Kind::Semicolon)?;
                StatementKind::Return(values)
            }
            Kind::Define => {
                let token = self.core.take();
                let TokenValue::Type(ty) = token.value else {
                    unreachable!("define tokens always carry a primitive type");
                };
                let ty = TypeRef {
                    span: token.span,
                    ty,
                };
                self.core.expect(Kind::Dollar)?;
                let name = self.identifier()?;
                let initializer = if self.core.take_if(Kind::Equal).is_some() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.core.expect(Kind::Semicolon)?;
                StatementKind::VariableDeclaration {
                    ty,
                    name,
                    initializer,
                }
            }
            Kind::Dollar | Kind::Percent | Kind::PercentPercent => {
                let target = self.variable_ref()?;
                self.core.expect(Kind::Equal)?;
                let value = self.parse_expression()?;
                self.core.expect(Kind::Semicolon)?;
                StatementKind::Assignment { target, value }
            }
            Kind::Eof | Kind::RBrace | Kind::LBracket => {
                let found = self.core.peek_kind();
                let span = self.core.peek_span();
                self.core.report(span, SyntaxError::ExpectedStatement { found });
                // A stray `}` would stall recovery; swallow it here.
                if found == Kind::RBrace {
                    self.core.take();
                }
                return None;
            }
            _ => {
                let expression = self.parse_expression()?;
                self.core.expect(Kind::Semicolon)?;
                StatementKind::Expression(expression)
            }
        };
        Some(Statement {
            span: self.core.close_span(start),
            kind,
        })
    }

    fn variable_ref(&mut self) -> Option<VariableRef> {
        let sigil = self.core.take();
        let scope = match sigil.kind {
            Kind::Dollar => VariableScope::Local,
            Kind::Percent => VariableScope::Global,
            Kind::PercentPercent => VariableScope::GlobalBit,
            _ => unreachable!("variable_ref is only entered on a sigil"),
        };
        let name = self.identifier()?;
        Some(VariableRef {
            span: sigil.span.merge(name.span),
            scope,
            name,
        })
    }

    /// A condition is an expression optionally followed by one comparison.
    fn parse_condition(&mut self) -> Option<Expression> {
        let left = self.parse_expression()?;
        let operator = match self.core.peek_kind() {
            Kind::EqualEqual => Operator::Equal,
            Kind::LessThan => Operator::LessThan,
            Kind::GreaterThan => Operator::GreaterThan,
            Kind::LessThanOrEqual => Operator::LessThanOrEquals,
            Kind::GreaterThanOrEqual => Operator::GreaterThanOrEquals,
            _ => return Some(left),
        };
        self.core.take();
        let right = self.parse_expression()?;
        Some(Expression {
            span: left.span.merge(right.span),
            kind: ExpressionKind::BinaryOperation {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
        })
    }

    fn parse_expression(&mut self) -> Option<Expression> {
        let start = self.core.peek_span();
        let kind = match self.core.peek_kind() {
            Kind::Integer => {
                let token = self.core.take();
                let TokenValue::Int(value) = token.value else {
                    unreachable!("integer tokens always carry a value");
                };
                ExpressionKind::Integer(value)
            }
            Kind::Long => {
                let token = self.core.take();
                let TokenValue::Long(value) = token.value else {
                    unreachable!("long tokens always carry a value");
                };
                ExpressionKind::Long(value)
            }
            Kind::String => {
                let token = self.core.take();
                let TokenValue::Str(value) = token.value else {
                    unreachable!("string tokens always carry a value");
                };
                ExpressionKind::Str(value)
            }
            Kind::Bool => {
                let token = self.core.take();
                let TokenValue::Bool(value) = token.value else {
                    unreachable!("bool tokens always carry a value");
                };
                ExpressionKind::Bool(value)
            }
            Kind::CoordGrid => {
                let token = self.core.take();
                let TokenValue::Coord(value) = token.value else {
                    unreachable!("coordinate tokens always carry a value");
                };
                ExpressionKind::CoordGrid(value)
            }
            Kind::InterpolatedString => {
                let token = self.core.take();
                let TokenValue::Interpolated(segments) = token.value else {
                    unreachable!("interpolated tokens always carry segments");
                };
                self.concat_from_segments(token.span, segments)
            }
            Kind::Dollar | Kind::Percent | Kind::PercentPercent => {
                ExpressionKind::Variable(self.variable_ref()?)
            }
            Kind::Caret => {
                self.core.take();
                ExpressionKind::Constant(self.identifier()?)
            }
            Kind::Tilde => {
                self.core.take();
                let name = self.identifier()?;
                let arguments = if self.core.at(Kind::LParen) {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                ExpressionKind::Gosub { name, arguments }
            }
            Kind::Dot => {
                self.core.take();
                let name = self.identifier()?;
                let arguments = self.parse_arguments()?;
                ExpressionKind::Command {
                    name,
                    arguments,
                    alternative: true,
                }
            }
            Kind::Calc => {
                self.core.take();
                self.core.expect(Kind::LParen)?;
                let inner = self.parse_arith()?;
                self.core.expect(Kind::RParen)?;
                ExpressionKind::Calc(Box::new(inner))
            }
            Kind::Identifier => {
                let name = self.identifier()?;
                if self.core.at(Kind::LParen) {
                    let arguments = self.parse_arguments()?;
                    ExpressionKind::Command {
                        name,
                        arguments,
                        alternative: false,
                    }
                } else {
                    ExpressionKind::Dynamic(name)
                }
            }
            Kind::LParen => {
                self.core.take();
                let inner = self.parse_arith()?;
                self.core.expect(Kind::RParen)?;
                return Some(inner);
            }
            found => {
                let span = self.core.peek_span();
                self.core
                    .report(span, SyntaxError::ExpectedExpression { found });
                return None;
            }
        };
        Some(Expression {
            span: self.core.close_span(start),
            kind,
        })
    }

    fn parse_arguments(&mut self) -> Option<Vec<Expression>> {
        self.core.expect(Kind::LParen)?;
        let mut arguments = Vec::new();
        if !self.core.at(Kind::RParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if self.core.take_if(Kind::Comma).is_none() {
                    break;
                }
            }
        }
        self.core.expect(Kind::RParen)?;
        Some(arguments)
    }

    /// `calc` arithmetic with ordinary precedence; `%` binds like `*`.
    fn parse_arith(&mut self) -> Option<Expression> {
        let mut left = self.parse_arith_term()?;
        loop {
            let operator = match self.core.peek_kind() {
                Kind::Plus => Operator::Add,
                Kind::Minus => Operator::Subtract,
                _ => return Some(left),
            };
            self.core.take();
            let right = self.parse_arith_term()?;
            left = Expression {
                span: left.span.merge(right.span),
                kind: ExpressionKind::BinaryOperation {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
            };
        }
    }

    fn parse_arith_term(&mut self) -> Option<Expression> {
        let mut left = self.parse_expression()?;
        loop {
            let operator = match self.core.peek_kind() {
                Kind::Star => Operator::Multiply,
                Kind::Slash => Operator::Divide,
                // After a complete operand `%` cannot open a variable.
                Kind::Percent => Operator::Modulo,
                _ => return Some(left),
            };
            self.core.take();
            let right = self.parse_expression()?;
            left = Expression {
                span: left.span.merge(right.span),
                kind: ExpressionKind::BinaryOperation {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
            };
        }
    }

    fn concat_from_segments(&mut self, span: Span, segments: Vec<Segment>) -> ExpressionKind {
        let mut parts = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => parts.push(Expression {
                    span,
                    kind: ExpressionKind::Str(text),
                }),
                Segment::Expression { raw, offset } => {
                    parts.push(self.parse_embedded(span, &raw, offset));
                }
            }
        }
        ExpressionKind::Concat(parts)
    }

    /// Re-lexes one `<...>` placeholder at its true offset so its spans (and
    /// any diagnostics) land inside the enclosing string.
    fn parse_embedded(&mut self, string_span: Span, raw: &str, offset: usize) -> Expression {
        let tokenizer =
            Tokenizer::with_offset(self.table, raw, string_span.file_id(), offset);
        let lexer = Lexer::new(tokenizer);
        let mut sub = ScriptParser::new(self.table, lexer, &mut *self.core.diagnostics);
        let expression = sub.parse_expression();
        let leftover = sub.core.peek_span();
        if sub.core.peek_kind() != Kind::Eof {
            sub.core.report(leftover, SyntaxError::TrailingTokens);
        }
        sub.core.finish();
        expression.unwrap_or(Expression {
            span: Span::new(
                string_span.file_id(),
                offset,
                offset + raw.len(),
            ),
            kind: ExpressionKind::Error,
        })
    }
}
