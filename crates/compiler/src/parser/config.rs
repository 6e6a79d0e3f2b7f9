use crate::ast::{ConfigNode, Identifier, PropertyNode, ValueKind, ValueNode};
use crate::lexer::Lexer;
use crate::reporting::{Diagnostics, SyntaxError};
use crate::tokens::{Kind, TokenValue};

use super::ParserCore;

/// Recursive-descent parser for the config dialect. Properties are comma
/// separated value lists; recovery resynchronizes on the next `key =` shape
/// or the next `[name]` header.
pub struct ConfigParser<'a, 'd> {
    core: ParserCore<'a, 'd>,
}

impl<'a, 'd> ConfigParser<'a, 'd> {
    pub fn new(lexer: Lexer<'a>, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            core: ParserCore::new(lexer, diagnostics),
        }
    }

    pub fn parse_file(mut self) -> Vec<ConfigNode> {
        let mut configs = Vec::new();
        loop {
            match self.core.peek_kind() {
                Kind::Eof => break,
                Kind::LBracket => {
                    if let Some(config) = self.parse_config() {
                        configs.push(config);
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
        configs
    }

    fn skip_to_header(&mut self) {
        while !matches!(self.core.peek_kind(), Kind::LBracket | Kind::Eof) {
            self.core.take();
        }
    }

    fn parse_config(&mut self) -> Option<ConfigNode> {
        let open = self.core.expect(Kind::LBracket)?;
        let header = (|| {
            let name = self.property_key()?;
            self.core.expect(Kind::RBracket)?;
            Some(name)
        })();
        let Some(name) = header else {
            self.skip_to_header();
            return None;
        };

        let mut properties = Vec::new();
        while !matches!(self.core.peek_kind(), Kind::LBracket | Kind::Eof) {
            match self.parse_property() {
                Some(property) => properties.push(property),
                None => self.recover_property(),
            }
        }

        Some(ConfigNode {
            span: self.core.close_span(open.span),
            name,
            properties,
        })
    }

    /// Property keys and config names are identifiers, but spellings that
    /// collide with a type keyword (`type`, `obj`, ...) stay legal.
    fn property_key(&mut self) -> Option<Identifier> {
        match self.core.peek_kind() {
            Kind::Identifier | Kind::Type => {
                let token = self.core.take();
                Some(Identifier {
                    span: token.span,
                    text: token.lexeme,
                })
            }
            found => {
                let span = self.core.peek_span();
                self.core.report(
                    span,
                    SyntaxError::ExpectedKind {
                        expected: Kind::Identifier,
                        found,
                    },
                );
                None
            }
        }
    }

    fn parse_property(&mut self) -> Option<PropertyNode> {
        let key = self.property_key()?;
        self.core.expect(Kind::Equal)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_value()?);
            if self.core.take_if(Kind::Comma).is_none() {
                break;
            }
        }
        Some(PropertyNode {
            span: self.core.close_span(key.span),
            key,
            values,
        })
    }

    /// Discard until something that can start a property, or the next
    /// config header.
    fn recover_property(&mut self) {
        loop {
            match self.core.peek_kind() {
                Kind::LBracket | Kind::Eof => return,
                Kind::Identifier | Kind::Type
                    if self.core.peek_nth_kind(1) == Kind::Equal =>
                {
                    return;
                }
                _ => {
                    self.core.take();
                }
            }
        }
    }

    fn parse_value(&mut self) -> Option<ValueNode> {
        let start = self.core.peek_span();
        let kind = match self.core.peek_kind() {
            Kind::String => {
                let token = self.core.take();
                let TokenValue::Str(value) = token.value else {
                    unreachable!("string tokens always carry a value");
                };
                ValueKind::Str(value)
            }
            Kind::Integer => {
                let token = self.core.take();
                let TokenValue::Int(value) = token.value else {
                    unreachable!("integer tokens always carry a value");
                };
                ValueKind::Integer(value)
            }
            Kind::Long => {
                let token = self.core.take();
                let TokenValue::Long(value) = token.value else {
                    unreachable!("long tokens always carry a value");
                };
                ValueKind::Long(value)
            }
            Kind::Bool => {
                let token = self.core.take();
                let TokenValue::Bool(value) = token.value else {
                    unreachable!("bool tokens always carry a value");
                };
                ValueKind::Bool(value)
            }
            Kind::Type => {
                let token = self.core.take();
                let TokenValue::Type(ty) = token.value else {
                    unreachable!("type tokens always carry a primitive type");
                };
                ValueKind::TypeLiteral(ty)
            }
            Kind::CoordGrid => {
                let token = self.core.take();
                let TokenValue::Coord(value) = token.value else {
                    unreachable!("coordinate tokens always carry a value");
                };
                ValueKind::CoordGrid(value)
            }
            Kind::Caret => {
                self.core.take();
                let token = self.core.expect(Kind::Identifier)?;
                ValueKind::ConstantRef(Identifier {
                    span: token.span,
                    text: token.lexeme,
                })
            }
            Kind::Identifier => {
                let token = self.core.take();
                ValueKind::Reference(Identifier {
                    span: token.span,
                    text: token.lexeme,
                })
            }
            found => {
                let span = self.core.peek_span();
                self.core.report(span, SyntaxError::ExpectedValue { found });
                return None;
            }
        };
        Some(ValueNode {
            span: self.core.close_span(start),
            kind,
        })
    }
}
