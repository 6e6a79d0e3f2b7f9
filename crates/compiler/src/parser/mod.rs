use crate::lexer::Lexer;
use crate::reporting::{Diagnostics, SyntaxError};
use crate::tokens::{Kind, Span, Token};

mod config;
mod script;

pub use config::ConfigParser;
pub use script::ScriptParser;

/// The machinery both dialect parsers share: token cursor, `expect` guards,
/// and diagnostics. Recovery policy lives with each dialect because the
/// synchronization points differ.
pub(crate) struct ParserCore<'a, 'd> {
    lexer: Lexer<'a>,
    diagnostics: &'d mut Diagnostics,
    last_span: Option<Span>,
}

impl<'a, 'd> ParserCore<'a, 'd> {
    pub(crate) fn new(lexer: Lexer<'a>, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            lexer,
            diagnostics,
            last_span: None,
        }
    }

    pub(crate) fn peek(&mut self) -> &Token {
        self.lexer.drain_errors(self.diagnostics);
        self.lexer.peek()
    }

    pub(crate) fn peek_kind(&mut self) -> Kind {
        self.peek().kind
    }

    pub(crate) fn peek_nth_kind(&mut self, n: usize) -> Kind {
        self.lexer.drain_errors(self.diagnostics);
        self.lexer.peek_nth(n).kind
    }

    pub(crate) fn peek_span(&mut self) -> Span {
        self.peek().span
    }

    pub(crate) fn take(&mut self) -> Token {
        self.lexer.drain_errors(self.diagnostics);
        let token = self.lexer.take();
        if token.kind != Kind::Eof {
            self.last_span = Some(token.span);
        }
        token
    }

    pub(crate) fn at(&mut self, kind: Kind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn take_if(&mut self, kind: Kind) -> Option<Token> {
        if self.at(kind) {
            Some(self.take())
        } else {
            None
        }
    }

    /// Takes the next token if it matches, otherwise reports a diagnostic
    /// and leaves the cursor in place for the caller's recovery.
    pub(crate) fn expect(&mut self, kind: Kind) -> Option<Token> {
        if self.at(kind) {
            return Some(self.take());
        }
        let found = self.peek_kind();
        let span = self.peek_span();
        self.diagnostics.report(
            span,
            SyntaxError::ExpectedKind {
                expected: kind,
                found,
            },
        );
        None
    }

    pub(crate) fn report(&mut self, span: Span, error: SyntaxError) {
        self.diagnostics.report(span, error);
    }

    /// The span from `start` through the last consumed token.
    pub(crate) fn close_span(&mut self, start: Span) -> Span {
        match self.last_span {
            Some(last) if last.end() >= start.start() => start.merge(last),
            _ => start,
        }
    }

    pub(crate) fn finish(mut self) {
        self.lexer.drain_errors(self.diagnostics);
    }
}
