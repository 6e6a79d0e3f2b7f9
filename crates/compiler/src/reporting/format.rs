use std::{
    collections::HashMap,
    io::{self, Write},
    path::Path,
};

use ariadne::{Label, Source};

use crate::tokens::{FileId, Span};

use super::{Diagnostic, DiagnosticKind, LexicalError, SemanticError, SyntaxError};

/// Source store for ariadne, keyed by [`FileId`].
pub struct DiagnosticCache {
    map: HashMap<FileId, (String, Source<String>)>,
}

impl DiagnosticCache {
    pub fn new(files: impl Iterator<Item = (FileId, (String, String))>) -> Self {
        let map = files
            .map(|(id, (name, content))| (id, (name, Source::from(content))))
            .collect();
        Self { map }
    }

    pub fn single(file_id: FileId, filename: impl AsRef<Path>, content: &str) -> Self {
        Self::new(std::iter::once((
            file_id,
            (
                filename.as_ref().display().to_string(),
                content.to_owned(),
            ),
        )))
    }
}

impl ariadne::Cache<FileId> for DiagnosticCache {
    type Storage = String;

    fn fetch(
        &mut self,
        id: &FileId,
    ) -> Result<&Source<Self::Storage>, Box<dyn std::fmt::Debug + '_>> {
        match self.map.get(id) {
            Some((_, data)) => Ok(data),
            None => Err(Box::new(format!("Failed to find file with ID {id:?}"))),
        }
    }

    fn display<'a>(&self, id: &'a FileId) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let (filename, _) = self.map.get(id)?;
        Some(Box::new(filename.clone()))
    }
}

impl ariadne::Span for Span {
    type SourceId = FileId;

    fn source(&self) -> &Self::SourceId {
        &self.file_id
    }

    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

impl Diagnostic {
    pub fn write_report<W: Write>(
        &self,
        w: W,
        cache: &mut DiagnosticCache,
        include_colour: bool,
    ) -> io::Result<()> {
        let report = match &self.kind {
            DiagnosticKind::Lexical(error) => lexical_report(error, self.span),
            DiagnosticKind::Syntax(error) => syntax_report(error, self.span),
            DiagnosticKind::Semantic(error) => semantic_report(error, self.span),
        };

        report
            .with_config(ariadne::Config::default().with_color(include_colour))
            .finish()
            .write(cache, w)
    }
}

fn build_error_report(span: Span) -> ariadne::ReportBuilder<'static, Span> {
    ariadne::Report::build(ariadne::ReportKind::Error, span.file_id, span.start)
}

fn lexical_report(error: &LexicalError, span: Span) -> ariadne::ReportBuilder<'static, Span> {
    match error {
        LexicalError::UnterminatedString => build_error_report(span)
            .with_label(Label::new(span).with_message("String is never closed"))
            .with_message("Unterminated string literal"),
        LexicalError::UnterminatedComment => build_error_report(span)
            .with_label(Label::new(span).with_message("Comment is never closed"))
            .with_message("Unterminated block comment"),
        LexicalError::BadEscape(c) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown escape"))
            .with_message(format!("`\\{c}` is not a valid escape sequence")),
        LexicalError::IntegerOverflow(literal) => build_error_report(span)
            .with_label(Label::new(span).with_message("Out of range"))
            .with_message(format!("The literal {literal} of type int is out of range"))
            .with_note(format!("int literals must fit in {}..={}", i32::MIN, i32::MAX)),
        LexicalError::LongOverflow(literal) => build_error_report(span)
            .with_label(Label::new(span).with_message("Out of range"))
            .with_message(format!(
                "The literal {literal} of type long is out of range"
            ))
            .with_note(format!("long literals must fit in {}..={}", i64::MIN, i64::MAX)),
        LexicalError::MalformedCoordGrid => build_error_report(span)
            .with_label(Label::new(span).with_message("Invalid coordinate"))
            .with_message("Coordinate literals take five components: level, square x, square z, tile x, tile z"),
        LexicalError::UnknownCharacter(c) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown character"))
            .with_message(format!("Unexpected character `{c}`")),
    }
}

fn syntax_report(error: &SyntaxError, span: Span) -> ariadne::ReportBuilder<'static, Span> {
    match error {
        SyntaxError::ExpectedKind { expected, found } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Expected {expected}")))
            .with_message(format!("Unexpected {found}, expected {expected}")),
        SyntaxError::ExpectedExpression { found } => build_error_report(span)
            .with_label(Label::new(span).with_message("Expected an expression"))
            .with_message(format!("Unexpected {found}, expected an expression")),
        SyntaxError::ExpectedStatement { found } => build_error_report(span)
            .with_label(Label::new(span).with_message("Expected a statement"))
            .with_message(format!("Unexpected {found}, expected a statement")),
        SyntaxError::ExpectedValue { found } => build_error_report(span)
            .with_label(Label::new(span).with_message("Expected a property value"))
            .with_message(format!("Unexpected {found}, expected a property value")),
        SyntaxError::ExpectedScript { found } => build_error_report(span)
            .with_label(Label::new(span).with_message("Expected `[`"))
            .with_message(format!(
                "Unexpected {found}, expected a script or config header"
            )),
        SyntaxError::TrailingTokens => build_error_report(span)
            .with_label(Label::new(span).with_message("Extra input"))
            .with_message("Trailing input after the embedded expression"),
    }
}

fn semantic_report(error: &SemanticError, span: Span) -> ariadne::ReportBuilder<'static, Span> {
    match error {
        SemanticError::UnresolvedName(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown name"))
            .with_message(format!("Could not resolve `{name}`")),
        SemanticError::UnresolvedVariable(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown variable"))
            .with_message(format!("Could not resolve the variable `{name}`")),
        SemanticError::UnknownTrigger(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown trigger"))
            .with_message(format!("`{name}` is not a registered trigger")),
        SemanticError::UnknownCommand(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown command"))
            .with_message(format!("`{name}` is not a registered command")),
        SemanticError::UnknownScript(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown script"))
            .with_message(format!("No script named `{name}` is declared")),
        SemanticError::UnknownConstant(name) => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown constant"))
            .with_message(format!("No constant named `{name}` is declared")),
        SemanticError::TypeMismatch { expected, actual } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("This has type {actual}")))
            .with_message(format!("Expected {expected} but got {actual}")),
        SemanticError::ConditionNotBoolean { actual } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("This has type {actual}")))
            .with_message(format!(
                "Conditions must be a comparison or a bool expression, got {actual}"
            )),
        SemanticError::ArityMismatch {
            name,
            expected,
            actual,
        } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Takes {expected} arguments")))
            .with_message(format!(
                "`{name}` takes {expected} arguments but {actual} were supplied"
            )),
        SemanticError::ReturnMismatch { expected, actual } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Returns {actual}")))
            .with_message(format!(
                "The script declares {expected} but this returns {actual}"
            )),
        SemanticError::DuplicateDeclaration { name } => build_error_report(span)
            .with_label(Label::new(span).with_message("Already declared"))
            .with_message(format!("`{name}` is already declared")),
        SemanticError::TupleNotAllowedHere { actual } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("This has type {actual}")))
            .with_message(
                "A call returning multiple values is only allowed as an initializer or return value",
            ),
        SemanticError::TriggerHasNoParameters { trigger } => build_error_report(span)
            .with_label(Label::new(span).with_message("Parameters not allowed"))
            .with_message(format!("`{trigger}` scripts do not take parameters")),
        SemanticError::TriggerHasNoReturns { trigger } => build_error_report(span)
            .with_label(Label::new(span).with_message("Returns not allowed"))
            .with_message(format!("`{trigger}` scripts do not return values")),
        SemanticError::DuplicateParameter { name } => build_error_report(span)
            .with_label(Label::new(span).with_message("Duplicate parameter"))
            .with_message(format!("The parameter `{name}` is declared twice")),
        SemanticError::UnknownProperty { key } => build_error_report(span)
            .with_label(Label::new(span).with_message("Unknown property"))
            .with_message(format!("`{key}` is not a property of this config type")),
        SemanticError::ComponentCountMismatch {
            key,
            expected,
            actual,
        } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Takes {expected} values")))
            .with_message(format!(
                "`{key}` takes {expected} values but {actual} were supplied"
            )),
        SemanticError::ValueOutOfRange { value, min, max } => build_error_report(span)
            .with_label(Label::new(span).with_message("Out of range"))
            .with_message(format!("{value} is outside the allowed range {min}..={max}")),
        SemanticError::MissingRequiredProperty { key, required } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Requires `{required}`")))
            .with_message(format!(
                "`{key}` also requires the `{required}` property in the same config"
            )),
        SemanticError::MissingTypeProperty { key, companion } => build_error_report(span)
            .with_label(Label::new(span).with_message(format!("Needs `{companion}`")))
            .with_message(format!(
                "`{key}` needs the `{companion}` property to pick its serialized type"
            )),
        SemanticError::NotATypeProperty { companion } => build_error_report(span)
            .with_label(Label::new(span).with_message("Expected a type literal"))
            .with_message(format!("`{companion}` must hold a single type literal")),
    }
}
