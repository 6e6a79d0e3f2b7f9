use crate::tokens::{Kind, Span};
use crate::types::Type;

pub(crate) mod format;

pub use format::DiagnosticCache;

/// A user-code problem attached to a source range. Diagnostics are values on
/// the compilation output, never unwound errors; only internal invariant
/// violations surface as hard failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(span: Span, kind: impl Into<DiagnosticKind>) -> Self {
        Self {
            span,
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    Lexical(LexicalError),
    Syntax(SyntaxError),
    Semantic(SemanticError),
}

impl From<LexicalError> for DiagnosticKind {
    fn from(value: LexicalError) -> Self {
        DiagnosticKind::Lexical(value)
    }
}

impl From<SyntaxError> for DiagnosticKind {
    fn from(value: SyntaxError) -> Self {
        DiagnosticKind::Syntax(value)
    }
}

impl From<SemanticError> for DiagnosticKind {
    fn from(value: SemanticError) -> Self {
        DiagnosticKind::Semantic(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexicalError {
    UnterminatedString,
    UnterminatedComment,
    BadEscape(char),
    IntegerOverflow(String),
    LongOverflow(String),
    MalformedCoordGrid,
    UnknownCharacter(char),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    ExpectedKind { expected: Kind, found: Kind },
    ExpectedExpression { found: Kind },
    ExpectedStatement { found: Kind },
    ExpectedValue { found: Kind },
    ExpectedScript { found: Kind },
    TrailingTokens,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticError {
    UnresolvedName(String),
    UnresolvedVariable(String),
    UnknownTrigger(String),
    UnknownCommand(String),
    UnknownScript(String),
    UnknownConstant(String),
    TypeMismatch {
        expected: Type,
        actual: Type,
    },
    ConditionNotBoolean {
        actual: Type,
    },
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    ReturnMismatch {
        expected: Type,
        actual: Type,
    },
    DuplicateDeclaration {
        name: String,
    },
    TupleNotAllowedHere {
        actual: Type,
    },
    TriggerHasNoParameters {
        trigger: String,
    },
    TriggerHasNoReturns {
        trigger: String,
    },
    DuplicateParameter {
        name: String,
    },
    UnknownProperty {
        key: String,
    },
    ComponentCountMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    ValueOutOfRange {
        value: i32,
        min: i32,
        max: i32,
    },
    MissingRequiredProperty {
        key: String,
        required: String,
    },
    MissingTypeProperty {
        key: String,
        companion: String,
    },
    NotATypeProperty {
        companion: String,
    },
}

/// The per-file buffer diagnostics accumulate into, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.messages.push(diagnostic);
    }

    pub fn report(&mut self, span: Span, kind: impl Into<DiagnosticKind>) {
        self.push(Diagnostic::new(span, kind));
    }

    pub fn has_any(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.messages
    }

    /// Renders every buffered diagnostic through ariadne.
    pub fn pretty_string(&self, cache: &mut DiagnosticCache, colourful: bool) -> String {
        let mut output = Vec::new();
        for message in &self.messages {
            message
                .write_report(&mut output, cache, colourful)
                .expect("writing a diagnostic to a Vec cannot fail");
        }
        String::from_utf8_lossy(&output).into_owned()
    }
}
