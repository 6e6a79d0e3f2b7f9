use std::collections::{HashMap, VecDeque};

use crate::reporting::{Diagnostic, Diagnostics, LexicalError};
use crate::tokens::{FileId, Kind, Segment, Span, Token, TokenValue};
use crate::types::PrimitiveType;

/// The symbol table driving lexical analysis: keyword spellings,
/// single-character separators and multi-character operators, shared by both
/// dialects. A keyword always wins over an identifier with the same spelling
/// because identifiers are reclassified through this table after scanning.
#[derive(Debug, Clone, Default)]
pub struct LexicalTable {
    keywords: HashMap<String, (Kind, TokenValue)>,
    separators: HashMap<char, Kind>,
    operators: HashMap<String, Kind>,
    max_operator: usize,
}

impl LexicalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_keyword(&mut self, text: &str, kind: Kind, value: TokenValue) {
        self.keywords.insert(text.to_owned(), (kind, value));
    }

    pub fn register_separator(&mut self, c: char, kind: Kind) {
        self.separators.insert(c, kind);
    }

    pub fn register_operator(&mut self, text: &str, kind: Kind) {
        self.max_operator = self.max_operator.max(text.len());
        self.operators.insert(text.to_owned(), kind);
    }

    fn keyword(&self, text: &str) -> Option<&(Kind, TokenValue)> {
        self.keywords.get(text)
    }

    fn separator(&self, c: char) -> Option<Kind> {
        self.separators.get(&c).copied()
    }

    fn operator(&self, text: &str) -> Option<Kind> {
        self.operators.get(text).copied()
    }

    /// The full table for the ScrollScript language pair.
    pub fn scroll() -> Self {
        let mut table = Self::new();
        table.register_keyword("true", Kind::Bool, TokenValue::Bool(true));
        table.register_keyword("false", Kind::Bool, TokenValue::Bool(false));
        table.register_keyword("yes", Kind::Bool, TokenValue::Bool(true));
        table.register_keyword("no", Kind::Bool, TokenValue::Bool(false));
        table.register_keyword("if", Kind::If, TokenValue::None);
        table.register_keyword("else", Kind::Else, TokenValue::None);
        table.register_keyword("while", Kind::While, TokenValue::None);
        table.register_keyword("return", Kind::Return, TokenValue::None);
        table.register_keyword("calc", Kind::Calc, TokenValue::None);
        for ty in PrimitiveType::ALL {
            table.register_keyword(ty.representation(), Kind::Type, TokenValue::Type(*ty));
            if ty.is_declarable() {
                table.register_keyword(
                    &format!("def_{}", ty.representation()),
                    Kind::Define,
                    TokenValue::Type(*ty),
                );
            }
        }
        for c in ['(', ')', '[', ']', '{', '}', ',', ';', '~', '$', '^', '.'] {
            let kind = match c {
                '(' => Kind::LParen,
                ')' => Kind::RParen,
                '[' => Kind::LBracket,
                ']' => Kind::RBracket,
                '{' => Kind::LBrace,
                '}' => Kind::RBrace,
                ',' => Kind::Comma,
                ';' => Kind::Semicolon,
                '~' => Kind::Tilde,
                '$' => Kind::Dollar,
                '^' => Kind::Caret,
                _ => Kind::Dot,
            };
            table.register_separator(c, kind);
        }
        table.register_operator("=", Kind::Equal);
        table.register_operator("==", Kind::EqualEqual);
        table.register_operator("<", Kind::LessThan);
        table.register_operator(">", Kind::GreaterThan);
        table.register_operator("<=", Kind::LessThanOrEqual);
        table.register_operator(">=", Kind::GreaterThanOrEqual);
        table.register_operator("+", Kind::Plus);
        table.register_operator("-", Kind::Minus);
        table.register_operator("*", Kind::Star);
        table.register_operator("/", Kind::Slash);
        table.register_operator("%", Kind::Percent);
        table.register_operator("%%", Kind::PercentPercent);
        table
    }
}

/// Streaming scanner over one source string. Emits raw lexemes with byte
/// spans; decoded payloads ride along in [`TokenValue`]. All failures are
/// recoverable: the caller gets a [`Diagnostic`] and scanning continues at
/// the next input.
pub struct Tokenizer<'a> {
    table: &'a LexicalTable,
    source: &'a str,
    file_id: FileId,
    base: usize,
    pos: usize,
    last_kind: Option<Kind>,
    keep_comments: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(table: &'a LexicalTable, source: &'a str, file_id: FileId) -> Self {
        Self::with_offset(table, source, file_id, 0)
    }

    /// A tokenizer whose spans are shifted by `base` — used to re-lex the
    /// embedded expressions of interpolated strings at their true offsets.
    pub fn with_offset(
        table: &'a LexicalTable,
        source: &'a str,
        file_id: FileId,
        base: usize,
    ) -> Self {
        Self {
            table,
            source,
            file_id,
            base,
            pos: 0,
            last_kind: None,
            keep_comments: false,
        }
    }

    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file_id, self.base + start, self.base + self.pos)
    }

    fn lexeme_from(&self, start: usize) -> &'a str {
        &self.source[start..self.pos]
    }

    /// Scans the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Result<Token, Diagnostic>> {
        loop {
            while self.peek_char().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            let start = self.pos;
            let c = self.peek_char()?;

            if c == '/' && self.peek_second() == Some('/') {
                while self.peek_char().is_some_and(|c| c != '\n') {
                    self.bump();
                }
                if self.keep_comments {
                    return Some(Ok(Token::new(
                        Kind::Comment,
                        self.lexeme_from(start),
                        self.span_from(start),
                    )));
                }
                continue;
            }
            if c == '/' && self.peek_second() == Some('*') {
                match self.block_comment(start) {
                    Ok(token) => {
                        if self.keep_comments {
                            return Some(Ok(token));
                        }
                        continue;
                    }
                    Err(diagnostic) => return Some(Err(diagnostic)),
                }
            }

            let result = self.scan(start, c);
            if let Ok(token) = &result {
                self.last_kind = Some(token.kind);
            }
            return Some(result);
        }
    }

    fn scan(&mut self, start: usize, c: char) -> Result<Token, Diagnostic> {
        if c == '"' {
            return self.string(start);
        }
        if c == '`' {
            return self.coord_grid(start);
        }
        if c.is_ascii_digit() {
            return self.number(start, false);
        }
        if c == '-' && self.negative_literal_position() && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            return self.number(start, true);
        }
        if c.is_ascii_alphabetic() || c == '_' {
            while self
                .peek_char()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                self.bump();
            }
            let text = self.lexeme_from(start);
            return Ok(match self.table.keyword(text) {
                Some((kind, value)) => {
                    Token::new(*kind, text, self.span_from(start)).with_value(value.clone())
                }
                None => Token::new(Kind::Identifier, text, self.span_from(start)),
            });
        }
        if let Some(kind) = self.table.separator(c) {
            self.bump();
            return Ok(Token::new(kind, self.lexeme_from(start), self.span_from(start)));
        }
        for len in (1..=self.table.max_operator.min(self.rest().len())).rev() {
            if !self.source.is_char_boundary(start + len) {
                continue;
            }
            if let Some(kind) = self.table.operator(&self.source[start..start + len]) {
                self.pos = start + len;
                return Ok(Token::new(kind, self.lexeme_from(start), self.span_from(start)));
            }
        }
        self.bump();
        Err(Diagnostic::new(
            self.span_from(start),
            LexicalError::UnknownCharacter(c),
        ))
    }

    /// A leading `-` folds into a numeric literal only where a value can
    /// begin; after a value it has to be the subtraction operator.
    fn negative_literal_position(&self) -> bool {
        !matches!(
            self.last_kind,
            Some(
                Kind::Identifier
                    | Kind::Integer
                    | Kind::Long
                    | Kind::String
                    | Kind::InterpolatedString
                    | Kind::Bool
                    | Kind::Type
                    | Kind::CoordGrid
                    | Kind::RParen
                    | Kind::RBracket
            )
        )
    }

    fn block_comment(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        self.bump();
        loop {
            match self.peek_char() {
                None => {
                    return Err(Diagnostic::new(
                        self.span_from(start),
                        LexicalError::UnterminatedComment,
                    ))
                }
                Some('*') if self.peek_second() == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(Token::new(
                        Kind::Comment,
                        self.lexeme_from(start),
                        self.span_from(start),
                    ));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn number(&mut self, start: usize, negative: bool) -> Result<Token, Diagnostic> {
        let digits_start = self.pos;
        let hex = self.peek_char() == Some('0')
            && matches!(self.peek_second(), Some('x') | Some('X'));
        if hex {
            self.bump();
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
        } else {
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let digits_end = self.pos;
        let long = matches!(self.peek_char(), Some('L') | Some('l'));
        if long {
            self.bump();
        }
        let lexeme = self.lexeme_from(start);
        let span = self.span_from(start);
        let digits = &self.source[digits_start..digits_end];

        if long {
            let value = if hex {
                u64::from_str_radix(&digits[2..], 16)
                    .map(|magnitude| {
                        let value = magnitude as i64;
                        if negative {
                            value.wrapping_neg()
                        } else {
                            value
                        }
                    })
                    .ok()
            } else {
                let mut text = String::new();
                if negative {
                    text.push('-');
                }
                text.push_str(digits);
                text.parse::<i128>()
                    .ok()
                    .filter(|v| i64::try_from(*v).is_ok())
                    .map(|v| v as i64)
            };
            match value {
                Some(value) => {
                    Ok(Token::new(Kind::Long, lexeme, span).with_value(TokenValue::Long(value)))
                }
                None => Err(Diagnostic::new(
                    span,
                    LexicalError::LongOverflow(lexeme.to_owned()),
                )),
            }
        } else {
            let value = if hex {
                u32::from_str_radix(&digits[2..], 16)
                    .map(|magnitude| {
                        let value = magnitude as i32;
                        if negative {
                            value.wrapping_neg()
                        } else {
                            value
                        }
                    })
                    .ok()
            } else {
                let mut text = String::new();
                if negative {
                    text.push('-');
                }
                text.push_str(digits);
                text.parse::<i64>()
                    .ok()
                    .filter(|v| i32::try_from(*v).is_ok())
                    .map(|v| v as i32)
            };
            match value {
                Some(value) => {
                    Ok(Token::new(Kind::Integer, lexeme, span).with_value(TokenValue::Int(value)))
                }
                None => Err(Diagnostic::new(
                    span,
                    LexicalError::IntegerOverflow(lexeme.to_owned()),
                )),
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(Diagnostic::new(
                        self.span_from(start),
                        LexicalError::UnterminatedString,
                    ))
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some('<') => text.push('<'),
                        Some(other) => {
                            return Err(Diagnostic::new(
                                self.span_from(start),
                                LexicalError::BadEscape(other),
                            ))
                        }
                        None => {
                            return Err(Diagnostic::new(
                                self.span_from(start),
                                LexicalError::UnterminatedString,
                            ))
                        }
                    }
                }
                Some('<') => {
                    self.bump();
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    let expr_start = self.pos;
                    self.embedded_expression(start)?;
                    segments.push(Segment::Expression {
                        raw: self.source[expr_start..self.pos].to_owned(),
                        offset: self.base + expr_start,
                    });
                    self.bump();
                }
                Some(c) => {
                    self.bump();
                    text.push(c);
                }
            }
        }
        let span = self.span_from(start);
        let lexeme = self.lexeme_from(start);
        if segments.is_empty() {
            Ok(Token::new(Kind::String, lexeme, span).with_value(TokenValue::Str(text)))
        } else {
            if !text.is_empty() {
                segments.push(Segment::Text(text));
            }
            Ok(Token::new(Kind::InterpolatedString, lexeme, span)
                .with_value(TokenValue::Interpolated(segments)))
        }
    }

    /// Positions the cursor on the `>` that closes a `<expr>` placeholder.
    /// Nested string literals inside the placeholder are skipped whole so
    /// their contents cannot terminate the placeholder early.
    fn embedded_expression(&mut self, string_start: usize) -> Result<(), Diagnostic> {
        let mut depth = 1usize;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(Diagnostic::new(
                        self.span_from(string_start),
                        LexicalError::UnterminatedString,
                    ))
                }
                Some('"') => {
                    self.bump();
                    loop {
                        match self.peek_char() {
                            None | Some('\n') => {
                                return Err(Diagnostic::new(
                                    self.span_from(string_start),
                                    LexicalError::UnterminatedString,
                                ))
                            }
                            Some('\\') => {
                                self.bump();
                                self.bump();
                            }
                            Some('"') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                Some('<') => {
                    depth += 1;
                    self.bump();
                }
                Some('>') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn coord_grid(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_digit() || c == '_')
        {
            self.bump();
        }
        let span = self.span_from(start);
        let text = &self.source[start + 1..self.pos];
        let components: Vec<i32> = text
            .split('_')
            .map(|part| part.parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| Diagnostic::new(span, LexicalError::MalformedCoordGrid))?;
        let [level, square_x, square_z, tile_x, tile_z] = components[..] else {
            return Err(Diagnostic::new(span, LexicalError::MalformedCoordGrid));
        };
        if !(0..=3).contains(&level)
            || !(0..=255).contains(&square_x)
            || !(0..=255).contains(&square_z)
            || !(0..=63).contains(&tile_x)
            || !(0..=63).contains(&tile_z)
        {
            return Err(Diagnostic::new(span, LexicalError::MalformedCoordGrid));
        }
        let packed = (level << 28) | ((square_x * 64 + tile_x) << 14) | (square_z * 64 + tile_z);
        Ok(Token::new(Kind::CoordGrid, self.lexeme_from(start), span)
            .with_value(TokenValue::Coord(packed)))
    }
}

/// Buffered token source with arbitrary look-ahead. Lexical errors become
/// buffered diagnostics plus a synthetic [`Kind::Error`] token, so the parser
/// keeps going and the batch never aborts.
pub struct Lexer<'a> {
    tokenizer: Tokenizer<'a>,
    buffer: VecDeque<Token>,
    errors: Vec<Diagnostic>,
    eof: Token,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(tokenizer: Tokenizer<'a>) -> Self {
        let end = tokenizer.base() + tokenizer.source_len();
        let eof = Token::new(Kind::Eof, "", Span::new(tokenizer.file_id(), end, end));
        Self {
            tokenizer,
            buffer: VecDeque::new(),
            errors: Vec::new(),
            eof,
            done: false,
        }
    }

    fn fill(&mut self, n: usize) {
        while self.buffer.len() < n && !self.done {
            match self.tokenizer.next_token() {
                Some(Ok(token)) if token.kind == Kind::Comment => {}
                Some(Ok(token)) => self.buffer.push_back(token),
                Some(Err(diagnostic)) => {
                    let span = diagnostic.span;
                    self.errors.push(diagnostic);
                    self.buffer.push_back(Token::new(Kind::Error, "", span));
                }
                None => self.done = true,
            }
        }
    }

    pub fn peek(&mut self) -> &Token {
        self.peek_nth(0)
    }

    /// Look `n` tokens past the cursor; `peek_nth(0)` is `peek()`.
    pub fn peek_nth(&mut self, n: usize) -> &Token {
        self.fill(n + 1);
        self.buffer.get(n).unwrap_or(&self.eof)
    }

    pub fn take(&mut self) -> Token {
        self.fill(1);
        self.buffer.pop_front().unwrap_or_else(|| self.eof.clone())
    }

    /// How many unconsumed tokens are known to remain; zero at end of input.
    pub fn remaining(&mut self) -> usize {
        if self.peek().kind == Kind::Eof {
            0
        } else {
            self.buffer.len()
        }
    }

    pub fn drain_errors(&mut self, diagnostics: &mut Diagnostics) {
        for error in self.errors.drain(..) {
            diagnostics.push(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let table = LexicalTable::scroll();
        let mut tokenizer = Tokenizer::new(&table, source, FileId::new(0));
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        while let Some(result) = tokenizer.next_token() {
            match result {
                Ok(token) => tokens.push(token),
                Err(diagnostic) => errors.push(diagnostic),
            }
        }
        (tokens, errors)
    }

    fn kinds(source: &str) -> Vec<Kind> {
        lex(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn position_fidelity() {
        let source = "[proc,hello](string $s) return(\"hi\");";
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty());
        for token in &tokens {
            assert_eq!(
                &source[token.span.start()..token.span.end()],
                token.lexeme,
                "lexeme mismatch for {:?}",
                token.kind
            );
        }
    }

    #[test]
    fn keyword_beats_identifier() {
        assert_eq!(kinds("while whilex"), vec![Kind::While, Kind::Identifier]);
        assert_eq!(kinds("int def_int"), vec![Kind::Type, Kind::Define]);
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            kinds("= == <= < %% %"),
            vec![
                Kind::Equal,
                Kind::EqualEqual,
                Kind::LessThanOrEqual,
                Kind::LessThan,
                Kind::PercentPercent,
                Kind::Percent
            ]
        );
    }

    #[test]
    fn string_escapes_decode() {
        let (tokens, errors) = lex(r#""a\tb\\c\"d\<e""#);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, Kind::String);
        assert_eq!(
            tokens[0].value,
            TokenValue::Str("a\tb\\c\"d<e".to_owned())
        );
    }

    #[test]
    fn interpolated_string_segments() {
        let (tokens, errors) = lex(r#""ab <$x> cd""#);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, Kind::InterpolatedString);
        let TokenValue::Interpolated(segments) = &tokens[0].value else {
            panic!("expected interpolated payload");
        };
        assert_eq!(
            segments,
            &vec![
                Segment::Text("ab ".to_owned()),
                Segment::Expression {
                    raw: "$x".to_owned(),
                    offset: 5
                },
                Segment::Text(" cd".to_owned()),
            ]
        );
    }

    #[test]
    fn placeholder_skips_nested_strings() {
        let (tokens, errors) = lex(r#""<foo("x>y")>""#);
        assert!(errors.is_empty());
        let TokenValue::Interpolated(segments) = &tokens[0].value else {
            panic!("expected interpolated payload");
        };
        assert_eq!(
            segments,
            &vec![Segment::Expression {
                raw: "foo(\"x>y\")".to_owned(),
                offset: 2
            }]
        );
    }

    #[test]
    fn unterminated_string_reports_and_continues() {
        let (tokens, errors) = lex("\"oops\nreturn");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            crate::reporting::DiagnosticKind::Lexical(LexicalError::UnterminatedString)
        ));
        assert_eq!(tokens.last().map(|t| t.kind), Some(Kind::Return));
    }

    #[test_case("2147483647", Some(2147483647); "int max accepted")]
    #[test_case("2147483648", None; "int max plus one overflows")]
    #[test_case("-2147483648", Some(-2147483648); "int min accepted")]
    #[test_case("-2147483649", None; "int min minus one overflows")]
    #[test_case("0xffffffff", Some(-1); "hex reinterprets")]
    fn int_literal_boundaries(source: &str, expected: Option<i32>) {
        let (tokens, errors) = lex(source);
        match expected {
            Some(value) => {
                assert!(errors.is_empty());
                assert_eq!(tokens[0].value, TokenValue::Int(value));
            }
            None => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(
                    errors[0].kind,
                    crate::reporting::DiagnosticKind::Lexical(LexicalError::IntegerOverflow(_))
                ));
            }
        }
    }

    #[test_case("9223372036854775807L", Some(9223372036854775807); "long max accepted")]
    #[test_case("9223372036854775808L", None; "long max plus one overflows")]
    fn long_literal_boundaries(source: &str, expected: Option<i64>) {
        let (tokens, errors) = lex(source);
        match expected {
            Some(value) => {
                assert!(errors.is_empty());
                assert_eq!(tokens[0].kind, Kind::Long);
                assert_eq!(tokens[0].value, TokenValue::Long(value));
            }
            None => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(
                    errors[0].kind,
                    crate::reporting::DiagnosticKind::Lexical(LexicalError::LongOverflow(_))
                ));
            }
        }
    }

    #[test]
    fn negative_literal_versus_subtraction() {
        let (tokens, _) = lex("calc(1 - 2)");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                Kind::Calc,
                Kind::LParen,
                Kind::Integer,
                Kind::Minus,
                Kind::Integer,
                Kind::RParen
            ]
        );

        let (tokens, _) = lex("members = -1");
        assert_eq!(tokens[2].value, TokenValue::Int(-1));
    }

    #[test]
    fn coord_grid_packs() {
        let (tokens, errors) = lex("`0_50_50_11_31");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, Kind::CoordGrid);
        let expected = ((50 * 64 + 11) << 14) | (50 * 64 + 31);
        assert_eq!(tokens[0].value, TokenValue::Coord(expected));
    }

    #[test]
    fn coord_grid_rejects_wrong_arity() {
        let (_, errors) = lex("`1_2_3");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            crate::reporting::DiagnosticKind::Lexical(LexicalError::MalformedCoordGrid)
        ));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("return // trailing\n/* block */ return"),
            vec![Kind::Return, Kind::Return]
        );
    }

    #[test]
    fn comments_can_be_preserved() {
        let table = LexicalTable::scroll();
        let mut tokenizer =
            Tokenizer::new(&table, "// note\nreturn", FileId::new(0)).keep_comments(true);
        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, Kind::Comment);
        assert_eq!(token.lexeme, "// note");
    }

    #[test]
    fn lexer_lookahead() {
        let table = LexicalTable::scroll();
        let tokenizer = Tokenizer::new(&table, "a b c", FileId::new(0));
        let mut lexer = Lexer::new(tokenizer);
        assert_eq!(lexer.peek_nth(2).lexeme, "c");
        assert_eq!(lexer.peek().lexeme, "a");
        assert_eq!(lexer.take().lexeme, "a");
        assert_eq!(lexer.take().lexeme, "b");
        assert_eq!(lexer.take().lexeme, "c");
        assert_eq!(lexer.remaining(), 0);
        assert_eq!(lexer.take().kind, Kind::Eof);
    }
}
