use serde::Serialize;

/// A structural bracket seen outside of any string or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub ch: char,
    /// Byte offset of the bracket in the scanned text.
    pub offset: usize,
    pub line: usize,
}

impl Bracket {
    pub fn is_open(&self) -> bool {
        matches!(self.ch, '{' | '[' | '(')
    }
}

/// A string or block comment still open when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    BlockComment { opened_at: usize },
    String { opened_at: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    LineComment,
    BlockComment { opened_at: usize },
    Quoted { quote: u8, opened_at: usize },
    TripleQuoted { quote: u8, opened_at: usize },
}

/// Mode-aware lexer yielding the brackets that carry structure.
///
/// Recognises `//` and `/* */` comments, `'`/`"` strings with backslash
/// escapes, and `'''`/`"""` strings that end only on their own delimiter.
/// Every delimiter is ASCII, so the text is walked byte by byte and the
/// reported offsets are always valid char boundaries.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            pos: 0,
            line: 1,
            mode: Mode::Normal,
        }
    }

    /// Current 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The string or block comment left open at end of input, if any.
    /// Only meaningful once the iterator is exhausted.
    pub fn unterminated(&self) -> Option<Unterminated> {
        match self.mode {
            Mode::BlockComment { opened_at } => Some(Unterminated::BlockComment { opened_at }),
            Mode::Quoted { opened_at, .. } | Mode::TripleQuoted { opened_at, .. } => {
                Some(Unterminated::String { opened_at })
            }
            Mode::Normal | Mode::LineComment => None,
        }
    }

    fn starts_with(&self, pat: &[u8]) -> bool {
        self.src[self.pos..].starts_with(pat)
    }

    fn at_triple(&self, quote: u8) -> bool {
        self.starts_with(&[quote, quote, quote])
    }

    fn advance(&mut self) {
        if self.src[self.pos] == b'\n' {
            self.line += 1;
        }
        self.pos += 1;
    }
}

impl Iterator for Lexer<'_> {
    type Item = Bracket;

    fn next(&mut self) -> Option<Bracket> {
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            match self.mode {
                Mode::LineComment => {
                    self.advance();
                    if b == b'\n' {
                        self.mode = Mode::Normal;
                    }
                }
                Mode::BlockComment { .. } => {
                    if self.starts_with(b"*/") {
                        self.pos += 2;
                        self.mode = Mode::Normal;
                    } else {
                        self.advance();
                    }
                }
                Mode::Quoted { quote, .. } => {
                    if b == b'\\' {
                        self.pos += 1;
                        if self.pos < self.src.len() {
                            self.advance();
                        }
                    } else {
                        self.advance();
                        if b == quote {
                            self.mode = Mode::Normal;
                        }
                    }
                }
                Mode::TripleQuoted { quote, .. } => {
                    if self.at_triple(quote) {
                        self.pos += 3;
                        self.mode = Mode::Normal;
                    } else {
                        self.advance();
                    }
                }
                Mode::Normal => {
                    if self.starts_with(b"//") {
                        self.pos += 2;
                        self.mode = Mode::LineComment;
                    } else if self.starts_with(b"/*") {
                        self.pos += 2;
                        self.mode = Mode::BlockComment {
                            opened_at: self.line,
                        };
                    } else if b == b'\'' || b == b'"' {
                        let opened_at = self.line;
                        if self.at_triple(b) {
                            self.pos += 3;
                            self.mode = Mode::TripleQuoted {
                                quote: b,
                                opened_at,
                            };
                        } else {
                            self.pos += 1;
                            self.mode = Mode::Quoted {
                                quote: b,
                                opened_at,
                            };
                        }
                    } else if matches!(b, b'{' | b'[' | b'(' | b'}' | b']' | b')') {
                        let bracket = Bracket {
                            ch: b as char,
                            offset: self.pos,
                            line: self.line,
                        };
                        self.pos += 1;
                        return Some(bracket);
                    } else {
                        self.advance();
                    }
                }
            }
        }
        None
    }
}

/// Index of the bracket closing `brackets[open]`, by plain depth counting.
pub fn matching_close(brackets: &[Bracket], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in brackets.iter().enumerate().skip(open) {
        if b.is_open() {
            depth += 1;
        } else {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnexpectedClose,
    Mismatched,
    Unclosed,
    Unterminated,
}

/// A structural problem found by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn new(line: usize, kind: DiagnosticKind, message: String) -> Self {
        Self {
            line,
            kind,
            message,
        }
    }
}

/// Expected closer for an opening bracket.
pub fn closing_for(open: char) -> Option<char> {
    match open {
        '{' => Some('}'),
        '[' => Some(']'),
        '(' => Some(')'),
        _ => None,
    }
}

/// Bracket history of a single scan. The stack only ever holds openers.
#[derive(Debug, Default)]
struct ScanState {
    stack: Vec<(char, usize)>,
    diagnostics: Vec<Diagnostic>,
}

impl ScanState {
    fn on_bracket(&mut self, bracket: Bracket) {
        if bracket.is_open() {
            self.stack.push((bracket.ch, bracket.line));
            return;
        }
        let Some((open, opened_at)) = self.stack.pop() else {
            self.diagnostics.push(Diagnostic::new(
                bracket.line,
                DiagnosticKind::UnexpectedClose,
                format!("unexpected closing bracket '{}'", bracket.ch),
            ));
            return;
        };
        if let Some(expected) = closing_for(open).filter(|c| *c != bracket.ch) {
            self.diagnostics.push(Diagnostic::new(
                bracket.line,
                DiagnosticKind::Mismatched,
                format!(
                    "mismatched bracket: expected '{}', got '{}', opened at line {}",
                    expected, bracket.ch, opened_at
                ),
            ));
        }
    }

    fn finish(mut self, unterminated: Option<Unterminated>) -> Vec<Diagnostic> {
        match unterminated {
            Some(Unterminated::BlockComment { opened_at }) => {
                self.diagnostics.push(Diagnostic::new(
                    opened_at,
                    DiagnosticKind::Unterminated,
                    format!("unterminated block comment opened at line {}", opened_at),
                ));
            }
            Some(Unterminated::String { opened_at }) => {
                self.diagnostics.push(Diagnostic::new(
                    opened_at,
                    DiagnosticKind::Unterminated,
                    format!("unterminated string opened at line {}", opened_at),
                ));
            }
            None => {}
        }
        for (open, opened_at) in self.stack {
            self.diagnostics.push(Diagnostic::new(
                opened_at,
                DiagnosticKind::Unclosed,
                format!("unclosed bracket '{}' opened at line {}", open, opened_at),
            ));
        }
        self.diagnostics
    }
}

/// Check bracket balance of `text`, ignoring anything inside strings or
/// comments.
///
/// Diagnostics accumulate in scan order; unclosed brackets are appended at
/// the end, oldest first. Never fails: malformed input is what it reports.
pub fn scan(text: &str) -> Vec<Diagnostic> {
    let mut lexer = Lexer::new(text);
    let mut state = ScanState::default();
    for bracket in lexer.by_ref() {
        state.on_bracket(bracket);
    }
    state.finish(lexer.unterminated())
}
