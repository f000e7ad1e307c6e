//! Prosa Lexer
//!
//! Lexing happens in three layers:
//! - `preprocess` strips `//` comments to end of line and surrounding
//!   whitespace before any scanning starts.
//! - a `logos`-derived raw scanner recognises literals, words and the
//!   symbolic punctuation shared by both surfaces.
//! - the active `Surface`'s keyword table resolves words to grammar roles;
//!   words it does not know stay identifiers.
//!
//! The public `Lexer` is a pull interface: it holds the most recently
//! produced token and advances on an explicit `select_next` call, which is
//! the one token of lookahead the parser works with.

use crate::ast::Kind;
use crate::error::{ProsaError, ProsaResult};
use crate::span::Span;
use crate::Surface;
use logos::Logos;
use std::fmt;

/// Strip single-line comments and surrounding whitespace. The comment
/// marker truncates the rest of its line unconditionally, string literals
/// included.
pub fn preprocess(source: &str) -> String {
    let stripped: Vec<&str> = source
        .lines()
        .map(|line| match line.find("//") {
            Some(at) => &line[..at],
            None => line,
        })
        .collect();
    stripped.join("\n").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawLexError {
    #[default]
    InvalidCharacter,
    DigitThenLetter,
    UnterminatedText,
    IntegerOverflow,
}

fn lex_int(lex: &mut logos::Lexer<RawToken>) -> Result<i64, RawLexError> {
    // A digit run glued to a letter is rejected, never split into two tokens.
    if lex
        .remainder()
        .starts_with(|c: char| c.is_ascii_alphabetic())
    {
        return Err(RawLexError::DigitThenLetter);
    }
    lex.slice()
        .parse()
        .map_err(|_| RawLexError::IntegerOverflow)
}

fn lex_text(lex: &mut logos::Lexer<RawToken>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_string()
}

fn lex_unterminated(_lex: &mut logos::Lexer<RawToken>) -> Result<String, RawLexError> {
    Err(RawLexError::UnterminatedText)
}

/// Surface-independent raw tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(error = RawLexError)]
enum RawToken {
    #[regex(r"[0-9]+", lex_int)]
    Int(i64),

    #[regex(r#""[^"]*""#, lex_text, priority = 6)]
    #[regex(r#""[^"]*"#, lex_unterminated, priority = 5)]
    Text(String),

    #[regex(r"[A-Za-z][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Word(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(":=")]
    Walrus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("++")]
    PlusPlus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("=")]
    Eq,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,
}

/// Grammar-role tokens consumed by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals and names ===
    Int(i64),
    Text(String),
    Bool(bool),
    Ident(String),
    TypeName(Kind),

    // === Keywords ===
    Var,
    Print,
    Speak,
    Read,
    If,
    Else,
    While,

    // === Operators ===
    Plus,
    Minus,
    Star,
    Slash,
    Concat,
    Bang,
    AndAnd,
    OrOr,
    Equal,
    Greater,
    Less,
    Assign,

    // === Punctuation ===
    Colon,
    Semi,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Text(s) => write!(f, "\"{}\"", s),
            TokenKind::Bool(b) => write!(f, "{}", b),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::TypeName(k) => write!(f, "{}", k),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Print => write!(f, "print"),
            TokenKind::Speak => write!(f, "speak"),
            TokenKind::Read => write!(f, "read"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Concat => write!(f, "++"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Equal => write!(f, "="),
            TokenKind::Greater => write!(f, ">"),
            TokenKind::Less => write!(f, "<"),
            TokenKind::Assign => write!(f, ":="),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semi => write!(f, ";"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Resolve a word against the active surface's keyword table. Words the
/// table does not know are identifiers, so each surface treats the other
/// surface's keywords as ordinary names.
pub fn keyword(surface: Surface, word: &str) -> Option<TokenKind> {
    match surface {
        Surface::Script => match word {
            "var" => Some(TokenKind::Var),
            "print" => Some(TokenKind::Print),
            "speak" => Some(TokenKind::Speak),
            "read" => Some(TokenKind::Read),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "true" => Some(TokenKind::Bool(true)),
            "false" => Some(TokenKind::Bool(false)),
            "i32" => Some(TokenKind::TypeName(Kind::Int)),
            "bool" => Some(TokenKind::TypeName(Kind::Bool)),
            "str" => Some(TokenKind::TypeName(Kind::Str)),
            _ => None,
        },
        Surface::Spoken => match word {
            "INICIO" => Some(TokenKind::LBrace),
            "FIM" => Some(TokenKind::RBrace),
            "GUARDAR" => Some(TokenKind::Var),
            "COMO" => Some(TokenKind::Colon),
            "COM" => Some(TokenKind::Equal),
            "RECEBE" => Some(TokenKind::Assign),
            "EXIBIR" => Some(TokenKind::Print),
            "FALAR" => Some(TokenKind::Speak),
            "PERGUNTAR" => Some(TokenKind::Read),
            "QUANDO" => Some(TokenKind::If),
            "SENAO" => Some(TokenKind::Else),
            "ENQUANTO" => Some(TokenKind::While),
            "MAIS" => Some(TokenKind::Plus),
            "MENOS" => Some(TokenKind::Minus),
            "CONCATENA" => Some(TokenKind::Concat),
            "VEZES" => Some(TokenKind::Star),
            "DIVIDIDO" => Some(TokenKind::Slash),
            "NAO" => Some(TokenKind::Bang),
            "E" => Some(TokenKind::AndAnd),
            "OU" => Some(TokenKind::OrOr),
            "IGUAL" => Some(TokenKind::Equal),
            "MAIOR" => Some(TokenKind::Greater),
            "MENOR" => Some(TokenKind::Less),
            "VERDADEIRO" => Some(TokenKind::Bool(true)),
            "FALSO" => Some(TokenKind::Bool(false)),
            "NUMERO" => Some(TokenKind::TypeName(Kind::Int)),
            "BOOLEANO" => Some(TokenKind::TypeName(Kind::Bool)),
            "TEXTO" => Some(TokenKind::TypeName(Kind::Str)),
            _ => None,
        },
    }
}

/// Pull-based token source with one token of lookahead
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, RawToken>,
    surface: Surface,
    current: Token,
}

impl<'a> Lexer<'a> {
    /// Build a lexer over preprocessed source and prime the first token.
    pub fn new(source: &'a str, surface: Surface) -> ProsaResult<Self> {
        let mut lexer = Self {
            inner: RawToken::lexer(source),
            surface,
            current: Token::new(TokenKind::Eof, Span::default()),
        };
        lexer.select_next()?;
        Ok(lexer)
    }

    /// The most recently produced token.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Advance to the next token. Once the input is exhausted this keeps
    /// producing `Eof`.
    pub fn select_next(&mut self) -> ProsaResult<()> {
        let Some(result) = self.inner.next() else {
            let end = self.inner.source().len();
            self.current = Token::new(TokenKind::Eof, Span::new(end, end));
            return Ok(());
        };

        let span = Span::new(self.inner.span().start, self.inner.span().end);
        match result {
            Ok(raw) => {
                self.current = Token::new(self.resolve(raw), span);
                Ok(())
            }
            Err(err) => {
                let message = match err {
                    RawLexError::InvalidCharacter => {
                        format!("invalid character '{}'", self.inner.slice())
                    }
                    RawLexError::DigitThenLetter => format!(
                        "integer literal '{}' runs straight into a letter",
                        self.inner.slice()
                    ),
                    RawLexError::UnterminatedText => {
                        "text literal is missing its closing quote".to_string()
                    }
                    RawLexError::IntegerOverflow => {
                        format!("integer literal '{}' is out of range", self.inner.slice())
                    }
                };
                Err(ProsaError::lexical(message, span))
            }
        }
    }

    fn resolve(&self, raw: RawToken) -> TokenKind {
        match raw {
            RawToken::Int(value) => TokenKind::Int(value),
            RawToken::Text(text) => TokenKind::Text(text),
            RawToken::Word(word) => {
                keyword(self.surface, &word).unwrap_or(TokenKind::Ident(word))
            }
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Semi => TokenKind::Semi,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Walrus => TokenKind::Assign,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::PlusPlus => TokenKind::Concat,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Bang => TokenKind::Bang,
            RawToken::AndAnd => TokenKind::AndAnd,
            RawToken::OrOr => TokenKind::OrOr,
            RawToken::Eq => TokenKind::Equal,
            RawToken::Greater => TokenKind::Greater,
            RawToken::Less => TokenKind::Less,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str, surface: Surface) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source, surface).unwrap();
        let mut out = Vec::new();
        loop {
            let kind = lexer.current().kind.clone();
            let done = kind == TokenKind::Eof;
            out.push(kind);
            if done {
                break;
            }
            lexer.select_next().unwrap();
        }
        out
    }

    #[test]
    fn test_script_tokens() {
        let toks = kinds("var x : i32 = 2;", Surface::Script);
        assert_eq!(
            toks,
            vec![
                TokenKind::Var,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::TypeName(Kind::Int),
                TokenKind::Equal,
                TokenKind::Int(2),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_spoken_words_map_to_same_roles() {
        let script = kinds("x := 1 + 2;", Surface::Script);
        let spoken = kinds("x RECEBE 1 MAIS 2;", Surface::Spoken);
        assert_eq!(script, spoken);
    }

    #[test]
    fn test_two_char_operators() {
        let toks = kinds("a ++ b := c && d || !e", Surface::Script);
        assert!(toks.contains(&TokenKind::Concat));
        assert!(toks.contains(&TokenKind::Assign));
        assert!(toks.contains(&TokenKind::AndAnd));
        assert!(toks.contains(&TokenKind::OrOr));
        assert!(toks.contains(&TokenKind::Bang));
    }

    #[test]
    fn test_keywords_of_other_surface_are_identifiers() {
        let toks = kinds("EXIBIR", Surface::Script);
        assert_eq!(toks[0], TokenKind::Ident("EXIBIR".into()));
        let toks = kinds("print", Surface::Spoken);
        assert_eq!(toks[0], TokenKind::Ident("print".into()));
    }

    #[test]
    fn test_digit_then_letter_is_rejected() {
        let err = Lexer::new("12abc", Surface::Script)
            .err()
            .expect("lexing should fail");
        assert!(matches!(err, crate::ProsaError::Lexical { .. }));
    }

    #[test]
    fn test_unterminated_text_literal() {
        let err = Lexer::new("\"still open", Surface::Script)
            .err()
            .expect("lexing should fail");
        let message = err.to_string();
        assert!(message.contains("closing quote"), "{}", message);
    }

    #[test]
    fn test_invalid_character() {
        let err = Lexer::new("@", Surface::Script).err().expect("must fail");
        assert!(err.to_string().contains("invalid character"));
    }

    #[test]
    fn test_eof_is_repeatable() {
        let mut lexer = Lexer::new("1", Surface::Script).unwrap();
        lexer.select_next().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Eof);
        lexer.select_next().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Eof);
    }

    #[test]
    fn test_preprocess_strips_comments() {
        let clean = preprocess("  x := 1; // trailing note\n// whole line\ny := 2;  ");
        assert_eq!(clean, "x := 1; \n\ny := 2;");
    }
}
