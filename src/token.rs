use std::fmt::Display;

use logos::{FilterResult, Logos};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedComment,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexError::UnterminatedString => write!(f, "unterminated string literal"),
            LexError::UnterminatedComment => write!(f, "unterminated block comment"),
        }
    }
}

fn unescape_string(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    chars.next();
    chars.next_back();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '"' => result.push('"'),
                    '\'' => result.push('\''),
                    '\\' => result.push('\\'),
                    _ => {
                        result.push('\\');
                        result.push(escaped);
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

// Block comments do not nest: the first `-}` closes the comment.
fn block_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), LexError> {
    match lex.remainder().find("-}") {
        Some(len) => {
            lex.bump(len + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(LexError::UnterminatedComment)
        }
    }
}

fn unterminated_string(_lex: &mut logos::Lexer<Token>) -> Result<String, LexError> {
    Err(LexError::UnterminatedString)
}

fn hex_literal(lex: &mut logos::Lexer<Token>) -> Option<String> {
    u64::from_str_radix(&lex.slice()[2..], 16)
        .ok()
        .map(|n| n.to_string())
}

fn octal_literal(lex: &mut logos::Lexer<Token>) -> Option<String> {
    u64::from_str_radix(&lex.slice()[2..], 8)
        .ok()
        .map(|n| n.to_string())
}

#[derive(Logos, Hash, Eq, Clone, Debug, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("do")]
    Do,

    #[token("let")]
    Let,

    #[token("in")]
    In,

    #[token("lambda")]
    Lambda,

    #[token("True")]
    True,

    #[token("False")]
    False,

    #[token("Void")]
    Void,

    #[token("NaN")]
    NaN,

    #[token("Infinity")]
    Infinity,

    // A comment wins over an operator of the same length, so `-->` starts a
    // line comment rather than lexing as an operator.
    #[regex(r"--[^\n]*", logos::skip, priority = 10)]
    #[token("{-", block_comment)]
    Comment,

    // One maximal-munch run of symbol characters; the parser matches the
    // spelling, including the reserved `=`, `\` and `->`.
    #[regex(r"[!#$%&*+./<=>?@\\^|~-]+", |lex| lex.slice().to_owned())]
    Operator(String),

    // The spelling is kept as text so the token stays `Hash + Eq`; the
    // parser converts it to a number.
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_owned())]
    #[regex(r"0[xX][0-9a-fA-F]+", hex_literal)]
    #[regex(r"0[oO][0-7]+", octal_literal)]
    Number(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    #[regex(r#""([^"\\\n]|\\.)*"#, unterminated_string)]
    Str(String),

    #[regex(r"[a-zA-Z][a-zA-Z0-9_']*", |lex| lex.slice().to_owned())]
    Ident(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::LeftBrace => write!(f, "'{{'"),
            Token::RightBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Colon => write!(f, "':'"),
            Token::If => write!(f, "'if'"),
            Token::Then => write!(f, "'then'"),
            Token::Else => write!(f, "'else'"),
            Token::While => write!(f, "'while'"),
            Token::Do => write!(f, "'do'"),
            Token::Let => write!(f, "'let'"),
            Token::In => write!(f, "'in'"),
            Token::Lambda => write!(f, "'lambda'"),
            Token::True => write!(f, "'True'"),
            Token::False => write!(f, "'False'"),
            Token::Void => write!(f, "'Void'"),
            Token::NaN => write!(f, "'NaN'"),
            Token::Infinity => write!(f, "'Infinity'"),
            Token::Comment => write!(f, "comment"),
            Token::Operator(op) => write!(f, "operator '{}'", op),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Str(_) => write!(f, "string literal"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
        }
    }
}
