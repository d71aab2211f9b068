use logos::Logos;
use tracing::trace;

use crate::error::ParseError;
use crate::position::{LineIndex, Span};
use crate::token::Token;

/// Turns source text into positioned tokens, plus the span of the end of
/// input. The first unrecognized character or unterminated string/comment
/// aborts the whole lex.
pub fn lex(name: &str, source: &str) -> Result<(Vec<(Token, Span)>, Span), ParseError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();

    for (token, range) in Token::lexer(source).spanned() {
        let span = Span::new(index.position(range.start), index.position(range.end));
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(err) => return Err(ParseError::new(name, span.start, err.to_string())),
        }
    }

    trace!(tokens = tokens.len(), "lexed source");
    let eoi = Span::new(index.end(), index.end());
    Ok((tokens, eoi))
}
