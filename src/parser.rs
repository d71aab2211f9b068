use std::rc::Rc;

use chumsky::error::{Simple, SimpleReason};
use chumsky::prelude::{choice, end, just, recursive};
use chumsky::{select, Parser, Stream};
use tracing::debug;

use crate::ast::Expr;
use crate::error::ParseError;
use crate::lexer::lex;
use crate::position::{Position, Span};
use crate::token::Token;
use crate::value::Value;

// Lexed as operators, but never usable as one.
const RESERVED_OPERATORS: [&str; 3] = ["=", "\\", "->"];

/// Parses a whole program into its root Procedure node. `name` is only used
/// for diagnostics. Parsing either yields a complete AST or fails with the
/// furthest position reached; there is no partial result.
pub fn parse(name: &str, source: &str) -> Result<Expr, ParseError> {
    let (tokens, eoi) = lex(name, source)?;
    debug!(name, tokens = tokens.len(), "parsing source");

    parser()
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map_err(|errors| convert_errors(name, errors))
}

fn convert_errors(name: &str, errors: Vec<Simple<Token, Span>>) -> ParseError {
    // report the error that got furthest into the input
    let err = match errors.into_iter().max_by_key(|err| err.span().start) {
        Some(err) => err,
        None => return ParseError::new(name, Position::default(), "parse error"),
    };

    if let SimpleReason::Custom(message) = err.reason() {
        return ParseError::new(name, err.span().start, message.clone());
    }

    let found = match err.found() {
        Some(token) => format!("unexpected {}", token),
        None => "unexpected end of input".to_owned(),
    };
    let mut expected: Vec<String> = err
        .expected()
        .map(|expected| match expected {
            Some(token) => token.to_string(),
            None => "end of input".to_owned(),
        })
        .collect();
    expected.sort();
    expected.dedup();

    let message = if expected.is_empty() {
        found
    } else {
        format!("{}; expecting {}", found, expected.join(", "))
    };
    ParseError::new(name, err.span().start, message)
}

/// One operator occurrence: its spelling and the position of its token.
type OpToken = (String, Position);

fn op(sym: &'static str) -> impl Parser<Token, OpToken, Error = Simple<Token, Span>> + Clone {
    just(Token::Operator(sym.to_owned()))
        .map_with_span(move |_, span: Span| (sym.to_owned(), span.start))
}

// Every operator desugars to an application of a synthesized variable, so
// the evaluator resolves `x + y` as `_+_ (x, y)` through the environment
// with no operator-specific code path.
fn infix_apply(pos: Position, sym: &str, left: Expr, right: Expr) -> Expr {
    Expr::Apply {
        pos,
        func: Box::new(Expr::Variable {
            pos,
            name: format!("_{}_", sym),
        }),
        args: vec![left, right],
    }
}

fn prefix_apply(pos: Position, sym: &str, operand: Expr) -> Expr {
    Expr::Apply {
        pos,
        func: Box::new(Expr::Variable {
            pos,
            name: format!("{}_", sym),
        }),
        args: vec![operand],
    }
}

fn fold_left(first: Expr, rest: Vec<(OpToken, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, ((sym, pos), right)| {
            infix_apply(pos, &sym, left, right)
        })
}

fn fold_right(first: Expr, rest: Vec<(OpToken, Expr)>) -> Expr {
    // a `op1` b `op2` c groups as a `op1` (b `op2` c)
    let mut tail = rest.into_iter().rev();
    match tail.next() {
        None => first,
        Some((op, last)) => {
            let mut acc = last;
            let mut pending = op;
            for (op, operand) in tail {
                let (sym, pos) = pending;
                acc = infix_apply(pos, &sym, operand, acc);
                pending = op;
            }
            let (sym, pos) = pending;
            infix_apply(pos, &sym, first, acc)
        }
    }
}

fn parser() -> impl Parser<Token, Expr, Error = Simple<Token, Span>> {
    let sequence = recursive(|sequence| {
        let expression = recursive(|expression| {
            let ident = select! { Token::Ident(name) => name };

            let number = select! {
                Token::Number(text) => text.parse::<f64>().unwrap_or(f64::NAN),
                Token::NaN => f64::NAN,
                Token::Infinity => f64::INFINITY,
            }
            .map(Value::Number);

            let string = select! { Token::Str(text) => Value::String(text) };

            let boolean = select! {
                Token::True => Value::Boolean(true),
                Token::False => Value::Boolean(false),
            };

            let void = just(Token::Void)
                .ignored()
                .or(just(Token::LeftParen)
                    .ignore_then(just(Token::RightParen))
                    .ignored())
                .to(Value::Void);

            let prim_literal = choice((number, string, boolean, void))
                .map_with_span(|value, span: Span| Expr::Literal {
                    pos: span.start,
                    value,
                });

            let array_literal = expression
                .clone()
                .separated_by(just(Token::Comma))
                .delimited_by(just(Token::LeftBracket), just(Token::RightBracket))
                .map_with_span(|elements, span: Span| Expr::ArrayLiteral {
                    pos: span.start,
                    elements,
                });

            let literal = prim_literal.or(array_literal).labelled("literal");

            let identifier = ident.map_with_span(|name, span: Span| Expr::Variable {
                pos: span.start,
                name,
            });

            // operators referenced as first-class values, e.g. `(+)`
            let operator_ref = select! { Token::Operator(sym) => sym }
                .try_map(|sym, span: Span| {
                    if RESERVED_OPERATORS.contains(&sym.as_str()) {
                        Err(Simple::custom(span, format!("reserved operator: {}", sym)))
                    } else {
                        Ok(sym)
                    }
                })
                .delimited_by(just(Token::LeftParen), just(Token::RightParen))
                .map_with_span(|sym, span: Span| Expr::Variable {
                    pos: span.start,
                    name: format!("_{}_", sym),
                });

            let variable = identifier.or(operator_ref).labelled("variable");

            // value-or-function position inside an application chain
            let value_expr = choice((
                literal,
                variable,
                expression
                    .clone()
                    .delimited_by(just(Token::LeftParen), just(Token::RightParen)),
            ))
            .boxed();

            let application = value_expr
                .clone()
                .then(value_expr.repeated())
                .map_with_span(|(func, args), span: Span| {
                    if args.is_empty() {
                        func
                    } else {
                        Expr::Apply {
                            pos: span.start,
                            func: Box::new(func),
                            args,
                        }
                    }
                })
                .labelled("value or function application");

            // a bare identifier immediately followed by `=`; the lookahead
            // backtracks into an application for `x == y` or `f x`
            let declaration = ident
                .then_ignore(just(Token::Operator("=".to_owned())))
                .then(expression.clone())
                .map_with_span(|(name, value), span: Span| Expr::Declaration {
                    pos: span.start,
                    name,
                    value: Box::new(value),
                })
                .labelled("declaration");

            let lambda = just(Token::Operator("\\".to_owned()))
                .or(just(Token::Lambda))
                .ignore_then(ident.repeated())
                .then_ignore(just(Token::Operator("->".to_owned())))
                .then(expression.clone())
                .map_with_span(|(params, body), span: Span| Expr::Lambda {
                    pos: span.start,
                    params: Rc::new(params),
                    body: Rc::new(body),
                })
                .labelled("lambda");

            // sugar for an immediately applied one-parameter closure
            let let_in = just(Token::Let)
                .ignore_then(ident)
                .then_ignore(just(Token::Operator("=".to_owned())))
                .then(expression.clone())
                .then_ignore(just(Token::In))
                .then(expression.clone())
                .map_with_span(|((name, bound), body), span: Span| {
                    let pos = span.start;
                    Expr::Apply {
                        pos,
                        func: Box::new(Expr::Lambda {
                            pos,
                            params: Rc::new(vec![name]),
                            body: Rc::new(body),
                        }),
                        args: vec![bound],
                    }
                })
                .labelled("let in");

            let if_else = just(Token::If)
                .ignore_then(expression.clone())
                .then_ignore(just(Token::Then))
                .then(expression.clone())
                .then(just(Token::Else).ignore_then(expression.clone()).or_not())
                .map_with_span(|((test, consequent), alternative), span: Span| Expr::If {
                    pos: span.start,
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternative: alternative.map(Box::new),
                })
                .labelled("if else");

            let while_loop = just(Token::While)
                .ignore_then(expression.clone())
                .then_ignore(just(Token::Do))
                .then(expression.clone())
                .map_with_span(|(test, body), span: Span| Expr::While {
                    pos: span.start,
                    test: Box::new(test),
                    body: Box::new(body),
                })
                .labelled("while");

            let block = sequence
                .clone()
                .delimited_by(just(Token::LeftBrace), just(Token::RightBrace))
                .labelled("procedure block");

            let operand = choice((
                declaration,
                lambda,
                let_in,
                if_else,
                while_loop,
                block,
                application,
            ))
            .boxed();

            // the operator table, tightest first

            let index_or_compose = operand
                .clone()
                .then(
                    choice((
                        op("!!")
                            .then(operand.clone())
                            .repeated()
                            .at_least(1)
                            .map(|rest| (true, rest)),
                        op(".")
                            .then(operand)
                            .repeated()
                            .at_least(1)
                            .map(|rest| (false, rest)),
                    ))
                    .or_not(),
                )
                .map(|(first, chain)| match chain {
                    None => first,
                    Some((true, rest)) => fold_left(first, rest),
                    Some((false, rest)) => fold_right(first, rest),
                })
                .boxed();

            let power = index_or_compose
                .clone()
                .then(op("**").then(index_or_compose).repeated())
                .map(|(first, rest)| fold_right(first, rest))
                .boxed();

            let product = power
                .clone()
                .then(choice((op("*"), op("/"), op("%"))).then(power).repeated())
                .map(|(first, rest)| fold_left(first, rest))
                .boxed();

            // a single optional sign, binding tighter than the infix forms
            let signed = choice((op("+"), op("-")))
                .or_not()
                .then(product)
                .map(|(sign, operand)| match sign {
                    Some((sym, pos)) => prefix_apply(pos, &sym, operand),
                    None => operand,
                })
                .boxed();

            let sum = signed
                .clone()
                .then(choice((op("+"), op("-"))).then(signed).repeated())
                .map(|(first, rest)| fold_left(first, rest))
                .boxed();

            let concat = sum
                .clone()
                .then(op("++").then(sum).repeated())
                .map(|(first, rest)| fold_right(first, rest))
                .boxed();

            // comparisons do not chain
            let comparison = concat
                .clone()
                .then(
                    choice((op("=="), op("!="), op("<="), op(">="), op("<"), op(">")))
                        .then(concat)
                        .or_not(),
                )
                .map(|(first, rest)| match rest {
                    Some(((sym, pos), right)) => infix_apply(pos, &sym, first, right),
                    None => first,
                })
                .boxed();

            let and = comparison
                .clone()
                .then(op("&&").then(comparison).repeated())
                .map(|(first, rest)| fold_right(first, rest))
                .boxed();

            let or = and
                .clone()
                .then(op("||").then(and).repeated())
                .map(|(first, rest)| fold_right(first, rest))
                .boxed();

            let apply_op = or
                .clone()
                .then(op("$").then(or).repeated())
                .map(|(first, rest)| fold_right(first, rest))
                .boxed();

            apply_op.labelled("expression")
        });

        // a link: colon-separated expressions evaluate last-to-first, so the
        // children are stored reversed; do not "fix" this
        let link = expression
            .separated_by(just(Token::Colon))
            .at_least(1)
            .map_with_span(|mut exprs: Vec<Expr>, span: Span| {
                if exprs.len() == 1 {
                    exprs.remove(0)
                } else {
                    exprs.reverse();
                    Expr::Block {
                        pos: span.start,
                        body: exprs,
                    }
                }
            });

        // links separated by at most one `;` each; a block is always a
        // Procedure node, even around a single link
        link.then_ignore(just(Token::Semicolon).or_not())
            .repeated()
            .map_with_span(|body, span: Span| Expr::Block {
                pos: span.start,
                body,
            })
    });

    sequence.then_ignore(end())
}
