//! Recursive-descent parsers for effect strings and logic functions.
//!
//! The grammar has no tokenizer: each stage looks at the first character of
//! what remains, finds the matching closing bracket, and splits on the two
//! characters that follow it.
//!
//! ```text
//! logicFunction := "true" | "false" | "(" logicFunction ")" [op logicFunction]
//!                | logicExpr [op logicFunction]
//! logicExpr     := "{" quantifier "~" modifiers cardSelector "}"
//!                | "{" quantifier "}" modifiers group
//! cardSelector  := "[" statement "]" [op cardSelector] | "(" cardSelector ")" [op cardSelector]
//! effect        := "-" | instruction " " logicFunction (" " instruction " " logicFunction)*
//! ```

use crate::classify::{is_card_statement, is_logic_operator};
use crate::{
    CardSelector, CardStatement, Effect, Instruction, LogicExpression, LogicFunction,
    LogicOperator, Modifier, Quantifier, SlugIdMap,
};
use thiserror::Error;

pub const LOGIC_EXPRESSION_OPEN: char = '{';
pub const LOGIC_EXPRESSION_CLOSE: char = '}';
pub const CARD_OPEN: char = '[';
pub const CARD_CLOSE: char = ']';
pub const PRECEDENCE_OPEN: char = '(';
pub const PRECEDENCE_CLOSE: char = ')';
pub const LOGIC_EXPRESSION_SEPARATOR: char = '~';
pub const NO_EFFECT: &str = "-";

/// Deepest tree a parser builds. Every operator in a chain and every
/// parenthesised group adds a level.
pub const MAX_NESTING_DEPTH: usize = 256;

const END_OF_STRING: &str = "end of string";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{expression} bracket mismatch at {position}: is '{found}', expected {expected}")]
    BracketMismatch {
        expression: String,
        position: usize,
        found: char,
        expected: String,
    },
    #[error("{expression} bracket mismatch: could not find closing brackets for {unclosed}")]
    UnclosedBrackets { expression: String, unclosed: String },
    #[error("illegal character '{found}' at start of expression - {target} must start with either {expected} ({expression})")]
    IllegalCharacter {
        found: String,
        target: &'static str,
        expected: &'static str,
        expression: String,
    },
    #[error("expression uses unknown logic operator '{operator}' ({expression})")]
    UnknownOperator { operator: String, expression: String },
    #[error("reached EOS after logic operator - operators must be followed by another {target} ({expression})")]
    EndAfterOperator {
        target: &'static str,
        expression: String,
    },
    #[error("unexpected input '{rest}' after logic expression ({expression})")]
    TrailingInput { rest: String, expression: String },
    #[error("missing '~' between quantifier and selector ({0})")]
    MissingSeparator(String),
    #[error("'{0}' is not a valid card statement")]
    InvalidStatement(String),
    #[error("'{0}' is not a valid card slug")]
    InvalidSlug(String),
    #[error("'{0}' is not a valid card group")]
    InvalidGroup(String),
    #[error("'{quantifier}' is not a legal quantifier ({expression})")]
    InvalidQuantifier { quantifier: String, expression: String },
    #[error("expression uses at least one unknown modifier '{modifiers}' ({expression})")]
    InvalidModifier { modifiers: String, expression: String },
    #[error("unknown instruction '{instruction}' used in effect '{effect}'")]
    UnknownInstruction { instruction: String, effect: String },
    #[error("could not recognize effect '{0}'")]
    UnrecognizedEffect(String),
    #[error("expression nests deeper than {limit} levels ({expression})")]
    NestingTooDeep { limit: usize, expression: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Selector,
    Function,
}

impl Target {
    fn name(self) -> &'static str {
        match self {
            Self::Selector => "cardSelector",
            Self::Function => "logicFunction",
        }
    }

    fn starts(self) -> &'static str {
        match self {
            Self::Selector => "'[' or '('",
            Self::Function => "'{' or '('",
        }
    }
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        b'(' => Some(b')'),
        _ => None,
    }
}

fn is_closer(value: u8) -> bool {
    matches!(value, b'}' | b']' | b')')
}

/// Checks that `{}`, `[]` and `()` pairs match and nest. Other characters pass through.
pub fn verify_bracket_closure(expression: &str) -> Result<(), ParseError> {
    let mut stack: Vec<char> = Vec::new();
    for (position, ch) in expression.chars().enumerate() {
        if !ch.is_ascii() {
            continue;
        }
        let byte = ch as u8;
        if let Some(close) = closer_for(byte) {
            stack.push(close as char);
        } else if is_closer(byte) {
            if stack.last() == Some(&ch) {
                stack.pop();
            } else {
                return Err(ParseError::BracketMismatch {
                    expression: expression.to_string(),
                    position,
                    found: ch,
                    expected: stack
                        .last()
                        .map(|c| format!("'{c}'"))
                        .unwrap_or_else(|| "no closing bracket".to_string()),
                });
            }
        }
    }
    if stack.is_empty() {
        Ok(())
    } else {
        Err(ParseError::UnclosedBrackets {
            expression: expression.to_string(),
            unclosed: stack.iter().rev().collect(),
        })
    }
}

pub fn brackets_balanced(expression: &str) -> bool {
    verify_bracket_closure(expression).is_ok()
}

pub fn parse_effect(effect: &str, slugs: Option<&SlugIdMap>) -> Result<Vec<Effect>, ParseError> {
    if effect == NO_EFFECT {
        return Ok(Vec::new());
    }
    let tokens: Vec<&str> = effect.split(' ').collect();
    if tokens.len() % 2 != 0 {
        return Err(ParseError::UnrecognizedEffect(effect.to_string()));
    }
    let mut effects = Vec::with_capacity(tokens.len() / 2);
    for pair in tokens.chunks(2) {
        let (keyword, argument) = (pair[0], pair[1]);
        let instruction =
            Instruction::from_keyword(keyword).ok_or_else(|| ParseError::UnknownInstruction {
                instruction: keyword.to_string(),
                effect: format!("{keyword} {argument}"),
            })?;
        let condition = parse_logic_function(argument, slugs)?;
        effects.push(Effect {
            instruction,
            condition,
        });
    }
    Ok(effects)
}

pub fn parse_logic_function(
    expression: &str,
    slugs: Option<&SlugIdMap>,
) -> Result<LogicFunction, ParseError> {
    verify_bracket_closure(expression)?;
    parse_function_inner(expression, slugs, 0)
}

fn parse_function_inner(
    expression: &str,
    slugs: Option<&SlugIdMap>,
    depth: usize,
) -> Result<LogicFunction, ParseError> {
    let mut chain: Vec<(LogicFunction, LogicOperator)> = Vec::new();
    let mut rest = expression;
    let last = loop {
        let level = nesting_level(depth, chain.len(), expression)?;
        match rest {
            "true" => break LogicFunction::TRUE,
            "false" => break LogicFunction::FALSE,
            _ => {}
        }
        let (left, tail) = match rest.as_bytes().first() {
            Some(b'(') => {
                let close = matching_close(rest, 0)?;
                let left = parse_function_inner(&rest[1..close], slugs, level + 1)?;
                (left, &rest[close + 1..])
            }
            Some(b'{') => {
                let end = expression_span(rest)?;
                let left = LogicFunction::Expression(parse_logic_expression(&rest[..end], slugs)?);
                (left, &rest[end..])
            }
            _ => return Err(illegal_start(rest, Target::Function)),
        };
        match split_operator(tail, rest, Target::Function)? {
            None => break left,
            Some((op, next)) => {
                chain.push((left, op));
                rest = next;
            }
        }
    };
    Ok(chain
        .into_iter()
        .rev()
        .fold(last, |right, (left, op)| LogicFunction::binary(left, op, right)))
}

/// Parses one `{quantifier~modifiers selector}` clause.
///
/// The older `{quantifier}modifiers selector` surface is accepted as well.
pub fn parse_logic_expression(
    expression: &str,
    slugs: Option<&SlugIdMap>,
) -> Result<LogicExpression, ParseError> {
    let (quantifier, rest) = split_quantifier(expression)?;
    let quantifier =
        Quantifier::from_keyword(quantifier).ok_or_else(|| ParseError::InvalidQuantifier {
            quantifier: quantifier.to_string(),
            expression: expression.to_string(),
        })?;
    let split = rest
        .bytes()
        .position(|b| closer_for(b).is_some())
        .unwrap_or(rest.len());
    let (raw_modifiers, selector) = rest.split_at(split);
    let modifiers = raw_modifiers
        .chars()
        .map(Modifier::from_symbol)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ParseError::InvalidModifier {
            modifiers: raw_modifiers.to_string(),
            expression: expression.to_string(),
        })?;
    Ok(LogicExpression::clause(
        quantifier,
        modifiers,
        parse_card_selector(selector, slugs)?,
    ))
}

/// Parses a boolean combination of `[statement]` references.
///
/// With a slug map, slugs become IDs; unknown slugs become the `-1` sentinel.
pub fn parse_card_selector(
    expression: &str,
    slugs: Option<&SlugIdMap>,
) -> Result<CardSelector, ParseError> {
    parse_selector_inner(expression, slugs, 0)
}

fn parse_selector_inner(
    expression: &str,
    slugs: Option<&SlugIdMap>,
    depth: usize,
) -> Result<CardSelector, ParseError> {
    let mut chain: Vec<(CardSelector, LogicOperator)> = Vec::new();
    let mut rest = expression;
    let last = loop {
        let level = nesting_level(depth, chain.len(), expression)?;
        let (left, tail) = match rest.as_bytes().first() {
            Some(b'[') => {
                let close = matching_close(rest, 0)?;
                let left = parse_statement(&rest[1..close], slugs)?;
                (left, &rest[close + 1..])
            }
            Some(b'(') => {
                let close = matching_close(rest, 0)?;
                let left = parse_selector_inner(&rest[1..close], slugs, level + 1)?;
                (left, &rest[close + 1..])
            }
            _ => return Err(illegal_start(rest, Target::Selector)),
        };
        match split_operator(tail, rest, Target::Selector)? {
            None => break left,
            Some((op, next)) => {
                chain.push((left, op));
                rest = next;
            }
        }
    };
    Ok(chain
        .into_iter()
        .rev()
        .fold(last, |right, (left, op)| CardSelector::binary(left, op, right)))
}

/// Tree depth of the next operand: the group's own depth plus one per
/// operator already read in its chain.
fn nesting_level(depth: usize, chained: usize, expression: &str) -> Result<usize, ParseError> {
    let level = depth + chained;
    if level > MAX_NESTING_DEPTH {
        return Err(ParseError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
            expression: expression.to_string(),
        });
    }
    Ok(level)
}

fn parse_statement(body: &str, slugs: Option<&SlugIdMap>) -> Result<CardSelector, ParseError> {
    if !is_card_statement(body) {
        return Err(ParseError::InvalidStatement(body.to_string()));
    }
    let statement: CardStatement = body.parse()?;
    let statement = match slugs {
        Some(map) => statement.resolve(map).0,
        None => statement,
    };
    Ok(CardSelector::Statement(statement))
}

fn matching_close(expression: &str, open: usize) -> Result<usize, ParseError> {
    let mut stack: Vec<u8> = Vec::new();
    for (idx, byte) in expression.bytes().enumerate().skip(open) {
        if let Some(close) = closer_for(byte) {
            stack.push(close);
        } else if is_closer(byte) {
            if stack.last() != Some(&byte) {
                return Err(ParseError::BracketMismatch {
                    expression: expression.to_string(),
                    position: expression[..idx].chars().count(),
                    found: byte as char,
                    expected: stack
                        .last()
                        .map(|c| format!("'{}'", *c as char))
                        .unwrap_or_else(|| "no closing bracket".to_string()),
                });
            }
            stack.pop();
            if stack.is_empty() {
                return Ok(idx);
            }
        }
    }
    Err(ParseError::UnclosedBrackets {
        expression: expression.to_string(),
        unclosed: stack.iter().rev().map(|b| *b as char).collect(),
    })
}

/// What follows a closed group: nothing, or an operator and a non-empty rest.
fn split_operator<'a>(
    tail: &'a str,
    expression: &str,
    target: Target,
) -> Result<Option<(LogicOperator, &'a str)>, ParseError> {
    if tail.is_empty() {
        return Ok(None);
    }
    let operator = tail.get(..2).filter(|op| is_logic_operator(op));
    let Some(op) = operator.and_then(LogicOperator::from_symbol) else {
        return Err(ParseError::UnknownOperator {
            operator: tail.chars().take(2).collect(),
            expression: expression.to_string(),
        });
    };
    let rest = &tail[2..];
    if rest.is_empty() {
        return Err(ParseError::EndAfterOperator {
            target: target.name(),
            expression: expression.to_string(),
        });
    }
    Ok(Some((op, rest)))
}

/// Byte length of the leading logic expression of a function.
///
/// A brace body holding `~` is the whole clause. Otherwise the clause keeps
/// going after `}` through the modifiers and one bracketed selector group.
fn expression_span(expression: &str) -> Result<usize, ParseError> {
    let close = matching_close(expression, 0)?;
    if expression[1..close].contains(LOGIC_EXPRESSION_SEPARATOR) {
        return Ok(close + 1);
    }
    let after = close + 1;
    let open = expression[after..]
        .bytes()
        .position(|b| closer_for(b).is_some())
        .map(|offset| after + offset)
        .ok_or_else(|| illegal_start("", Target::Selector))?;
    Ok(matching_close(expression, open)? + 1)
}

fn split_quantifier(expression: &str) -> Result<(&str, &str), ParseError> {
    if expression.starts_with(LOGIC_EXPRESSION_OPEN) {
        let close = matching_close(expression, 0)?;
        let body = &expression[1..close];
        let after = &expression[close + 1..];
        if let Some((quantifier, rest)) = body.split_once(LOGIC_EXPRESSION_SEPARATOR) {
            if !after.is_empty() {
                return Err(ParseError::TrailingInput {
                    rest: after.to_string(),
                    expression: expression.to_string(),
                });
            }
            return Ok((quantifier, rest));
        }
        if after.is_empty() {
            return Err(ParseError::MissingSeparator(expression.to_string()));
        }
        return Ok((body, after));
    }
    expression
        .split_once(LOGIC_EXPRESSION_SEPARATOR)
        .ok_or_else(|| ParseError::MissingSeparator(expression.to_string()))
}

fn illegal_start(expression: &str, target: Target) -> ParseError {
    ParseError::IllegalCharacter {
        found: expression
            .chars()
            .next()
            .map(String::from)
            .unwrap_or_else(|| END_OF_STRING.to_string()),
        target: target.name(),
        expected: target.starts(),
        expression: expression.to_string(),
    }
}
