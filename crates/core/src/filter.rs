//! Declarative filters that generate card groups from card fields.
//!
//! Filters are parsed once into a [`Filter`] tree and interpreted against
//! [`CardFacts`]. Only the fields in [`CardField`] can be referenced.

use crate::{CardType, Connectivity, Stage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown card field '{0}'")]
    UnknownField(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unterminated string in filter")]
    UnterminatedString,
    #[error("unexpected character '{0}' in filter")]
    UnexpectedChar(char),
    #[error("unexpected token in filter: {0}")]
    UnexpectedToken(String),
    #[error("expected ')', found {0}")]
    ExpectedRParen(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Stage,
    Frequency,
    Slug,
    Title,
    Type,
    IsOptional,
    ConnectLeft,
    ConnectRight,
    ConnectUp,
    ConnectDown,
}

impl CardField {
    pub fn from_path(value: &str) -> Option<Self> {
        let path = value.strip_prefix("card.").unwrap_or(value);
        match path {
            "stage" => Some(Self::Stage),
            "frequency" => Some(Self::Frequency),
            "slug" => Some(Self::Slug),
            "title" => Some(Self::Title),
            "type" => Some(Self::Type),
            "isOptional" => Some(Self::IsOptional),
            "connectivity.left" => Some(Self::ConnectLeft),
            "connectivity.right" => Some(Self::ConnectRight),
            "connectivity.up" => Some(Self::ConnectUp),
            "connectivity.down" => Some(Self::ConnectDown),
            _ => None,
        }
    }
}

/// What a filter can see of one card.
#[derive(Debug, Clone, Copy)]
pub struct CardFacts<'a> {
    pub kind: CardType,
    pub slug: &'a str,
    pub title: &'a str,
    pub stage: Stage,
    pub frequency: Option<u32>,
    pub is_optional: Option<bool>,
    pub connectivity: Option<Connectivity>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0,
            Self::Str(value) => !value.is_empty(),
        }
    }
}

impl CardFacts<'_> {
    pub fn field(&self, field: CardField) -> Value {
        let connect = |pick: fn(&Connectivity) -> bool| {
            self.connectivity
                .as_ref()
                .map(|c| Value::Bool(pick(c)))
                .unwrap_or(Value::Null)
        };
        match field {
            CardField::Stage => Value::Number(f64::from(self.stage.number())),
            CardField::Frequency => self
                .frequency
                .map(|f| Value::Number(f64::from(f)))
                .unwrap_or(Value::Null),
            CardField::Slug => Value::Str(self.slug.to_string()),
            CardField::Title => Value::Str(self.title.to_string()),
            CardField::Type => Value::Str(self.kind.keyword().to_string()),
            CardField::IsOptional => self.is_optional.map(Value::Bool).unwrap_or(Value::Null),
            CardField::ConnectLeft => connect(|c| c.left),
            CardField::ConnectRight => connect(|c| c.right),
            CardField::ConnectUp => connect(|c| c.up),
            CardField::ConnectDown => connect(|c| c.down),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Literal(Value),
    Field(CardField),
    Not(Box<Filter>),
    Binary {
        left: Box<Filter>,
        op: FilterOp,
        right: Box<Filter>,
    },
}

impl Filter {
    /// An empty source matches nothing.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        if input.trim().is_empty() {
            return Ok(Self::Literal(Value::Bool(false)));
        }
        let mut parser = FilterParser::new(input)?;
        let filter = parser.parse_or()?;
        match parser.peek_token() {
            None => Ok(filter),
            Some(token) => Err(FilterError::UnexpectedToken(format!("{token:?}"))),
        }
    }

    pub fn matches(&self, card: &CardFacts<'_>) -> bool {
        self.eval(card).truthy()
    }

    pub fn eval(&self, card: &CardFacts<'_>) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Field(field) => card.field(*field),
            Self::Not(inner) => Value::Bool(!inner.eval(card).truthy()),
            Self::Binary { left, op, right } => match op {
                FilterOp::Or => Value::Bool(left.eval(card).truthy() || right.eval(card).truthy()),
                FilterOp::And => Value::Bool(left.eval(card).truthy() && right.eval(card).truthy()),
                _ => Value::Bool(compare(&left.eval(card), *op, &right.eval(card))),
            },
        }
    }
}

fn compare(left: &Value, op: FilterOp, right: &Value) -> bool {
    use std::cmp::Ordering;
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    };
    match op {
        FilterOp::Eq => ordering == Some(Ordering::Equal),
        FilterOp::Ne => ordering != Some(Ordering::Equal),
        FilterOp::Lt => ordering == Some(Ordering::Less),
        FilterOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => ordering == Some(Ordering::Greater),
        FilterOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Or | FilterOp::And => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

struct FilterParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl FilterParser {
    fn new(input: &str) -> Result<Self, FilterError> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn parse_or(&mut self) -> Result<Filter, FilterError> {
        let mut node = self.parse_and()?;
        while self.match_op("||") {
            let right = self.parse_and()?;
            node = binary(node, FilterOp::Or, right);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Filter, FilterError> {
        let mut node = self.parse_unary()?;
        while self.match_op("&&") {
            let right = self.parse_unary()?;
            node = binary(node, FilterOp::And, right);
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Filter, FilterError> {
        if self.match_op("!") {
            let inner = self.parse_unary()?;
            return Ok(Filter::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Filter, FilterError> {
        let left = self.parse_primary()?;
        let op = [
            ("==", FilterOp::Eq),
            ("!=", FilterOp::Ne),
            ("<=", FilterOp::Le),
            (">=", FilterOp::Ge),
            ("<", FilterOp::Lt),
            (">", FilterOp::Gt),
        ]
        .into_iter()
        .find(|(symbol, _)| self.match_op(symbol))
        .map(|(_, op)| op);
        match op {
            Some(op) => {
                let right = self.parse_primary()?;
                Ok(binary(left, op, right))
            }
            None => Ok(left),
        }
    }

    fn parse_primary(&mut self) -> Result<Filter, FilterError> {
        match self.next_token() {
            Some(Token::Number(value)) => Ok(Filter::Literal(Value::Number(value))),
            Some(Token::Str(value)) => Ok(Filter::Literal(Value::Str(value))),
            Some(Token::Ident(value)) => match value.as_str() {
                "true" => Ok(Filter::Literal(Value::Bool(true))),
                "false" => Ok(Filter::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Filter::Literal(Value::Null)),
                _ => CardField::from_path(&value)
                    .map(Filter::Field)
                    .ok_or(FilterError::UnknownField(value)),
            },
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next_token() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(FilterError::ExpectedRParen(format!("{other:?}"))),
                }
            }
            other => Err(FilterError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn match_op(&mut self, op: &str) -> bool {
        if let Some(Token::Op(value)) = self.peek_token() {
            if *value == op {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn binary(left: Filter, op: FilterOp, right: Filter) -> Filter {
    Filter::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if ch == '"' || ch == '\'' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(next) if next == ch => break,
                    Some(next) => value.push(next),
                    None => return Err(FilterError::UnterminatedString),
                }
            }
            tokens.push(Token::Str(value));
            continue;
        }
        if ch.is_ascii_digit() {
            let mut value = String::new();
            while let Some(next) = chars.peek().copied() {
                if !next.is_ascii_digit() && next != '.' {
                    break;
                }
                value.push(next);
                chars.next();
            }
            let number = value
                .parse()
                .map_err(|_| FilterError::InvalidNumber(value.clone()))?;
            tokens.push(Token::Number(number));
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(next) = chars.peek().copied() {
                if !next.is_ascii_alphanumeric() && next != '_' && next != '.' {
                    break;
                }
                ident.push(next);
                chars.next();
            }
            tokens.push(Token::Ident(ident));
            continue;
        }

        let rest: String = chars.clone().take(3).collect();
        // `===`/`!==` from older data files behave as `==`/`!=`.
        let op = ["===", "!==", "&&", "||", "==", "!=", "<=", ">=", "<", ">", "!"]
            .into_iter()
            .find(|op| rest.starts_with(op));
        match (op, ch) {
            (Some(op), _) => {
                for _ in 0..op.len() {
                    chars.next();
                }
                tokens.push(Token::Op(match op {
                    "===" => "==",
                    "!==" => "!=",
                    other => other,
                }));
            }
            (None, '(') => {
                chars.next();
                tokens.push(Token::LParen);
            }
            (None, ')') => {
                chars.next();
                tokens.push(Token::RParen);
            }
            (None, other) => return Err(FilterError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(stage: Stage, frequency: u32) -> CardFacts<'static> {
        CardFacts {
            kind: CardType::Activity,
            slug: "act-PLAN-sample",
            title: "Sample",
            stage,
            frequency: Some(frequency),
            is_optional: None,
            connectivity: Some(Connectivity {
                left: true,
                right: false,
                up: true,
                down: false,
            }),
        }
    }

    fn event(stage: Stage, optional: bool) -> CardFacts<'static> {
        CardFacts {
            kind: CardType::Event,
            slug: "event-IMP-crash",
            title: "Crash",
            stage,
            frequency: None,
            is_optional: Some(optional),
            connectivity: None,
        }
    }

    #[test]
    fn stage_filter() {
        let filter = Filter::parse("card.stage == 1").expect("parse");
        assert!(filter.matches(&activity(Stage::Plan, 2)));
        assert!(!filter.matches(&activity(Stage::Context, 2)));
    }

    #[test]
    fn strict_equality_aliases() {
        let filter = Filter::parse("card.stage === 3 && card.isOptional !== true").expect("parse");
        assert!(filter.matches(&event(Stage::Implementation, false)));
        assert!(!filter.matches(&event(Stage::Implementation, true)));
    }

    #[test]
    fn connectivity_and_grouping() {
        let filter = Filter::parse("!(card.connectivity.right || card.frequency < 2) && stage >= 1")
            .expect("parse");
        assert!(filter.matches(&activity(Stage::Plan, 3)));
        assert!(!filter.matches(&activity(Stage::Plan, 1)));
    }

    #[test]
    fn missing_fields_compare_false() {
        let filter = Filter::parse("card.frequency > 0").expect("parse");
        assert!(!filter.matches(&event(Stage::Plan, true)));
        let filter = Filter::parse("card.frequency != 0").expect("parse");
        assert!(filter.matches(&event(Stage::Plan, true)));
    }

    #[test]
    fn strings_and_types() {
        let filter = Filter::parse("card.type == 'event' && card.title == \"Crash\"").expect("parse");
        assert!(filter.matches(&event(Stage::Plan, true)));
        assert!(!filter.matches(&activity(Stage::Plan, 1)));
    }

    #[test]
    fn empty_and_false_match_nothing() {
        assert!(!Filter::parse("").expect("parse").matches(&activity(Stage::Plan, 1)));
        assert!(!Filter::parse("false").expect("parse").matches(&activity(Stage::Plan, 1)));
    }

    #[test]
    fn rejects_unknown_fields_and_code() {
        assert_eq!(
            Filter::parse("card.image == 'x'"),
            Err(FilterError::UnknownField("card.image".to_string()))
        );
        assert!(matches!(
            Filter::parse("card.stage == 1; alert(1)"),
            Err(FilterError::UnexpectedChar(';'))
        ));
        assert!(Filter::parse("card.stage == 1 card.stage").is_err());
        assert_eq!(Filter::parse("'open"), Err(FilterError::UnterminatedString));
    }
}
