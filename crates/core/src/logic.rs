use crate::classify::{is_card_group, is_card_id_literal, is_card_slug};
use crate::{CardGroup, CardId, CardSlug, ParseError, UNRESOLVED_CARD_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

pub type SlugIdMap = HashMap<CardSlug, CardId>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogicOperator {
    And,
    Or,
}

impl LogicOperator {
    pub fn from_symbol(value: &str) -> Option<Self> {
        match value {
            "&&" => Some(Self::And),
            "||" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Count(NonZeroU32),
    /// `*`: every card the selector names.
    All,
}

impl Quantifier {
    pub fn from_keyword(value: &str) -> Option<Self> {
        if !crate::classify::is_quantifier(value) {
            return None;
        }
        if value == crate::classify::ALL_QUANTIFIER {
            return Some(Self::All);
        }
        value.parse().ok().map(Self::Count)
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::All => f.write_str(crate::classify::ALL_QUANTIFIER),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    NonAdjacent,
    UniqueSelect,
}

impl Modifier {
    pub fn from_symbol(value: char) -> Option<Self> {
        match value {
            '!' => Some(Self::NonAdjacent),
            '^' => Some(Self::UniqueSelect),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::NonAdjacent => '!',
            Self::UniqueSelect => '^',
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Instruction {
    Add,
    Remove,
    RemoveAll,
    Queue,
    Block,
    Save,
    Flip,
}

impl Instruction {
    pub fn from_keyword(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "removeall" => Some(Self::RemoveAll),
            "queue" => Some(Self::Queue),
            "block" => Some(Self::Block),
            "save" => Some(Self::Save),
            "flip" => Some(Self::Flip),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::RemoveAll => "removeall",
            Self::Queue => "queue",
            Self::Block => "block",
            Self::Save => "save",
            Self::Flip => "flip",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Leaf card reference inside `[...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CardStatement {
    Id(CardId),
    Slug(CardSlug),
    Group(CardGroup),
}

impl CardStatement {
    /// Replaces a slug with its ID. Unknown slugs become [`UNRESOLVED_CARD_ID`]
    /// and are returned so callers can report them.
    pub fn resolve(self, slugs: &SlugIdMap) -> (Self, Option<CardSlug>) {
        match self {
            Self::Slug(slug) => match slugs.get(&slug) {
                Some(id) => (Self::Id(*id), None),
                None => {
                    log::debug!("card slug {slug} has no ID");
                    (Self::Id(UNRESOLVED_CARD_ID), Some(slug))
                }
            },
            other => (other, None),
        }
    }
}

impl FromStr for CardStatement {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if is_card_id_literal(value) {
            let id = value
                .parse()
                .map_err(|_| ParseError::InvalidStatement(value.to_string()))?;
            return Ok(Self::Id(id));
        }
        if is_card_slug(value) {
            return value.parse().map(Self::Slug);
        }
        if is_card_group(value) {
            return value.parse().map(Self::Group);
        }
        Err(ParseError::InvalidStatement(value.to_string()))
    }
}

impl fmt::Display for CardStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => write!(f, "{slug}"),
            Self::Group(group) => write!(f, "{group}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CardSelector {
    Statement(CardStatement),
    Binary {
        left: Box<CardSelector>,
        op: LogicOperator,
        right: Box<CardSelector>,
    },
}

impl CardSelector {
    pub fn binary(left: CardSelector, op: LogicOperator, right: CardSelector) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn statements(&self) -> Vec<&CardStatement> {
        let mut out = Vec::new();
        self.collect_statements(&mut out);
        out
    }

    fn collect_statements<'a>(&'a self, out: &mut Vec<&'a CardStatement>) {
        match self {
            Self::Statement(statement) => out.push(statement),
            Self::Binary { left, right, .. } => {
                left.collect_statements(out);
                right.collect_statements(out);
            }
        }
    }

    pub fn resolve_slugs(&mut self, slugs: &SlugIdMap, unresolved: &mut Vec<CardSlug>) {
        match self {
            Self::Statement(statement) => {
                let (resolved, missing) = statement.clone().resolve(slugs);
                *statement = resolved;
                unresolved.extend(missing);
            }
            Self::Binary { left, right, .. } => {
                left.resolve_slugs(slugs, unresolved);
                right.resolve_slugs(slugs, unresolved);
            }
        }
    }
}

impl fmt::Display for CardSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement(statement) => write!(f, "[{statement}]"),
            Self::Binary { left, op, right } => {
                if matches!(**left, Self::Binary { .. }) {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, "{}{right}", op.symbol())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicExpression {
    Bool(bool),
    Clause {
        quantifier: Quantifier,
        modifiers: BTreeSet<Modifier>,
        selector: CardSelector,
    },
}

impl LogicExpression {
    pub fn clause(
        quantifier: Quantifier,
        modifiers: impl IntoIterator<Item = Modifier>,
        selector: CardSelector,
    ) -> Self {
        Self::Clause {
            quantifier,
            modifiers: modifiers.into_iter().collect(),
            selector,
        }
    }
}

impl fmt::Display for LogicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Clause {
                quantifier,
                modifiers,
                selector,
            } => {
                write!(f, "{{{quantifier}~")?;
                for modifier in modifiers {
                    write!(f, "{}", modifier.symbol())?;
                }
                write!(f, "{selector}}}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicFunction {
    Expression(LogicExpression),
    Binary {
        left: Box<LogicFunction>,
        op: LogicOperator,
        right: Box<LogicFunction>,
    },
}

impl LogicFunction {
    pub const TRUE: LogicFunction = LogicFunction::Expression(LogicExpression::Bool(true));
    pub const FALSE: LogicFunction = LogicFunction::Expression(LogicExpression::Bool(false));

    pub fn binary(left: LogicFunction, op: LogicOperator, right: LogicFunction) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Expression(LogicExpression::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn expressions(&self) -> Vec<&LogicExpression> {
        let mut out = Vec::new();
        self.collect_expressions(&mut out);
        out
    }

    fn collect_expressions<'a>(&'a self, out: &mut Vec<&'a LogicExpression>) {
        match self {
            Self::Expression(expression) => out.push(expression),
            Self::Binary { left, right, .. } => {
                left.collect_expressions(out);
                right.collect_expressions(out);
            }
        }
    }

    pub fn statements(&self) -> Vec<&CardStatement> {
        self.expressions()
            .into_iter()
            .flat_map(|expression| match expression {
                LogicExpression::Clause { selector, .. } => selector.statements(),
                LogicExpression::Bool(_) => Vec::new(),
            })
            .collect()
    }

    pub fn resolve_slugs(&mut self, slugs: &SlugIdMap, unresolved: &mut Vec<CardSlug>) {
        match self {
            Self::Expression(LogicExpression::Clause { selector, .. }) => {
                selector.resolve_slugs(slugs, unresolved)
            }
            Self::Expression(LogicExpression::Bool(_)) => {}
            Self::Binary { left, right, .. } => {
                left.resolve_slugs(slugs, unresolved);
                right.resolve_slugs(slugs, unresolved);
            }
        }
    }

    fn needs_group(&self) -> bool {
        matches!(
            self,
            Self::Binary { .. } | Self::Expression(LogicExpression::Bool(_))
        )
    }
}

impl From<LogicExpression> for LogicFunction {
    fn from(expression: LogicExpression) -> Self {
        Self::Expression(expression)
    }
}

impl fmt::Display for LogicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(expression) => write!(f, "{expression}"),
            Self::Binary { left, op, right } => {
                // Booleans only parse as a whole function, so they need a group
                // when nested; a binary left side needs one to keep its shape.
                if left.needs_group() {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                f.write_str(op.symbol())?;
                if right.as_bool().is_some() {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Effect {
    pub instruction: Instruction,
    pub condition: LogicFunction,
}

impl Effect {
    pub fn new(instruction: Instruction, condition: LogicFunction) -> Self {
        Self {
            instruction,
            condition,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instruction, self.condition)
    }
}

/// Effect string in canonical form; `-` for no effects.
pub fn format_effects(effects: &[Effect]) -> String {
    if effects.is_empty() {
        return "-".to_string();
    }
    effects
        .iter()
        .map(|effect| effect.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
