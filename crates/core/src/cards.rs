use crate::classify::{is_card_group, is_card_slug};
use crate::{Effect, LogicFunction, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric card identifier. Activity cards start at 1, event cards follow.
pub type CardId = i64;

pub const NO_CARD: CardId = 0;

/// Slug that was not present in the slug map at parse time.
pub const UNRESOLVED_CARD_ID: CardId = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardType {
    Activity,
    Event,
}

impl CardType {
    pub fn from_keyword(value: &str) -> Option<Self> {
        match value {
            "act" => Some(Self::Activity),
            "event" => Some(Self::Event),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Activity => "act",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Research stage, also the board row a card belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    Plan,
    Context,
    Implementation,
    WriteUp,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Plan,
        Stage::Context,
        Stage::Implementation,
        Stage::WriteUp,
    ];

    pub fn from_keyword(value: &str) -> Option<Self> {
        match value {
            "PLAN" => Some(Self::Plan),
            "CONTEXT" => Some(Self::Context),
            "IMP" => Some(Self::Implementation),
            "WRITEUP" => Some(Self::WriteUp),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Plan => "PLAN",
            Self::Context => "CONTEXT",
            Self::Implementation => "IMP",
            Self::WriteUp => "WRITEUP",
        }
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Plan),
            2 => Some(Self::Context),
            3 => Some(Self::Implementation),
            4 => Some(Self::WriteUp),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Plan => 1,
            Self::Context => 2,
            Self::Implementation => 3,
            Self::WriteUp => 4,
        }
    }

    pub fn row(self) -> usize {
        usize::from(self.number() - 1)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or_else(|| format!("stage must be 1, 2, 3 or 4, got {value}"))
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.number()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Validated `<type>-<stage>-<name>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardSlug(String);

impl CardSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn card_type(&self) -> CardType {
        self.segment(0)
            .and_then(CardType::from_keyword)
            .unwrap_or(CardType::Activity)
    }

    pub fn stage(&self) -> Stage {
        self.segment(1)
            .and_then(Stage::from_keyword)
            .unwrap_or(Stage::Plan)
    }

    pub fn name(&self) -> &str {
        self.segment(2).unwrap_or_default()
    }

    fn segment(&self, index: usize) -> Option<&str> {
        self.0.split('-').nth(index)
    }
}

impl FromStr for CardSlug {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if is_card_slug(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ParseError::InvalidSlug(value.to_string()))
        }
    }
}

impl TryFrom<String> for CardSlug {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_card_slug(&value) {
            Ok(Self(value))
        } else {
            Err(ParseError::InvalidSlug(value))
        }
    }
}

impl From<CardSlug> for String {
    fn from(slug: CardSlug) -> Self {
        slug.0
    }
}

impl fmt::Display for CardSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named set of cards, written `$NAME` in expressions.
///
/// Stored without the `$` so that `$ALL` and a bare `ALL` refer to the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardGroup(String);

impl CardGroup {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl FromStr for CardGroup {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !is_card_group(value) {
            return Err(ParseError::InvalidGroup(value.to_string()));
        }
        Ok(Self(value.strip_prefix('$').unwrap_or(value).to_string()))
    }
}

impl TryFrom<String> for CardGroup {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardGroup> for String {
    fn from(group: CardGroup) -> Self {
        group.to_string()
    }
}

impl fmt::Display for CardGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connectivity {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Connectivity {
    pub const ALL: Connectivity = Connectivity {
        left: true,
        right: true,
        up: true,
        down: true,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameActivityCard {
    pub id: CardId,
    pub slug: CardSlug,
    pub title: String,
    pub stage: Stage,
    pub frequency: u32,
    pub image: String,
    pub description: String,
    pub connectivity: Connectivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEventCard {
    pub id: CardId,
    pub slug: CardSlug,
    pub title: String,
    pub stage: Stage,
    pub image: String,
    pub is_optional: bool,
    pub effect: Vec<Effect>,
    pub else_condition: LogicFunction,
    pub else_effect: Vec<Effect>,
}
