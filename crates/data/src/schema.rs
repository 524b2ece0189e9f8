use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use phdquest_core::{CardFacts, CardType, Connectivity, GameConfig, Stage};

/// Activity card as written in `activity-cards.json`.
///
/// Numbers stay signed so that validation can report bad values instead of
/// failing to deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawActivityCard {
    pub title: String,
    pub slug: String,
    pub stage: i64,
    pub frequency: i64,
    pub image: String,
    pub description: String,
    pub connectivity: Connectivity,
}

/// Event card as written in `event-cards.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawEventCard {
    pub title: String,
    pub slug: String,
    pub stage: i64,
    pub image: String,
    pub is_optional: bool,
    pub effect: String,
    pub else_condition: String,
    pub else_effect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardGroupGenerator {
    pub activity_card_filter: String,
    pub event_card_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawCardGroupEntry {
    Slug(String),
    Generator(CardGroupGenerator),
}

/// Group name (without `$`) to its members, from `card-groups.json`.
pub type RawCardGroups = BTreeMap<String, Vec<RawCardGroupEntry>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub activity_cards: Vec<RawActivityCard>,
    pub event_cards: Vec<RawEventCard>,
    pub card_groups: RawCardGroups,
}

fn stage_of(value: i64) -> Option<Stage> {
    u8::try_from(value).ok().and_then(Stage::from_number)
}

impl RawActivityCard {
    pub fn stage(&self) -> Option<Stage> {
        stage_of(self.stage)
    }

    /// Filter view of the card, `None` while the stage is out of range.
    pub fn facts(&self) -> Option<CardFacts<'_>> {
        Some(CardFacts {
            kind: CardType::Activity,
            slug: &self.slug,
            title: &self.title,
            stage: self.stage()?,
            frequency: u32::try_from(self.frequency).ok(),
            is_optional: None,
            connectivity: Some(self.connectivity),
        })
    }
}

impl RawEventCard {
    pub fn stage(&self) -> Option<Stage> {
        stage_of(self.stage)
    }

    pub fn facts(&self) -> Option<CardFacts<'_>> {
        Some(CardFacts {
            kind: CardType::Event,
            slug: &self.slug,
            title: &self.title,
            stage: self.stage()?,
            frequency: None,
            is_optional: Some(self.is_optional),
            connectivity: None,
        })
    }

    /// The three expression fields with their JSON names.
    pub fn expressions(&self) -> [(&'static str, &str); 3] {
        [
            ("effect", self.effect.as_str()),
            ("elseCondition", self.else_condition.as_str()),
            ("elseEffect", self.else_effect.as_str()),
        ]
    }
}
