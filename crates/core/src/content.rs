use crate::{
    CardGroup, CardId, CardSlug, GameActivityCard, GameEventCard, RngState,
    SelfReplenishingStack, SlugIdMap, Stage,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type CardGroups = HashMap<CardGroup, BTreeSet<CardId>>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub activity_cards: BTreeMap<CardId, GameActivityCard>,
    pub event_cards: BTreeMap<CardId, GameEventCard>,
    pub groups: CardGroups,
    pub slugs: SlugIdMap,
    /// ID of the first event card.
    pub event_offset: CardId,
}

impl Catalog {
    pub fn activity(&self, id: CardId) -> Option<&GameActivityCard> {
        self.activity_cards.get(&id)
    }

    pub fn event(&self, id: CardId) -> Option<&GameEventCard> {
        self.event_cards.get(&id)
    }

    pub fn id_of(&self, slug: &CardSlug) -> Option<CardId> {
        self.slugs.get(slug).copied()
    }

    pub fn group(&self, group: &CardGroup) -> Option<&BTreeSet<CardId>> {
        self.groups.get(group)
    }

    pub fn activity_pile(&self, stage: Stage) -> Vec<CardId> {
        self.activity_cards
            .values()
            .filter(|card| card.stage == stage)
            .flat_map(|card| std::iter::repeat(card.id).take(card.frequency as usize))
            .collect()
    }

    pub fn event_pile(&self, stage: Stage) -> Vec<CardId> {
        self.event_cards
            .values()
            .filter(|card| card.stage == stage)
            .map(|card| card.id)
            .collect()
    }

    pub fn activity_stack(&self, stage: Stage, rng: &mut RngState) -> SelfReplenishingStack<CardId> {
        let pile = self.activity_pile(stage);
        SelfReplenishingStack::new(move || pile.clone(), true, rng)
    }

    pub fn event_stack(&self, stage: Stage, rng: &mut RngState) -> SelfReplenishingStack<CardId> {
        let pile = self.event_pile(stage);
        SelfReplenishingStack::new(move || pile.clone(), true, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Connectivity;

    fn activity(id: CardId, slug: &str, frequency: u32) -> GameActivityCard {
        let slug: CardSlug = slug.parse().expect("slug");
        GameActivityCard {
            id,
            title: slug.name().to_string(),
            stage: slug.stage(),
            image: format!("{slug}.png"),
            slug,
            frequency,
            description: String::new(),
            connectivity: Connectivity::ALL,
        }
    }

    #[test]
    fn piles_follow_stage_and_frequency() {
        let mut catalog = Catalog::default();
        for card in [
            activity(1, "act-PLAN-a", 2),
            activity(2, "act-PLAN-b", 0),
            activity(3, "act-CONTEXT-c", 1),
        ] {
            catalog.activity_cards.insert(card.id, card);
        }
        assert_eq!(catalog.activity_pile(Stage::Plan), vec![1, 1]);
        assert_eq!(catalog.activity_pile(Stage::Context), vec![3]);
        assert!(catalog.activity_pile(Stage::WriteUp).is_empty());

        let mut rng = RngState::from_seed(3);
        let mut stack = catalog.activity_stack(Stage::Plan, &mut rng);
        assert_eq!(stack.pop(&mut rng), Ok(1));
    }
}
