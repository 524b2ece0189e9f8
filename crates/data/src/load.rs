use crate::schema::{RawActivityCard, RawCardGroupEntry, RawDataset, RawEventCard};
use anyhow::{anyhow, bail, Context};
use phdquest_core::{
    find_illegal_char, parse_effect, parse_logic_function, CardFacts, CardGroup, CardGroups,
    CardId, CardSlug, Catalog, Effect, Filter, GameActivityCard, GameConfig, GameEventCard,
    LogicFunction, SlugIdMap, SlugResolution, UNRESOLVED_CARD_ID,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const ACTIVITY_CARDS_FILE: &str = "activity-cards.json";
pub const EVENT_CARDS_FILE: &str = "event-cards.json";
pub const CARD_GROUPS_FILE: &str = "card-groups.json";
pub const CONFIG_FILE: &str = "config.json";

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}

pub fn load_raw_dataset(dir: &Path) -> anyhow::Result<RawDataset> {
    Ok(RawDataset {
        activity_cards: load_json(&dir.join(ACTIVITY_CARDS_FILE))?,
        event_cards: load_json(&dir.join(EVENT_CARDS_FILE))?,
        card_groups: load_json(&dir.join(CARD_GROUPS_FILE))?,
    })
}

/// `config.json` when present, defaults otherwise.
pub fn load_game_config(dir: &Path) -> anyhow::Result<GameConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        log::debug!("no {} in {}, using defaults", CONFIG_FILE, dir.display());
        return Ok(GameConfig::default());
    }
    load_json(&path)
}

pub fn load_catalog(dir: &Path, config: &GameConfig) -> anyhow::Result<Catalog> {
    let raw = load_raw_dataset(dir)?;
    build_catalog(&raw, config)
}

/// Activity cards take IDs `1..=n` in file order, event cards follow.
pub fn assign_slug_ids(raw: &RawDataset) -> anyhow::Result<SlugIdMap> {
    let activity = raw.activity_cards.iter().map(|card| card.slug.as_str());
    let event = raw.event_cards.iter().map(|card| card.slug.as_str());
    let mut slugs = SlugIdMap::new();
    for (idx, value) in activity.chain(event).enumerate() {
        let slug: CardSlug = value.parse()?;
        let id = idx as CardId + 1;
        if let Some(previous) = slugs.insert(slug, id) {
            bail!("duplicate card slug {value} (IDs {previous} and {id})");
        }
    }
    Ok(slugs)
}

/// Swaps slugs for IDs in place, applying the resolution policy to misses.
fn resolve_function(
    function: &mut LogicFunction,
    slugs: &SlugIdMap,
    policy: SlugResolution,
) -> anyhow::Result<()> {
    let mut unresolved = Vec::new();
    function.resolve_slugs(slugs, &mut unresolved);
    check_unresolved(&unresolved, policy)
}

fn check_unresolved(unresolved: &[CardSlug], policy: SlugResolution) -> anyhow::Result<()> {
    if unresolved.is_empty() {
        return Ok(());
    }
    let names = unresolved
        .iter()
        .map(CardSlug::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match policy {
        SlugResolution::Strict => bail!("unknown card slugs: {names}"),
        SlugResolution::Lenient => {
            log::warn!("unknown card slugs resolved to {UNRESOLVED_CARD_ID}: {names}");
            Ok(())
        }
    }
}

fn checked_effect(value: &str, slugs: &SlugIdMap, policy: SlugResolution) -> anyhow::Result<Vec<Effect>> {
    check_charset(value)?;
    let mut effects = parse_effect(value, None)?;
    for effect in &mut effects {
        resolve_function(&mut effect.condition, slugs, policy)?;
    }
    Ok(effects)
}

fn checked_condition(
    value: &str,
    slugs: &SlugIdMap,
    policy: SlugResolution,
) -> anyhow::Result<LogicFunction> {
    check_charset(value)?;
    let mut function = parse_logic_function(value, None)?;
    resolve_function(&mut function, slugs, policy)?;
    Ok(function)
}

fn check_charset(value: &str) -> anyhow::Result<()> {
    match find_illegal_char(value) {
        Some((position, ch)) => Err(anyhow!("illegal character '{ch}' at position {position}")),
        None => Ok(()),
    }
}

fn activity_card(raw: &RawActivityCard, id: CardId) -> anyhow::Result<GameActivityCard> {
    let stage = raw
        .stage()
        .ok_or_else(|| anyhow!("stage {} out of range 1..=4", raw.stage))?;
    let frequency = u32::try_from(raw.frequency)
        .map_err(|_| anyhow!("negative frequency {}", raw.frequency))?;
    Ok(GameActivityCard {
        id,
        slug: raw.slug.parse()?,
        title: raw.title.clone(),
        stage,
        frequency,
        image: raw.image.clone(),
        description: raw.description.clone(),
        connectivity: raw.connectivity,
    })
}

fn event_card(
    raw: &RawEventCard,
    id: CardId,
    slugs: &SlugIdMap,
    policy: SlugResolution,
) -> anyhow::Result<GameEventCard> {
    let stage = raw
        .stage()
        .ok_or_else(|| anyhow!("stage {} out of range 1..=4", raw.stage))?;
    Ok(GameEventCard {
        id,
        slug: raw.slug.parse()?,
        title: raw.title.clone(),
        stage,
        image: raw.image.clone(),
        is_optional: raw.is_optional,
        effect: checked_effect(&raw.effect, slugs, policy).context("field effect")?,
        else_condition: checked_condition(&raw.else_condition, slugs, policy)
            .context("field elseCondition")?,
        else_effect: checked_effect(&raw.else_effect, slugs, policy).context("field elseEffect")?,
    })
}

/// Runs a generator's two filters over every card and collects matching slugs.
pub fn generate_group_members<'a>(
    raw: &'a RawDataset,
    activity_filter: &str,
    event_filter: &str,
) -> anyhow::Result<Vec<&'a str>> {
    let activity_filter = Filter::parse(activity_filter)
        .with_context(|| format!("activity filter '{activity_filter}'"))?;
    let event_filter =
        Filter::parse(event_filter).with_context(|| format!("event filter '{event_filter}'"))?;
    let select = |facts: Option<CardFacts<'a>>, filter: &Filter| {
        facts.filter(|facts| filter.matches(facts)).map(|facts| facts.slug)
    };
    let activity = raw
        .activity_cards
        .iter()
        .filter_map(|card| select(card.facts(), &activity_filter));
    let event = raw
        .event_cards
        .iter()
        .filter_map(|card| select(card.facts(), &event_filter));
    Ok(activity.chain(event).collect())
}

/// Each key `K` of `card-groups.json` becomes group `$K`.
pub fn resolve_card_groups(
    raw: &RawDataset,
    slugs: &SlugIdMap,
    policy: SlugResolution,
) -> anyhow::Result<CardGroups> {
    let mut groups = CardGroups::new();
    for (name, entries) in &raw.card_groups {
        let group: CardGroup = format!("${name}")
            .parse()
            .with_context(|| format!("card group key '{name}'"))?;
        let mut members = BTreeSet::new();
        let mut unresolved = Vec::new();
        for entry in entries {
            let member_slugs = match entry {
                RawCardGroupEntry::Slug(slug) => vec![slug.as_str()],
                RawCardGroupEntry::Generator(generator) => {
                    let generated = generate_group_members(
                        raw,
                        &generator.activity_card_filter,
                        &generator.event_card_filter,
                    )
                    .with_context(|| format!("generator of {group}"))?;
                    if generated.is_empty() {
                        log::warn!("generator of {group} selects no cards");
                    }
                    generated
                }
            };
            for value in member_slugs {
                let slug: CardSlug = value
                    .parse()
                    .with_context(|| format!("member of {group}"))?;
                match slugs.get(&slug) {
                    Some(id) => {
                        members.insert(*id);
                    }
                    None => {
                        members.insert(UNRESOLVED_CARD_ID);
                        unresolved.push(slug);
                    }
                }
            }
        }
        check_unresolved(&unresolved, policy).with_context(|| format!("card group {group}"))?;
        log::debug!("card group {group}: {} cards", members.len());
        groups.insert(group, members);
    }
    Ok(groups)
}

pub fn build_catalog(raw: &RawDataset, config: &GameConfig) -> anyhow::Result<Catalog> {
    let policy = config.slug_resolution;
    let slugs = assign_slug_ids(raw)?;
    let event_offset = raw.activity_cards.len() as CardId + 1;

    let mut catalog = Catalog {
        slugs,
        event_offset,
        ..Catalog::default()
    };
    for (idx, raw_card) in raw.activity_cards.iter().enumerate() {
        let card = activity_card(raw_card, idx as CardId + 1)
            .with_context(|| format!("activity card {}", raw_card.slug))?;
        log::debug!("activity card {} -> {}", card.slug, card.id);
        catalog.activity_cards.insert(card.id, card);
    }
    for (idx, raw_card) in raw.event_cards.iter().enumerate() {
        let card = event_card(raw_card, idx as CardId + event_offset, &catalog.slugs, policy)
            .with_context(|| format!("event card {}", raw_card.slug))?;
        log::debug!("event card {} -> {}", card.slug, card.id);
        catalog.event_cards.insert(card.id, card);
    }
    catalog.groups = resolve_card_groups(raw, &catalog.slugs, policy)?;

    log::info!(
        "loaded {} activity cards, {} event cards, {} card groups",
        catalog.activity_cards.len(),
        catalog.event_cards.len(),
        catalog.groups.len()
    );
    Ok(catalog)
}
