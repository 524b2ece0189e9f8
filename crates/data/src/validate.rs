//! Content checks for a raw dataset, collected into a report instead of
//! failing on the first problem.

use crate::load::generate_group_members;
use crate::schema::{RawActivityCard, RawCardGroupEntry, RawDataset, RawEventCard};
use phdquest_core::{
    count_non_ascii, find_illegal_char, is_card_group, is_card_slug, is_card_statement,
    parse_effect, parse_logic_function, verify_bracket_closure, CardGroup, CardSlug,
    CardStatement, Stage,
};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Slug of the card, or `$NAME` for a card group.
    pub card: String,
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.card, self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn for_card<'a>(&'a self, card: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues.iter().filter(move |issue| issue.card == card)
    }

    fn push(&mut self, card: &str, field: &'static str, message: impl Into<String>) {
        self.issues.push(Issue {
            card: card.to_string(),
            field,
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Names a card expression may refer to.
struct Known<'a> {
    slugs: HashSet<&'a str>,
    groups: HashSet<&'a str>,
}

pub fn validate_dataset(raw: &RawDataset) -> ValidationReport {
    let mut report = ValidationReport::default();
    let known = Known {
        slugs: raw
            .activity_cards
            .iter()
            .map(|card| card.slug.as_str())
            .chain(raw.event_cards.iter().map(|card| card.slug.as_str()))
            .collect(),
        groups: raw.card_groups.keys().map(String::as_str).collect(),
    };

    let mut slug_counts: HashMap<&str, usize> = HashMap::new();
    let mut image_counts: HashMap<&str, usize> = HashMap::new();
    let common = raw
        .activity_cards
        .iter()
        .map(|card| (card.slug.as_str(), card.title.as_str(), card.stage, card.image.as_str()))
        .chain(
            raw.event_cards
                .iter()
                .map(|card| (card.slug.as_str(), card.title.as_str(), card.stage, card.image.as_str())),
        );
    for (slug, title, stage, image) in common {
        *slug_counts.entry(slug).or_default() += 1;
        *image_counts.entry(image).or_default() += 1;
        check_common(&mut report, slug, title, stage, image);
    }
    for (slug, count) in slug_counts.into_iter().filter(|(_, count)| *count > 1) {
        report.push(slug, "slug", format!("used by {count} cards"));
    }
    for (image, count) in image_counts.into_iter().filter(|(_, count)| *count > 1) {
        report.push(image, "image", format!("used by {count} cards"));
    }

    for card in &raw.activity_cards {
        check_activity(&mut report, card);
    }
    for card in &raw.event_cards {
        check_event(&mut report, card, &known);
    }
    check_groups(&mut report, raw, &known);

    report.issues.sort_by(|a, b| a.card.cmp(&b.card).then(a.field.cmp(b.field)));
    report
}

fn check_ascii(report: &mut ValidationReport, card: &str, field: &'static str, value: &str) {
    let non_ascii = count_non_ascii(value);
    if non_ascii > 0 {
        report.push(card, field, format!("{non_ascii} non-ascii characters"));
    }
}

fn check_common(report: &mut ValidationReport, slug: &str, title: &str, stage: i64, image: &str) {
    check_ascii(report, slug, "title", title);
    check_ascii(report, slug, "slug", slug);
    check_ascii(report, slug, "image", image);

    if let Some(ch) = slug.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-') {
        report.push(slug, "slug", format!("illegal character '{ch}'"));
    }
    let parsed = slug.parse::<CardSlug>().ok();
    if parsed.is_none() {
        report.push(slug, "slug", "does not follow <type>-<stage>-<name>");
    }

    match u8::try_from(stage).ok().and_then(Stage::from_number) {
        None => report.push(slug, "stage", format!("{stage} is not 1, 2, 3 or 4")),
        Some(stage) => {
            if let Some(parsed) = &parsed {
                if parsed.stage() != stage {
                    report.push(
                        slug,
                        "stage",
                        format!("{} does not match slug stage {}", stage.number(), parsed.stage()),
                    );
                }
            }
        }
    }

    if let Some(ch) = image
        .chars()
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-' && *ch != '.')
    {
        report.push(slug, "image", format!("illegal character '{ch}'"));
    }
    if !image.starts_with(slug) {
        report.push(slug, "image", "does not start with the card slug");
    }
    match image.rsplit_once('.') {
        Some((_, ext)) if IMAGE_EXTENSIONS.contains(&ext) => {}
        _ => report.push(
            slug,
            "image",
            format!("extension must be one of {}", IMAGE_EXTENSIONS.join(", ")),
        ),
    }
}

fn check_activity(report: &mut ValidationReport, card: &RawActivityCard) {
    let slug = card.slug.as_str();
    check_ascii(report, slug, "description", &card.description);
    if card.frequency < 0 {
        report.push(slug, "frequency", format!("{} is negative", card.frequency));
    }
    match card.stage() {
        Some(Stage::WriteUp) if card.connectivity.up => {
            report.push(slug, "connectivity", "last stage cards must not connect up");
        }
        Some(Stage::Plan) if card.connectivity.down => {
            report.push(slug, "connectivity", "first stage cards must not connect down");
        }
        _ => {}
    }
}

fn check_event(report: &mut ValidationReport, card: &RawEventCard, known: &Known<'_>) {
    let slug = card.slug.as_str();
    for (field, value) in card.expressions() {
        check_ascii(report, slug, field, value);
        if let Some((position, ch)) = find_illegal_char(value) {
            report.push(slug, field, format!("illegal character '{ch}' at position {position}"));
            continue;
        }
        if field == "elseCondition" {
            if value.contains(' ') {
                report.push(slug, field, "must not contain spaces");
                continue;
            }
            if value.len() < 6 && value != "true" && value != "false" {
                report.push(slug, field, "short conditions must be true or false");
                continue;
            }
        }
        if let Err(err) = verify_bracket_closure(value) {
            report.push(slug, field, err.to_string());
            continue;
        }
        let parsed = if field == "elseCondition" {
            parse_logic_function(value, None).map(|_| ())
        } else {
            parse_effect(value, None).map(|_| ())
        };
        if let Err(err) = parsed {
            report.push(slug, field, err.to_string());
            continue;
        }
        for message in missing_references(value, known) {
            report.push(slug, field, message);
        }
    }
}

/// Every `[statement]` must be an ID, a known slug or a known group.
fn missing_references(expression: &str, known: &Known<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = expression;
    while let Some(open) = rest.find('[') {
        let Some(len) = rest[open + 1..].find(']') else {
            break;
        };
        let body = &rest[open + 1..open + 1 + len];
        rest = &rest[open + 1 + len..];
        if !is_card_statement(body) {
            out.push(format!("invalid card statement '{body}'"));
        } else if is_card_slug(body) {
            if !known.slugs.contains(body) {
                out.push(format!("could not find card slug '{body}'"));
            }
        } else if is_card_group(body) {
            let name = body.strip_prefix('$').unwrap_or(body);
            if !known.groups.contains(name) {
                out.push(format!("could not find card group '{body}'"));
            }
        }
    }
    out
}

fn check_groups(report: &mut ValidationReport, raw: &RawDataset, known: &Known<'_>) {
    for (name, entries) in &raw.card_groups {
        let label = format!("${name}");
        if label.parse::<CardGroup>().is_err() {
            report.push(&label, "name", "not a valid card group name");
        }
        for entry in entries {
            match entry {
                RawCardGroupEntry::Slug(slug) => {
                    if !known.slugs.contains(slug.as_str()) {
                        report.push(&label, "members", format!("could not find card slug '{slug}'"));
                    }
                }
                RawCardGroupEntry::Generator(generator) => {
                    match generate_group_members(
                        raw,
                        &generator.activity_card_filter,
                        &generator.event_card_filter,
                    ) {
                        Ok(members) if members.is_empty() => {
                            report.push(&label, "generator", "selects no cards");
                        }
                        Ok(_) => {}
                        Err(err) => report.push(&label, "generator", format!("{err:#}")),
                    }
                }
            }
        }
    }
}

/// Statements of an already parsed expression that name neither a known slug
/// nor a known group.
pub fn unknown_statements<'a>(
    statements: impl IntoIterator<Item = &'a CardStatement>,
    raw: &RawDataset,
) -> Vec<&'a CardStatement> {
    statements
        .into_iter()
        .filter(|statement| match statement {
            CardStatement::Id(_) => false,
            CardStatement::Slug(slug) => !raw
                .activity_cards
                .iter()
                .map(|card| card.slug.as_str())
                .chain(raw.event_cards.iter().map(|card| card.slug.as_str()))
                .any(|known| known == slug.as_str()),
            CardStatement::Group(group) => !raw.card_groups.contains_key(group.name()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CardGroupGenerator;
    use phdquest_core::Connectivity;

    fn activity(slug: &str, stage: i64) -> RawActivityCard {
        RawActivityCard {
            title: "Survey".to_string(),
            slug: slug.to_string(),
            stage,
            frequency: 1,
            image: format!("{slug}.png"),
            description: "Ask around.".to_string(),
            connectivity: Connectivity {
                left: true,
                right: true,
                up: true,
                down: false,
            },
        }
    }

    fn event(slug: &str, effect: &str) -> RawEventCard {
        RawEventCard {
            title: "Deadline".to_string(),
            slug: slug.to_string(),
            stage: 1,
            image: format!("{slug}.png"),
            is_optional: false,
            effect: effect.to_string(),
            else_condition: "false".to_string(),
            else_effect: "-".to_string(),
        }
    }

    fn fields(report: &ValidationReport, card: &str) -> Vec<&'static str> {
        report.for_card(card).map(|issue| issue.field).collect()
    }

    #[test]
    fn clean_dataset_has_no_issues() {
        let mut raw = RawDataset {
            activity_cards: vec![activity("act-PLAN-survey", 1)],
            event_cards: vec![event("event-PLAN-deadline", "add {1~[act-PLAN-survey]}||{1~[$ALL]}")],
            ..RawDataset::default()
        };
        raw.card_groups.insert(
            "ALL".to_string(),
            vec![RawCardGroupEntry::Generator(CardGroupGenerator {
                activity_card_filter: "true".to_string(),
                event_card_filter: "true".to_string(),
            })],
        );
        let report = validate_dataset(&raw);
        assert!(report.is_ok(), "{report}");
    }

    #[test]
    fn common_properties() {
        let mut card = activity("act-PLAN-survey", 2);
        card.title = "Umfrage\u{e4}".to_string();
        card.image = "survey.bmp".to_string();
        let raw = RawDataset {
            activity_cards: vec![card, activity("act-PLAN-survey", 1), activity("act-FOO-x", 7)],
            ..RawDataset::default()
        };
        let report = validate_dataset(&raw);
        let survey = fields(&report, "act-PLAN-survey");
        assert!(survey.contains(&"title"));
        assert!(survey.contains(&"stage"));
        assert!(survey.contains(&"image"));
        assert!(survey.contains(&"slug"), "duplicate slug: {report}");
        let bad = fields(&report, "act-FOO-x");
        assert!(bad.contains(&"slug"));
        assert!(bad.contains(&"stage"));
    }

    #[test]
    fn connectivity_edges() {
        let mut last = activity("act-WRITEUP-paper", 4);
        last.connectivity.up = true;
        let mut first = activity("act-PLAN-idea", 1);
        first.connectivity.down = true;
        let mut negative = activity("act-IMP-code", 3);
        negative.frequency = -2;
        let raw = RawDataset {
            activity_cards: vec![last, first, negative],
            ..RawDataset::default()
        };
        let report = validate_dataset(&raw);
        assert_eq!(fields(&report, "act-WRITEUP-paper"), vec!["connectivity"]);
        assert_eq!(fields(&report, "act-PLAN-idea"), vec!["connectivity"]);
        assert_eq!(fields(&report, "act-IMP-code"), vec!["frequency"]);
    }

    #[test]
    fn event_expressions() {
        let mut short = event("event-PLAN-b", "-");
        short.else_condition = "tru".to_string();
        let raw = RawDataset {
            activity_cards: vec![activity("act-PLAN-survey", 1)],
            event_cards: vec![
                event("event-PLAN-a", "add {1~[act-PLAN-survey]"),
                short,
                event("event-PLAN-c", "add {1~[act-PLAN-missing]}&&{1~[$NONE]}"),
                event("event-PLAN-d", "add {1~[act-PLAN-survey]};"),
                event("event-PLAN-e", "jump true"),
            ],
            ..RawDataset::default()
        };
        let report = validate_dataset(&raw);
        let unclosed: Vec<_> = report.for_card("event-PLAN-a").collect();
        assert_eq!(unclosed.len(), 1);
        assert!(unclosed[0].message.contains("bracket mismatch"));
        assert_eq!(fields(&report, "event-PLAN-b"), vec!["elseCondition"]);
        let missing: Vec<_> = report.for_card("event-PLAN-c").map(|i| i.message.as_str()).collect();
        assert_eq!(
            missing,
            vec![
                "could not find card slug 'act-PLAN-missing'",
                "could not find card group '$NONE'",
            ]
        );
        assert!(report.for_card("event-PLAN-d").any(|i| i.message.contains("illegal character ';'")));
        assert!(report.for_card("event-PLAN-e").any(|i| i.message.contains("unknown instruction")));
    }

    #[test]
    fn groups() {
        let mut raw = RawDataset {
            activity_cards: vec![activity("act-PLAN-survey", 1)],
            ..RawDataset::default()
        };
        raw.card_groups.insert(
            "EMPTY".to_string(),
            vec![
                RawCardGroupEntry::Slug("act-PLAN-gone".to_string()),
                RawCardGroupEntry::Generator(CardGroupGenerator {
                    activity_card_filter: "card.stage == 4".to_string(),
                    event_card_filter: "".to_string(),
                }),
                RawCardGroupEntry::Generator(CardGroupGenerator {
                    activity_card_filter: "card.colour == 'red'".to_string(),
                    event_card_filter: "false".to_string(),
                }),
            ],
        );
        let report = validate_dataset(&raw);
        let issues: Vec<_> = report.for_card("$EMPTY").collect();
        assert_eq!(issues.len(), 3, "{report}");
        assert!(issues.iter().any(|i| i.message.contains("act-PLAN-gone")));
        assert!(issues.iter().any(|i| i.message == "selects no cards"));
        assert!(issues.iter().any(|i| i.message.contains("unknown card field 'card.colour'")));
    }

    #[test]
    fn unknown_statements_after_parse() {
        let raw = RawDataset {
            activity_cards: vec![activity("act-PLAN-survey", 1)],
            ..RawDataset::default()
        };
        let function =
            parse_logic_function("{1~[act-PLAN-survey]||[act-PLAN-x]||[$G]||[4]}", None).expect("parse");
        let unknown = unknown_statements(function.statements(), &raw);
        assert_eq!(unknown.len(), 2);
    }
}
