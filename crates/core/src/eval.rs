//! Evaluating logic functions against one team's board.
//!
//! Only the read side lives here: deciding whether a condition holds and
//! which cards an effect names. Applying add/remove/queue/block/save/flip
//! to a board is up to the caller.

use crate::{
    BidirectionalArray, CardGroup, CardGroups, CardId, CardSelector, CardStatement, Effect,
    GameEventCard, Instruction, LogicExpression, LogicFunction, LogicOperator, Modifier,
    Quantifier, Stage, NO_CARD,
};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown card group {0}")]
    UnknownGroup(CardGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub row: usize,
    pub column: isize,
    pub card: CardId,
}

impl Placement {
    pub fn is_adjacent(&self, other: &Placement) -> bool {
        let same_row = self.row == other.row && self.column.abs_diff(other.column) == 1;
        let same_column = self.column == other.column && self.row.abs_diff(other.row) == 1;
        same_row || same_column
    }
}

pub trait BoardView {
    fn placements(&self) -> Vec<Placement>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamBoard {
    rows: Vec<BidirectionalArray<CardId>>,
}

impl Default for TeamBoard {
    fn default() -> Self {
        Self {
            rows: Stage::ALL.iter().map(|_| BidirectionalArray::new()).collect(),
        }
    }
}

impl TeamBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, stage: Stage) -> &BidirectionalArray<CardId> {
        &self.rows[stage.row()]
    }

    /// Puts `card` at `column`, growing the row by one slot at either end if
    /// needed. Returns false when `column` is not reachable.
    pub fn place(&mut self, stage: Stage, column: isize, card: CardId) -> bool {
        self.rows[stage.row()].set(column, card).is_ok()
    }

    pub fn card_at(&self, stage: Stage, column: isize) -> CardId {
        self.row(stage).get(column).copied().unwrap_or(NO_CARD)
    }
}

impl BoardView for TeamBoard {
    fn placements(&self) -> Vec<Placement> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, cards)| {
                cards.iter().filter(|(_, card)| **card != NO_CARD).map(move |(column, card)| {
                    Placement {
                        row,
                        column,
                        card: *card,
                    }
                })
            })
            .collect()
    }
}

pub fn evaluate(
    function: &LogicFunction,
    board: &dyn BoardView,
    groups: &CardGroups,
) -> Result<bool, EvalError> {
    let placements = board.placements();
    evaluate_with(function, &placements, groups)
}

fn evaluate_with(
    function: &LogicFunction,
    placements: &[Placement],
    groups: &CardGroups,
) -> Result<bool, EvalError> {
    match function {
        LogicFunction::Expression(expression) => evaluate_expression(expression, placements, groups),
        LogicFunction::Binary { left, op, right } => {
            let left = evaluate_with(left, placements, groups)?;
            match (op, left) {
                (LogicOperator::And, false) => Ok(false),
                (LogicOperator::Or, true) => Ok(true),
                _ => evaluate_with(right, placements, groups),
            }
        }
    }
}

fn evaluate_expression(
    expression: &LogicExpression,
    placements: &[Placement],
    groups: &CardGroups,
) -> Result<bool, EvalError> {
    let LogicExpression::Clause {
        quantifier,
        modifiers,
        selector,
    } = expression
    else {
        return Ok(matches!(expression, LogicExpression::Bool(true)));
    };

    let mut matched = Vec::new();
    for placement in placements {
        if selector_matches(selector, placement.card, groups)? {
            matched.push(*placement);
        }
    }
    if modifiers.contains(&Modifier::NonAdjacent) {
        matched = non_adjacent_subset(matched);
    }
    if modifiers.contains(&Modifier::UniqueSelect) {
        let mut seen = HashSet::new();
        matched.retain(|placement| seen.insert(placement.card));
    }

    match quantifier {
        Quantifier::Count(n) => Ok(matched.len() >= n.get() as usize),
        Quantifier::All => {
            let wanted = selector_cards(selector, groups)?;
            let present: HashSet<CardId> = matched.iter().map(|p| p.card).collect();
            Ok(!wanted.is_empty() && wanted.iter().all(|card| present.contains(card)))
        }
    }
}

/// Greedy pick in board order: a placement is kept unless it touches one
/// already kept.
fn non_adjacent_subset(mut placements: Vec<Placement>) -> Vec<Placement> {
    placements.sort_by_key(|p| (p.row, p.column));
    let mut kept: Vec<Placement> = Vec::new();
    for placement in placements {
        if !kept.iter().any(|other| other.is_adjacent(&placement)) {
            kept.push(placement);
        }
    }
    kept
}

/// Whether `card` is named by the selector. Slugs never match an ID.
pub fn selector_matches(
    selector: &CardSelector,
    card: CardId,
    groups: &CardGroups,
) -> Result<bool, EvalError> {
    match selector {
        CardSelector::Statement(CardStatement::Id(id)) => Ok(*id == card),
        CardSelector::Statement(CardStatement::Slug(_)) => Ok(false),
        CardSelector::Statement(CardStatement::Group(group)) => groups
            .get(group)
            .map(|members| members.contains(&card))
            .ok_or_else(|| EvalError::UnknownGroup(group.clone())),
        CardSelector::Binary { left, op, right } => {
            let left = selector_matches(left, card, groups)?;
            match (op, left) {
                (LogicOperator::And, false) => Ok(false),
                (LogicOperator::Or, true) => Ok(true),
                _ => selector_matches(right, card, groups),
            }
        }
    }
}

/// The card IDs a selector names: `&&` intersects, `||` unites.
pub fn selector_cards(
    selector: &CardSelector,
    groups: &CardGroups,
) -> Result<BTreeSet<CardId>, EvalError> {
    match selector {
        CardSelector::Statement(CardStatement::Id(id)) => Ok(BTreeSet::from([*id])),
        CardSelector::Statement(CardStatement::Slug(_)) => Ok(BTreeSet::new()),
        CardSelector::Statement(CardStatement::Group(group)) => groups
            .get(group)
            .cloned()
            .ok_or_else(|| EvalError::UnknownGroup(group.clone())),
        CardSelector::Binary { left, op, right } => {
            let left = selector_cards(left, groups)?;
            let right = selector_cards(right, groups)?;
            Ok(match op {
                LogicOperator::And => left.intersection(&right).copied().collect(),
                LogicOperator::Or => left.union(&right).copied().collect(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTarget {
    pub quantifier: Quantifier,
    pub modifiers: BTreeSet<Modifier>,
    pub cards: BTreeSet<CardId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEffect {
    pub instruction: Instruction,
    pub enabled: bool,
    pub targets: Vec<EffectTarget>,
}

pub fn plan_effects(effects: &[Effect], groups: &CardGroups) -> Result<Vec<PlannedEffect>, EvalError> {
    effects
        .iter()
        .map(|effect| -> Result<PlannedEffect, EvalError> {
            let mut targets = Vec::new();
            for expression in effect.condition.expressions() {
                if let LogicExpression::Clause {
                    quantifier,
                    modifiers,
                    selector,
                } = expression
                {
                    targets.push(EffectTarget {
                        quantifier: *quantifier,
                        modifiers: modifiers.clone(),
                        cards: selector_cards(selector, groups)?,
                    });
                }
            }
            Ok(PlannedEffect {
                instruction: effect.instruction,
                enabled: effect.condition.as_bool() != Some(false),
                targets,
            })
        })
        .collect()
}

/// The effect list that applies when `card` is drawn: `else_effect` if the
/// else-condition holds on `board`, `effect` otherwise.
pub fn resolve_event(
    card: &GameEventCard,
    board: &dyn BoardView,
    groups: &CardGroups,
) -> Result<Vec<PlannedEffect>, EvalError> {
    let effects = if evaluate(&card.else_condition, board, groups)? {
        &card.else_effect
    } else {
        &card.effect
    };
    plan_effects(effects, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_logic_function;

    fn groups() -> CardGroups {
        let mut groups = CardGroups::new();
        groups.insert("$PAIR".parse().expect("group"), BTreeSet::from([1, 2]));
        groups
    }

    fn board(cards: &[(Stage, isize, CardId)]) -> TeamBoard {
        let mut board = TeamBoard::new();
        for (stage, column, card) in cards {
            assert!(board.place(*stage, *column, *card), "place {card}");
        }
        board
    }

    fn holds(expression: &str, board: &TeamBoard) -> bool {
        let function = parse_logic_function(expression, None).expect("parse");
        evaluate(&function, board, &groups()).expect("evaluate")
    }

    #[test]
    fn counts_matching_placements() {
        let board = board(&[(Stage::Plan, 0, 1), (Stage::Plan, 1, 1), (Stage::Plan, -1, 3)]);
        assert!(holds("{2~[1]}", &board));
        assert!(!holds("{3~[1]}", &board));
        assert!(holds("{3~[$PAIR]||[3]}", &board));
        assert!(!holds("{1~[$PAIR]&&[3]}", &board));
    }

    #[test]
    fn unique_select_counts_distinct_cards() {
        let board = board(&[(Stage::Plan, 0, 1), (Stage::Plan, 1, 1), (Stage::Plan, 2, 2)]);
        assert!(holds("{3~[$PAIR]}", &board));
        assert!(!holds("{3~^[$PAIR]}", &board));
        assert!(holds("{2~^[$PAIR]}", &board));
    }

    #[test]
    fn non_adjacent_skips_touching_cards() {
        let board = board(&[
            (Stage::Plan, 0, 1),
            (Stage::Plan, 1, 1),
            (Stage::Plan, 2, 1),
            (Stage::Context, 0, 1),
        ]);
        // Kept: (0,0) and (0,2); (0,1) and (1,0) touch (0,0).
        assert!(holds("{2~![1]}", &board));
        assert!(!holds("{3~![1]}", &board));
    }

    #[test]
    fn all_quantifier_needs_every_card() {
        let partial = board(&[(Stage::Plan, 0, 1)]);
        let full = board(&[(Stage::Plan, 0, 1), (Stage::Context, 0, 2)]);
        assert!(!holds("{*~[$PAIR]}", &partial));
        assert!(holds("{*~[$PAIR]}", &full));
        assert!(!holds("{*~[act-PLAN-unresolved]}", &full));
    }

    #[test]
    fn booleans_and_short_circuit() {
        let empty = TeamBoard::new();
        assert!(holds("true", &empty));
        assert!(!holds("false", &empty));
        assert!(holds("({1~[1]})||(true)", &empty));
        // Right side names an unknown group but is never reached.
        let function = parse_logic_function("{1~[1]}&&{1~[$NOPE]}", None).expect("parse");
        assert_eq!(evaluate(&function, &empty, &groups()), Ok(false));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let board = board(&[(Stage::Plan, 0, 1)]);
        let function = parse_logic_function("{1~[$NOPE]}", None).expect("parse");
        assert_eq!(
            evaluate(&function, &board, &groups()),
            Err(EvalError::UnknownGroup("$NOPE".parse().expect("group")))
        );
    }

    #[test]
    fn plans_targets_in_order() {
        let effects = crate::parse_effect("add {2~^[$PAIR]}||{1~[7]} remove false", None).expect("parse");
        let planned = plan_effects(&effects, &groups()).expect("plan");
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].instruction, Instruction::Add);
        assert!(planned[0].enabled);
        assert_eq!(planned[0].targets.len(), 2);
        assert_eq!(planned[0].targets[0].cards, BTreeSet::from([1, 2]));
        assert_eq!(planned[0].targets[1].cards, BTreeSet::from([7]));
        assert!(!planned[1].enabled);
        assert!(planned[1].targets.is_empty());
    }

    #[test]
    fn board_rejects_gaps() {
        let mut board = TeamBoard::new();
        assert!(!board.place(Stage::Plan, 3, 1));
        assert!(board.place(Stage::Plan, 0, 1));
        assert_eq!(board.card_at(Stage::Plan, 0), 1);
        assert_eq!(board.card_at(Stage::Plan, 1), NO_CARD);
        assert_eq!(board.placements().len(), 1);
    }
}
