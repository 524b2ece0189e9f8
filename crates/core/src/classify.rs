//! Pure predicates over the raw text of card-effect expressions.
//!
//! Every parser stage consults these before building a node, and the data
//! loader reuses them to check raw card records.

pub const LOGIC_OPERATORS: [&str; 2] = ["&&", "||"];
pub const INSTRUCTIONS: [&str; 7] = ["add", "remove", "removeall", "queue", "block", "save", "flip"];
pub const ALL_QUANTIFIER: &str = "*";
pub const MODIFIERS: [&str; 2] = ["!", "^"];
pub const CARD_TYPES: [&str; 2] = ["act", "event"];
pub const CARD_STAGES: [&str; 4] = ["PLAN", "CONTEXT", "IMP", "WRITEUP"];

pub fn is_logic_operator(value: &str) -> bool {
    LOGIC_OPERATORS.contains(&value)
}

pub fn is_instruction(value: &str) -> bool {
    INSTRUCTIONS.contains(&value)
}

/// A positive integer literal that fits a `u32`, or the ALL operator `*`.
///
/// Counts above `u32::MAX` are rejected rather than clamped.
pub fn is_quantifier(value: &str) -> bool {
    if value == ALL_QUANTIFIER {
        return true;
    }
    is_unsigned_literal(value) && value.parse::<u32>().map(|n| n > 0).unwrap_or(false)
}

pub fn is_modifier(value: &str) -> bool {
    MODIFIERS.contains(&value)
}

pub fn is_modifier_array<S: AsRef<str>>(values: &[S]) -> bool {
    values.iter().all(|value| is_modifier(value.as_ref()))
}

/// `<type>-<stage>-<name>` with ASCII alphanumeric segments.
pub fn is_card_slug(value: &str) -> bool {
    if !value.is_ascii() {
        return false;
    }
    if !value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
        return false;
    }
    let segments: Vec<&str> = value.split('-').collect();
    if segments.len() != 3 {
        return false;
    }
    CARD_TYPES.contains(&segments[0]) && CARD_STAGES.contains(&segments[1]) && !segments[2].is_empty()
}

/// First character `$` or an uppercase letter, the rest uppercase letters.
///
/// A bare uppercase word such as `ALLPLAN` passes; data files always write the
/// `$` prefix, but the check itself only constrains position zero.
pub fn is_card_group(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first != '$' && !first.is_ascii_uppercase() {
        return false;
    }
    let rest = chars.as_str();
    if first == '$' && rest.is_empty() {
        return false;
    }
    rest.chars().all(|ch| ch.is_ascii_uppercase())
}

/// Integer card ID literal, optionally negative (the unresolved sentinel is `-1`).
pub fn is_card_id_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    is_unsigned_literal(digits) && value.parse::<i64>().is_ok()
}

pub fn is_card_statement(value: &str) -> bool {
    is_card_id_literal(value) || is_card_slug(value) || is_card_group(value)
}

/// Characters allowed in effect and condition strings by the data layer.
pub fn is_expression_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "-~{}[]()*$!^&| ".contains(ch)
}

/// Position and character of the first character outside the expression charset.
pub fn find_illegal_char(value: &str) -> Option<(usize, char)> {
    value
        .chars()
        .enumerate()
        .find(|(_, ch)| !is_expression_char(*ch))
}

pub fn count_non_ascii(value: &str) -> usize {
    value.chars().filter(|ch| !ch.is_ascii()).count()
}

fn is_unsigned_literal(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
