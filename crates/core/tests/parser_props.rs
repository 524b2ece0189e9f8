use phdquest_core::*;
use proptest::prelude::*;
use std::num::NonZeroU32;

fn slug(value: &str) -> CardSelector {
    CardSelector::Statement(CardStatement::Slug(value.parse().expect("slug")))
}

fn is_bracket_error(err: &ParseError) -> bool {
    matches!(
        err,
        ParseError::BracketMismatch { .. } | ParseError::UnclosedBrackets { .. }
    )
}

#[test]
fn literal_booleans() {
    assert_eq!(parse_logic_function("true", None), Ok(LogicFunction::TRUE));
    assert_eq!(parse_logic_function("false", None), Ok(LogicFunction::FALSE));
}

#[test]
fn single_selector_keeps_raw_slug() {
    assert_eq!(
        parse_card_selector("[act-PLAN-foo]", None),
        Ok(slug("act-PLAN-foo"))
    );
}

#[test]
fn selector_resolves_known_slug() {
    let mut map = SlugIdMap::new();
    map.insert("act-PLAN-foo".parse().expect("slug"), 7);
    assert_eq!(
        parse_card_selector("[act-PLAN-foo]", Some(&map)),
        Ok(CardSelector::Statement(CardStatement::Id(7)))
    );
}

#[test]
fn binary_selector() {
    assert_eq!(
        parse_card_selector("[act-PLAN-foo]&&[act-PLAN-bar]", None),
        Ok(CardSelector::binary(
            slug("act-PLAN-foo"),
            LogicOperator::And,
            slug("act-PLAN-bar"),
        ))
    );
}

#[test]
fn full_expression_both_surfaces() {
    let expected: LogicFunction = LogicExpression::clause(
        Quantifier::Count(NonZeroU32::MIN),
        [],
        slug("act-PLAN-foo"),
    )
    .into();
    assert_eq!(parse_logic_function("{1}[act-PLAN-foo]", None), Ok(expected.clone()));
    assert_eq!(parse_logic_function("{1~[act-PLAN-foo]}", None), Ok(expected));
}

#[test]
fn empty_and_single_effects() {
    assert_eq!(parse_effect("-", None), Ok(Vec::new()));
    assert_eq!(
        parse_effect("add true", None),
        Ok(vec![Effect::new(Instruction::Add, LogicFunction::TRUE)])
    );
}

#[test]
fn bracket_mismatch_detection() {
    assert!(verify_bracket_closure("{1}[foo").is_err());
    assert!(!brackets_balanced("{1}[foo"));
    assert!(verify_bracket_closure("{1}[foo]}").is_err());
    assert!(!brackets_balanced("{1}[foo]}"));
    assert!(brackets_balanced("{1}[foo]"));
}

#[test]
fn malformed_effects_rejected() {
    let odd = parse_effect("add", None).expect_err("odd tokens");
    assert!(odd.to_string().contains("could not recognize effect"));
    let unknown = parse_effect("jump true", None).expect_err("unknown instruction");
    assert!(unknown.to_string().contains("unknown instruction"));
}

#[test]
fn illegal_leading_character() {
    let err = parse_logic_function("xyz", None).expect_err("illegal");
    assert!(err.to_string().contains("illegal character"));
}

#[test]
fn effect_list_round_trips_through_display() {
    let source = "add {2~^[$ALLPLAN]}||{1~[act-PLAN-foo]} removeall ({*~!([3]||[4])&&[$HARD]})&&(false)";
    let effects = parse_effect(source, None).expect("parse");
    assert_eq!(effects.len(), 2);
    let formatted = format_effects(&effects);
    assert_eq!(parse_effect(&formatted, None), Ok(effects));
    assert_eq!(format_effects(&[]), NO_EFFECT);
}

fn statement() -> impl Strategy<Value = CardStatement> {
    prop_oneof![
        (-1i64..500).prop_map(CardStatement::Id),
        "[a-z0-9]{1,8}".prop_map(|name| {
            CardStatement::Slug(format!("act-PLAN-{name}").parse().expect("slug"))
        }),
        "[A-Z]{1,6}".prop_map(|name| {
            CardStatement::Group(format!("${name}").parse().expect("group"))
        }),
    ]
}

fn operator() -> impl Strategy<Value = LogicOperator> {
    prop_oneof![Just(LogicOperator::And), Just(LogicOperator::Or)]
}

fn selector() -> impl Strategy<Value = CardSelector> {
    statement()
        .prop_map(CardSelector::Statement)
        .prop_recursive(4, 16, 2, |inner| {
            (inner.clone(), operator(), inner)
                .prop_map(|(left, op, right)| CardSelector::binary(left, op, right))
        })
}

fn quantifier() -> impl Strategy<Value = Quantifier> {
    prop_oneof![
        Just(Quantifier::All),
        (1u32..1000).prop_map(|n| Quantifier::Count(NonZeroU32::new(n).expect("positive"))),
    ]
}

fn expression() -> impl Strategy<Value = LogicExpression> {
    prop_oneof![
        1 => any::<bool>().prop_map(LogicExpression::Bool),
        4 => (quantifier(), any::<bool>(), any::<bool>(), selector()).prop_map(
            |(quantifier, non_adjacent, unique, selector)| {
                let modifiers = [
                    non_adjacent.then_some(Modifier::NonAdjacent),
                    unique.then_some(Modifier::UniqueSelect),
                ];
                LogicExpression::clause(quantifier, modifiers.into_iter().flatten(), selector)
            }
        ),
    ]
}

fn function() -> impl Strategy<Value = LogicFunction> {
    expression()
        .prop_map(LogicFunction::from)
        .prop_recursive(4, 16, 2, |inner| {
            (inner.clone(), operator(), inner)
                .prop_map(|(left, op, right)| LogicFunction::binary(left, op, right))
        })
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn parsed_trees_cross_threads() {
    assert_send_sync::<CardSelector>();
    assert_send_sync::<LogicFunction>();
    assert_send_sync::<Effect>();
    assert_send_sync::<ParseError>();

    let source = "add ({1~[act-PLAN-a]}||{2~!(([$PLAN]))})&&{*~[3]}";
    let expected = parse_effect(source, None).expect("parse");
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| parse_effect(source, None)))
            .collect();
        for worker in workers {
            assert_eq!(worker.join().expect("join").as_ref(), Ok(&expected));
        }
    });
}

proptest! {
    #[test]
    fn formatted_functions_reparse_identically(tree in function()) {
        let text = tree.to_string();
        prop_assert!(brackets_balanced(&text), "unbalanced output {}", text);
        let parsed = parse_logic_function(&text, None);
        prop_assert_eq!(parsed.as_ref(), Ok(&tree), "text {}", text);
        let again = parsed.expect("parsed above").to_string();
        prop_assert_eq!(again, text);
    }

    #[test]
    fn balanced_input_never_fails_on_brackets(text in "[{}\\[\\]()~1*!^&|a$-]{0,24}") {
        if brackets_balanced(&text) {
            if let Err(err) = parse_logic_function(&text, None) {
                prop_assert!(!is_bracket_error(&err), "{} gave {}", text, err);
            }
        }
    }

    #[test]
    fn slugs_and_groups_never_overlap(text in "[$A-Za-z0-9-]{0,16}") {
        prop_assert_eq!(is_card_slug(&text), is_card_slug(&text));
        prop_assert_eq!(is_card_group(&text), is_card_group(&text));
        prop_assert!(!(is_card_slug(&text) && is_card_group(&text)));
    }
}
