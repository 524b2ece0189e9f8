use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use phdquest_core::{
    format_effects, parse_effect, parse_logic_function, CardStatement, Catalog, GameConfig,
    LogicFunction, RngState, SlugResolution, Stage,
};
use phdquest_data::{load_catalog, load_game_config, load_raw_dataset, unknown_statements, validate_dataset};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "phdquest", about = "Inspect and check card content")]
struct Cli {
    /// Directory holding the card JSON files.
    #[arg(long, default_value = "assets", global = true)]
    assets: PathBuf,
    /// Seed for shuffling draw stacks.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Fail on card slugs that name no card.
    #[arg(long, global = true)]
    strict: bool,
    /// More log output, repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every card and group, exit non-zero on problems.
    Validate,
    /// Parse a logic function.
    Parse {
        expression: String,
        /// Replace slugs with card IDs from the dataset.
        #[arg(long)]
        resolve: bool,
        #[arg(long)]
        json: bool,
    },
    /// Parse an effect string.
    Effect {
        effect: String,
        #[arg(long)]
        resolve: bool,
        #[arg(long)]
        json: bool,
    },
    /// List loaded cards and groups.
    Show,
    /// Pop activity cards from a stage's draw stack.
    Draw {
        #[arg(long, default_value_t = 1)]
        stage: u8,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Validate => validate(cli),
        Command::Parse {
            expression,
            resolve,
            json,
        } => {
            let mut function = parse_logic_function(expression, None)?;
            let unknown = unknown_names(cli, *resolve, vec![&mut function])?;
            println!("{function}");
            if *json {
                println!("{}", serde_json::to_string_pretty(&function)?);
            } else {
                println!("{function:#?}");
            }
            report_unknown(cli, &unknown);
            Ok(ExitCode::SUCCESS)
        }
        Command::Effect {
            effect,
            resolve,
            json,
        } => {
            let mut effects = parse_effect(effect, None)?;
            let conditions = effects.iter_mut().map(|e| &mut e.condition).collect();
            let unknown = unknown_names(cli, *resolve, conditions)?;
            println!("{}", format_effects(&effects));
            if *json {
                println!("{}", serde_json::to_string_pretty(&effects)?);
            } else {
                println!("{effects:#?}");
            }
            report_unknown(cli, &unknown);
            Ok(ExitCode::SUCCESS)
        }
        Command::Show => {
            show(&catalog(cli)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Draw { stage, count } => {
            draw(cli, *stage, *count)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn config(cli: &Cli) -> anyhow::Result<GameConfig> {
    let mut config = load_game_config(&cli.assets)?;
    if cli.strict {
        config.slug_resolution = SlugResolution::Strict;
    }
    Ok(config)
}

fn catalog(cli: &Cli) -> anyhow::Result<Catalog> {
    let config = config(cli)?;
    load_catalog(&cli.assets, &config)
        .with_context(|| format!("load cards from {}", cli.assets.display()))
}

/// Slugs and groups in `functions` that the dataset does not know.
///
/// With `resolve`, known slugs are swapped for card IDs in place and the
/// misses become the `-1` sentinel. Without it nothing is loaded unless the
/// assets directory is there.
fn unknown_names(
    cli: &Cli,
    resolve: bool,
    mut functions: Vec<&mut LogicFunction>,
) -> anyhow::Result<Vec<String>> {
    if resolve {
        let catalog = catalog(cli)?;
        let mut unresolved = Vec::new();
        for function in functions.iter_mut() {
            function.resolve_slugs(&catalog.slugs, &mut unresolved);
        }
        let mut names: Vec<String> = unresolved.iter().map(ToString::to_string).collect();
        names.extend(
            functions
                .iter()
                .flat_map(|function| function.statements())
                .filter_map(|statement| match statement {
                    CardStatement::Group(group) if catalog.group(group).is_none() => {
                        Some(group.to_string())
                    }
                    _ => None,
                }),
        );
        return Ok(names);
    }
    if !cli.assets.is_dir() {
        return Ok(Vec::new());
    }
    let raw = load_raw_dataset(&cli.assets)?;
    let statements = functions.iter().flat_map(|function| function.statements());
    Ok(unknown_statements(statements, &raw)
        .into_iter()
        .map(ToString::to_string)
        .collect())
}

fn report_unknown(cli: &Cli, names: &[String]) {
    for name in names {
        log::warn!("{name} is not in {}", cli.assets.display());
    }
}

fn validate(cli: &Cli) -> anyhow::Result<ExitCode> {
    let raw = load_raw_dataset(&cli.assets)?;
    let report = validate_dataset(&raw);
    if report.is_ok() {
        println!(
            "{} activity cards, {} event cards, {} card groups: ok",
            raw.activity_cards.len(),
            raw.event_cards.len(),
            raw.card_groups.len()
        );
        return Ok(ExitCode::SUCCESS);
    }
    print!("{report}");
    println!("{} issues", report.len());
    Ok(ExitCode::FAILURE)
}

fn show(catalog: &Catalog) {
    println!("activity cards:");
    for card in catalog.activity_cards.values() {
        println!(
            "  {:>3} {} (stage {}, x{}) {}",
            card.id,
            card.slug,
            card.stage.number(),
            card.frequency,
            card.title
        );
    }
    println!("event cards:");
    for card in catalog.event_cards.values() {
        let optional = if card.is_optional { ", optional" } else { "" };
        println!(
            "  {:>3} {} (stage {}{optional}) {}",
            card.id,
            card.slug,
            card.stage.number(),
            card.title
        );
        println!("      effect: {}", format_effects(&card.effect));
        println!("      else if {}: {}", card.else_condition, format_effects(&card.else_effect));
    }
    println!("card groups:");
    let mut groups: Vec<_> = catalog.groups.iter().collect();
    groups.sort_by(|a, b| a.0.cmp(b.0));
    for (group, members) in groups {
        let ids: Vec<String> = members.iter().map(ToString::to_string).collect();
        println!("  {group}: {}", ids.join(", "));
    }
}

fn draw(cli: &Cli, stage: u8, count: usize) -> anyhow::Result<()> {
    let stage = Stage::from_number(stage).ok_or_else(|| anyhow!("stage must be 1, 2, 3 or 4"))?;
    let catalog = catalog(cli)?;
    let mut rng = match cli.seed {
        Some(seed) => RngState::from_seed(seed),
        None => RngState::from_entropy(),
    };
    log::info!("drawing with seed {}", rng.seed());
    let mut stack = catalog.activity_stack(stage, &mut rng);
    for _ in 0..count {
        let id = stack.pop(&mut rng)?;
        match catalog.activity(id) {
            Some(card) => println!("{:>3} {} {}", id, card.slug, card.title),
            None => println!("{id:>3}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phdquest_core::{CardSelector, LogicExpression, UNRESOLVED_CARD_ID};

    fn cli_for(command: &str, argument: &str, resolve: bool) -> Cli {
        let assets = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("assets");
        let mut args = vec![
            "phdquest".to_string(),
            "--assets".to_string(),
            assets.display().to_string(),
            command.to_string(),
            argument.to_string(),
        ];
        if resolve {
            args.push("--resolve".to_string());
        }
        Cli::parse_from(args)
    }

    fn first_statement(function: &LogicFunction) -> &CardStatement {
        match function {
            LogicFunction::Expression(LogicExpression::Clause {
                selector: CardSelector::Statement(statement),
                ..
            }) => statement,
            other => panic!("unexpected condition {other}"),
        }
    }

    const EFFECT: &str = "add {1~[act-PLAN-literature]} remove {1~[act-PLAN-missing]} block {1~[$NOPE]}";

    #[test]
    fn effect_reports_unknown_statements() {
        let cli = cli_for("effect", EFFECT, false);
        let mut effects = parse_effect(EFFECT, None).expect("parse");
        let conditions = effects.iter_mut().map(|e| &mut e.condition).collect();
        let unknown = unknown_names(&cli, false, conditions).expect("check");
        assert_eq!(unknown, vec!["act-PLAN-missing".to_string(), "$NOPE".to_string()]);
    }

    #[test]
    fn resolve_reports_unresolved_slugs() {
        let cli = cli_for("effect", EFFECT, true);
        let mut effects = parse_effect(EFFECT, None).expect("parse");
        let conditions = effects.iter_mut().map(|e| &mut e.condition).collect();
        let unknown = unknown_names(&cli, true, conditions).expect("resolve");
        assert_eq!(unknown, vec!["act-PLAN-missing".to_string(), "$NOPE".to_string()]);
        assert_eq!(first_statement(&effects[0].condition), &CardStatement::Id(1));
        assert_eq!(
            first_statement(&effects[1].condition),
            &CardStatement::Id(UNRESOLVED_CARD_ID)
        );
    }

    #[test]
    fn parse_resolves_in_place() {
        let cli = cli_for("parse", "{1~[act-PLAN-literature]}", true);
        let mut function = parse_logic_function("{1~[act-PLAN-literature]}", None).expect("parse");
        let unknown = unknown_names(&cli, true, vec![&mut function]).expect("resolve");
        assert!(unknown.is_empty());
        assert_eq!(function.to_string(), "{1~[1]}");
    }
}
