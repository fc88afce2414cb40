/// Config Linter — checks a bot configuration against its schema and the
/// value ranges the dice and sanity mechanics rely on.
///
/// Usage: config_linter <config.json|config.ron> [--schema <file>] [--tables-dir <dir>]

use std::collections::HashMap;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use trpg_engine::core::config::{self, ConfigStore};
use trpg_engine::core::sanity::{InsanityKind, MANIA_SLOT, PHOBIA_SLOT};
use trpg_engine::core::template::{format_template, FormatError};
use trpg_engine::schema::character::{DbBuildEntry, DiceSpec, DropLowestSpec};
use trpg_engine::schema::tables::PhobiaManiaTables;
use trpg_engine::schema::value::ConfigValue;

/// Keys of a schema node that describe it rather than hold output text.
const SCHEMA_META_KEYS: [&str; 3] = ["type", "description", "title"];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: config_linter <config.json|config.ron> [--schema <file>] [--tables-dir <dir>]");
        process::exit(0);
    }

    let config_path = &args[1];
    let mut schema_path = None;
    let mut tables_dir = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--schema" && i + 1 < args.len() {
            i += 1;
            schema_path = Some(args[i].clone());
        } else if args[i] == "--tables-dir" && i + 1 < args.len() {
            i += 1;
            tables_dir = Some(args[i].clone());
        }
        i += 1;
    }

    let tree = match config::load_file(Path::new(config_path)) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("ERROR: Failed to load config file: {}", e);
            process::exit(1);
        }
    };
    let schema = match schema_path {
        Some(ref path) => config::load_file(Path::new(path)),
        None => config::builtin_schema(),
    };
    let schema = match schema {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("ERROR: Failed to load schema: {}", e);
            process::exit(1);
        }
    };
    let tables = match tables_dir {
        Some(ref dir) => PhobiaManiaTables::load_from_dir(Path::new(dir)),
        None => PhobiaManiaTables::builtin(),
    };
    let tables = match tables {
        Ok(tables) => tables,
        Err(e) => {
            eprintln!("ERROR: Failed to load phobia/mania tables: {}", e);
            process::exit(1);
        }
    };

    let store = ConfigStore::new();
    let mismatches = store.initialize(schema, tree.clone());
    println!("Loaded {}", config_path);

    let (errors, lint_warnings) = lint_config(&store, &tree, &tables);
    let mut warnings: Vec<String> = mismatches.iter().map(|m| format!("Schema: {}", m)).collect();
    warnings.extend(lint_warnings);

    println!("\n=== Config Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_config(
    store: &ConfigStore,
    tree: &ConfigValue,
    tables: &PhobiaManiaTables,
) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Ranges that feed uniform rolls
    for prefix in ["sanity.dice_range", "sanity.insanity_dice", "sanity.phobia_mania_range"] {
        let min = store.get_checked(&format!("{}.min", prefix), 0i64);
        let max = store.get_checked(&format!("{}.max", prefix), 0i64);
        if min.is_degraded() || max.is_degraded() {
            warnings.push(format!("'{}' has no integer min/max, built-in range applies", prefix));
        } else if min.value() > max.value() {
            errors.push(format!(
                "'{}' is inverted: min {} > max {}",
                prefix,
                min.value(),
                max.value()
            ));
        }
    }

    let (range_min, range_max) = (
        store.get("sanity.phobia_mania_range.min", 1i64),
        store.get("sanity.phobia_mania_range.max", 100i64),
    );
    for roll in range_min..=range_max {
        if tables.phobia(roll).is_none() || tables.mania(roll).is_none() {
            warnings.push(format!(
                "Phobia/mania range {}..={} reaches roll {} which has no table entry",
                range_min, range_max, roll
            ));
            break;
        }
    }

    let token: String = store.get("sanity.insanity_dice.dice", "1D10".to_string());
    if token.is_empty() {
        warnings.push("'sanity.insanity_dice.dice' is empty, symptoms will not be rolled".to_string());
    }

    // Symptom tables
    for kind in [InsanityKind::Temporary, InsanityKind::LongTerm] {
        let symptoms = store.get_checked::<Vec<String>>(kind.table_key(), Vec::new());
        if symptoms.is_degraded() || symptoms.value().is_empty() {
            errors.push(format!("'{}' is missing or not a list of strings", kind.table_key()));
            continue;
        }
        let len = symptoms.value().len();
        if len < MANIA_SLOT {
            warnings.push(format!(
                "'{}' has {} entries; slots {} (phobia) and {} (mania) will never be reached",
                kind.table_key(),
                len,
                PHOBIA_SLOT,
                MANIA_SLOT
            ));
        } else if len > MANIA_SLOT {
            warnings.push(format!(
                "'{}' has {} entries; only slots {} and {} append a phobia or mania",
                kind.table_key(),
                len,
                PHOBIA_SLOT,
                MANIA_SLOT
            ));
        }
    }

    // Dice specs
    for key in [
        "character.coc.dice.three_d6",
        "character.coc.dice.two_d6_plus_6",
        "character.coc.luck_dice",
    ] {
        let spec = store.get_checked(key, DiceSpec::three_d6());
        if spec.is_degraded() {
            warnings.push(format!("'{}' is missing or malformed, built-in dice apply", key));
        } else if spec.value().dice_faces == 0 {
            errors.push(format!("'{}' has zero-faced dice", key));
        }
    }
    let dnd = store.get_checked("character.dnd.dice", DropLowestSpec::default());
    if dnd.is_degraded() {
        warnings.push("'character.dnd.dice' is missing or malformed, 4d6 drop lowest applies".to_string());
    } else if dnd.value().drop_lowest >= dnd.value().dice_count {
        errors.push("'character.dnd.dice' drops every die".to_string());
    }

    let table = store.get_checked::<Vec<DbBuildEntry>>("db_build.table", Vec::new());
    if table.is_degraded() {
        warnings.push("'db_build.table' is missing or malformed, built-in table applies".to_string());
    } else if table.value().windows(2).any(|w| w[0].threshold > w[1].threshold) {
        errors.push("'db_build.table' thresholds are not ascending".to_string());
    }

    // Output templates
    let mut templates = Vec::new();
    match tree.get("output") {
        Some(output) => collect_templates(output, "output", &mut templates),
        None => errors.push("No 'output' category, every message will be empty".to_string()),
    }
    let no_values = HashMap::<&str, &str>::new();
    for (path, text) in &templates {
        match format_template(text, &no_values) {
            Ok(_) | Err(FormatError::MissingArgument(_)) => {}
            Err(e) => errors.push(format!("Template '{}' will render verbatim: {}", path, e)),
        }
    }

    (errors, warnings)
}

/// Gather every string leaf under `node`, treating `items` and `default`
/// as transparent.
fn collect_templates<'a>(node: &'a ConfigValue, path: &str, out: &mut Vec<(String, &'a str)>) {
    match node {
        ConfigValue::String(text) => out.push((path.to_string(), text.as_str())),
        ConfigValue::List(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                collect_templates(entry, &format!("{}[{}]", path, i + 1), out);
            }
        }
        ConfigValue::Map(map) => {
            for (key, child) in map {
                if SCHEMA_META_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let child_path = if key == "items" || key == "default" {
                    path.to_string()
                } else {
                    format!("{}.{}", path, key)
                };
                collect_templates(child, &child_path, out);
            }
        }
        _ => {}
    }
}
