/// Preview — interactive shell for trying a configuration out.
///
/// Usage: preview [--config <path>] [--schema <path>] [--tables-dir <dir>] [--seed <n>]
///
/// Commands:
///   coc [n]                  — roll n investigators
///   dnd [n]                  — roll n sets of ability scores
///   sc <san> <formula>       — sanity check, e.g. `sc 60 1d6/1d10`
///   ti                       — temporary insanity symptom
///   li                       — long-term insanity symptom
///   get <key>                — resolve a dotted config key
///   render <key> [k=v ...]   — render an output template
///   seed <n>                 — set RNG seed
///   info                     — configuration overview
///   help                     — list commands
///   quit                     — exit

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;
use trpg_engine::core::engine::{EngineError, TrpgEngine};
use trpg_engine::schema::character::CharacterRecord;
use trpg_engine::schema::value::ConfigValue;

/// Upper bound on batch commands.
const MAX_BATCH: usize = 10;

struct Options {
    config_path: Option<String>,
    schema_path: Option<String>,
    tables_dir: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut options = Options {
        config_path: None,
        schema_path: None,
        tables_dir: None,
    };
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                options.config_path = Some(args[i].clone());
            }
            "--schema" if i + 1 < args.len() => {
                i += 1;
                options.schema_path = Some(args[i].clone());
            }
            "--tables-dir" if i + 1 < args.len() => {
                i += 1;
                options.tables_dir = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut engine = match build_engine(&options, seed) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Config: {}",
        options.config_path.as_deref().unwrap_or("<built-in defaults>")
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "coc" => {
                let n = batch_size(parts.get(1));
                println!();
                for index in 1..=n {
                    let character = engine.generate_character();
                    println!("{}\n", engine.format_character(&character, index));
                }
            }
            "dnd" => {
                let n = batch_size(parts.get(1));
                println!();
                for index in 1..=n {
                    let scores = engine.generate_ability_scores();
                    println!("{}\n", engine.format_ability_scores(&scores, index));
                }
            }
            "sc" => {
                if parts.len() < 3 {
                    println!("Usage: sc <san> <formula>   e.g. sc 60 1d6/1d10");
                    continue;
                }
                let san: i64 = match parts[1].parse() {
                    Ok(san) => san,
                    Err(_) => {
                        println!("Invalid SAN value: {}", parts[1]);
                        continue;
                    }
                };
                let mut record = CharacterRecord::with_sanity(san);
                record.name = Some("Investigator".to_string());
                match engine.narrate_sanity_check(&mut record, parts[2]) {
                    Ok(text) => println!("\n{}\n", text),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "ti" => {
                println!("\n{}\n", engine.temporary_insanity());
            }
            "li" => {
                println!("\n{}\n", engine.long_term_insanity());
            }
            "get" => {
                if parts.len() < 2 {
                    println!("Usage: get <key>");
                    continue;
                }
                match engine.resolve_config(parts[1], ConfigValue::Null) {
                    ConfigValue::Null => println!("(not set)"),
                    value => match serde_json::to_string_pretty(&value) {
                        Ok(json) => println!("{}", json),
                        Err(e) => println!("ERROR: {}", e),
                    },
                }
            }
            "render" => {
                if parts.len() < 2 {
                    println!("Usage: render <key> [name=value ...]");
                    continue;
                }
                let substitutions: HashMap<String, String> = parts[2..]
                    .iter()
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let text = engine.render_template(parts[1], &substitutions);
                if text.is_empty() {
                    println!("(empty: template '{}' not found)", parts[1]);
                } else {
                    println!("{}", text);
                }
            }
            "seed" => {
                if parts.len() < 2 {
                    println!("Usage: seed <n>");
                    continue;
                }
                match parts[1].parse::<u64>() {
                    Ok(n) => {
                        engine.reseed(n);
                        println!("Seed set to {}", n);
                    }
                    Err(_) => println!("Invalid seed: {}", parts[1]),
                }
            }
            "info" => {
                let info = engine.config_info();
                println!("Initialized: {}", info.initialized);
                println!("Categories: {}", info.categories.join(", "));
                let mismatches = engine.store().validate();
                if mismatches.is_empty() {
                    println!("Schema: OK");
                } else {
                    for mismatch in &mismatches {
                        println!("Schema: {}", mismatch);
                    }
                }
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn build_engine(options: &Options, seed: u64) -> Result<TrpgEngine, EngineError> {
    let mut builder = TrpgEngine::builder().seed(seed);
    if let Some(ref path) = options.config_path {
        builder = builder.config_path(path);
    }
    if let Some(ref path) = options.schema_path {
        builder = builder.schema_path(path);
    }
    if let Some(ref dir) = options.tables_dir {
        builder = builder.tables_dir(dir);
    }
    builder.build()
}

fn batch_size(arg: Option<&&str>) -> usize {
    arg.and_then(|s| s.parse::<usize>().ok()).unwrap_or(1).clamp(1, MAX_BATCH)
}

fn print_usage() {
    println!("Usage: preview [--config <path>] [--schema <path>] [--tables-dir <dir>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  coc [n]                 — roll n investigators (max {})", MAX_BATCH);
    println!("  dnd [n]                 — roll n sets of ability scores");
    println!("  sc <san> <formula>      — sanity check, e.g. sc 60 1d6/1d10");
    println!("  ti                      — temporary insanity symptom");
    println!("  li                      — long-term insanity symptom");
    println!("  get <key>               — resolve a dotted config key");
    println!("  render <key> [k=v ...]  — render an output template");
    println!("  seed <n>                — set RNG seed");
    println!("  info                    — configuration overview");
    println!("  help                    — this message");
    println!("  quit                    — exit");
}
