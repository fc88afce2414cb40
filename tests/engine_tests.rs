/// Engine integration tests — a host session from config file to output text.

use std::collections::HashMap;
use trpg_engine::core::engine::{EngineError, TrpgEngine};
use trpg_engine::core::names::{NameGenerator, Sex};
use trpg_engine::schema::character::CharacterRecord;
use trpg_engine::schema::tables::TableError;

fn build_test_engine(seed: u64) -> TrpgEngine {
    TrpgEngine::builder()
        .seed(seed)
        .config_path("tests/fixtures/custom_config.json")
        .tables_dir("data")
        .build()
        .unwrap()
}

struct CountingGenerator {
    calls: usize,
}

impl NameGenerator for CountingGenerator {
    fn name(&mut self, locale: Option<&str>, _sex: Option<Sex>) -> String {
        self.calls += 1;
        format!("{}-{}", locale.unwrap_or("?"), self.calls)
    }
}

#[test]
fn full_session() {
    let mut engine = build_test_engine(1234);

    let character = engine.generate_character();
    let sheet = engine.format_character(&character, 1);
    assert!(sheet.starts_with("Investigator #1"));

    let mut record = character.to_record();
    record.name = Some("Agatha".to_string());
    let san_before = record.sanity();
    assert_eq!(san_before, i64::from(character.san));

    let text = engine.narrate_sanity_check(&mut record, "1/1d6").unwrap();
    assert!(text.starts_with("Agatha: "));
    assert!(record.sanity() < san_before);

    let symptom = engine.temporary_insanity();
    assert!(!symptom.is_empty());
    assert!(!symptom.contains("1D10"));

    let scores = engine.generate_ability_scores();
    assert_eq!(scores.len(), 7);
    assert!(engine
        .format_ability_scores(&scores, 1)
        .starts_with("Adventurer #1"));
}

#[test]
fn same_seed_same_session() {
    let run = |seed| {
        let mut engine = build_test_engine(seed);
        let mut record = CharacterRecord::with_sanity(55);
        let mut out = Vec::new();
        for _ in 0..5 {
            let character = engine.generate_character();
            out.push(engine.format_character(&character, 1));
            out.push(engine.long_term_insanity());
            let check = engine.sanity_check(&mut record, "1d4/1d8").unwrap();
            out.push(check.new_san.to_string());
        }
        out
    };
    assert_eq!(run(77), run(77));
    assert_ne!(run(77), run(78));
}

#[test]
fn names_use_configured_languages() {
    let engine = build_test_engine(1);
    let mut generator = CountingGenerator { calls: 0 };
    let names = engine.generate_names(&mut generator, "german", 2, None);
    assert_eq!(names, vec!["de_DE-1", "de_DE-2"]);
    let names = engine.generate_names(&mut generator, "", 1, Some(Sex::Male));
    assert_eq!(names, vec!["en_GB-3"]);
}

#[test]
fn render_template_with_owned_substitutions() {
    let engine = build_test_engine(1);
    let substitutions: HashMap<String, String> = HashMap::new();
    assert_eq!(
        engine.render_template("san.check.failure", &substitutions),
        "Your mind reels."
    );
}

#[test]
fn missing_tables_dir_is_an_error() {
    let result = TrpgEngine::builder()
        .tables_dir("tests/fixtures/no_such_dir")
        .build();
    assert!(matches!(result, Err(EngineError::Table(TableError::Io(_)))));
}
