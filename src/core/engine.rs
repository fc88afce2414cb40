/// The host-facing engine: one configuration, one RNG, every operation.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::core::character::{format_ability_scores, format_coc_character, CharacterGenerator};
use crate::core::config::{self, ConfigError, ConfigInfo, ConfigStore};
use crate::core::names::{generate_names, NameGenerator, Sex};
use crate::core::sanity::{InsanityKind, SanityCheck, SanityEngine, SanityError};
use crate::core::template::TemplateResolver;
use crate::schema::character::{CharacterRecord, CocCharacter};
use crate::schema::tables::{PhobiaManiaTables, TableError};
use crate::schema::value::ConfigValue;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("sanity error: {0}")]
    Sanity(#[from] SanityError),
}

/// The top-level engine. Built via `TrpgEngine::builder()`.
pub struct TrpgEngine {
    store: Arc<ConfigStore>,
    templates: TemplateResolver,
    characters: CharacterGenerator,
    sanity: SanityEngine,
    rng: StdRng,
}

/// Builder for constructing a `TrpgEngine`.
#[derive(Default)]
pub struct TrpgEngineBuilder {
    schema_path: Option<String>,
    config_path: Option<String>,
    tables_dir: Option<String>,
    seed: Option<u64>,
    /// Directly provided schema (for hosts that already hold it).
    schema: Option<ConfigValue>,
    /// Directly provided configuration tree.
    config: Option<ConfigValue>,
    /// Directly provided tables.
    tables: Option<PhobiaManiaTables>,
    /// A store shared with other parts of the host.
    store: Option<Arc<ConfigStore>>,
}

impl TrpgEngine {
    pub fn builder() -> TrpgEngineBuilder {
        TrpgEngineBuilder::default()
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Restart the random sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn resolve_config(&self, key: &str, default: ConfigValue) -> ConfigValue {
        self.store.resolve(key, default)
    }

    pub fn render_template(&self, key: &str, substitutions: &HashMap<String, String>) -> String {
        self.templates.render(key, substitutions)
    }

    pub fn config_info(&self) -> ConfigInfo {
        self.store.info()
    }

    pub fn sanity_check(
        &mut self,
        character: &mut CharacterRecord,
        loss_formula: &str,
    ) -> Result<SanityCheck, EngineError> {
        Ok(self
            .sanity
            .sanity_check(character, loss_formula, &mut self.rng)?)
    }

    /// Run a sanity check and narrate it with the `san.result` template.
    pub fn narrate_sanity_check(
        &mut self,
        character: &mut CharacterRecord,
        loss_formula: &str,
    ) -> Result<String, EngineError> {
        let check = self.sanity_check(character, loss_formula)?;
        let name = character.name.clone().unwrap_or_default();
        let substitutions = HashMap::from([
            ("name", name),
            ("roll", check.roll.to_string()),
            ("san", check.prior_san.to_string()),
            ("message", check.message.clone()),
            ("loss", check.loss.to_string()),
            ("new_san", check.new_san.to_string()),
        ]);
        Ok(self.templates.render("san.result", &substitutions))
    }

    pub fn temporary_insanity(&mut self) -> String {
        self.sanity.insanity(InsanityKind::Temporary, &mut self.rng)
    }

    pub fn long_term_insanity(&mut self) -> String {
        self.sanity.insanity(InsanityKind::LongTerm, &mut self.rng)
    }

    pub fn generate_character(&mut self) -> CocCharacter {
        self.characters.roll_coc(&mut self.rng)
    }

    pub fn format_character(&self, character: &CocCharacter, index: usize) -> String {
        format_coc_character(character, index)
    }

    pub fn generate_ability_scores(&mut self) -> Vec<i32> {
        self.characters.roll_ability_scores(&mut self.rng)
    }

    pub fn format_ability_scores(&self, scores: &[i32], index: usize) -> String {
        format_ability_scores(scores, index)
    }

    pub fn generate_names<G: NameGenerator + ?Sized>(
        &self,
        generator: &mut G,
        language: &str,
        count: usize,
        sex: Option<Sex>,
    ) -> Vec<String> {
        generate_names(&self.store, generator, language, count, sex)
    }
}

impl TrpgEngineBuilder {
    pub fn schema_path(mut self, path: &str) -> Self {
        self.schema_path = Some(path.to_string());
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn tables_dir(mut self, path: &str) -> Self {
        self.tables_dir = Some(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_schema(mut self, schema: ConfigValue) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_config(mut self, config: ConfigValue) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_tables(mut self, tables: PhobiaManiaTables) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Use an existing store. It is initialized only if a schema or config
    /// is also given.
    pub fn with_store(mut self, store: Arc<ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<TrpgEngine, EngineError> {
        let schema = match (self.schema, &self.schema_path) {
            (Some(schema), _) => Some(schema),
            (None, Some(path)) => Some(config::load_file(Path::new(path))?),
            (None, None) => None,
        };
        let tree = match (self.config, &self.config_path) {
            (Some(tree), _) => Some(tree),
            (None, Some(path)) => Some(config::load_file(Path::new(path))?),
            (None, None) => None,
        };

        let store = match (self.store, schema, tree) {
            (Some(store), None, None) => store,
            (store, schema, tree) => {
                let store = store.unwrap_or_default();
                let schema = match schema {
                    Some(schema) => schema,
                    None => config::builtin_schema()?,
                };
                // Without an explicit tree the schema's defaults are the configuration.
                let tree = tree.unwrap_or_else(|| schema.clone());
                store.initialize(schema, tree);
                store
            }
        };

        let tables = match (self.tables, &self.tables_dir) {
            (Some(tables), _) => tables,
            (None, Some(dir)) => PhobiaManiaTables::load_from_dir(Path::new(dir))?,
            (None, None) => PhobiaManiaTables::builtin()?,
        };

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(TrpgEngine {
            templates: TemplateResolver::new(Arc::clone(&store)),
            characters: CharacterGenerator::new(Arc::clone(&store)),
            sanity: SanityEngine::new(Arc::clone(&store), Arc::new(tables)),
            store,
            rng,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded(seed: u64) -> TrpgEngine {
        TrpgEngine::builder().seed(seed).build().unwrap()
    }

    #[test]
    fn default_build_uses_builtin_schema() {
        let engine = seeded(1);
        assert!(engine.config_info().initialized);
        assert_eq!(
            engine.resolve_config("sanity.dice_range.max", ConfigValue::Null),
            ConfigValue::Int(100)
        );
        assert_eq!(
            engine.render_template("san.check.success", &HashMap::new()),
            "Sanity check passed."
        );
    }

    #[test]
    fn same_seed_same_output() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        assert_eq!(a.generate_character(), b.generate_character());
        assert_eq!(a.generate_ability_scores(), b.generate_ability_scores());
        assert_eq!(a.temporary_insanity(), b.temporary_insanity());
        assert_eq!(a.long_term_insanity(), b.long_term_insanity());
    }

    #[test]
    fn reseed_restarts_sequence() {
        let mut engine = seeded(3);
        let first = engine.generate_ability_scores();
        engine.reseed(3);
        assert_eq!(engine.generate_ability_scores(), first);
    }

    #[test]
    fn explicit_config_overrides_defaults() {
        let config = ConfigValue::from(json!({
            "output": {"san": {"check": {"success": "calm", "failure": "shaken"}}},
            "sanity": {"dice_range": {"min": 100, "max": 100}}
        }));
        let mut engine = TrpgEngine::builder()
            .seed(9)
            .with_config(config)
            .build()
            .unwrap();
        let mut record = CharacterRecord::with_sanity(50);
        let check = engine.sanity_check(&mut record, "1/2").unwrap();
        assert_eq!(check.roll, 100);
        assert_eq!(check.message, "shaken");
        assert_eq!(check.new_san, 48);
    }

    #[test]
    fn shared_uninitialized_store_fails_sanity_checks() {
        let store = Arc::new(ConfigStore::new());
        let mut engine = TrpgEngine::builder()
            .with_store(Arc::clone(&store))
            .seed(1)
            .build()
            .unwrap();
        let mut record = CharacterRecord::with_sanity(50);
        assert!(matches!(
            engine.sanity_check(&mut record, "1d6"),
            Err(EngineError::Sanity(SanityError::Uninitialized))
        ));
        // The character generator still falls back to literal defaults.
        assert!(engine.generate_character().hp > 0);

        store.initialize(ConfigValue::Null, ConfigValue::from(json!({})));
        assert!(engine.sanity_check(&mut record, "1d6").is_ok());
    }

    #[test]
    fn narrate_sanity_check_uses_result_template() {
        let mut engine = seeded(5);
        let mut record = CharacterRecord::with_sanity(100);
        record.name = Some("Harvey".to_string());
        let text = engine.narrate_sanity_check(&mut record, "0").unwrap();
        assert!(text.starts_with("Harvey rolled "));
        assert!(text.contains("Sanity check passed."));
        assert!(text.ends_with("Lost 0, SAN is now 100."));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = TrpgEngine::builder()
            .config_path("does/not/exist.json")
            .build();
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Io(_)))));
    }
}
