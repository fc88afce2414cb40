//! WASM bindings for trpg-engine — lets a browser-hosted bot run dice,
//! character generation and sanity checks without a server round trip.

use std::collections::HashMap;
use wasm_bindgen::prelude::*;

use trpg_engine::core::config;
use trpg_engine::core::engine::TrpgEngine;
use trpg_engine::core::sanity::SanityCheck;
use trpg_engine::schema::character::{CharacterRecord, CocCharacter};
use trpg_engine::schema::value::ConfigValue;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct SanityOutcome {
    character: CharacterRecord,
    check: SanityCheck,
}

#[derive(serde::Serialize)]
struct AbilityRoll {
    scores: Vec<i32>,
    text: String,
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

#[wasm_bindgen]
pub struct TrpgSession {
    engine: TrpgEngine,
    config_json: String,
}

#[wasm_bindgen]
impl TrpgSession {
    /// Create a session. An empty `config_json` uses the built-in defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, seed: u64) -> Result<TrpgSession, JsError> {
        let mut builder = TrpgEngine::builder().seed(seed);
        if !config_json.trim().is_empty() {
            let tree =
                config::parse_json(config_json).map_err(|e| js_err("Invalid config JSON", e))?;
            builder = builder.with_config(tree);
        }
        let engine = builder
            .build()
            .map_err(|e| js_err("Engine build error", e))?;

        Ok(TrpgSession {
            engine,
            config_json: config_json.to_string(),
        })
    }

    /// Resolve a dotted key. Returns the value as JSON; `default_json` is
    /// returned when the key is absent.
    pub fn resolve_config(&self, key: &str, default_json: &str) -> Result<String, JsError> {
        let default: ConfigValue = if default_json.trim().is_empty() {
            ConfigValue::Null
        } else {
            serde_json::from_str(default_json).map_err(|e| js_err("Invalid default JSON", e))?
        };
        let value = self.engine.resolve_config(key, default);
        serde_json::to_string(&value).map_err(|e| js_err("Serialization error", e))
    }

    /// Render an output template with a JSON object of string substitutions.
    pub fn render_template(&self, key: &str, substitutions_json: &str) -> Result<String, JsError> {
        let substitutions: HashMap<String, String> = if substitutions_json.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(substitutions_json)
                .map_err(|e| js_err("Invalid substitutions JSON", e))?
        };
        Ok(self.engine.render_template(key, &substitutions))
    }

    /// Run a sanity check against a character record.
    ///
    /// Returns `{"character": <updated record>, "check": {...}}`.
    pub fn sanity_check(&mut self, character_json: &str, loss_formula: &str) -> Result<String, JsError> {
        let mut character: CharacterRecord = serde_json::from_str(character_json)
            .map_err(|e| js_err("Invalid character JSON", e))?;
        let check = self
            .engine
            .sanity_check(&mut character, loss_formula)
            .map_err(|e| js_err("Sanity check error", e))?;
        serde_json::to_string(&SanityOutcome { character, check })
            .map_err(|e| js_err("Serialization error", e))
    }

    pub fn temporary_insanity(&mut self) -> String {
        self.engine.temporary_insanity()
    }

    pub fn long_term_insanity(&mut self) -> String {
        self.engine.long_term_insanity()
    }

    /// Roll `count` investigators. Returns a JSON array of character sheets.
    pub fn generate_characters(&mut self, count: usize) -> Result<String, JsError> {
        let characters: Vec<CocCharacter> =
            (0..count).map(|_| self.engine.generate_character()).collect();
        serde_json::to_string(&characters).map_err(|e| js_err("Serialization error", e))
    }

    /// Human-readable sheet for a character produced by `generate_characters`.
    pub fn format_character(&self, character_json: &str, index: usize) -> Result<String, JsError> {
        let character: CocCharacter = serde_json::from_str(character_json)
            .map_err(|e| js_err("Invalid character JSON", e))?;
        Ok(self.engine.format_character(&character, index))
    }

    /// Roll `count` sets of ability scores. Returns a JSON array of
    /// `{scores, text}` objects.
    pub fn generate_ability_scores(&mut self, count: usize) -> Result<String, JsError> {
        let rolls: Vec<AbilityRoll> = (1..=count)
            .map(|index| {
                let scores = self.engine.generate_ability_scores();
                let text = self.engine.format_ability_scores(&scores, index);
                AbilityRoll { scores, text }
            })
            .collect();
        serde_json::to_string(&rolls).map_err(|e| js_err("Serialization error", e))
    }

    pub fn config_info(&self) -> String {
        serde_json::to_string(&self.engine.config_info()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Reset the engine with a new seed (same configuration).
    pub fn reset(&mut self, seed: u64) -> Result<(), JsError> {
        let fresh = TrpgSession::new(&self.config_json.clone(), seed)?;
        self.engine = fresh.engine;
        Ok(())
    }
}
