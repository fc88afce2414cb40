/// Sanity mechanics — the sanity check transition and insanity symptoms.
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::ConfigStore;
use crate::core::dice::{evaluate_checked, roll_range, LossFormula};
use crate::core::template::TemplateResolver;
use crate::schema::character::CharacterRecord;
use crate::schema::tables::PhobiaManiaTables;

/// Symptom index that appends a rolled phobia. Tied to the ten-entry
/// default tables; it does not follow a resized table.
pub const PHOBIA_SLOT: usize = 9;
/// Symptom index that appends a rolled mania.
pub const MANIA_SLOT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanityError {
    #[error("configuration is not initialized; sanity checks need thresholds")]
    Uninitialized,
    #[error("character sanity {found} is not a whole number")]
    InvalidSanity { found: String },
}

/// Which side of the check the roll landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckBranch {
    Success,
    Failure,
}

impl CheckBranch {
    /// Template key of the branch's message.
    pub fn template_key(&self) -> &'static str {
        match self {
            Self::Success => "san.check.success",
            Self::Failure => "san.check.failure",
        }
    }
}

/// Everything a caller needs to narrate a sanity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanityCheck {
    pub roll: i64,
    pub prior_san: i64,
    pub message: String,
    pub loss: i64,
    pub new_san: i64,
    pub branch: CheckBranch,
}

/// The two insanity symptom tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsanityKind {
    Temporary,
    LongTerm,
}

impl InsanityKind {
    pub fn table_key(&self) -> &'static str {
        match self {
            Self::Temporary => "output.san.temporary_insanity_types",
            Self::LongTerm => "output.san.long_term_insanity_types",
        }
    }

    /// Text returned when the table is not configured.
    pub fn missing_table_text(&self) -> &'static str {
        match self {
            Self::Temporary => {
                "Temporary insanity: no temporary insanity symptom types found in configuration"
            }
            Self::LongTerm => {
                "Long-term insanity: no long-term insanity symptom types found in configuration"
            }
        }
    }
}

/// Applies sanity checks to character records and picks insanity symptoms.
///
/// Stateless between calls: everything it changes lives in the record the
/// caller passes in.
#[derive(Debug, Clone)]
pub struct SanityEngine {
    store: Arc<ConfigStore>,
    templates: TemplateResolver,
    tables: Arc<PhobiaManiaTables>,
}

impl SanityEngine {
    pub fn new(store: Arc<ConfigStore>, tables: Arc<PhobiaManiaTables>) -> Self {
        Self {
            templates: TemplateResolver::new(Arc::clone(&store)),
            store,
            tables,
        }
    }

    /// Roll against the record's sanity and write the new value back.
    pub fn sanity_check<R: Rng + ?Sized>(
        &self,
        record: &mut CharacterRecord,
        loss_formula: &str,
        rng: &mut R,
    ) -> Result<SanityCheck, SanityError> {
        if !self.store.is_initialized() {
            return Err(SanityError::Uninitialized);
        }
        let min = self.store.get("sanity.dice_range.min", 1i64);
        let max = self.store.get("sanity.dice_range.max", 100i64);
        let roll = roll_range(rng, min, max);
        self.sanity_check_with_roll(record, loss_formula, roll, rng)
    }

    /// Same as `sanity_check` with the deciding roll supplied by the caller.
    pub fn sanity_check_with_roll<R: Rng + ?Sized>(
        &self,
        record: &mut CharacterRecord,
        loss_formula: &str,
        roll: i64,
        rng: &mut R,
    ) -> Result<SanityCheck, SanityError> {
        if !self.store.is_initialized() {
            return Err(SanityError::Uninitialized);
        }
        let prior_san = record
            .try_sanity()
            .map_err(|value| SanityError::InvalidSanity {
                found: value.to_string(),
            })?;
        let formula = LossFormula::parse(loss_formula);

        let (branch, expression) = if roll <= prior_san {
            (CheckBranch::Success, &formula.success)
        } else {
            (CheckBranch::Failure, &formula.failure)
        };
        let loss = i64::try_from(evaluate_checked(expression, rng).into_value()).unwrap_or(i64::MAX);
        let message = self.templates.render_plain(branch.template_key());

        let new_san = prior_san.saturating_sub(loss).max(0);
        record.set_sanity(new_san);
        tracing::debug!(roll, prior_san, loss, new_san, ?branch, "sanity check");

        Ok(SanityCheck {
            roll,
            prior_san,
            message,
            loss,
            new_san,
            branch,
        })
    }

    pub fn temporary_insanity<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.insanity(InsanityKind::Temporary, rng)
    }

    pub fn long_term_insanity<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.insanity(InsanityKind::LongTerm, rng)
    }

    /// Pick a random symptom from the configured table.
    pub fn insanity<R: Rng + ?Sized>(&self, kind: InsanityKind, rng: &mut R) -> String {
        let symptoms = self.symptoms(kind);
        if symptoms.is_empty() {
            return kind.missing_table_text().to_string();
        }
        let index = rng.gen_range(1..=symptoms.len());
        self.describe_symptom(&symptoms, index, rng)
    }

    /// Describe the symptom at a caller-chosen 1-based `index`. Indices
    /// outside the table are clamped into it.
    pub fn insanity_with_roll<R: Rng + ?Sized>(
        &self,
        kind: InsanityKind,
        index: usize,
        rng: &mut R,
    ) -> String {
        let symptoms = self.symptoms(kind);
        if symptoms.is_empty() {
            return kind.missing_table_text().to_string();
        }
        let index = index.clamp(1, symptoms.len());
        self.describe_symptom(&symptoms, index, rng)
    }

    fn symptoms(&self, kind: InsanityKind) -> Vec<String> {
        self.store.get(kind.table_key(), Vec::new())
    }

    fn describe_symptom<R: Rng + ?Sized>(
        &self,
        symptoms: &[String],
        index: usize,
        rng: &mut R,
    ) -> String {
        let token: String = self
            .store
            .get("sanity.insanity_dice.dice", "1D10".to_string());
        let min = self.store.get("sanity.insanity_dice.min", 1i64);
        let max = self.store.get("sanity.insanity_dice.max", 10i64);

        let symptom = &symptoms[index - 1];
        let mut text = if token.is_empty() {
            symptom.clone()
        } else {
            symptom.replace(&token, &roll_range(rng, min, max).to_string())
        };

        if index == PHOBIA_SLOT {
            let roll = self.roll_phobia_mania(rng);
            let detail = self.tables.phobia(roll).unwrap_or_else(|| {
                tracing::warn!(roll, "no phobia entry for roll");
                "unknown phobia"
            });
            text.push_str(&format!("\n→ Phobia: {} (roll {})", detail, roll));
        }
        if index == MANIA_SLOT {
            let roll = self.roll_phobia_mania(rng);
            let detail = self.tables.mania(roll).unwrap_or_else(|| {
                tracing::warn!(roll, "no mania entry for roll");
                "unknown mania"
            });
            text.push_str(&format!("\n→ Mania: {} (roll {})", detail, roll));
        }
        text
    }

    fn roll_phobia_mania<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let min = self.store.get("sanity.phobia_mania_range.min", 1i64);
        let max = self.store.get("sanity.phobia_mania_range.max", 100i64);
        roll_range(rng, min, max)
    }
}
