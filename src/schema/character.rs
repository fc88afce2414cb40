use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key the sanity check reads and writes.
pub const SANITY_ATTRIBUTE: &str = "san";

/// Parameters of one "NdM + bonus, times multiplier" attribute roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSpec {
    pub dice_count: u32,
    pub dice_faces: u32,
    #[serde(default)]
    pub bonus: i32,
    #[serde(default = "default_multiplier")]
    pub multiplier: i32,
}

fn default_multiplier() -> i32 {
    1
}

impl DiceSpec {
    /// 3d6×5, the roll for most characteristics and for luck.
    pub const fn three_d6() -> Self {
        Self {
            dice_count: 3,
            dice_faces: 6,
            bonus: 0,
            multiplier: 5,
        }
    }

    /// (2d6+6)×5, the roll for SIZ, INT and EDU.
    pub const fn two_d6_plus_6() -> Self {
        Self {
            dice_count: 2,
            dice_faces: 6,
            bonus: 6,
            multiplier: 5,
        }
    }

    /// Smallest value this spec can produce. Saturates at the `i32` bounds.
    pub fn min(&self) -> i32 {
        let dice = if self.dice_faces == 0 { 0 } else { i64::from(self.dice_count) };
        self.apply(dice)
    }

    /// Largest value this spec can produce. Saturates at the `i32` bounds.
    pub fn max(&self) -> i32 {
        self.apply(i64::from(self.dice_count).saturating_mul(i64::from(self.dice_faces)))
    }

    fn apply(&self, dice: i64) -> i32 {
        let value = dice
            .saturating_add(i64::from(self.bonus))
            .saturating_mul(i64::from(self.multiplier));
        saturate_i32(value)
    }
}

/// Parameters of a "roll N, keep the best" ability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropLowestSpec {
    pub dice_count: u32,
    pub dice_faces: u32,
    #[serde(default)]
    pub drop_lowest: u32,
}

impl Default for DropLowestSpec {
    fn default() -> Self {
        Self {
            dice_count: 4,
            dice_faces: 6,
            drop_lowest: 1,
        }
    }
}

/// One row of the damage bonus / build table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbBuildEntry {
    pub threshold: i32,
    pub db: String,
    pub build: i32,
}

impl DbBuildEntry {
    fn new(threshold: i32, db: &str, build: i32) -> Self {
        Self {
            threshold,
            db: db.to_string(),
            build,
        }
    }
}

/// The classic table, sorted ascending by threshold. The last row is a
/// catch-all ceiling.
pub fn default_db_build_table() -> Vec<DbBuildEntry> {
    vec![
        DbBuildEntry::new(64, "-2D6", -2),
        DbBuildEntry::new(84, "-1D6", -1),
        DbBuildEntry::new(124, "+0", 0),
        DbBuildEntry::new(164, "+1D4", 1),
        DbBuildEntry::new(204, "+1D6", 2),
        DbBuildEntry::new(999, "+2D6", 3),
    ]
}

/// A freshly rolled investigator: eight characteristics plus the values
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CocCharacter {
    pub str: i32,
    pub con: i32,
    pub siz: i32,
    pub dex: i32,
    pub app: i32,
    pub int: i32,
    pub pow: i32,
    pub edu: i32,
    pub hp: i32,
    pub mp: i32,
    pub san: i32,
    pub luck: i32,
    pub db: String,
    pub build: i32,
    pub total: i32,
}

impl CocCharacter {
    /// The eight primary characteristics in sheet order.
    pub fn primaries(&self) -> [(&'static str, i32); 8] {
        [
            ("STR", self.str),
            ("CON", self.con),
            ("SIZ", self.siz),
            ("DEX", self.dex),
            ("APP", self.app),
            ("INT", self.int),
            ("POW", self.pow),
            ("EDU", self.edu),
        ]
    }

    /// Convert into a host-facing record. Attribute keys are lowercase so
    /// the sanity check finds `san` where it expects it.
    pub fn to_record(&self) -> CharacterRecord {
        let mut record = CharacterRecord::default();
        for (name, value) in self.primaries() {
            record.set_attribute(&name.to_lowercase(), value as i64);
        }
        record.set_attribute("hp", self.hp as i64);
        record.set_attribute("mp", self.mp as i64);
        record.set_attribute(SANITY_ATTRIBUTE, self.san as i64);
        record.set_attribute("luck", self.luck as i64);
        record.set_attribute("build", self.build as i64);
        record
            .attributes
            .insert("db".to_string(), serde_json::Value::String(self.db.clone()));
        record
    }
}

/// A character as the host stores it. Only `attributes.san` is
/// interpreted here; every other field passes through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CharacterRecord {
    /// A record holding nothing but a sanity value.
    pub fn with_sanity(san: i64) -> Self {
        let mut record = Self::default();
        record.set_sanity(san);
        record
    }

    /// Integer attribute; whole floats such as `50.0` count as integers.
    pub fn attribute(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(whole_number)
    }

    /// Store an integer attribute. A value the host stored as a float stays
    /// a float.
    pub fn set_attribute(&mut self, key: &str, value: i64) {
        let stored = match self.attributes.get(key) {
            Some(existing) if existing.is_f64() => serde_json::Value::from(value as f64),
            _ => serde_json::Value::from(value),
        };
        self.attributes.insert(key.to_string(), stored);
    }

    /// Current sanity; absent or non-integer values read as 0.
    pub fn sanity(&self) -> i64 {
        self.attribute(SANITY_ATTRIBUTE).unwrap_or(0)
    }

    /// Current sanity, distinguishing "not set" (0) from a value that is
    /// present but not a whole number, which comes back as `Err`.
    pub fn try_sanity(&self) -> Result<i64, &serde_json::Value> {
        match self.attributes.get(SANITY_ATTRIBUTE) {
            None | Some(serde_json::Value::Null) => Ok(0),
            Some(value) => whole_number(value).ok_or(value),
        }
    }

    pub fn set_sanity(&mut self, san: i64) {
        self.set_attribute(SANITY_ATTRIBUTE, san);
    }
}

pub(crate) fn saturate_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

fn whole_number(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18)
            .map(|f| f as i64)
    })
}
