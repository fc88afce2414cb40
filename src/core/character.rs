/// Character generation — CoC investigators and D&D ability scores.
use rand::Rng;
use std::sync::Arc;

use crate::core::config::ConfigStore;
use crate::schema::character::{
    default_db_build_table, CocCharacter, DbBuildEntry, DiceSpec, DropLowestSpec,
};

/// Damage bonus and build for a given STR + SIZ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbBuild {
    pub db: String,
    pub build: i32,
}

/// Pick the first row whose threshold is at or above `str_val + siz_val`.
/// The table must be sorted ascending; past the last row the result is `+0`.
pub fn db_build(table: &[DbBuildEntry], str_val: i32, siz_val: i32) -> DbBuild {
    let total = str_val.saturating_add(siz_val);
    table
        .iter()
        .find(|row| total <= row.threshold)
        .map(|row| DbBuild {
            db: row.db.clone(),
            build: row.build,
        })
        .unwrap_or_else(|| DbBuild {
            db: "+0".to_string(),
            build: 0,
        })
}

/// Rolls characters using dice parameters from the configuration.
#[derive(Debug, Clone)]
pub struct CharacterGenerator {
    store: Arc<ConfigStore>,
}

impl CharacterGenerator {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    /// Roll a full investigator.
    ///
    /// STR, CON, DEX, APP and POW use `character.coc.dice.three_d6`; SIZ, INT
    /// and EDU use `character.coc.dice.two_d6_plus_6`; luck uses
    /// `character.coc.luck_dice`. HP = (SIZ+CON)/10, MP = POW/5, SAN = POW.
    pub fn roll_coc<R: Rng + ?Sized>(&self, rng: &mut R) -> CocCharacter {
        let three_d6 = self
            .store
            .get("character.coc.dice.three_d6", DiceSpec::three_d6());
        let two_d6_plus_6 = self
            .store
            .get("character.coc.dice.two_d6_plus_6", DiceSpec::two_d6_plus_6());
        let luck_dice = self.store.get("character.coc.luck_dice", DiceSpec::three_d6());
        let table = self.store.get("db_build.table", default_db_build_table());

        let str = three_d6.roll(rng);
        let con = three_d6.roll(rng);
        let siz = two_d6_plus_6.roll(rng);
        let dex = three_d6.roll(rng);
        let app = three_d6.roll(rng);
        let int = two_d6_plus_6.roll(rng);
        let pow = three_d6.roll(rng);
        let edu = two_d6_plus_6.roll(rng);
        let luck = luck_dice.roll(rng);
        let DbBuild { db, build } = db_build(&table, str, siz);

        CocCharacter {
            str,
            con,
            siz,
            dex,
            app,
            int,
            pow,
            edu,
            hp: siz.saturating_add(con) / 10,
            mp: pow / 5,
            san: pow,
            luck,
            db,
            build,
            total: [str, con, siz, dex, app, int, pow, edu]
                .into_iter()
                .fold(0, i32::saturating_add),
        }
    }

    /// Roll `character.dnd.attributes_count` scores with `character.dnd.dice`.
    pub fn roll_ability_scores<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<i32> {
        let spec = self
            .store
            .get("character.dnd.dice", DropLowestSpec::default());
        let count: usize = self.store.get("character.dnd.attributes_count", 6);
        (0..count).map(|_| spec.roll(rng)).collect()
    }
}

pub fn format_coc_character(c: &CocCharacter, index: usize) -> String {
    format!(
        "Investigator #{}\n\
         STR: {}  CON: {}  SIZ: {}\n\
         DEX: {}  APP: {}  INT: {}\n\
         POW: {}  EDU: {}\n\
         HP: {}  MP: {}  SAN: {}  LUCK: {}\n\
         DB: {}  TOTAL: {} / {}",
        index,
        c.str,
        c.con,
        c.siz,
        c.dex,
        c.app,
        c.int,
        c.pow,
        c.edu,
        c.hp,
        c.mp,
        c.san,
        c.luck,
        c.db,
        c.total,
        c.total.saturating_add(c.luck)
    )
}

/// Scores are listed highest first, followed by their sum.
pub fn format_ability_scores(scores: &[i32], index: usize) -> String {
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let list = sorted
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Adventurer #{}\n[{}] → total {}",
        index,
        list,
        sorted.iter().map(|&s| i64::from(s)).sum::<i64>()
    )
}
