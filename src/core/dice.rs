/// Dice notation — parsing, evaluation, and the roll primitives used by
/// character generation.
use rand::Rng;
use std::fmt;

use crate::core::outcome::{Soft, SoftFailure};
use crate::schema::character::{saturate_i32, DiceSpec, DropLowestSpec};

/// A parsed dice expression: `NdM` or a plain non-negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceExpr {
    Roll { count: u64, faces: u64 },
    Flat(u64),
}

impl DiceExpr {
    /// Parse `<digits>[dD]<digits>` or `<digits>`. Anything else, including
    /// surrounding whitespace and zero-faced dice, is not an expression.
    /// Numbers too large for `u64` saturate.
    pub fn parse(input: &str) -> Option<DiceExpr> {
        if let Some((count, faces)) = input.split_once(['d', 'D']) {
            let count = parse_digits(count)?;
            let faces = parse_digits(faces)?;
            if faces == 0 {
                return None;
            }
            return Some(DiceExpr::Roll { count, faces });
        }
        parse_digits(input).map(DiceExpr::Flat)
    }

    /// Totals saturate at `u64::MAX`.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            // Every one-faced die shows 1.
            DiceExpr::Roll { count, faces: 1 } => count,
            DiceExpr::Roll { count, faces } => (0..count)
                .map(|_| roll_die(rng, faces))
                .fold(0u64, u64::saturating_add),
            DiceExpr::Flat(n) => n,
        }
    }

    pub fn min(&self) -> u64 {
        match *self {
            DiceExpr::Roll { count, .. } => count,
            DiceExpr::Flat(n) => n,
        }
    }

    pub fn max(&self) -> u64 {
        match *self {
            DiceExpr::Roll { count, faces } => count.saturating_mul(faces),
            DiceExpr::Flat(n) => n,
        }
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceExpr::Roll { count, faces } => write!(f, "{}d{}", count, faces),
            DiceExpr::Flat(n) => write!(f, "{}", n),
        }
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // All digits, so the only possible parse failure is overflow.
    Some(s.parse().unwrap_or(u64::MAX))
}

/// Sanity loss expressions for a passed and a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossFormula {
    pub success: String,
    pub failure: String,
}

impl LossFormula {
    /// Split `success/failure`. Without a `/` both sides are the same
    /// expression; anything past a second `/` is ignored.
    pub fn parse(formula: &str) -> Self {
        let mut parts = formula.split('/');
        let success = parts.next().unwrap_or_default().to_string();
        let failure = parts.next().map(str::to_string).unwrap_or_else(|| success.clone());
        Self { success, failure }
    }
}

/// Evaluate a dice expression. Unrecognized expressions count as zero.
pub fn evaluate<R: Rng + ?Sized>(expression: &str, rng: &mut R) -> u64 {
    evaluate_checked(expression, rng).into_value()
}

pub fn evaluate_checked<R: Rng + ?Sized>(expression: &str, rng: &mut R) -> Soft<u64> {
    match DiceExpr::parse(expression) {
        Some(expr) => Soft::Clean(expr.roll(rng)),
        None => Soft::degraded(
            0,
            SoftFailure::UnrecognizedDice {
                expression: expression.to_string(),
            },
        ),
    }
}

/// One uniform draw in `[1, faces]`; a zero-faced die rolls 0.
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R, faces: u64) -> u64 {
    if faces == 0 {
        return 0;
    }
    rng.gen_range(1..=faces)
}

/// A uniform draw in `[min, max]`. An inverted range is swapped.
pub fn roll_range<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let (lo, hi) = if min <= max {
        (min, max)
    } else {
        tracing::warn!(min, max, "inverted roll range, swapping bounds");
        (max, min)
    };
    rng.gen_range(lo..=hi)
}

/// `(sum of count dice + bonus) * multiplier`, saturating at the `i32` bounds.
pub fn roll_attribute<R: Rng + ?Sized>(
    rng: &mut R,
    count: u32,
    faces: u32,
    multiplier: i32,
    bonus: i32,
) -> i32 {
    let sum = DiceExpr::Roll {
        count: u64::from(count),
        faces: u64::from(faces),
    }
    .roll(rng);
    let sum = i64::try_from(sum).unwrap_or(i64::MAX);
    saturate_i32(
        sum.saturating_add(i64::from(bonus))
            .saturating_mul(i64::from(multiplier)),
    )
}

/// Roll `count` dice, discard the lowest `drop`, and sum the rest.
pub fn roll_drop_lowest<R: Rng + ?Sized>(rng: &mut R, count: u32, faces: u32, drop: u32) -> i32 {
    let mut rolls: Vec<u64> = (0..count).map(|_| roll_die(rng, u64::from(faces))).collect();
    rolls.sort_unstable();
    let kept = rolls
        .iter()
        .skip(drop as usize)
        .fold(0u64, |acc, &r| acc.saturating_add(r));
    saturate_i32(i64::try_from(kept).unwrap_or(i64::MAX))
}

impl DiceSpec {
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        roll_attribute(rng, self.dice_count, self.dice_faces, self.multiplier, self.bonus)
    }
}

impl DropLowestSpec {
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        roll_drop_lowest(rng, self.dice_count, self.dice_faces, self.drop_lowest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parse_expressions() {
        assert_eq!(DiceExpr::parse("3d6"), Some(DiceExpr::Roll { count: 3, faces: 6 }));
        assert_eq!(DiceExpr::parse("1D100"), Some(DiceExpr::Roll { count: 1, faces: 100 }));
        assert_eq!(DiceExpr::parse("5"), Some(DiceExpr::Flat(5)));
        assert_eq!(DiceExpr::parse("0d6"), Some(DiceExpr::Roll { count: 0, faces: 6 }));
        assert_eq!(DiceExpr::parse("abc"), None);
        assert_eq!(DiceExpr::parse(""), None);
        assert_eq!(DiceExpr::parse("d6"), None);
        assert_eq!(DiceExpr::parse("1d"), None);
        assert_eq!(DiceExpr::parse("1d0"), None);
        assert_eq!(DiceExpr::parse(" 5"), None);
        assert_eq!(DiceExpr::parse("-5"), None);
        assert_eq!(DiceExpr::parse("1d6+1"), None);
        assert_eq!(DiceExpr::parse("99999999999"), Some(DiceExpr::Flat(99_999_999_999)));
        assert_eq!(
            DiceExpr::parse("99999999999999999999999d6"),
            Some(DiceExpr::Roll { count: u64::MAX, faces: 6 })
        );
    }

    #[test]
    fn display_round_trips_notation() {
        assert_eq!(DiceExpr::Roll { count: 2, faces: 10 }.to_string(), "2d10");
        assert_eq!(DiceExpr::Flat(4).to_string(), "4");
    }

    #[test]
    fn loss_formula_split() {
        assert_eq!(
            LossFormula::parse("1d6/1d10"),
            LossFormula {
                success: "1d6".to_string(),
                failure: "1d10".to_string()
            }
        );
        assert_eq!(
            LossFormula::parse("1d6"),
            LossFormula {
                success: "1d6".to_string(),
                failure: "1d6".to_string()
            }
        );
        assert_eq!(LossFormula::parse("0/1d4").success, "0");
        assert_eq!(LossFormula::parse("1/2/3").failure, "2");
        assert_eq!(LossFormula::parse("").failure, "");
    }

    #[test]
    fn evaluate_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let v = evaluate("3d6", &mut rng);
            assert!((3..=18).contains(&v), "3d6 out of range: {}", v);
        }
        assert_eq!(evaluate("5", &mut rng), 5);
        assert_eq!(evaluate("abc", &mut rng), 0);
        assert_eq!(evaluate("0d6", &mut rng), 0);
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(evaluate("5000000000", &mut rng), 5_000_000_000);
        assert_eq!(evaluate("5000000000d1", &mut rng), 5_000_000_000);
        assert_eq!(evaluate("99999999999999999999d1", &mut rng), u64::MAX);
        assert_eq!(DiceExpr::Roll { count: u64::MAX, faces: 6 }.max(), u64::MAX);
    }

    #[test]
    fn extreme_attribute_specs_saturate() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(roll_attribute(&mut rng, 10, 1, i32::MAX, 0), i32::MAX);
        assert_eq!(roll_attribute(&mut rng, 1, 1, i32::MAX, i32::MAX), i32::MAX);
        assert_eq!(roll_attribute(&mut rng, 1, 1, i32::MIN, 0), i32::MIN);
        let huge = DiceSpec {
            dice_count: u32::MAX,
            dice_faces: 1,
            bonus: i32::MAX,
            multiplier: i32::MAX,
        };
        assert_eq!(huge.roll(&mut rng), i32::MAX);
        assert_eq!(huge.min(), i32::MAX);
        assert_eq!(huge.max(), i32::MAX);
    }

    #[test]
    fn evaluate_checked_reports_unrecognized() {
        let mut rng = StdRng::seed_from_u64(7);
        let soft = evaluate_checked("1d6 ", &mut rng);
        assert!(soft.is_degraded());
        assert_eq!(*soft.value(), 0);
        assert!(!evaluate_checked("2d4", &mut rng).is_degraded());
    }

    #[test]
    fn roll_range_inclusive_and_swapped() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = roll_range(&mut rng, 1, 10);
            assert!((1..=10).contains(&v));
            let w = roll_range(&mut rng, 10, 1);
            assert!((1..=10).contains(&w));
        }
        assert_eq!(roll_range(&mut rng, 4, 4), 4);
    }

    #[test]
    fn roll_attribute_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let v = roll_attribute(&mut rng, 2, 6, 5, 6);
            assert!((40..=90).contains(&v));
            assert_eq!(v % 5, 0);
        }
        assert_eq!(roll_attribute(&mut rng, 3, 0, 5, 0), 0);
    }

    #[test]
    fn drop_lowest_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let v = roll_drop_lowest(&mut rng, 4, 6, 1);
            assert!((3..=18).contains(&v), "4d6kh3 out of range: {}", v);
        }
        assert_eq!(roll_drop_lowest(&mut rng, 2, 6, 5), 0);
    }

    #[test]
    fn drop_lowest_drops_smallest() {
        // With one face every die is 1, so the kept sum is count - drop.
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_drop_lowest(&mut rng, 5, 1, 2), 3);
    }

    #[test]
    fn spec_rolls_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let spec = DiceSpec::two_d6_plus_6();
        for _ in 0..200 {
            let v = spec.roll(&mut rng);
            assert!(v >= spec.min() && v <= spec.max());
        }
        let v = DropLowestSpec::default().roll(&mut rng);
        assert!((3..=18).contains(&v));
    }
}
