//! Inter-message wait computation.
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Shape of the distribution the wait between publishes is drawn from.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ScheduleKind {
    /// Always wait exactly the nominal interval.
    Flat,
    /// Mean = interval, standard deviation = interval / 2.
    #[default]
    Normal,
    /// Uniform over `[0, 2 * interval)`.
    Random,
}

impl ScheduleKind {
    /// Maps a schedule name to its kind. Unknown names fall back to `random`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "flat" => ScheduleKind::Flat,
            "normal" => ScheduleKind::Normal,
            _ => ScheduleKind::Random,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScheduleKind::Flat => "flat",
            ScheduleKind::Normal => "normal",
            ScheduleKind::Random => "random",
        }
    }
}

impl From<String> for ScheduleKind {
    fn from(value: String) -> Self {
        ScheduleKind::from_name(&value)
    }
}

impl From<ScheduleKind> for String {
    fn from(value: ScheduleKind) -> Self {
        value.as_str().to_owned()
    }
}

/// Computes the next delay in milliseconds for a nominal interval.
///
/// Non-positive and non-finite intervals yield `0.0`. The `normal` shape can return negative
/// values; [`SchedulePolicy::next_wait`] clamps those to zero.
#[expect(
    clippy::float_arithmetic,
    reason = "Delays are sampled from continuous distributions."
)]
pub fn next_delay_ms<R: Rng + ?Sized>(nominal_ms: f64, kind: ScheduleKind, rng: &mut R) -> f64 {
    if !nominal_ms.is_finite() || nominal_ms <= 0.0 {
        return 0.0;
    }
    match kind {
        ScheduleKind::Flat => nominal_ms,
        ScheduleKind::Normal => Normal::new(nominal_ms, nominal_ms / 2.0)
            .map_or(nominal_ms, |normal| normal.sample(rng)),
        ScheduleKind::Random => {
            let upper = nominal_ms * 2.0;
            rng.gen_range(0.0..if upper.is_finite() { upper } else { f64::MAX })
        }
    }
}

/// Per-run pacing: nominal interval plus distribution shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    interval_ms: i64,
    kind: ScheduleKind,
}

impl SchedulePolicy {
    #[must_use]
    pub const fn new(interval_ms: i64, kind: ScheduleKind) -> Self {
        Self { interval_ms, kind }
    }

    #[must_use]
    pub const fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    #[must_use]
    pub const fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// Returns how long to sleep after a publish, or `None` to skip waiting.
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "Millisecond intervals are converted to fractional seconds."
    )]
    pub fn next_wait<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        if self.interval_ms <= 0 {
            return None;
        }
        let delay_ms = next_delay_ms(self.interval_ms as f64, self.kind, rng).max(0.0);
        Some(Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const SAMPLE_COUNT: u32 = 10_000;

    fn mean_of(kind: ScheduleKind, rng: &mut StdRng) -> f64 {
        let mut total = 0.0_f64;
        for _ in 0..SAMPLE_COUNT {
            total += next_delay_ms(100.0, kind, rng);
        }
        total / f64::from(SAMPLE_COUNT)
    }

    #[test]
    fn non_positive_interval_never_waits() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [ScheduleKind::Flat, ScheduleKind::Normal, ScheduleKind::Random] {
            for nominal in [0.0, -1.0, -250.0] {
                assert!(next_delay_ms(nominal, kind, &mut rng).abs() < f64::EPSILON);
            }
            assert!(SchedulePolicy::new(0, kind).next_wait(&mut rng).is_none());
            assert!(SchedulePolicy::new(-5, kind).next_wait(&mut rng).is_none());
        }
    }

    #[test]
    fn non_finite_interval_never_waits() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [ScheduleKind::Flat, ScheduleKind::Normal, ScheduleKind::Random] {
            for nominal in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
                assert!(next_delay_ms(nominal, kind, &mut rng).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn random_draws_stay_finite_near_the_float_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delay = next_delay_ms(f64::MAX, ScheduleKind::Random, &mut rng);
            assert!(delay.is_finite() && delay >= 0.0);
        }
    }

    #[test]
    fn flat_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!((next_delay_ms(100.0, ScheduleKind::Flat, &mut rng) - 100.0).abs() < f64::EPSILON);
        }
        let wait = SchedulePolicy::new(100, ScheduleKind::Flat).next_wait(&mut rng);
        assert_eq!(wait, Some(Duration::from_millis(100)));
    }

    #[test]
    fn normal_mean_tracks_interval() {
        let mut rng = StdRng::seed_from_u64(11);
        let mean = mean_of(ScheduleKind::Normal, &mut rng);
        assert!((90.0..=110.0).contains(&mean), "mean was {mean}");
    }

    #[test]
    fn random_mean_tracks_interval_and_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(13);
        let mean = mean_of(ScheduleKind::Random, &mut rng);
        assert!((90.0..=110.0).contains(&mean), "mean was {mean}");
        for _ in 0..1_000 {
            let delay = next_delay_ms(100.0, ScheduleKind::Random, &mut rng);
            assert!((0.0..200.0).contains(&delay));
        }
    }

    #[test]
    fn negative_normal_draws_clamp_to_zero_wait() {
        let mut rng = StdRng::seed_from_u64(17);
        let policy = SchedulePolicy::new(1, ScheduleKind::Normal);
        for _ in 0..1_000 {
            let wait = policy.next_wait(&mut rng);
            assert!(wait.is_some_and(|value| value < Duration::from_millis(10)));
        }
    }

    #[test]
    fn unknown_names_fall_back_to_random() {
        assert_eq!(ScheduleKind::from_name("flat"), ScheduleKind::Flat);
        assert_eq!(ScheduleKind::from_name("normal"), ScheduleKind::Normal);
        assert_eq!(ScheduleKind::from_name("random"), ScheduleKind::Random);
        assert_eq!(ScheduleKind::from_name("poisson"), ScheduleKind::Random);
    }
}
