//! Character-level corruption of topics and payloads.
//!
//! Every input unit (a `char` for topics, a byte for payloads) is replaced
//! independently with probability `rate`. Output length in units always
//! equals input length; the engine never inserts or deletes.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const ALPHANUMERIC: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PRINTABLE_FIRST: u8 = 32;
const PRINTABLE_LAST: u8 = 126;

/// Replacement strategy applied to each selected character.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum MutatorKind {
    /// Leave input untouched.
    #[default]
    None,
    /// Draw from the 62 alphanumeric characters.
    Alfa,
    /// Draw from the 95 printable ASCII characters.
    Sym,
    /// XOR the original byte with a random byte. May produce control bytes.
    Bin,
}

impl MutatorKind {
    /// Maps a mutator name to its kind. Unknown names disable mutation.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "alfa" => MutatorKind::Alfa,
            "sym" => MutatorKind::Sym,
            "bin" => MutatorKind::Bin,
            _ => MutatorKind::None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MutatorKind::None => "none",
            MutatorKind::Alfa => "alfa",
            MutatorKind::Sym => "sym",
            MutatorKind::Bin => "bin",
        }
    }
}

impl From<String> for MutatorKind {
    fn from(value: String) -> Self {
        MutatorKind::from_name(&value)
    }
}

impl From<MutatorKind> for String {
    fn from(value: MutatorKind) -> Self {
        value.as_str().to_owned()
    }
}

/// Mutation settings shared read-only by every client.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPolicy {
    kind: MutatorKind,
    rate: f64,
    disallowed: String,
}

impl MutationPolicy {
    #[must_use]
    pub fn new(kind: MutatorKind, rate: f64, disallowed: impl Into<String>) -> Self {
        Self {
            kind,
            rate,
            disallowed: disallowed.into(),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(MutatorKind::None, 0.0, String::new())
    }

    #[must_use]
    pub const fn kind(&self) -> MutatorKind {
        self.kind
    }

    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn disallowed(&self) -> &str {
        &self.disallowed
    }

    const fn is_active(&self) -> bool {
        !matches!(self.kind, MutatorKind::None)
    }

    /// Mutates a UTF-8 string one `char` at a time.
    ///
    /// Replacement characters are always in `U+0000..=U+00FF`; in `bin` mode
    /// the low byte of the original code point is the XOR input.
    pub fn mutate<R: Rng + ?Sized>(&self, input: &str, rng: &mut R) -> String {
        if !self.is_active() {
            return input.to_owned();
        }
        input
            .chars()
            .map(|ch| {
                let [low, ..] = u32::from(ch).to_le_bytes();
                self.replacement(low, rng).map_or(ch, char::from)
            })
            .collect()
    }

    /// Mutates raw payload bytes one byte at a time.
    pub fn mutate_bytes<R: Rng + ?Sized>(&self, input: &[u8], rng: &mut R) -> Vec<u8> {
        if !self.is_active() {
            return input.to_vec();
        }
        input
            .iter()
            .map(|&byte| self.replacement(byte, rng).unwrap_or(byte))
            .collect()
    }

    /// Returns the replacement for one unit, or `None` to keep the original.
    fn replacement<R: Rng + ?Sized>(&self, original: u8, rng: &mut R) -> Option<u8> {
        if rng.r#gen::<f64>() >= self.rate {
            return None;
        }
        let candidate = match self.kind {
            MutatorKind::None => return None,
            MutatorKind::Alfa => ALPHANUMERIC.choose(rng).copied()?,
            MutatorKind::Sym => rng.gen_range(PRINTABLE_FIRST..=PRINTABLE_LAST),
            MutatorKind::Bin => original ^ rng.r#gen::<u8>(),
        };
        if !self.disallowed.is_empty() && self.disallowed.contains(char::from(candidate)) {
            return None;
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const SAMPLES: [&str; 5] = ["", "Hi!", "/load/42", "héllo wörld", "+#/sensor/+/temp"];

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn from_name_falls_back_to_none() {
        assert_eq!(MutatorKind::from_name("alfa"), MutatorKind::Alfa);
        assert_eq!(MutatorKind::from_name("sym"), MutatorKind::Sym);
        assert_eq!(MutatorKind::from_name("bin"), MutatorKind::Bin);
        assert_eq!(MutatorKind::from_name(""), MutatorKind::None);
        assert_eq!(MutatorKind::from_name("ALFA"), MutatorKind::None);
        assert_eq!(MutatorKind::from_name("grammar"), MutatorKind::None);
    }

    #[test]
    fn none_kind_is_identity_for_any_rate() {
        let mut rng = rng();
        for rate in [0.0, 0.5, 1.0] {
            let policy = MutationPolicy::new(MutatorKind::None, rate, "abc");
            for sample in SAMPLES {
                assert_eq!(policy.mutate(sample, &mut rng), sample);
                assert_eq!(policy.mutate_bytes(sample.as_bytes(), &mut rng), sample.as_bytes());
            }
        }
    }

    #[test]
    fn zero_rate_is_identity_for_every_kind() {
        let mut rng = rng();
        for kind in [MutatorKind::Alfa, MutatorKind::Sym, MutatorKind::Bin] {
            let policy = MutationPolicy::new(kind, 0.0, "");
            for sample in SAMPLES {
                assert_eq!(policy.mutate(sample, &mut rng), sample);
            }
        }
    }

    #[test]
    fn length_is_preserved() {
        let mut rng = rng();
        for kind in [MutatorKind::Alfa, MutatorKind::Sym, MutatorKind::Bin] {
            for rate in [0.07, 0.5, 1.0] {
                let policy = MutationPolicy::new(kind, rate, "");
                for sample in SAMPLES {
                    let mutated = policy.mutate(sample, &mut rng);
                    assert_eq!(mutated.chars().count(), sample.chars().count());
                    let mutated_bytes = policy.mutate_bytes(sample.as_bytes(), &mut rng);
                    assert_eq!(mutated_bytes.len(), sample.len());
                }
            }
        }
    }

    #[test]
    fn alfa_full_rate_draws_from_alphanumeric() {
        let mut rng = rng();
        let policy = MutationPolicy::new(MutatorKind::Alfa, 1.0, "");
        for _ in 0..200 {
            let mutated = policy.mutate("Hi!", &mut rng);
            assert_eq!(mutated.chars().count(), 3);
            assert!(mutated.chars().all(|ch| ch.is_ascii_alphanumeric()), "{mutated:?}");
        }
    }

    #[test]
    fn sym_full_rate_stays_printable() {
        let mut rng = rng();
        let policy = MutationPolicy::new(MutatorKind::Sym, 1.0, "");
        let mutated = policy.mutate_bytes(&[0_u8; 512], &mut rng);
        assert!(mutated.iter().all(|byte| (32..=126).contains(byte)));
    }

    #[test]
    fn disallowed_characters_are_never_introduced() {
        let mut rng = rng();
        let policy = MutationPolicy::new(MutatorKind::Sym, 1.0, "+#");
        let input = "a/b/c".repeat(100);
        for _ in 0..20 {
            let mutated = policy.mutate(&input, &mut rng);
            assert!(!mutated.contains('+') && !mutated.contains('#'));
        }
    }

    #[test]
    fn disallowed_filter_only_applies_to_replacements() {
        let mut rng = rng();
        let policy = MutationPolicy::new(MutatorKind::Alfa, 1.0, "+");
        let mutated = policy.mutate("+++", &mut rng);
        assert_eq!(mutated.chars().count(), 3);
        assert!(mutated.chars().all(|ch| ch.is_ascii_alphanumeric()));

        let every_alphanumeric = std::str::from_utf8(ALPHANUMERIC).unwrap_or_default();
        let filter_all = MutationPolicy::new(MutatorKind::Alfa, 1.0, every_alphanumeric);
        assert_eq!(filter_all.mutate("+#+", &mut rng), "+#+");
    }

    #[test]
    fn bin_full_rate_flips_bits() {
        let mut rng = rng();
        let policy = MutationPolicy::new(MutatorKind::Bin, 1.0, "");
        let input = vec![0x55_u8; 256];
        let mutated = policy.mutate_bytes(&input, &mut rng);
        assert_eq!(mutated.len(), input.len());
        assert_ne!(mutated, input);
    }

    #[test]
    fn same_seed_same_output() {
        let policy = MutationPolicy::new(MutatorKind::Sym, 0.3, "");
        let first = policy.mutate("deterministic/topic", &mut rng());
        let second = policy.mutate("deterministic/topic", &mut rng());
        assert_eq!(first, second);
    }
}
