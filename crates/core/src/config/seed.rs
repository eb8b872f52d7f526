use derive_more::Display;
use fnv::FnvHasher;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// RNG seed for one of the randomized generators. Every generator builds its
/// RNG through [Seed::rng], so a seed fully determines its output.
///
/// Deserializes from either an unsigned integer or a string. A string that
/// parses as a `u64` becomes that integer; anything else is kept as text and
/// hashed whenever the seed is used. Seeds always serialize as a string, since
/// neither JSON nor TOML can hold every `u64`.
#[derive(Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSeed", into = "String")]
pub enum Seed {
    Int(u64),
    Text(String),
}

impl Seed {
    pub fn to_u64(&self) -> u64 {
        match self {
            Self::Int(seed) => *seed,
            Self::Text(text) => {
                let mut hasher = FnvHasher::default();
                text.hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    pub fn rng(&self) -> Pcg64 {
        Pcg64::seed_from_u64(self.to_u64())
    }
}

impl Default for Seed {
    fn default() -> Self {
        // Danger! This means the default will vary between calls!
        Self::Int(rand::random())
    }
}

impl From<u64> for Seed {
    fn from(seed: u64) -> Self {
        Self::Int(seed)
    }
}

impl From<&str> for Seed {
    fn from(text: &str) -> Self {
        text.parse().map_or_else(|_| Self::Text(text.into()), Self::Int)
    }
}

impl From<Seed> for String {
    fn from(seed: Seed) -> Self {
        seed.to_string()
    }
}

/// What a seed can look like on the way in
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeed {
    Int(u64),
    Text(String),
}

impl From<RawSeed> for Seed {
    fn from(raw: RawSeed) -> Self {
        match raw {
            RawSeed::Int(seed) => Self::Int(seed),
            RawSeed::Text(text) => text.as_str().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{
        assert_de_tokens, assert_de_tokens_error, assert_ser_tokens, Token,
    };

    #[test]
    fn test_from_str() {
        assert_eq!(Seed::from("0"), Seed::Int(0));
        assert_eq!(Seed::from("90210"), Seed::Int(90210));
        assert_eq!(Seed::from("-3"), Seed::Text("-3".into()));
        assert_eq!(Seed::from("hamlet"), Seed::Text("hamlet".into()));
    }

    #[test]
    fn test_text_seed_is_stable() {
        let seed = Seed::from("bramblewick");
        assert_eq!(seed.to_u64(), Seed::from("bramblewick").to_u64());
        assert_ne!(seed.to_u64(), Seed::from("thornbury").to_u64());
        assert_eq!(Seed::Int(17).to_u64(), 17);
    }

    #[test]
    fn test_serialize() {
        assert_ser_tokens(&Seed::Int(7), &[Token::Str("7")]);
        assert_ser_tokens(&Seed::Text("hamlet".into()), &[Token::Str("hamlet")]);
    }

    #[test]
    fn test_deserialize() {
        assert_de_tokens(&Seed::Int(1234), &[Token::U64(1234)]);
        assert_de_tokens(&Seed::Int(1234), &[Token::Str("1234")]);
        assert_de_tokens(&Seed::Text("hamlet".into()), &[Token::Str("hamlet")]);
        assert_de_tokens_error::<Seed>(
            &[Token::I64(-5)],
            "data did not match any variant of untagged enum RawSeed",
        );
    }
}
