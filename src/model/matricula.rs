use derive_more::Display;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Employee registration number, formatted `NNNNN-NN`.
///
/// Generated once at registration and never changed afterwards; every punch
/// record refers to its employee through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Matricula(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("registration number must look like NNNNN-NN, got {0:?}")]
pub struct MatriculaFormatError(pub String);

impl Matricula {
    /// Draws a random candidate. Uniqueness is the caller's concern.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let head: u32 = rng.gen_range(0..100_000);
        let tail: u32 = rng.gen_range(0..100);
        Matricula(format!("{head:05}-{tail:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Matricula {
    type Err = MatriculaFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 8
            && bytes[5] == b'-'
            && bytes[..5].iter().all(u8::is_ascii_digit)
            && bytes[6..].iter().all(u8::is_ascii_digit);

        if well_formed {
            Ok(Matricula(s.to_string()))
        } else {
            Err(MatriculaFormatError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Matricula {
    type Error = MatriculaFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Matricula> for String {
    fn from(value: Matricula) -> Self {
        value.0
    }
}

impl AsRef<str> for Matricula {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
