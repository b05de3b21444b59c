use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EOR vendors whose quote payloads the engine knows how to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Deel,
    Remote,
    Rippling,
    Rivermate,
    Skuad,
    VelocityGlobal,
    Oyster,
    Playroll,
    Omnipresent,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown provider `{0}`")]
pub struct UnknownProvider(pub String);

impl ProviderId {
    pub const ALL: [ProviderId; 9] = [
        Self::Deel,
        Self::Remote,
        Self::Rippling,
        Self::Rivermate,
        Self::Skuad,
        Self::VelocityGlobal,
        Self::Oyster,
        Self::Playroll,
        Self::Omnipresent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deel => "deel",
            Self::Remote => "remote",
            Self::Rippling => "rippling",
            Self::Rivermate => "rivermate",
            Self::Skuad => "skuad",
            Self::VelocityGlobal => "velocity_global",
            Self::Oyster => "oyster",
            Self::Playroll => "playroll",
            Self::Omnipresent => "omnipresent",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .trim()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "deel" => Ok(Self::Deel),
            "remote" => Ok(Self::Remote),
            "rippling" => Ok(Self::Rippling),
            "rivermate" => Ok(Self::Rivermate),
            "skuad" => Ok(Self::Skuad),
            "velocityglobal" | "velocity" => Ok(Self::VelocityGlobal),
            "oyster" | "oysterhr" => Ok(Self::Oyster),
            "playroll" => Ok(Self::Playroll),
            "omnipresent" => Ok(Self::Omnipresent),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderId;

    #[test]
    fn parses_common_spellings() {
        assert_eq!("Velocity Global".parse::<ProviderId>(), Ok(ProviderId::VelocityGlobal));
        assert_eq!("velocity-global".parse::<ProviderId>(), Ok(ProviderId::VelocityGlobal));
        assert_eq!(" DEEL ".parse::<ProviderId>(), Ok(ProviderId::Deel));
        let error = "papaya".parse::<ProviderId>().expect_err("unknown");
        assert_eq!(error.to_string(), "unknown provider `papaya`");
    }

    #[test]
    fn as_str_round_trips_for_every_provider() {
        for provider in ProviderId::ALL {
            assert_eq!(provider.as_str().parse::<ProviderId>(), Ok(provider));
        }
    }
}
