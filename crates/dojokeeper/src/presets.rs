//! Built-in rank sequences for common styles.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::NewMartialArt;

const TRADITIONAL_KARATE: &[&str] = &[
    "Branca", "Amarela", "Vermelha", "Laranja", "Verde", "Roxa", "Marrom", "Preta",
];

const CONTACT_KARATE: &[&str] = &[
    "Branca", "Amarela", "Laranja", "Verde", "Azul", "Roxa", "Marrom", "Preta",
];

const JIU_JITSU: &[&str] = &[
    "Branca", "Cinza", "Amarela", "Laranja", "Verde", "Azul", "Roxa", "Marrom", "Preta",
];

/// A built-in rank sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankPreset {
    /// Traditional karate belts.
    TraditionalKarate,
    /// Full-contact karate belts.
    ContactKarate,
    /// Jiu-jitsu belts.
    JiuJitsu,
}

impl RankPreset {
    /// Every preset, in display order.
    pub const ALL: [Self; 3] = [Self::TraditionalKarate, Self::ContactKarate, Self::JiuJitsu];

    /// Display name, also used as the default martial-art name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TraditionalKarate => "Karate Tradicional",
            Self::ContactKarate => "Karate Contato",
            Self::JiuJitsu => "Jiu-Jitsu",
        }
    }

    /// Rank labels, lowest first.
    #[must_use]
    pub const fn ranks(self) -> &'static [&'static str] {
        match self {
            Self::TraditionalKarate => TRADITIONAL_KARATE,
            Self::ContactKarate => CONTACT_KARATE,
            Self::JiuJitsu => JIU_JITSU,
        }
    }

    /// A martial-art form using this rank sequence and no requirements.
    #[must_use]
    pub fn new_martial_art(self, uses_degrees: bool, max_degrees: u32) -> NewMartialArt {
        NewMartialArt {
            name: self.name().to_string(),
            ranks: self.ranks().iter().map(ToString::to_string).collect(),
            uses_degrees,
            max_degrees,
            promotion_requirements: std::collections::BTreeMap::new(),
        }
    }

    const fn slug(self) -> &'static str {
        match self {
            Self::TraditionalKarate => "traditional-karate",
            Self::ContactKarate => "contact-karate",
            Self::JiuJitsu => "jiu-jitsu",
        }
    }
}

impl fmt::Display for RankPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RankPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.slug() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.slug()).collect();
                format!("unknown preset '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
