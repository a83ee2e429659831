//! Belt colors for rank labels.
//!
//! Rank labels are Portuguese color names. A compound label such as
//! `"Vermelha e Preta"` describes a two-colored belt and is drawn half and
//! half, first color on the left.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Fill used for ranks whose color is not known.
pub const DEFAULT_COLOR: &str = "#6c757d";

/// Border drawn around unknown colors.
const DEFAULT_BORDER: &str = "#343a40";

/// Border drawn around white belts so they stay visible.
const WHITE_BORDER: &str = "#dee2e6";

const WHITE: &str = "#ffffff";

/// Known belt colors, keyed by lower-case label.
const COLOR_MAP: &[(&str, &str)] = &[
    ("branca", WHITE),
    ("cinza", "#808080"),
    ("azul", "#007bff"),
    ("amarela", "#ffc107"),
    ("vermelha", "#dc3545"),
    ("laranja", "#fd7e14"),
    ("verde", "#28a745"),
    ("roxa", "#6f42c1"),
    ("marrom", "#8B4513"),
    ("preta", "#000000"),
];

fn compound_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s+e\s+").expect("separator pattern is valid"))
}

fn lookup(color: &str) -> Option<&'static str> {
    COLOR_MAP
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, hex)| *hex)
}

/// How a rank badge is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankFill {
    /// A single color, optionally outlined.
    Solid {
        /// Fill color.
        color: &'static str,
        /// Outline color, if any.
        border: Option<&'static str>,
    },
    /// Two colors split at 50%.
    Split {
        /// Left half.
        left: &'static str,
        /// Right half.
        right: &'static str,
    },
}

impl RankFill {
    /// The fill as CSS declarations.
    #[must_use]
    pub fn css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RankFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid {
                color,
                border: None,
            } => write!(f, "background-color: {color};"),
            Self::Solid {
                color,
                border: Some(border),
            } => write!(f, "background-color: {color}; border: 1px solid {border};"),
            Self::Split { left, right } => write!(
                f,
                "background: linear-gradient(to right, {left} 50%, {right} 50%);"
            ),
        }
    }
}

/// The fill for a rank label.
///
/// Matching ignores case and surrounding whitespace. A label made of exactly
/// two colors joined by `e` gives a split fill, with unknown halves drawn in
/// [`DEFAULT_COLOR`]. Unknown single labels get [`DEFAULT_COLOR`] with a dark
/// outline.
#[must_use]
pub fn rank_fill(rank: &str) -> RankFill {
    let label = rank.trim().to_lowercase();

    let parts: Vec<&str> = compound_separator().split(&label).collect();
    if let [left, right] = parts.as_slice() {
        return RankFill::Split {
            left: lookup(left).unwrap_or(DEFAULT_COLOR),
            right: lookup(right).unwrap_or(DEFAULT_COLOR),
        };
    }

    match lookup(&label) {
        Some(WHITE) => RankFill::Solid {
            color: WHITE,
            border: Some(WHITE_BORDER),
        },
        Some(color) => RankFill::Solid {
            color,
            border: None,
        },
        None => RankFill::Solid {
            color: DEFAULT_COLOR,
            border: Some(DEFAULT_BORDER),
        },
    }
}
