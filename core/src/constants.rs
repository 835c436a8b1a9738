//! Enumerated values Planka accepts, and the checks that enforce them.

use rand::seq::IndexedRandom;

use crate::error::{ApiError, Result};

pub const BOARD_ROLES: &[&str] = &["editor", "viewer"];

pub const LABEL_COLORS: &[&str] = &[
    "berry-red",
    "pumpkin-orange",
    "lagoon-blue",
    "pink-tulip",
    "light-mud",
    "orange-peel",
    "bright-moss",
    "antique-blue",
    "dark-granite",
    "lagune-blue",
    "sunny-grass",
    "morning-sky",
    "light-orange",
    "midnight-blue",
    "tank-green",
    "gun-metal",
    "wet-moss",
    "red-burgundy",
    "light-concrete",
    "apricot-red",
    "desert-sand",
    "navy-blue",
    "egg-yellow",
    "coral-green",
    "light-cocoa",
];

pub const LIST_COLORS: &[&str] = &[
    "berry-red",
    "pumpkin-orange",
    "lagoon-blue",
    "pink-tulip",
    "light-mud",
    "orange-peel",
    "bright-moss",
    "antique-blue",
    "dark-granite",
    "turquoise-sea",
];

pub const GRADIENTS: &[&str] = &[
    "old-lime",
    "ocean-dive",
    "tzepesch-style",
    "jungle-mesh",
    "strawberry-dust",
    "purple-rose",
    "sun-scream",
    "warm-rust",
    "sky-change",
    "green-eyes",
    "blue-xchange",
    "blood-orange",
    "sour-peel",
    "green-ninja",
    "algae-green",
    "coral-reef",
    "steel-grey",
    "heat-waves",
    "velvet-lounge",
    "purple-rain",
    "blue-steel",
    "blueish-curve",
    "prism-light",
    "green-mist",
    "red-curtain",
];

pub const ACTION_TYPES: &[&str] = &["createCard", "moveCard", "commentCard"];

/// Sort orders accepted by `POST /api/lists/{id}/sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSort {
    Name,
    DueDate,
    OldestFirst,
    NewestFirst,
}

impl ListSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListSort::Name => "name_asc",
            ListSort::DueDate => "dueDate_asc",
            ListSort::OldestFirst => "createdAt_asc",
            ListSort::NewestFirst => "createdAt_desc",
        }
    }
}

/// Reject `value` unless it is one of `valid`.
pub fn validate(field: &'static str, value: &str, valid: &'static [&'static str]) -> Result<()> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::InvalidValue {
            field,
            value: value.to_string(),
            valid,
        })
    }
}

/// Uniform pick from a non-empty table.
pub fn random_choice(values: &'static [&'static str]) -> &'static str {
    values.choose(&mut rand::rng()).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_members_only() {
        assert!(validate("role", "editor", BOARD_ROLES).is_ok());
        let err = validate("color", "neon-pink", LABEL_COLORS).unwrap_err();
        match err {
            ApiError::InvalidValue { field, value, valid } => {
                assert_eq!(field, "color");
                assert_eq!(value, "neon-pink");
                assert_eq!(valid.len(), 25);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn random_choice_stays_in_table() {
        for _ in 0..50 {
            assert!(GRADIENTS.contains(&random_choice(GRADIENTS)));
        }
    }

    #[test]
    fn table_sizes() {
        assert_eq!(GRADIENTS.len(), 25);
        assert_eq!(LIST_COLORS.len(), 10);
    }

    #[test]
    fn sort_wire_names() {
        assert_eq!(ListSort::DueDate.as_str(), "dueDate_asc");
        assert_eq!(ListSort::NewestFirst.as_str(), "createdAt_desc");
    }
}
