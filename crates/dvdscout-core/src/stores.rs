use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Maximum accepted store name length, in characters.
pub const MAX_STORE_NAME_LEN: usize = 200;

/// Where a store record came from. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreSource {
    #[default]
    Manual,
    Directory,
    Reddit,
}

impl StoreSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreSource::Manual => "manual",
            StoreSource::Directory => "directory",
            StoreSource::Reddit => "reddit",
        }
    }
}

impl fmt::Display for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(StoreSource::Manual),
            "directory" => Ok(StoreSource::Directory),
            "reddit" => Ok(StoreSource::Reddit),
            other => Err(CoreError::InvalidStoreSource(other.to_string())),
        }
    }
}

/// Trim a store name and reject empty or oversized values.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the trimmed name is empty or longer
/// than [`MAX_STORE_NAME_LEN`] characters.
pub fn validate_store_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_STORE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "name must be at most {MAX_STORE_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text, collapsing whitespace-only values to `None`.
#[must_use]
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_source_defaults_to_manual() {
        assert_eq!(StoreSource::default(), StoreSource::Manual);
    }

    #[test]
    fn store_source_round_trips_through_serde() {
        let json = serde_json::to_string(&StoreSource::Directory).unwrap();
        assert_eq!(json, "\"directory\"");
        let parsed: StoreSource = serde_json::from_str("\"reddit\"").unwrap();
        assert_eq!(parsed, StoreSource::Reddit);
    }

    #[test]
    fn store_source_rejects_unknown_values() {
        assert_eq!(
            "yelp".parse::<StoreSource>(),
            Err(CoreError::InvalidStoreSource("yelp".to_string()))
        );
    }

    #[test]
    fn validate_store_name_trims() {
        assert_eq!(
            validate_store_name("  Retro Flicks ").unwrap(),
            "Retro Flicks"
        );
    }

    #[test]
    fn validate_store_name_rejects_blank() {
        assert!(validate_store_name("").is_err());
        assert!(validate_store_name("   \t").is_err());
    }

    #[test]
    fn validate_store_name_rejects_oversized() {
        let long = "x".repeat(MAX_STORE_NAME_LEN + 1);
        assert!(validate_store_name(&long).is_err());
        let max = "x".repeat(MAX_STORE_NAME_LEN);
        assert!(validate_store_name(&max).is_ok());
    }

    #[test]
    fn normalize_optional_text_drops_blank_values() {
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(
            normalize_optional_text(Some(" Austin ")),
            Some("Austin".to_string())
        );
    }
}
