//! Conversion between comma-delimited wire strings and ordered lists.
//!
//! The agent store exchanges `suggested_prompts`, `files` and `deleted_files`
//! as comma-delimited strings. Everything inside the crate works with
//! `Vec<String>`; these helpers are the only place the two meet.

use serde::{Deserialize, Deserializer, Serializer};

/// Separator used when joining a list for the wire.
pub const SEPARATOR: &str = ", ";

/// Split a comma-delimited string into trimmed, non-empty items.
///
/// Items are otherwise taken verbatim, so `split(&join(items))` returns
/// `items` for any list whose items are trimmed and free of commas.
pub fn split(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join items into the comma-delimited wire form.
pub fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListRepr {
    Delimited(String),
    Items(Vec<String>),
}

/// Serde adapter for list fields carried as comma-delimited strings.
///
/// Deserialization also accepts a JSON array or `null`.
pub mod list {
    use super::*;

    pub fn serialize<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&join(items))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let items = match Option::<ListRepr>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(ListRepr::Delimited(raw)) => split(&raw),
            Some(ListRepr::Items(items)) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        };
        Ok(items)
    }
}

/// Serde adapter that decodes `null` text as an empty string.
pub mod text {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}
