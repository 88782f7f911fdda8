//! Multi-array configuration broadcasting.
//!
//! Array-capable configuration fields accept a scalar, a list, or a
//! comma-separated string. They are modeled as a [`MultiValue`] union that is
//! resolved exactly once, at this boundary, into a uniform `Vec` of
//! `array_count` items. Downstream code never sees the union.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A configuration value that is either one scalar or one value per array
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MultiValue<T> {
    Scalar(T),
    List(Vec<T>),
}

impl<T> MultiValue<T> {
    /// Length of the list form; `None` for scalars
    pub fn list_len(&self) -> Option<usize> {
        match self {
            MultiValue::Scalar(_) => None,
            MultiValue::List(items) => Some(items.len()),
        }
    }

    /// View the contained value(s) as a slice
    pub fn items(&self) -> &[T] {
        match self {
            MultiValue::Scalar(value) => std::slice::from_ref(value),
            MultiValue::List(items) => items,
        }
    }
}

impl<T: Clone> MultiValue<T> {
    /// Broadcast to exactly `array_count` items.
    ///
    /// Scalars and length-1 lists replicate; a list whose length already
    /// equals `array_count` is used as-is; any other length is a
    /// configuration error.
    pub fn broadcast(&self, array_count: usize) -> Result<Vec<T>, ConfigError> {
        match self {
            MultiValue::Scalar(value) => Ok(vec![value.clone(); array_count]),
            MultiValue::List(items) if items.len() == array_count => Ok(items.clone()),
            MultiValue::List(items) if items.len() == 1 => {
                Ok(vec![items[0].clone(); array_count])
            }
            MultiValue::List(items) => Err(ConfigError::InconsistentLengths {
                found: items.len(),
                expected: array_count,
            }),
        }
    }
}

/// Broadcast an optional field, substituting `default` when absent
pub fn broadcast_or<T: Clone>(
    value: Option<&MultiValue<T>>,
    array_count: usize,
    default: T,
) -> Result<Vec<T>, ConfigError> {
    match value {
        Some(value) => value.broadcast(array_count),
        None => Ok(vec![default; array_count]),
    }
}

/// Determine the array count from the list lengths of every array-capable
/// field (`None` entries are scalars).
///
/// No lists means one array. Otherwise the count is the maximum list length,
/// every list must have length 1 or that maximum, and empty lists are
/// rejected outright.
pub fn resolve_array_count<I>(list_lens: I) -> Result<usize, ConfigError>
where
    I: IntoIterator<Item = Option<usize>>,
{
    let lengths: Vec<usize> = list_lens.into_iter().flatten().collect();
    let Some(array_count) = lengths.iter().copied().max() else {
        return Ok(1);
    };

    for length in lengths {
        if length == 0 {
            return Err(ConfigError::EmptyList);
        }
        if length != 1 && length != array_count {
            return Err(ConfigError::InconsistentLengths {
                found: length,
                expected: array_count,
            });
        }
    }

    Ok(array_count)
}

/// Item parsing for the comma-separated string form of a [`MultiValue`].
///
/// Mirrors what the host's form layer accepts: lenient booleans
/// (1/0/true/false/yes/no/on/off) and non-empty trimmed strings.
pub trait FromConfigText: Sized {
    fn from_config_text(text: &str) -> Result<Self, String>;
}

impl FromConfigText for f64 {
    fn from_config_text(text: &str) -> Result<Self, String> {
        text.parse::<f64>()
            .map_err(|_| format!("'{text}' is not a number"))
    }
}

impl FromConfigText for u32 {
    fn from_config_text(text: &str) -> Result<Self, String> {
        text.parse::<u32>()
            .map_err(|_| format!("'{text}' is not a non-negative integer"))
    }
}

impl FromConfigText for bool {
    fn from_config_text(text: &str) -> Result<Self, String> {
        match text.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(format!("'{other}' is not a boolean value")),
        }
    }
}

impl FromConfigText for String {
    fn from_config_text(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Err("value cannot be empty".to_string());
        }
        Ok(text.to_string())
    }
}

fn parse_config_text<T: FromConfigText>(text: &str) -> Result<MultiValue<T>, String> {
    let trimmed = text.trim();
    if !trimmed.contains(',') {
        return Ok(MultiValue::Scalar(T::from_config_text(trimmed)?));
    }

    let mut items = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err("comma-separated values cannot contain empty items".to_string());
        }
        items.push(T::from_config_text(part)?);
    }
    Ok(MultiValue::List(items))
}

impl<'de, T> Deserialize<'de> for MultiValue<T>
where
    T: Deserialize<'de> + FromConfigText,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Strings go through the comma-aware text parser; everything else
        // must be a native list or scalar.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            List(Vec<T>),
            Text(String),
            Scalar(T),
        }

        match Raw::<T>::deserialize(deserializer)? {
            Raw::List(items) => Ok(MultiValue::List(items)),
            Raw::Scalar(value) => Ok(MultiValue::Scalar(value)),
            Raw::Text(text) => parse_config_text(&text).map_err(de::Error::custom),
        }
    }
}

impl<T: fmt::Display> fmt::Display for MultiValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiValue::Scalar(value) => write!(f, "{value}"),
            MultiValue::List(items) => {
                let joined = items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{joined}")
            }
        }
    }
}
