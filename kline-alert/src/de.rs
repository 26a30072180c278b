//! Serde helpers for exchange payloads.

use serde::{Deserialize, Deserializer};
use std::{fmt::Display, str::FromStr};

/// Deserialize a `String` as the desired type, e.g. `"16578.50"` -> `f64`.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let data = String::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Price {
        #[serde(deserialize_with = "de_str")]
        value: f64,
    }

    #[test]
    fn test_de_str() {
        let price = serde_json::from_str::<Price>(r#"{"value":"142.3700"}"#).unwrap();
        assert_eq!(price.value, 142.37);

        assert!(serde_json::from_str::<Price>(r#"{"value":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Price>(r#"{"value":142.37}"#).is_err());
    }
}
