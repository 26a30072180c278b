use crate::{candle::Candle, de::de_str, error::AlertError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Messages received on a Binance kline stream.
#[derive(Clone, Debug, PartialEq)]
pub enum BinanceKlineMessage {
    Ignore,
    Kline(BinanceKlineEvent),
}

impl<'de> Deserialize<'de> for BinanceKlineMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut value = Value::deserialize(deserializer)?;

        // Combined streams wrap each payload: {"stream": "solusdt@kline_1m", "data": {..}}
        if value.get("stream").is_some() {
            if let Some(data) = value.get_mut("data").map(Value::take) {
                value = data;
            }
        }

        match value.get("e").and_then(Value::as_str) {
            Some("kline") => serde_json::from_value::<BinanceKlineEvent>(value)
                .map(BinanceKlineMessage::Kline)
                .map_err(serde::de::Error::custom),
            _ => Ok(BinanceKlineMessage::Ignore),
        }
    }
}

/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#klinecandlestick-streams>
/// ```json
/// {
///     "e": "kline",
///     "E": 1672515782136,
///     "s": "SOLUSDT",
///     "k": {
///         "t": 1672515780000,
///         "T": 1672515839999,
///         "s": "SOLUSDT",
///         "i": "1m",
///         "f": 100,
///         "L": 200,
///         "o": "9.9600",
///         "c": "10.0200",
///         "h": "10.0500",
///         "l": "9.9500",
///         "v": "1000.25",
///         "n": 100,
///         "x": false,
///         "q": "10012.5000",
///         "V": "500",
///         "Q": "5006.2500",
///         "B": "123456"
///     }
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct BinanceKlineEvent {
    #[serde(rename = "E")]
    pub event_time: i64,

    #[serde(rename = "s")]
    pub symbol: String,

    #[serde(rename = "k")]
    pub kline: BinanceKline,
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct BinanceKline {
    #[serde(rename = "t")]
    pub open_time: i64,

    #[serde(rename = "T")]
    pub close_time: i64,

    #[serde(rename = "i")]
    pub interval: String,

    #[serde(rename = "o", deserialize_with = "de_str")]
    pub open: f64,

    #[serde(rename = "h", deserialize_with = "de_str")]
    pub high: f64,

    #[serde(rename = "l", deserialize_with = "de_str")]
    pub low: f64,

    #[serde(rename = "c", deserialize_with = "de_str")]
    pub close: f64,

    #[serde(rename = "v", deserialize_with = "de_str")]
    pub volume: f64,

    #[serde(rename = "x")]
    pub is_final: bool,
}

impl From<BinanceKline> for Candle {
    fn from(kline: BinanceKline) -> Self {
        Candle {
            open_time_ms: kline.open_time,
            close_time_ms: kline.close_time,
            open: kline.open,
            high: kline.high,
            low: kline.low,
            close: kline.close,
            volume: kline.volume,
            is_final: kline.is_final,
        }
    }
}

/// Decode one text frame. `Ok(None)` for frames that carry no kline (e.g. subscription acks).
pub fn parse_kline_message(text: &str) -> Result<Option<Candle>, AlertError> {
    match serde_json::from_str::<BinanceKlineMessage>(text)? {
        BinanceKlineMessage::Kline(event) => Ok(Some(Candle::from(event.kline))),
        BinanceKlineMessage::Ignore => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KLINE: &str = r#"
        {
            "e": "kline",
            "E": 1672515782136,
            "s": "SOLUSDT",
            "k": {
                "t": 1672515780000,
                "T": 1672515839999,
                "s": "SOLUSDT",
                "i": "1m",
                "f": 100,
                "L": 200,
                "o": "9.9600",
                "c": "10.0200",
                "h": "10.0500",
                "l": "9.9500",
                "v": "1000.25",
                "n": 100,
                "x": true,
                "q": "10012.5000",
                "V": "500",
                "Q": "5006.2500",
                "B": "123456"
            }
        }
    "#;

    #[test]
    fn test_binance_kline_message() {
        struct TestCase {
            input: String,
            expected: Result<Option<Candle>, ()>,
        }

        let expected_candle = Candle {
            open_time_ms: 1672515780000,
            close_time_ms: 1672515839999,
            open: 9.96,
            high: 10.05,
            low: 9.95,
            close: 10.02,
            volume: 1000.25,
            is_final: true,
        };

        let tests = vec![
            TestCase {
                // TC0: raw stream kline is deserialised
                input: KLINE.to_string(),
                expected: Ok(Some(expected_candle)),
            },
            TestCase {
                // TC1: combined stream envelope is unwrapped
                input: format!(r#"{{"stream":"solusdt@kline_1m","data":{KLINE}}}"#),
                expected: Ok(Some(expected_candle)),
            },
            TestCase {
                // TC2: subscription ack is ignored
                input: r#"{"result":null,"id":1}"#.to_string(),
                expected: Ok(None),
            },
            TestCase {
                // TC3: kline with a non-numeric price fails to decode
                input: KLINE.replace(r#""c": "10.0200""#, r#""c": "ten""#),
                expected: Err(()),
            },
            TestCase {
                // TC4: kline without the inner candle fails to decode
                input: r#"{"e":"kline","E":1,"s":"SOLUSDT"}"#.to_string(),
                expected: Err(()),
            },
            TestCase {
                // TC5: not JSON
                input: "pong".to_string(),
                expected: Err(()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = parse_kline_message(&test.input);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => {
                    assert_eq!(actual, expected, "TC{} failed", index)
                }
                (Err(AlertError::Decode(_)), Err(_)) => {
                    // Test passed
                }
                (actual, expected) => {
                    // Test failed
                    panic!(
                        "TC{index} failed because actual != expected. \nActual: {actual:?}\nExpected: {expected:?}\n"
                    );
                }
            }
        }
    }

    #[test]
    fn test_open_kline_is_not_final() {
        let open = KLINE.replace(r#""x": true"#, r#""x": false"#);
        let candle = parse_kline_message(&open).unwrap().unwrap();
        assert!(!candle.is_final);
        assert_eq!(candle.minute_bucket(), 1672515839999 / 60_000);
    }
}
