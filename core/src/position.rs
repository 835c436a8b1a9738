//! Ordering codec for Planka's `position` values.
//!
//! Planka stores positions as multiples of a fixed stride so that items can
//! be inserted between neighbours without renumbering. A value sitting on the
//! half stride (32767.5 on the wire, 32767 after flooring) is a service quirk
//! that always reads back as index 1.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::field::Field;

pub const STRIDE: i64 = 65535;

/// `floor(32767.5)`; see the module docs.
pub const HALF_STRIDE: i64 = STRIDE / 2;

/// Convert a stored position into a dense index.
pub fn decode_position(raw: i64, zero_indexed: bool) -> i64 {
    if raw.rem_euclid(STRIDE) == HALF_STRIDE {
        return 1;
    }
    raw.div_euclid(STRIDE) - i64::from(zero_indexed)
}

/// Convert a dense index into a stored position.
///
/// One-indexed this is `index * STRIDE`; zero-indexed the index is shifted
/// up by one stride so that `decode_position` inverts it.
pub fn encode_position(index: i64, zero_indexed: bool) -> i64 {
    (index + i64::from(zero_indexed)) * STRIDE
}

/// Deserialize a position that may arrive as an integer or a float.
pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<Field<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Field::Null),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64))
            .map(Field::Value)
            .ok_or_else(|| de::Error::custom(format!("position out of range: {n}"))),
        Some(other) => Err(de::Error::custom(format!("expected a number for position, got {other}"))),
    }
}
