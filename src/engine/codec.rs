//! Encoding of typed values to and from the JSON values held by the store.
//!
//! Every typed store operation goes through a [`Codec`]. [`JsonCodec`] covers any
//! serde type; [`FnCodec`] lets callers plug in an explicit encode/decode pair
//! for types that do not implement serde.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// An encode/decode pair for one logical type.
pub trait Codec: Send + Sync {
    /// The logical type handled by this codec.
    type Item;

    /// Name of the logical type, used in error messages.
    fn type_tag(&self) -> &'static str;

    fn encode(&self, item: &Self::Item) -> serde_json::Result<Value>;

    fn decode(&self, raw: &Value) -> serde_json::Result<Self::Item>;
}

/// Codec for any type implementing serde's traits.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Item = T;

    fn type_tag(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn encode(&self, item: &T) -> serde_json::Result<Value> {
        serde_json::to_value(item)
    }

    fn decode(&self, raw: &Value) -> serde_json::Result<T> {
        T::deserialize(raw)
    }
}

/// Codec built from a type tag and two plain functions.
pub struct FnCodec<T> {
    tag: &'static str,
    encode: fn(&T) -> serde_json::Result<Value>,
    decode: fn(&Value) -> serde_json::Result<T>,
}

impl<T> FnCodec<T> {
    pub const fn new(
        tag: &'static str,
        encode: fn(&T) -> serde_json::Result<Value>,
        decode: fn(&Value) -> serde_json::Result<T>,
    ) -> Self {
        Self { tag, encode, decode }
    }
}

impl<T> Codec for FnCodec<T> {
    type Item = T;

    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn encode(&self, item: &T) -> serde_json::Result<Value> {
        (self.encode)(item)
    }

    fn decode(&self, raw: &Value) -> serde_json::Result<T> {
        (self.decode)(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Rgb(u8, u8, u8);

    fn encode_rgb(c: &Rgb) -> serde_json::Result<Value> {
        Ok(Value::String(format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)))
    }

    fn decode_rgb(raw: &Value) -> serde_json::Result<Rgb> {
        let s = raw
            .as_str()
            .and_then(|s| s.strip_prefix('#'))
            .filter(|s| s.len() == 6)
            .ok_or_else(|| serde_json::Error::custom("expected #rrggbb"))?;
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).map_err(serde_json::Error::custom);
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    #[test]
    fn test_json_codec_mismatch() {
        let codec = JsonCodec::<u32>::new();
        assert_eq!(codec.decode(&json!(7)).unwrap(), 7);
        assert!(codec.decode(&json!("seven")).is_err());
        assert_eq!(codec.type_tag(), "u32");
    }

    #[test]
    fn test_fn_codec() {
        let codec = FnCodec::new("rgb", encode_rgb, decode_rgb);
        assert_eq!(codec.encode(&Rgb(255, 0, 16)).unwrap(), json!("#ff0010"));
        assert_eq!(codec.decode(&json!("#ff0010")).unwrap(), Rgb(255, 0, 16));
        assert!(codec.decode(&json!(12)).is_err());
        assert_eq!(codec.type_tag(), "rgb");
    }
}
