//! Serde helpers for the protobuf-JSON wire shape.
//!
//! The chain encodes `uint64` fields as JSON strings, while hand-written
//! market files tend to use plain numbers. Both must decode.

/// `u64` encoded as a decimal string, decoded from string or number.
pub mod u64_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct U64Visitor;

        impl<'de> Visitor<'de> for U64Visitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an unsigned integer or a string holding one")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.trim().parse::<u64>().map_err(de::Error::custom)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(v)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v).map_err(|_| de::Error::custom(format!("negative value {v}")))
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}

/// `u64` that may be absent or `null`; defaults to zero.
pub mod u64_string_default {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::u64_string::serialize(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super::u64_string")] u64);

        Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|w| w.0).unwrap_or(0))
    }
}

/// Decode `null` as the type's default value.
///
/// Protobuf-JSON emits `null` for empty repeated and map fields.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "super::u64_string")]
        value: u64,
    }

    #[derive(Debug, Deserialize)]
    struct Optional {
        #[serde(default, with = "super::u64_string_default")]
        value: u64,
    }

    #[test]
    fn test_decode_string_and_number() {
        let a: Holder = serde_json::from_str(r#"{"value":"42"}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"value":42}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.value, 42);
    }

    #[test]
    fn test_encode_as_string() {
        let json = serde_json::to_string(&Holder { value: 8 }).unwrap();
        assert_eq!(json, r#"{"value":"8"}"#);
    }

    #[test]
    fn test_reject_negative_and_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"value":-1}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"value":"abc"}"#).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Listy {
        #[serde(default, deserialize_with = "super::null_as_default")]
        items: Vec<u32>,
    }

    #[test]
    fn test_null_as_default() {
        let null: Listy = serde_json::from_str(r#"{"items":null}"#).unwrap();
        let missing: Listy = serde_json::from_str("{}").unwrap();
        let set: Listy = serde_json::from_str(r#"{"items":[1,2]}"#).unwrap();
        assert!(null.items.is_empty());
        assert!(missing.items.is_empty());
        assert_eq!(set.items, vec![1, 2]);
    }

    #[test]
    fn test_default_variant_handles_missing_and_null() {
        let missing: Optional = serde_json::from_str("{}").unwrap();
        let null: Optional = serde_json::from_str(r#"{"value":null}"#).unwrap();
        let set: Optional = serde_json::from_str(r#"{"value":"7"}"#).unwrap();
        assert_eq!(missing.value, 0);
        assert_eq!(null.value, 0);
        assert_eq!(set.value, 7);
    }
}
