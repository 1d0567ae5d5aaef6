//! Deserializers for parameter types.
//!
//! Path segments and query strings carry only text, so the server sees
//! `?page=2&draft=true` as `{"page": "2", "draft": "true"}`. [`from_params`]
//! decodes such an object into a typed parameter struct, parsing numbers and
//! booleans out of strings where the target field asks for them.
//!
//! A query string also cannot tell a one-element array from a scalar:
//! `?tag=a` arrives as `"a"`, `?tag=a&tag=b` as `["a", "b"]`. `from_params`
//! accepts both for a `Vec` field. Fields decoded through `deserialize_any`
//! (untagged enums, flattened structs) bypass that; use [`one_or_many`]
//! there.
//!
//! ```
//! use rest_contracts_core::serde_helpers::one_or_many;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Filter {
//!     #[serde(deserialize_with = "one_or_many")]
//!     tag: Vec<String>,
//! }
//!
//! let single: Filter = serde_json::from_str(r#"{"tag": "a"}"#).unwrap();
//! assert_eq!(single.tag, vec!["a"]);
//! ```

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Error, Map, Value};

/// Decodes a parameter object whose scalar values may have arrived as text.
///
/// - A string is parsed when the field is numeric or boolean. `"true"` is
///   true; `"false"` and `""` are false, matching how the client encodes
///   `false`.
/// - A scalar is read as a one-element list when the field is a sequence.
/// - Everything else decodes exactly as `serde_json::from_value` would.
///
/// ```
/// use rest_contracts_core::serde_helpers::from_params;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Page {
///     page: u32,
///     draft: bool,
///     tags: Vec<String>,
/// }
///
/// let params = json!({ "page": "2", "draft": "", "tags": "a" });
/// let page: Page = from_params(params.as_object().unwrap()).unwrap();
/// assert_eq!((page.page, page.draft, page.tags), (2, false, vec!["a".to_string()]));
/// ```
///
/// # Errors
///
/// Fails if a value cannot be read as the type its field declares.
pub fn from_params<T: DeserializeOwned>(params: &Map<String, Value>) -> Result<T, Error> {
    T::deserialize(ParamDeserializer::Object(params))
}

#[derive(Clone, Copy)]
enum ParamDeserializer<'de> {
    Object(&'de Map<String, Value>),
    Value(&'de Value),
}

impl<'de> ParamDeserializer<'de> {
    fn new(value: &'de Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(map),
            other => Self::Value(other),
        }
    }
}

macro_rules! forward {
    ($($method:ident),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            match self {
                Self::Object(_) => self.deserialize_any(visitor),
                Self::Value(value) => value.$method(visitor),
            }
        }
    )*};
}

macro_rules! parse_text {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            match self {
                Self::Value(Value::String(text)) => match text.parse::<$ty>() {
                    Ok(number) => visitor.$visit(number),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(text), &visitor)),
                },
                Self::Value(value) => value.$method(visitor),
                Self::Object(_) => self.deserialize_any(visitor),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for ParamDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Object(map) => visitor.visit_map(ParamMap {
                entries: map.iter(),
                value: None,
            }),
            Self::Value(value) => value.deserialize_any(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Value(Value::String(text)) => match text.as_str() {
                "true" => visitor.visit_bool(true),
                "false" | "" => visitor.visit_bool(false),
                _ => Err(de::Error::invalid_value(Unexpected::Str(text), &visitor)),
            },
            Self::Value(value) => value.deserialize_bool(visitor),
            Self::Object(_) => self.deserialize_any(visitor),
        }
    }

    parse_text! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    forward! {
        deserialize_char,
        deserialize_str,
        deserialize_string,
        deserialize_bytes,
        deserialize_byte_buf,
        deserialize_unit,
        deserialize_identifier,
        deserialize_ignored_any,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Value(Value::Null) => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_unit_struct(name, visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Value(Value::Array(values)) => visitor.visit_seq(ParamSeq::Many(values.iter())),
            Self::Value(Value::Null) => Value::Null.deserialize_seq(visitor),
            single => visitor.visit_seq(ParamSeq::One(Some(single))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_tuple(len, visitor),
        }
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_tuple_struct(name, len, visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Self::Object(_) => self.deserialize_any(visitor),
            Self::Value(value) => value.deserialize_enum(name, variants, visitor),
        }
    }
}

struct ParamMap<'de> {
    entries: serde_json::map::Iter<'de>,
    value: Option<&'de Value>,
}

impl<'de> MapAccess<'de> for ParamMap<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.value = Some(value);
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        let value = self
            .value
            .take()
            .ok_or_else(|| <Error as de::Error>::custom("value requested before its key"))?;
        seed.deserialize(ParamDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

enum ParamSeq<'de> {
    Many(std::slice::Iter<'de, Value>),
    One(Option<ParamDeserializer<'de>>),
}

impl<'de> SeqAccess<'de> for ParamSeq<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        let next = match self {
            Self::Many(values) => values.next().map(ParamDeserializer::new),
            Self::One(single) => single.take(),
        };
        next.map(|item| seed.deserialize(item)).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(match self {
            Self::Many(values) => values.len(),
            Self::One(single) => usize::from(single.is_some()),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

/// Deserializes either a single value or an array of values into a `Vec`.
///
/// # Errors
///
/// Fails if the input is neither a `T` nor an array of `T`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    OneOrMany::deserialize(deserializer).map(Vec::from)
}

/// Like [`one_or_many`], for fields that may be absent or `null`.
///
/// Pair it with `#[serde(default)]` so a missing key decodes as `None`.
///
/// # Errors
///
/// Fails if the input is neither null, a `T` nor an array of `T`.
pub fn optional_one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<OneOrMany<T>>::deserialize(deserializer).map(|value| value.map(Vec::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{encode_query, parse_query};
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Filter {
        #[serde(deserialize_with = "one_or_many")]
        tag: Vec<String>,
        #[serde(default, deserialize_with = "optional_one_or_many")]
        page: Option<Vec<String>>,
    }

    fn from_query(raw: &str) -> Filter {
        serde_json::from_value(Value::Object(parse_query(raw).unwrap())).unwrap()
    }

    #[test]
    fn test_single_value_becomes_one_element_vec() {
        let filter = from_query("tag=lame");
        assert_eq!(filter.tag, vec!["lame"]);
        assert_eq!(filter.page, None);
    }

    #[test]
    fn test_repeated_keys_become_vec() {
        let filter = from_query("tag=lame&tag=iffy&page=2");
        assert_eq!(filter.tag, vec!["lame", "iffy"]);
        assert_eq!(filter.page, Some(vec!["2".to_string()]));
    }

    #[test]
    fn test_explicit_null_is_none() {
        let filter: Filter = serde_json::from_str(r#"{"tag": [], "page": null}"#).unwrap();
        assert!(filter.tag.is_empty());
        assert_eq!(filter.page, None);
    }

    #[test]
    fn test_wrong_element_type_fails() {
        let result: Result<Filter, _> = serde_json::from_str(r#"{"tag": [1, {"x": 2}]}"#);
        assert!(result.is_err());
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Quality {
        Solid,
        Lame,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Page {
        page: u32,
        offset: i64,
        ratio: f64,
        draft: bool,
        published: bool,
        tags: Vec<String>,
        ids: Vec<u16>,
        limit: Option<u8>,
        quality: Quality,
    }

    #[test]
    fn test_from_params_reads_typed_values_back_from_query_text() {
        let page = Page {
            page: 2,
            offset: -5,
            ratio: 0.5,
            draft: true,
            published: false,
            tags: vec!["a".into()],
            ids: vec![3, 4],
            limit: None,
            quality: Quality::Lame,
        };
        let query = serde_json::to_value(&page).unwrap();
        let raw = encode_query(query.as_object().unwrap());

        let decoded: Page = from_params(&parse_query(&raw).unwrap()).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_from_params_accepts_native_json_values() {
        let params = json!({
            "page": 1, "offset": 0, "ratio": 1.5, "draft": false, "published": true,
            "tags": [], "ids": [7], "limit": 9, "quality": "solid"
        });
        let decoded: Page = from_params(params.as_object().unwrap()).unwrap();
        assert_eq!(decoded.limit, Some(9));
        assert_eq!(decoded.ids, vec![7]);
        assert_eq!(decoded.quality, Quality::Solid);
    }

    #[test]
    fn test_from_params_rejects_unparseable_text() {
        #[derive(Debug, Deserialize)]
        struct Numeric {
            #[allow(dead_code)]
            page: u32,
        }
        #[derive(Debug, Deserialize)]
        struct Flag {
            #[allow(dead_code)]
            draft: bool,
        }

        let err = from_params::<Numeric>(json!({ "page": "two" }).as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("two"), "{err}");
        assert!(from_params::<Flag>(json!({ "draft": "yes" }).as_object().unwrap()).is_err());
    }

    #[test]
    fn test_from_params_keeps_strings_and_nested_objects() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Inner {
            n: u8,
        }
        #[derive(Debug, Deserialize, PartialEq)]
        struct Outer {
            id: String,
            inner: Inner,
        }

        let decoded: Outer =
            from_params(json!({ "id": "007", "inner": { "n": "3" } }).as_object().unwrap()).unwrap();
        assert_eq!(
            decoded,
            Outer {
                id: "007".into(),
                inner: Inner { n: 3 }
            }
        );
    }
}
