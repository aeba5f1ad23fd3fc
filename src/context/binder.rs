//! Binding the unified parameter map into typed structs.
//!
//! [`from_params`] drives a serde `Deserializer` over the map. Each field the
//! target declares is looked up by its serialized name (use
//! `#[serde(rename = "userID")]` to bind camel-cased keys) and converted
//! leniently: a missing or unparsable value becomes the field's zero value
//! (`0`, `""`, `false`, `None`, an empty `Vec`). An `Option` field whose
//! value is present but does not parse as the inner type binds as `None`.
//!
//! ```rust
//! use routectx::context::from_params;
//! use serde::Deserialize;
//! use std::collections::HashMap;
//!
//! #[derive(Deserialize)]
//! struct Form {
//!     #[serde(rename = "userID")]
//!     user_id: String,
//!     #[serde(rename = "profileID")]
//!     profile_id: i64,
//!     page: Option<u32>,
//! }
//!
//! let params = HashMap::from([
//!     ("userID".to_string(), "1".to_string()),
//!     ("profileID".to_string(), "2".to_string()),
//!     ("page".to_string(), "last".to_string()),
//! ]);
//! let form: Form = from_params(Some(&params)).unwrap();
//! assert_eq!(form.user_id, "1");
//! assert_eq!(form.profile_id, 2);
//! assert_eq!(form.page, None);
//! ```

use serde::de::value::StrDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Failure to bind request data into a typed target.
#[derive(Debug)]
pub enum BindError {
    /// Body is not valid JSON or does not fit the target shape
    Json(serde_json::Error),
    /// Target shape cannot be bound from flat form parameters
    Form(String),
    /// The body was already taken by an earlier `bind_json`
    BodyConsumed,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Json(e) => write!(f, "JSON decode failed: {e}"),
            BindError::Form(msg) => write!(f, "form binding failed: {msg}"),
            BindError::BodyConsumed => write!(f, "request body already consumed"),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BindError {
    fn from(e: serde_json::Error) -> Self {
        BindError::Json(e)
    }
}

/// Error raised inside the form deserializer.
#[derive(Debug)]
enum DeError {
    Form(String),
    /// Value of an `Option` field did not parse; the field is rebound as absent.
    Unparsable(String),
}

impl fmt::Display for DeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeError::Form(msg) => f.write_str(msg),
            DeError::Unparsable(field) => write!(f, "field {field} could not be parsed"),
        }
    }
}

impl std::error::Error for DeError {}

impl de::Error for DeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DeError::Form(msg.to_string())
    }
}

/// Bind `params` into `T`.
///
/// Serde visitors are single-use, so an `Option` field that fails to parse
/// aborts the pass and binding restarts with that field treated as missing.
/// Each restart retires one field.
///
/// # Errors
///
/// [`BindError::Form`] only when `T` has a shape flat parameters cannot
/// describe (nested structs or maps as field types).
pub fn from_params<T: DeserializeOwned>(
    params: Option<&HashMap<String, String>>,
) -> Result<T, BindError> {
    let mut absent: Vec<String> = Vec::new();
    loop {
        let form = FormDeserializer {
            params,
            absent: &absent,
        };
        match T::deserialize(form) {
            Ok(value) => return Ok(value),
            Err(DeError::Unparsable(field)) if !absent.contains(&field) => {
                debug!(field = %field, "Optional field did not parse, binding as None");
                absent.push(field);
            }
            Err(err) => return Err(BindError::Form(err.to_string())),
        }
    }
}

/// Deserializer over the whole parameter map.
struct FormDeserializer<'a> {
    params: Option<&'a HashMap<String, String>>,
    absent: &'a [String],
}

impl<'a> FormDeserializer<'a> {
    fn is_absent(&self, name: &str) -> bool {
        self.absent.iter().any(|a| a == name)
    }

    fn lookup(&self, name: &str) -> Option<&'a str> {
        if self.is_absent(name) {
            return None;
        }
        self.params?.get(name).map(String::as_str)
    }
}

impl<'de> de::Deserializer<'de> for FormDeserializer<'_> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_map(EntryAccess {
            entries: self.params.map(|p| p.iter()),
            form: self,
            value: None,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_map(FieldAccess {
            fields: fields.iter(),
            form: self,
            value: None,
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf option unit unit_struct newtype_struct seq tuple tuple_struct
        enum identifier ignored_any
    }
}

/// Visits every declared struct field, present or not.
struct FieldAccess<'a> {
    fields: std::slice::Iter<'static, &'static str>,
    form: FormDeserializer<'a>,
    value: Option<FieldValue<'a>>,
}

impl<'de> MapAccess<'de> for FieldAccess<'_> {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        let Some(field) = self.fields.next() else {
            return Ok(None);
        };
        self.value = Some(FieldValue::new(field, self.form.lookup(field)));
        let key: StrDeserializer<'_, DeError> = field.into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let value = self
            .value
            .take()
            .ok_or_else(|| DeError::Form("value requested before key".to_string()))?;
        seed.deserialize(value)
    }
}

/// Visits the entries actually present, for map-shaped targets.
struct EntryAccess<'a> {
    entries: Option<hash_map::Iter<'a, String, String>>,
    form: FormDeserializer<'a>,
    value: Option<FieldValue<'a>>,
}

impl<'de> MapAccess<'de> for EntryAccess<'_> {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        let form = &self.form;
        let next = self
            .entries
            .as_mut()
            .and_then(|entries| entries.find(|(k, _)| !form.is_absent(k)));
        let Some((k, v)) = next else {
            return Ok(None);
        };
        self.value = Some(FieldValue::new(k, Some(v.as_str())));
        let key: StrDeserializer<'_, DeError> = k.as_str().into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let value = self
            .value
            .take()
            .ok_or_else(|| DeError::Form("value requested before key".to_string()))?;
        seed.deserialize(value)
    }
}

/// One parameter value, `None` when the key is absent.
///
/// `strict` is set under an `Option`: parse failures raise
/// [`DeError::Unparsable`] instead of falling back to the zero value.
#[derive(Clone, Copy)]
struct FieldValue<'a> {
    field: &'a str,
    value: Option<&'a str>,
    strict: bool,
}

impl<'a> FieldValue<'a> {
    fn new(field: &'a str, value: Option<&'a str>) -> Self {
        Self {
            field,
            value,
            strict: false,
        }
    }

    fn unparsable(&self) -> DeError {
        DeError::Unparsable(self.field.to_string())
    }

    fn number<T: FromStr + Default>(&self) -> Result<T, DeError> {
        match self.value.and_then(|v| v.trim().parse().ok()) {
            Some(n) => Ok(n),
            None if self.strict => Err(self.unparsable()),
            None => Ok(T::default()),
        }
    }

    fn boolean(&self) -> Result<bool, DeError> {
        match self.value.map(str::trim) {
            Some("1" | "t" | "T" | "true" | "TRUE" | "True" | "on" | "yes") => Ok(true),
            Some("0" | "f" | "F" | "false" | "FALSE" | "False" | "off" | "no") => Ok(false),
            _ if self.strict => Err(self.unparsable()),
            _ => Ok(false),
        }
    }

    fn character(&self) -> Result<char, DeError> {
        match self.value.and_then(|v| v.chars().next()) {
            Some(c) => Ok(c),
            None if self.strict => Err(self.unparsable()),
            None => Ok(char::default()),
        }
    }
}

macro_rules! lenient_number {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
            visitor.$visit(self.number::<$ty>()?)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for FieldValue<'_> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.value {
            Some(v) => visitor.visit_str(v),
            None => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_bool(self.boolean()?)
    }

    lenient_number! {
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

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_char(self.character()?)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_str(self.value.unwrap_or_default())
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_bytes(self.value.unwrap_or_default().as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.value {
            Some(_) => visitor.visit_some(FieldValue {
                strict: true,
                ..self
            }),
            None => visitor.visit_none(),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    /// Comma separated list; absent or empty gives an empty sequence.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let items = self
            .value
            .filter(|v| !v.is_empty())
            .map(|v| v.split(','));
        visitor.visit_seq(CommaSeq { parent: self, items })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, DeError> {
        Err(DeError::Form(
            "map-typed fields cannot be bound from form parameters".to_string(),
        ))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, DeError> {
        Err(DeError::Form(format!(
            "nested struct {name} cannot be bound from form parameters"
        )))
    }

    /// Unit variants by name.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        let variant: StrDeserializer<'_, DeError> =
            self.value.unwrap_or_default().trim().into_deserializer();
        visitor.visit_enum(variant).map_err(|err| {
            if self.strict {
                self.unparsable()
            } else {
                err
            }
        })
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }
}

struct CommaSeq<'a> {
    parent: FieldValue<'a>,
    items: Option<std::str::Split<'a, char>>,
}

impl<'de> SeqAccess<'de> for CommaSeq<'_> {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        match self.items.as_mut().and_then(Iterator::next) {
            Some(item) => seed
                .deserialize(FieldValue {
                    value: Some(item.trim()),
                    ..self.parent
                })
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        #[serde(rename = "userID")]
        user_id: String,
        #[serde(rename = "profileID")]
        profile_id: i64,
        active: bool,
        score: Option<f64>,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Role {
        Admin,
        Member,
    }

    #[derive(Debug, Deserialize)]
    struct WithRole {
        role: Role,
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_binds_declared_fields() {
        let p = params(&[
            ("userID", "1"),
            ("profileID", "2"),
            ("active", "true"),
            ("score", "9.5"),
            ("tags", "a, b,c"),
            ("ignored", "x"),
        ]);
        let profile: Profile = from_params(Some(&p)).unwrap();
        assert_eq!(
            profile,
            Profile {
                user_id: "1".to_string(),
                profile_id: 2,
                active: true,
                score: Some(9.5),
                tags: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_and_unparsable_become_zero_values() {
        let p = params(&[("profileID", "not-a-number")]);
        let profile: Profile = from_params(Some(&p)).unwrap();
        assert_eq!(profile.user_id, "");
        assert_eq!(profile.profile_id, 0);
        assert!(!profile.active);
        assert_eq!(profile.score, None);
        assert!(profile.tags.is_empty());

        let empty: Profile = from_params(None).unwrap();
        assert_eq!(empty.profile_id, 0);
    }

    #[test]
    fn test_unparsable_option_binds_none() {
        #[derive(Debug, Deserialize)]
        struct Paging {
            page: Option<i64>,
            size: Option<u32>,
            exact: Option<bool>,
            role: Option<Role>,
            label: Option<String>,
        }

        let p = params(&[
            ("page", "abc"),
            ("size", " 25 "),
            ("exact", "maybe"),
            ("role", "ghost"),
            ("label", ""),
        ]);
        let paging: Paging = from_params(Some(&p)).unwrap();
        assert_eq!(paging.page, None);
        assert_eq!(paging.size, Some(25));
        assert_eq!(paging.exact, None);
        assert_eq!(paging.role, None);
        assert_eq!(paging.label.as_deref(), Some(""));

        let p = params(&[("page", "3"), ("exact", "off"), ("role", "member")]);
        let paging: Paging = from_params(Some(&p)).unwrap();
        assert_eq!(paging.page, Some(3));
        assert_eq!(paging.exact, Some(false));
        assert_eq!(paging.role, Some(Role::Member));
    }

    #[test]
    fn test_unknown_required_variant_is_an_error() {
        let p = params(&[("role", "ghost")]);
        let err = from_params::<WithRole>(Some(&p)).unwrap_err();
        assert!(matches!(err, BindError::Form(_)));
    }

    #[test]
    fn test_enum_from_string() {
        let p = params(&[("role", "admin")]);
        let bound: WithRole = from_params(Some(&p)).unwrap();
        assert_eq!(bound.role, Role::Admin);
    }

    #[test]
    fn test_map_target_collects_entries() {
        let p = params(&[("a", "1"), ("b", "2")]);
        let map: HashMap<String, String> = from_params(Some(&p)).unwrap();
        assert_eq!(map, p);
    }

    #[test]
    fn test_nested_struct_is_rejected() {
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[allow(dead_code)]
            inner: Profile,
        }
        let err = from_params::<Outer>(None).unwrap_err();
        assert!(matches!(err, BindError::Form(_)));
    }
}
