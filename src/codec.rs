//! Strict JSON codec for arbitrary attribute and hint values.
//!
//! `serde_json::to_value` coerces non-finite floats to `null` instead of
//! failing, so a `f64::NAN` attribute would silently reach the consumer as
//! `null` — a lossy round-trip. [`JsonCodec::to_value`] walks the value
//! first and rejects any non-finite float, anywhere in the structure, so a
//! serializing push either produces a faithful document or reports a
//! serialization error with nothing sent.

use serde::de::DeserializeOwned;
use serde::ser::{self, Serialize};
use serde_json::Value;

use crate::error::Result;

/// JSON codec for dynamic values crossing the boundary.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the value cannot be encoded or
    /// contains a non-finite float (`NAN`, `INFINITY`).
    pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
        value.serialize(FiniteCheck)?;
        Ok(serde_json::to_value(value)?)
    }

    /// Decode a JSON document into a typed value.
    pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }
}

type SerResult<T> = std::result::Result<T, serde_json::Error>;

fn non_finite() -> serde_json::Error {
    ser::Error::custom("non-finite float cannot be represented in JSON")
}

/// Serializer that visits a value without building anything, failing on the
/// first non-finite float.
struct FiniteCheck;

/// Compound visitor: recurses into elements, entries and fields.
struct FiniteCheckCompound;

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    type SerializeSeq = FiniteCheckCompound;
    type SerializeTuple = FiniteCheckCompound;
    type SerializeTupleStruct = FiniteCheckCompound;
    type SerializeTupleVariant = FiniteCheckCompound;
    type SerializeMap = FiniteCheckCompound;
    type SerializeStruct = FiniteCheckCompound;
    type SerializeStructVariant = FiniteCheckCompound;

    fn serialize_bool(self, _v: bool) -> SerResult<()> {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> SerResult<()> {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> SerResult<()> {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> SerResult<()> {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> SerResult<()> {
        Ok(())
    }

    fn serialize_i128(self, _v: i128) -> SerResult<()> {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> SerResult<()> {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> SerResult<()> {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> SerResult<()> {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> SerResult<()> {
        Ok(())
    }

    fn serialize_u128(self, _v: u128) -> SerResult<()> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> SerResult<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(non_finite())
        }
    }

    fn serialize_f64(self, v: f64) -> SerResult<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(non_finite())
        }
    }

    fn serialize_char(self, _v: char) -> SerResult<()> {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> SerResult<()> {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> SerResult<()> {
        Ok(())
    }

    fn serialize_none(self) -> SerResult<()> {
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn serialize_unit(self) -> SerResult<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> SerResult<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> SerResult<()> {
        Ok(())
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn serialize_seq(self, _len: Option<usize>) -> SerResult<Self::SerializeSeq> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_tuple(self, _len: usize) -> SerResult<Self::SerializeTuple> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeTupleStruct> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeTupleVariant> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_map(self, _len: Option<usize>) -> SerResult<Self::SerializeMap> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeStruct> {
        Ok(FiniteCheckCompound)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> SerResult<Self::SerializeStructVariant> {
        Ok(FiniteCheckCompound)
    }
}

impl ser::SerializeSeq for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T>(&mut self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T>(&mut self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T>(&mut self, key: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T>(&mut self, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheckCompound {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> SerResult<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> SerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScopeError;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[test]
    fn test_finite_values_encode() {
        assert_eq!(JsonCodec::to_value(&4.5).unwrap(), json!(4.5));
        assert_eq!(JsonCodec::to_value(&"text").unwrap(), json!("text"));
        assert_eq!(
            JsonCodec::to_value(&vec![1.0, 2.5]).unwrap(),
            json!([1.0, 2.5])
        );
        assert_eq!(JsonCodec::to_value(&Option::<f64>::None).unwrap(), json!(null));
    }

    #[test]
    fn test_top_level_nan_rejected() {
        let err = JsonCodec::to_value(&f64::NAN).unwrap_err();
        assert!(matches!(err, ScopeError::Serialization(_)));
        assert!(JsonCodec::to_value(&f64::INFINITY).is_err());
        assert!(JsonCodec::to_value(&f32::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_nested_nan_rejected() {
        #[derive(Serialize)]
        struct Reading {
            label: String,
            values: Vec<f64>,
        }

        let reading = Reading {
            label: "temps".into(),
            values: vec![21.0, f64::NAN],
        };
        assert!(JsonCodec::to_value(&reading).is_err());

        let mut map = std::collections::HashMap::new();
        map.insert("score", f64::INFINITY);
        assert!(JsonCodec::to_value(&map).is_err());

        assert!(JsonCodec::to_value(&Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_struct_round_trip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Hint {
            columns: u32,
            scale: f64,
        }

        let hint = Hint {
            columns: 2,
            scale: 1.0,
        };
        let doc = JsonCodec::to_value(&hint).unwrap();
        assert_eq!(doc["scale"], json!(1.0));
        let back: Hint = JsonCodec::from_value(doc).unwrap();
        assert_eq!(back, hint);
    }
}
