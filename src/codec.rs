//! Content-type indexed encode/decode registry shared by the client request
//! builder and response decoder.
//!
//! Registration is append-only and keyed by a *normalized* content type —
//! lowercased, parameters stripped (`application/json; charset=utf-8`
//! becomes `application/json`), mirroring [`crate::request::Request::content_type`]
//! on the server side. A codec speaks `serde_json::Value` as its wire-neutral
//! intermediate representation rather than an arbitrary `T`, so the registry
//! can stay object-safe without pulling in an erased-serde crate the rest of
//! the corpus never reaches for: [`CodecRegistry::encode`]/`decode` do the
//! `T <-> Value` conversion through `serde_json`'s own (de)serializer, and
//! each [`Codec`] only has to convert `Value <-> bytes` for its wire format.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// A single content type's wire encoding, speaking `serde_json::Value` as
/// its intermediate representation.
pub trait Codec: Send + Sync + 'static {
    fn encode_value(&self, value: &Value) -> Result<Bytes, Error>;
    fn decode_value(&self, bytes: &[u8]) -> Result<Value, Error>;
}

/// The default `application/json` codec: a pass-through, since `Value` is
/// already `serde_json`'s own model.
struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_value(&self, value: &Value) -> Result<Bytes, Error> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|_| Error::InvalidDataFormat("value is not JSON-serializable"))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, Error> {
        serde_json::from_slice(bytes).map_err(|_| Error::InvalidDataFormat("body is not valid JSON"))
    }
}

/// `application/x-www-form-urlencoded`, restricted to flat string maps —
/// the shape the client request builder already produces for form bodies
/// (see `crate::client::request`).
struct FormCodec;

impl Codec for FormCodec {
    fn encode_value(&self, value: &Value) -> Result<Bytes, Error> {
        let obj = value
            .as_object()
            .ok_or(Error::InvalidDataFormat("form codec requires a flat string map"))?;
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (k, v) in obj {
            let v = v.as_str().ok_or(Error::InvalidDataFormat("form values must be strings"))?;
            out.append_pair(k, v);
        }
        Ok(Bytes::from(out.finish()))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, Error> {
        let mut map = serde_json::Map::new();
        for (k, v) in form_urlencoded::parse(bytes) {
            map.insert(k.into_owned(), Value::String(v.into_owned()));
        }
        Ok(Value::Object(map))
    }
}

/// Strips `;...` parameters and lowercases, the same normalization
/// [`crate::request::Request::content_type`] applies on the server side.
pub fn normalize(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or(content_type).trim().to_ascii_lowercase()
}

/// Maps normalized content type to [`Codec`]. Registration is append-only;
/// re-registering an already-present content type is rejected with
/// [`Error::InvalidDataFormat`] — "duplicate codec registration" in the
/// spec's error taxonomy.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
    default_content_type: Option<String>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            default_content_type: None,
        }
    }

    /// A registry pre-populated with `application/json` and
    /// `application/x-www-form-urlencoded`, `application/json` selected as
    /// the default.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("application/json", JsonCodec).unwrap();
        reg.register("application/x-www-form-urlencoded", FormCodec).unwrap();
        reg.set_default("application/json").unwrap();
        reg
    }

    pub fn register(&mut self, content_type: &str, codec: impl Codec) -> Result<(), Error> {
        let key = normalize(content_type);
        if self.codecs.contains_key(&key) {
            return Err(Error::InvalidDataFormat("codec already registered for this content type"));
        }
        self.codecs.insert(key, Arc::new(codec));
        Ok(())
    }

    pub fn set_default(&mut self, content_type: &str) -> Result<(), Error> {
        let key = normalize(content_type);
        if !self.codecs.contains_key(&key) {
            return Err(Error::DecoderNotFound(key));
        }
        self.default_content_type = Some(key);
        Ok(())
    }

    fn lookup(&self, content_type: Option<&str>) -> Option<(&str, &Arc<dyn Codec>)> {
        let key = content_type.map(normalize).or_else(|| self.default_content_type.clone())?;
        let (k, codec) = self.codecs.get_key_value(&key)?;
        Some((k.as_str(), codec))
    }

    pub fn encode<T: Serialize>(&self, content_type: Option<&str>, value: &T) -> Result<(String, Bytes), Error> {
        let (key, codec) = self
            .lookup(content_type)
            .ok_or_else(|| Error::DecoderNotFound(content_type.unwrap_or("<default>").to_string()))?;
        let json = serde_json::to_value(value)
            .map_err(|_| Error::InvalidDataFormat("value is not serializable"))?;
        Ok((key.to_string(), codec.encode_value(&json)?))
    }

    pub fn decode<T: DeserializeOwned>(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<T, Error> {
        let (_, codec) = self
            .lookup(content_type)
            .ok_or_else(|| Error::DecoderNotFound(content_type.unwrap_or("<default>").to_string()))?;
        let value = codec.decode_value(bytes)?;
        serde_json::from_value(value).map_err(|_| Error::InvalidDataFormat("value does not match target type"))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
