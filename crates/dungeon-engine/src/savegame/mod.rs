//! Save-state encoding of live game objects.
//!
//! Every persisted type implements [`Persist`]: it names its class, declares
//! how its data is stored ([`SaveKind`]), and writes/reads an explicit JSON
//! record. The [`SaveStateCodec`] wraps that record in an [`ObjectNode`]:
//!
//! ```json
//! { "class": "PositionComponent", "type": "self-describing", "data": { "x": 1.5, "y": 2.0 } }
//! { "class": "HitboxComponent",   "type": "opaque",          "data": "eyJvZmZzZXRYIjo..." }
//! ```
//!
//! Opaque nodes hold the same record, serialized and base64-encoded, so they
//! can only be read back as a whole. They carry no references to other
//! nodes; object graphs with cycles cannot be saved.
//!
//! Loading builds a default instance of the class and calls
//! [`Persist::load`] on it. Classes are resolved through static
//! [`ClassRegistry`] tables, one per behaviour family.

pub mod codec;
mod components;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dungeon_ecs::EcsError;

use crate::level::TileLevel;

pub use codec::{ClassRegistry, SaveStateCodec};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The object has no serialization capability.
    #[error("object of class {class} is not serializable")]
    NotSerializable { class: String },

    /// A node could not be turned back into a live object.
    #[error("could not deserialize object of class {class}: {details}")]
    DeserializationFailure { class: String, details: String },

    #[error("save format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("save was made at {saved} ticks per second but the engine runs at {current}")]
    FrameRateMismatch { saved: u32, current: u32 },

    #[error("save hash mismatch: recorded {recorded} but recomputed {recomputed}")]
    HashMismatch {
        recorded: String,
        recomputed: String,
    },

    #[error("entity layout rejected: {0}")]
    Layout(#[from] EcsError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand for a [`SaveError::DeserializationFailure`].
pub fn failure(class: &str, details: impl Into<String>) -> SaveError {
    SaveError::DeserializationFailure {
        class: class.to_owned(),
        details: details.into(),
    }
}

// ---------------------------------------------------------------------------
// Document nodes
// ---------------------------------------------------------------------------

/// How a node's `data` field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveKind {
    /// `data` is the object's JSON record.
    SelfDescribing,
    /// `data` is the base64 of the serialized record.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub class: String,
    #[serde(rename = "type")]
    pub kind: SaveKind,
    pub data: Value,
}

impl ObjectNode {
    /// The object's record, decoding opaque blobs.
    pub fn payload(&self) -> Result<Value, SaveError> {
        match self.kind {
            SaveKind::SelfDescribing => Ok(self.data.clone()),
            SaveKind::Opaque => {
                let blob = self
                    .data
                    .as_str()
                    .ok_or_else(|| failure(&self.class, "opaque data is not a string"))?;
                let bytes = STANDARD
                    .decode(blob)
                    .map_err(|e| failure(&self.class, format!("corrupt blob: {e}")))?;
                serde_json::from_slice(&bytes)
                    .map_err(|e| failure(&self.class, format!("corrupt blob: {e}")))
            }
        }
    }

    /// Parse a node embedded in another object's record.
    pub fn from_value(owner: &str, value: &Value) -> Result<Self, SaveError> {
        Self::deserialize(value).map_err(|e| failure(owner, format!("malformed node: {e}")))
    }

    pub fn to_value(&self) -> Result<Value, SaveError> {
        Ok(serde_json::to_value(self)?)
    }
}

// ---------------------------------------------------------------------------
// Persist
// ---------------------------------------------------------------------------

/// Everything a decoder may need besides the node itself.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub codec: &'a SaveStateCodec,
    /// The level tile paths are resolved against. Must be loaded before any
    /// object holding a path is decoded.
    pub level: Option<&'a dyn TileLevel>,
}

/// The single serialization capability of persisted types.
pub trait Persist {
    /// Class name written into the node and used to resolve it on load.
    fn class(&self) -> &'static str;

    /// `None` marks the object as not serializable.
    fn save_kind(&self) -> Option<SaveKind> {
        Some(SaveKind::SelfDescribing)
    }

    /// Produce the object's record.
    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError>;

    /// Restore state from a record written by [`save`](Self::save).
    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError>;
}

/// Default-construct `T` and load `data` into it.
pub fn construct<T: Persist + Default>(data: &Value, ctx: &LoadContext<'_>) -> Result<T, SaveError> {
    let mut object = T::default();
    object.load(data, ctx)?;
    Ok(object)
}

/// Serialize a plain record for [`Persist::save`].
pub fn record<T: Serialize>(value: &T) -> Result<Value, SaveError> {
    Ok(serde_json::to_value(value)?)
}

/// Deserialize a plain record inside [`Persist::load`].
pub fn read_record<T: DeserializeOwned>(class: &str, data: &Value) -> Result<T, SaveError> {
    T::deserialize(data).map_err(|e| failure(class, e.to_string()))
}

/// A required field of a record.
pub fn field<'v>(class: &str, data: &'v Value, name: &str) -> Result<&'v Value, SaveError> {
    data.get(name)
        .ok_or_else(|| failure(class, format!("missing field `{name}`")))
}

/// A required field, deserialized.
pub fn read_field<T: DeserializeOwned>(class: &str, data: &Value, name: &str) -> Result<T, SaveError> {
    T::deserialize(field(class, data, name)?)
        .map_err(|e| failure(class, format!("field `{name}`: {e}")))
}

/// The error [`Persist::save`] and [`Persist::load`] return for types that
/// opt out of serialization.
pub fn not_serializable(class: &str) -> SaveError {
    SaveError::NotSerializable {
        class: class.to_owned(),
    }
}
