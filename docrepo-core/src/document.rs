//! The document contract.
//!
//! Every entity stored through a repository carries an identity (`Id`) and a modification
//! timestamp (`ModifiedOn`). The identity is assigned by the store on first insert when absent
//! and never changes afterwards. The timestamp is stamped by the repository on every write and
//! is never meant to be set by callers.
//!
//! The usual way to implement [`Document`] is `#[derive(Document)]`:
//!
//! ```ignore
//! use docrepo::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "restaurants")]
//! pub struct Restaurant {
//!     pub id: Option<String>,
//!     pub modified_on: Option<bson::DateTime>,
//!     pub name: String,
//! }
//! ```

use std::fmt::Debug;

use bson::{Bson, DateTime, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::Shape,
};

/// Core trait that all documents stored through a repository must implement.
pub trait Document: Serialize + DeserializeOwned + Shape + Send + Sync + Clone + 'static {
    /// The identity type.
    type Key: DocumentKey;

    /// Serialized name of the identity field. Stored as `_id`.
    const ID_FIELD: &'static str = "id";

    /// Serialized name of the modification timestamp field.
    const MODIFIED_ON_FIELD: &'static str = "modified_on";

    /// Returns the identity, or `None` before the document is first inserted.
    fn id(&self) -> Option<&Self::Key>;

    fn set_id(&mut self, id: Self::Key);

    /// Returns the time of the last write made through a repository.
    fn modified_on(&self) -> Option<DateTime>;

    fn set_modified_on(&mut self, at: DateTime);

    /// Type-level collection naming metadata, if declared.
    fn collection_name() -> Option<&'static str> {
        None
    }

    /// The type's own name, the last-resort collection name.
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// An identity type that can be stored as `_id`.
///
/// `to_bson` gives the store-native representation. `from_bson` accepts a store-assigned or
/// caller-supplied value and fails with a serialization error when it cannot be represented.
pub trait DocumentKey: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static {
    fn to_bson(&self) -> Bson;

    fn from_bson(value: Bson) -> DocumentStoreResult<Self>;
}

fn key_mismatch<K>(value: &Bson) -> DocumentStoreError {
    DocumentStoreError::Serialization(format!(
        "cannot represent {value} as a {} identity",
        std::any::type_name::<K>()
    ))
}

/// String identities that look like an ObjectId are stored as one.
impl DocumentKey for String {
    fn to_bson(&self) -> Bson {
        match ObjectId::parse_str(self) {
            Ok(oid) if self.len() == 24 => Bson::ObjectId(oid),
            _ => Bson::String(self.clone()),
        }
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            Bson::String(s) => Ok(s),
            other => Err(key_mismatch::<Self>(&other)),
        }
    }
}

impl DocumentKey for ObjectId {
    fn to_bson(&self) -> Bson {
        Bson::ObjectId(*self)
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::ObjectId(oid) => Ok(oid),
            Bson::String(ref s) => ObjectId::parse_str(s).map_err(|_| key_mismatch::<Self>(&value)),
            other => Err(key_mismatch::<Self>(&other)),
        }
    }
}

impl DocumentKey for bson::Uuid {
    fn to_bson(&self) -> Bson {
        Bson::from(*self)
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::String(ref s) => bson::Uuid::parse_str(s).map_err(|_| key_mismatch::<Self>(&value)),
            other => Ok(deserialize_from_bson(other)?),
        }
    }
}

impl DocumentKey for uuid::Uuid {
    fn to_bson(&self) -> Bson {
        Bson::from(bson::Uuid::from(*self))
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        Ok(bson::Uuid::from_bson(value)?.into())
    }
}

impl DocumentKey for i64 {
    fn to_bson(&self) -> Bson {
        Bson::Int64(*self)
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::Int64(v) => Ok(v),
            Bson::Int32(v) => Ok(v.into()),
            other => Err(key_mismatch::<Self>(&other)),
        }
    }
}

impl DocumentKey for i32 {
    fn to_bson(&self) -> Bson {
        Bson::Int32(*self)
    }

    fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::Int32(v) => Ok(v),
            Bson::Int64(v) => i32::try_from(v).map_err(|_| key_mismatch::<Self>(&Bson::Int64(v))),
            other => Err(key_mismatch::<Self>(&other)),
        }
    }
}

/// Encodes a key into the form its document field deserializes from.
pub(crate) fn key_field_value<K: DocumentKey>(key: &K) -> DocumentStoreResult<Bson> {
    Ok(serialize_to_bson(key)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_strings_are_stored_as_object_ids() {
        let oid = ObjectId::new();
        let key = oid.to_hex();

        assert_eq!(key.to_bson(), Bson::ObjectId(oid));
        assert_eq!(String::from_bson(Bson::ObjectId(oid)).unwrap(), key);
    }

    #[test]
    fn plain_strings_stay_strings() {
        let key = "restaurant-1".to_string();

        assert_eq!(key.to_bson(), Bson::String("restaurant-1".into()));
        assert!(String::from_bson(Bson::Int32(4)).is_err());
    }

    #[test]
    fn uuid_keys_round_trip_through_binary() {
        let id = uuid::Uuid::new_v4();
        let stored = id.to_bson();

        assert!(matches!(stored, Bson::Binary(_)));
        assert_eq!(uuid::Uuid::from_bson(stored).unwrap(), id);
    }

    #[test]
    fn integer_keys_widen() {
        assert_eq!(i64::from_bson(Bson::Int32(7)).unwrap(), 7);
        assert!(i32::from_bson(Bson::Int64(i64::MAX)).is_err());
    }
}
