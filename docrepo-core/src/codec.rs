//! Conversion between documents and their stored BSON form.
//!
//! The identity field is aliased to `_id` on the way in and back on the way out. Absent
//! identities are left out so the store can assign one.

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, ser::serialize_to_bson};

use crate::{
    document::{Document, DocumentKey, key_field_value},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Encodes a document into its stored form.
pub fn encode<D: Document>(document: &D) -> DocumentStoreResult<BsonDocument> {
    let mut stored = match serialize_to_bson(document)? {
        Bson::Document(doc) => doc,
        other => {
            return Err(DocumentStoreError::Serialization(format!(
                "{} serialized to {:?} instead of a document",
                D::type_name(),
                other.element_type()
            )));
        }
    };

    stored.remove(D::ID_FIELD);

    if let Some(id) = document.id() {
        let mut with_id = BsonDocument::new();
        with_id.insert("_id", id.to_bson());
        for (key, value) in stored {
            with_id.insert(key, value);
        }
        stored = with_id;
    }

    Ok(stored)
}

/// Decodes a stored document back into `D`.
pub fn decode<D: Document>(mut stored: BsonDocument) -> DocumentStoreResult<D> {
    if let Some(id) = stored.remove("_id") {
        let key = D::Key::from_bson(id)?;
        stored.insert(D::ID_FIELD, key_field_value(&key)?);
    }

    Ok(deserialize_from_bson(Bson::Document(stored))?)
}

#[cfg(test)]
mod tests {
    use bson::{DateTime, doc, oid::ObjectId};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::schema::{Schema, SchemaField, Shape};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "noteId")]
        note_id: Option<String>,
        modified_on: Option<DateTime>,
        text: String,
    }

    impl Shape for Note {
        fn schema() -> Schema {
            Schema::object(vec![
                SchemaField::new("noteId", <Option<String> as Shape>::schema),
                SchemaField::new("modified_on", <Option<DateTime> as Shape>::schema),
                SchemaField::new("text", <String as Shape>::schema),
            ])
        }
    }

    impl Document for Note {
        type Key = String;
        const ID_FIELD: &'static str = "noteId";

        fn id(&self) -> Option<&String> {
            self.note_id.as_ref()
        }

        fn set_id(&mut self, id: String) {
            self.note_id = Some(id);
        }

        fn modified_on(&self) -> Option<DateTime> {
            self.modified_on
        }

        fn set_modified_on(&mut self, at: DateTime) {
            self.modified_on = Some(at);
        }
    }

    #[test]
    fn identity_is_stored_as_underscore_id() {
        let oid = ObjectId::new();
        let note = Note { note_id: Some(oid.to_hex()), modified_on: None, text: "hi".into() };

        let stored = encode(&note).unwrap();

        assert_eq!(stored.get("_id"), Some(&Bson::ObjectId(oid)));
        assert!(stored.get("noteId").is_none());
        assert_eq!(decode::<Note>(stored).unwrap(), note);
    }

    #[test]
    fn absent_identity_is_left_for_the_store() {
        let note = Note { note_id: None, modified_on: None, text: "hi".into() };

        let stored = encode(&note).unwrap();

        assert!(!stored.contains_key("_id"));
        assert_eq!(stored.get_str("text").unwrap(), "hi");
    }

    #[test]
    fn decode_reports_unrepresentable_identities() {
        let stored = doc! { "_id": 3.5, "modified_on": null, "text": "x" };

        assert!(matches!(
            decode::<Note>(stored),
            Err(DocumentStoreError::Serialization(_))
        ));
    }

    #[test]
    fn type_name_strips_module_path() {
        assert_eq!(Note::type_name(), "Note");
    }
}
