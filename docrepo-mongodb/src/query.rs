//! Translation of resolved queries and updates into MongoDB syntax.

use bson::{Bson, Document, doc};

use docrepo_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
    update::{UpdateOp, UpdateSpec},
};

/// Translates filter expressions into MongoDB query documents.
///
/// String operators are case-sensitive and match their argument literally.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn filter(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Sort document for `keys`, with `_id` ascending as the final tiebreak.
    pub(crate) fn sort(keys: &[Sort]) -> Option<Document> {
        if keys.is_empty() {
            return None;
        }

        let mut sort = Document::new();
        for key in keys {
            if !sort.contains_key(&key.field) {
                sort.insert(
                    key.field.clone(),
                    match key.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    },
                );
            }
        }
        if !sort.contains_key("_id") {
            sort.insert("_id", 1);
        }

        Some(sort)
    }

    /// Update document with one section per operator kind.
    pub(crate) fn update(spec: &UpdateSpec) -> Document {
        let mut sections: Vec<(&str, Document)> = Vec::new();

        for op in &spec.ops {
            let (section, path, value) = match op {
                UpdateOp::Set(path, value) => ("$set", path, value.clone()),
                UpdateOp::Unset(path) => ("$unset", path, Bson::String(String::new())),
                UpdateOp::Inc(path, delta) => ("$inc", path, delta.clone()),
                UpdateOp::CurrentDate(path) => ("$currentDate", path, Bson::Boolean(true)),
            };

            match sections.iter_mut().find(|(name, _)| *name == section) {
                Some((_, fields)) => {
                    fields.insert(path.clone(), value);
                }
                None => sections.push((section, doc! { path.clone(): value })),
            }
        }

        sections
            .into_iter()
            .map(|(name, fields)| (name.to_string(), Bson::Document(fields)))
            .collect()
    }

    fn text(op: FieldOp, value: &Bson) -> Result<String, DocumentStoreError> {
        match value {
            Bson::String(s) => Ok(regex::escape(s)),
            other => Err(DocumentStoreError::InvalidArgument(format!(
                "{op:?} requires a string value, got {other}"
            ))),
        }
    }

    fn contains(value: &Bson) -> Document {
        match value {
            Bson::String(s) => doc! { "$regex": regex::escape(s) },
            Bson::Array(items) => doc! { "$all": items.clone() },
            other => doc! { "$eq": other.clone() },
        }
    }

    fn list(value: &Bson) -> Bson {
        match value {
            Bson::Array(_) => value.clone(),
            single => Bson::Array(vec![single.clone()]),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$nor": [{}] });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => Self::contains(value),
                FieldOp::NotContains => doc! { "$not": Self::contains(value) },
                FieldOp::StartsWith => doc! { "$regex": format!("^{}", Self::text(*op, value)?) },
                FieldOp::EndsWith => doc! { "$regex": format!("{}$", Self::text(*op, value)?) },
                FieldOp::AnyOf => doc! { "$in": Self::list(value) },
                FieldOp::NoneOf => doc! { "$nin": Self::list(value) },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use docrepo_core::query::Filter;

    use super::*;

    fn translate(expr: &Expr) -> Document {
        MongoQueryTranslator::filter(Some(expr)).unwrap()
    }

    #[test]
    fn string_operators_escape_their_argument() {
        assert_eq!(
            translate(&Filter::contains("name", "Do.")),
            doc! { "name": { "$regex": "Do\\." } }
        );
        assert_eq!(
            translate(&Filter::starts_with("name", "Dom")),
            doc! { "name": { "$regex": "^Dom" } }
        );
        assert_eq!(
            translate(&Filter::ends_with("name", "(1)")),
            doc! { "name": { "$regex": "\\(1\\)$" } }
        );
        assert!(MongoQueryTranslator::filter(Some(&Filter::starts_with("n", 1))).is_err());
    }

    #[test]
    fn logical_operators() {
        let expr = Filter::eq("borough", "Bronx")
            .and(Filter::contains("tags", vec!["a", "b"]).not());

        assert_eq!(
            translate(&expr),
            doc! {
                "$and": [
                    { "borough": { "$eq": "Bronx" } },
                    { "$nor": [{ "tags": { "$all": ["a", "b"] } }] },
                ]
            }
        );
        assert_eq!(translate(&Expr::And(vec![])), doc! {});
        assert_eq!(translate(&Expr::Or(vec![])), doc! { "$nor": [{}] });
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
    }

    #[test]
    fn sort_appends_identity_tiebreak() {
        assert_eq!(MongoQueryTranslator::sort(&[]), None);
        assert_eq!(
            MongoQueryTranslator::sort(&[Sort::desc("score"), Sort::asc("name")]),
            Some(doc! { "score": -1, "name": 1, "_id": 1 })
        );
        assert_eq!(
            MongoQueryTranslator::sort(&[Sort::desc("_id")]),
            Some(doc! { "_id": -1 })
        );
    }

    #[test]
    fn updates_group_by_operator() {
        let spec = UpdateSpec::new(vec![
            UpdateOp::Set("name".into(), "x".into()),
            UpdateOp::Inc("score".into(), Bson::Int32(1)),
            UpdateOp::Set("borough".into(), "Queens".into()),
            UpdateOp::Unset("cuisine".into()),
            UpdateOp::CurrentDate("modified_on".into()),
        ]);

        assert_eq!(
            MongoQueryTranslator::update(&spec),
            doc! {
                "$set": { "name": "x", "borough": "Queens" },
                "$inc": { "score": 1 },
                "$unset": { "cuisine": "" },
                "$currentDate": { "modified_on": true },
            }
        );
    }
}
