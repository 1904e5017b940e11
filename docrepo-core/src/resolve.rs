//! Resolution of criteria against a document type.
//!
//! Rewrites every field path to its canonical stored path and converts identity literals to
//! the store-native form of the document's key type, so a hex string compares equal to the
//! ObjectId it names.

use std::marker::PhantomData;

use bson::Bson;

use crate::{
    document::{Document, DocumentKey},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor, Sort},
    schema::{Schema, resolve_path},
};

pub(crate) struct FieldResolver<D> {
    schema: Schema,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Document> FieldResolver<D> {
    pub fn new() -> Self {
        Self { schema: D::schema(), _marker: PhantomData }
    }

    pub fn resolve_path(&self, path: &str) -> DocumentStoreResult<String> {
        resolve_path(&self.schema, D::ID_FIELD, D::type_name(), path)
    }

    pub fn resolve_expr(&self, expr: &Expr) -> DocumentStoreResult<Expr> {
        ExprRewriter { resolver: self }.visit_expr(expr)
    }

    pub fn resolve_sort(&self, sort: &Sort) -> DocumentStoreResult<Sort> {
        Ok(Sort { field: self.resolve_path(&sort.field)?, direction: sort.direction })
    }
}

struct ExprRewriter<'r, D> {
    resolver: &'r FieldResolver<D>,
}

impl<D: Document> QueryVisitor for ExprRewriter<'_, D> {
    type Output = Expr;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(Expr::And(exprs.iter().map(|e| self.visit_expr(e)).collect::<Result<_, _>>()?))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(Expr::Or(exprs.iter().map(|e| self.visit_expr(e)).collect::<Result<_, _>>()?))
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(self.visit_expr(expr)?.not())
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(Expr::Exists(self.resolver.resolve_path(field)?, should_exist))
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field = self.resolver.resolve_path(field)?;
        let value = if field == "_id" { normalize_key::<D>(op, value) } else { value.clone() };

        Ok(Expr::field(field, *op, value))
    }
}

fn normalize_key<D: Document>(op: &FieldOp, value: &Bson) -> Bson {
    let convert = |v: &Bson| {
        D::Key::from_bson(v.clone())
            .map(|key| key.to_bson())
            .unwrap_or_else(|_| v.clone())
    };

    match (op, value) {
        (FieldOp::AnyOf | FieldOp::NoneOf, Bson::Array(items)) => {
            Bson::Array(items.iter().map(convert).collect())
        }
        (_, Bson::Null) => Bson::Null,
        _ => convert(value),
    }
}

#[cfg(test)]
mod tests {
    use bson::{DateTime, oid::ObjectId};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::{
        query::Filter,
        schema::{SchemaField, Shape},
    };

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Venue {
        id: Option<String>,
        modified_on: Option<DateTime>,
        title: String,
    }

    impl Shape for Venue {
        fn schema() -> Schema {
            Schema::object(vec![
                SchemaField::new("id", <Option<String> as Shape>::schema),
                SchemaField::new("modified_on", <Option<DateTime> as Shape>::schema),
                SchemaField::new("title", <String as Shape>::schema),
            ])
        }
    }

    impl Document for Venue {
        type Key = String;

        fn id(&self) -> Option<&String> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn modified_on(&self) -> Option<DateTime> {
            self.modified_on
        }

        fn set_modified_on(&mut self, at: DateTime) {
            self.modified_on = Some(at);
        }
    }

    #[test]
    fn paths_are_rewritten_to_stored_names() {
        let resolver = FieldResolver::<Venue>::new();
        let expr = Filter::eq("Title", "Hall").or(Filter::exists("ID"));

        assert_eq!(
            resolver.resolve_expr(&expr).unwrap(),
            Filter::eq("title", "Hall").or(Filter::exists("_id"))
        );
    }

    #[test]
    fn identity_literals_become_native_keys() {
        let resolver = FieldResolver::<Venue>::new();
        let oid = ObjectId::new();

        let eq = resolver.resolve_expr(&Filter::eq("id", oid.to_hex())).unwrap();
        assert_eq!(eq, Filter::eq("_id", oid));

        let any = resolver
            .resolve_expr(&Filter::any_of("id", vec![oid.to_hex(), "plain".to_string()]))
            .unwrap();
        assert_eq!(any, Filter::any_of("_id", vec![Bson::ObjectId(oid), Bson::String("plain".into())]));
    }

    #[test]
    fn unknown_fields_fail() {
        let resolver = FieldResolver::<Venue>::new();

        assert!(matches!(
            resolver.resolve_expr(&Filter::eq("capacity", 3).not()),
            Err(DocumentStoreError::FieldResolution { .. })
        ));
        assert!(resolver.resolve_sort(&Sort::asc("capacity")).is_err());
    }
}
