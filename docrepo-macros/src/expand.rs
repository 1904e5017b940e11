use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Path, Result, Type};

use crate::attrs::{ContainerAttrs, FieldAttrs, option_inner, unraw};

/// A serialized field of the deriving struct.
struct StoredField<'a> {
    ident: &'a syn::Ident,
    ty: &'a Type,
    name: String,
    attrs: FieldAttrs,
}

struct Parsed<'a> {
    container: ContainerAttrs,
    fields: Vec<StoredField<'a>>,
    krate: Path,
}

fn parse<'a>(input: &'a DeriveInput, derive: &str) -> Result<Parsed<'a>> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    format!("{derive} requires a struct with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    let container = ContainerAttrs::parse(&input.attrs)?;
    let mut fields = Vec::new();

    for field in &named.named {
        let attrs = FieldAttrs::parse(field)?;
        if attrs.flatten {
            return Err(syn::Error::new_spanned(
                field,
                format!("{derive} does not support #[serde(flatten)] fields"),
            ));
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let rust_name = unraw(ident);
        let name = match (&attrs.rename, container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply(&rust_name),
            (None, None) => rust_name,
        };

        fields.push(StoredField { ident, ty: &field.ty, name, attrs });
    }

    let krate = container
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::docrepo));

    Ok(Parsed { container, fields, krate })
}

/// Finds the field marked with `marker`, or else the field named `default_name`.
fn special_field<'p, 'a>(
    input: &DeriveInput,
    fields: &'p [StoredField<'a>],
    marker: fn(&FieldAttrs) -> bool,
    attribute: &str,
    default_name: &str,
) -> Result<&'p StoredField<'a>> {
    let mut marked = fields.iter().filter(|field| marker(&field.attrs));

    match (marked.next(), marked.next()) {
        (Some(field), None) => Ok(field),
        (Some(_), Some(extra)) => Err(syn::Error::new_spanned(
            extra.ident,
            format!("only one field can be marked #[document({attribute})]"),
        )),
        (None, _) => fields
            .iter()
            .find(|field| unraw(field.ident) == default_name)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    &input.ident,
                    format!("no `{default_name}` field; name one or mark it with #[document({attribute})]"),
                )
            }),
    }
}

fn shape_impl(input: &DeriveInput, parsed: &Parsed) -> TokenStream {
    let name = &input.ident;
    let krate = &parsed.krate;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let entries = parsed
        .fields
        .iter()
        .filter(|field| !field.attrs.skip)
        .map(|field| {
            let stored = &field.name;
            let ty = field.ty;
            quote! {
                #krate::schema::SchemaField::new(#stored, <#ty as #krate::schema::Shape>::schema)
            }
        });

    quote! {
        impl #impl_generics #krate::schema::Shape for #name #ty_generics #where_clause {
            fn schema() -> #krate::schema::Schema {
                #krate::schema::Schema::object(::std::vec![#(#entries),*])
            }
        }

        impl #impl_generics #krate::field::Nested for #name #ty_generics #where_clause {
            type Inner = Self;
        }
    }
}

fn field_consts(input: &DeriveInput, parsed: &Parsed, id_ident: Option<&syn::Ident>) -> TokenStream {
    let name = &input.ident;
    let krate = &parsed.krate;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let consts = parsed
        .fields
        .iter()
        .filter(|field| !field.attrs.skip)
        .map(|field| {
            let const_name = format_ident!("{}", unraw(field.ident).to_ascii_uppercase());
            let ty = field.ty;
            let path = if Some(field.ident) == id_ident {
                "_id".to_string()
            } else {
                field.name.clone()
            };
            let doc = format!("The stored field `{path}`.");

            quote! {
                #[doc = #doc]
                pub const #const_name: #krate::field::Field<Self, #ty> = #krate::field::Field::new(#path);
            }
        });

    quote! {
        #[allow(dead_code)]
        impl #impl_generics #name #ty_generics #where_clause {
            #(#consts)*
        }
    }
}

pub(crate) fn derive_document(input: &DeriveInput) -> Result<TokenStream> {
    let parsed = parse(input, "Document")?;
    let id = special_field(input, &parsed.fields, |attrs| attrs.id, "id", "id")?;
    let modified = special_field(
        input,
        &parsed.fields,
        |attrs| attrs.modified_on,
        "modified_on",
        "modified_on",
    )?;

    if id.attrs.skip || modified.attrs.skip {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "identity and modification timestamp fields must be serialized",
        ));
    }

    let name = &input.ident;
    let type_name = name.to_string();
    let krate = &parsed.krate;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let id_ident = id.ident;
    let (key_ty, id_getter, id_setter) = match option_inner(id.ty) {
        Some(inner) => (
            inner,
            quote! { self.#id_ident.as_ref() },
            quote! { self.#id_ident = ::std::option::Option::Some(id); },
        ),
        None => (
            id.ty,
            quote! { ::std::option::Option::Some(&self.#id_ident) },
            quote! { self.#id_ident = id; },
        ),
    };

    let modified_ident = modified.ident;
    let (modified_getter, modified_setter) = match option_inner(modified.ty) {
        Some(_) => (
            quote! { self.#modified_ident },
            quote! { self.#modified_ident = ::std::option::Option::Some(at); },
        ),
        None => (
            quote! { ::std::option::Option::Some(self.#modified_ident) },
            quote! { self.#modified_ident = at; },
        ),
    };

    let id_name = &id.name;
    let modified_name = &modified.name;
    let collection = parsed.container.collection.as_ref().map(|collection| {
        quote! {
            fn collection_name() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#collection)
            }
        }
    });

    let shape = shape_impl(input, &parsed);
    let consts = field_consts(input, &parsed, Some(id_ident));

    Ok(quote! {
        #shape

        #consts

        impl #impl_generics #krate::document::Document for #name #ty_generics #where_clause {
            type Key = #key_ty;

            const ID_FIELD: &'static str = #id_name;
            const MODIFIED_ON_FIELD: &'static str = #modified_name;

            fn id(&self) -> ::std::option::Option<&Self::Key> {
                #id_getter
            }

            fn set_id(&mut self, id: Self::Key) {
                #id_setter
            }

            fn modified_on(&self) -> ::std::option::Option<#krate::bson::DateTime> {
                #modified_getter
            }

            fn set_modified_on(&mut self, at: #krate::bson::DateTime) {
                #modified_setter
            }

            #collection

            fn type_name() -> &'static str {
                #type_name
            }
        }
    })
}

pub(crate) fn derive_embedded(input: &DeriveInput) -> Result<TokenStream> {
    let parsed = parse(input, "Embedded")?;

    if parsed.container.collection.is_some() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "embedded types are stored inside documents and cannot name a collection",
        ));
    }

    let shape = shape_impl(input, &parsed);
    let consts = field_consts(input, &parsed, None);

    Ok(quote! {
        #shape

        #consts
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: TokenStream) -> Result<String> {
        let input: DeriveInput = syn::parse2(tokens)?;
        derive_document(&input).map(|out| out.to_string().split_whitespace().collect())
    }

    #[test]
    fn defaults_to_conventional_field_names() {
        let out = expand(quote! {
            #[document(collection = "restaurants")]
            struct Restaurant {
                id: Option<String>,
                modified_on: Option<bson::DateTime>,
                borough: String,
            }
        })
        .unwrap();

        assert!(out.contains("pubconstBOROUGH"));
        assert!(out.contains("Field::new(\"_id\")"));
        assert!(out.contains("Some(\"restaurants\")"));
        assert!(out.contains("typeKey=String"));
    }

    #[test]
    fn serde_names_are_used_for_stored_paths() {
        let out = expand(quote! {
            #[serde(rename_all = "camelCase")]
            #[document(crate = "docrepo_core")]
            struct Grade {
                #[document(id)]
                grade_id: i64,
                #[serde(rename = "updated")]
                #[document(modified_on)]
                updated_at: bson::DateTime,
                letter_grade: String,
                #[serde(skip)]
                cached: u32,
            }
        })
        .unwrap();

        assert!(out.contains("ID_FIELD:&'staticstr=\"gradeId\""));
        assert!(out.contains("MODIFIED_ON_FIELD:&'staticstr=\"updated\""));
        assert!(out.contains("Field::new(\"letterGrade\")"));
        assert!(!out.contains("CACHED"));
        assert!(out.contains("docrepo_core::document::Document"));
    }

    #[test]
    fn missing_identity_is_rejected() {
        let err = expand(quote! {
            struct Note {
                modified_on: Option<bson::DateTime>,
                text: String,
            }
        })
        .unwrap_err();

        assert!(err.to_string().contains("no `id` field"));
    }

    #[test]
    fn only_named_structs_are_supported() {
        assert!(expand(quote! { struct Pair(String, i32); }).is_err());
        assert!(expand(quote! { enum Kind { A, B } }).is_err());
    }
}
