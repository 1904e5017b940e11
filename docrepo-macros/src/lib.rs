//! Derive macros for docrepo documents.
//!
//! ### `Document`
//!
//! Implements `Document`, `Shape` and `Nested` for a struct with named fields and adds one
//! typed `Field` constant per serialized field, named after the field in upper case.
//!
//! - **Container attributes**: `#[document(collection = "...")]` declares the collection name,
//!   `#[document(crate = "...")]` overrides the path of the docrepo crate
//! - **Field attributes**: `#[document(id)]` and `#[document(modified_on)]` mark the identity
//!   and timestamp fields when they are not called `id` and `modified_on`
//! - serde `rename`, `rename_all` and `skip` are honored for stored names
//!
//! ```rust,ignore
//! use docrepo::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "restaurants")]
//! pub struct Restaurant {
//!     pub id: Option<String>,
//!     pub modified_on: Option<bson::DateTime>,
//!     pub borough: String,
//!     pub address: Address,
//! }
//!
//! let filter = Restaurant::BOROUGH.eq("Bronx");
//! ```
//!
//! ### `Embedded`
//!
//! Implements `Shape` and `Nested` and adds the field constants for types stored inside
//! documents, so their fields can be addressed with `Field::then`:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Embedded)]
//! pub struct Address {
//!     pub street: String,
//!     pub zipcode: String,
//! }
//!
//! let by_street = Restaurant::ADDRESS.then(Address::STREET).asc();
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_macros;

mod attrs;
mod expand;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand::derive_document(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[proc_macro_derive(Embedded, attributes(document))]
pub fn derive_embedded(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand::derive_embedded(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
