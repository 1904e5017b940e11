//! Native errors of the in-memory store.
//!
//! These are boxed into [`DocumentStoreError::Write`](docrepo_core::error::DocumentStoreError::Write)
//! and can be recovered with `downcast_ref`.

use docrepo_core::update::UpdateApplyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryStoreError {
    #[error("duplicate key {id} in collection {collection}")]
    DuplicateKey { id: String, collection: String },
    #[error("replacement changes the identity of document {0}")]
    IdentityChanged(String),
    #[error(transparent)]
    Update(#[from] UpdateApplyError),
}
