pub mod elastic;
pub mod types;

mod error;

pub use error::{Error, Result};
pub use types::{BackendPage, ContinuationToken, Document, lookup_path};

use std::{future::Future, pin::Pin};

use serde_json::Value;

use cdr_domain::IndexName;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn execute_query<'a>(
		&'a self,
		index: &'a IndexName,
		body: &'a Value,
		page_size: u32,
	) -> BoxFuture<'a, Result<BackendPage>>;

	/// Consumes `token`; the backend must never accept the same token twice.
	fn continue_query(&self, token: ContinuationToken) -> BoxFuture<'_, Result<BackendPage>>;

	/// Frees the server-side state behind an abandoned token.
	fn release(&self, token: ContinuationToken) -> BoxFuture<'_, Result<()>>;

	fn get_document<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, Result<Option<Document>>>;

	/// Returns `false` when the document did not exist.
	fn delete_document<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<bool>>;
}

pub trait BlobStore
where
	Self: Send + Sync,
{
	/// Last write wins.
	fn put<'a>(&'a self, key: &'a str, value: &'a Value) -> BoxFuture<'a, Result<()>>;
}
