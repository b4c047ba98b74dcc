pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Cursor expired: {message}")]
	CursorExpired { message: String },
	#[error("Cursor busy: {message}")]
	CursorBusy { message: String },
	#[error("Backend failure: {0}")]
	Backend(#[from] cdr_backend::Error),
}
impl From<cdr_domain::ResolveError> for Error {
	fn from(err: cdr_domain::ResolveError) -> Self {
		Self::NotFound { message: err.to_string() }
	}
}
