pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("Invalid backend URL: {message}")]
	InvalidUrl { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Backend returned {status}: {body}")]
	Status { status: u16, body: String },
	#[error("Continuation token {token:?} is not known to the backend.")]
	UnknownToken { token: String },
}
