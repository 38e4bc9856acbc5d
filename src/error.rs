//! Strategy-level error types shared by configuration, token exchanges, and profile fetchers.

// self
use crate::{_prelude::*, auth::IdentifierError, profile::SoapFault};

/// Strategy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical strategy error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem, raised synchronously at construction time.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure while talking to the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Profile could not be fetched or mapped; the cause is attached as the source.
	#[error("Failed to fetch user profile.")]
	ProfileFetch(#[from] ProfileFetchError),
	/// Graph answered with a body that is not valid JSON.
	///
	/// Unlike every other profile failure this one is surfaced without the
	/// [`Error::ProfileFetch`] wrapper.
	#[error(transparent)]
	ProfileParse(serde_json::Error),

	/// Token endpoint rejected the exchange with an OAuth error body.
	#[error("Token endpoint returned an OAuth error: {error}.")]
	TokenEndpoint {
		/// OAuth `error` code.
		error: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded in a way the OAuth client could not classify.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenUnexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Authorization callback carried an error or failed validation.
	#[error("Authorization failed: {code}.")]
	Authorization {
		/// OAuth `error` code (or a local code such as `invalid_state`).
		code: String,
		/// Human readable description.
		description: Option<String>,
		/// Optional `error_uri` reported by the provider.
		uri: Option<String>,
	},
}
impl Error {
	/// Builds an [`Error::Authorization`] with a description.
	pub fn authorization(code: impl Into<String>, description: impl Into<String>) -> Self {
		Self::Authorization { code: code.into(), description: Some(description.into()), uri: None }
	}
}

/// Configuration and validation failures raised while building a strategy.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Options were absent or did not carry a client identifier.
	#[error("The strategy requires a client ID.")]
	MissingClientId,
	/// Tenant identifier failed validation.
	#[error("Tenant is invalid.")]
	InvalidTenant(#[from] IdentifierError),
	/// An endpoint URL cannot be parsed.
	#[error("The {endpoint} URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A custom header name or value is not valid HTTP.
	#[error("Custom header `{name}` is invalid.")]
	InvalidCustomHeader {
		/// Offending header name.
		name: String,
	},
	/// Options document could not be deserialized.
	#[error("Strategy options are invalid.")]
	InvalidOptions {
		/// Structured parsing failure pointing at the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO) raised during token exchanges.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Causes carried by [`Error::ProfileFetch`].
#[derive(Debug, ThisError)]
pub enum ProfileFetchError {
	/// Underlying HTTP client failed to reach the profile endpoint.
	#[error("Network error occurred while calling the profile endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Profile endpoint answered with a non-success status.
	#[error("Profile endpoint responded with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// Provider reported a SOAP fault.
	#[error(transparent)]
	Fault(#[from] SoapFault),
	/// Response parsed but lacked an expected node.
	#[error("Profile response is missing `{path}`.")]
	MissingNode {
		/// Slash-separated path of the missing node.
		path: String,
	},
	/// Response body is not well-formed XML.
	#[error("Profile response is not well-formed XML: {message}.")]
	Xml {
		/// Parser diagnostic.
		message: String,
	},
	/// Request envelope could not be written.
	#[error("Profile request envelope could not be written: {message}.")]
	Envelope {
		/// Writer diagnostic.
		message: String,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
}
impl ProfileFetchError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	pub(crate) fn missing(path: impl Into<String>) -> Self {
		Self::MissingNode { path: path.into() }
	}
}
