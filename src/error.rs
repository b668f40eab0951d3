//! Crate-level error types shared by the token cache, gateway, stores, and desk actions.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// API key or secret is not configured.
	#[error("API key or secret is not configured.")]
	CredentialsMissing,
	/// Token endpoint refused to issue a token or answered with an unreadable body.
	#[error("{message}")]
	TokenRetrievalFailed {
		/// Human-readable summary, including the provider's description when present.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Raw (truncated) upstream body for diagnostics.
		body: Option<String>,
	},
	/// API endpoint answered with a non-2xx status.
	#[error("{message}")]
	UpstreamRequestFailed {
		/// Summary built from the provider's `errors[].title` and `errors[].detail`.
		message: String,
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Decoded error body, when it parsed as JSON.
		body: Option<Value>,
	},
	/// Caller exceeded the action budget for the current window.
	#[error("Too many {action} requests; retry after {retry_at}.")]
	RateLimited {
		/// Action label whose budget was exhausted.
		action: String,
		/// Instant when the current window closes.
		retry_at: OffsetDateTime,
	},
	/// Required parameters are missing or malformed.
	#[error("Invalid input: {reason}.")]
	InvalidInput {
		/// What was wrong with the input.
		reason: String,
	},
	/// Anti-forgery token is missing or does not match the caller.
	#[error("Security check failed.")]
	InvalidNonce,
	/// Feature is switched off in the settings.
	#[error("The {feature} feature is disabled.")]
	FeatureDisabled {
		/// Feature label.
		feature: &'static str,
	},
}
impl Error {
	/// Convenience constructor for [`Error::InvalidInput`].
	pub fn invalid_input(reason: impl Into<String>) -> Self {
		Self::InvalidInput { reason: reason.into() }
	}

	/// Message suitable for the failure envelope shown to site visitors.
	pub fn user_message(&self) -> String {
		match self {
			Self::Storage(_) | Self::Config(_) | Self::Transport(_) =>
				"The travel service is temporarily unavailable. Please try again later.".into(),
			Self::RateLimited { .. } => "Too many requests. Please try again later.".into(),
			Self::InvalidInput { reason } => format!("{reason}."),
			other => other.to_string(),
		}
	}

	/// Returns `true` when repeating the same call later may succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transport(_) => true,
			Self::UpstreamRequestFailed { status, .. } => *status == 429 || *status >= 500,
			Self::TokenRetrievalFailed { status: Some(status), .. } => *status >= 500,
			_ => false,
		}
	}

	/// Returns `true` for upstream failures caused by an over-long request URI.
	pub fn is_uri_too_long(&self) -> bool {
		match self {
			Self::UpstreamRequestFailed { status, message, .. } =>
				*status == 414 || message.contains("exceeds 2048 bytes"),
			_ => false,
		}
	}
}

/// Configuration and validation failures.
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
	/// A configured endpoint cannot be parsed.
	#[error("Configured {what} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed.
		what: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Booking page is not configured, so selections cannot be redirected.
	#[error("Booking page URL is not configured.")]
	MissingBookingPage,
	/// Settings file could not be read or written.
	#[error("Settings store failure: {message}.")]
	SettingsStore {
		/// Human-readable error payload.
		message: String,
	},
	/// A request body could not be encoded.
	#[error("Request body could not be encoded.")]
	EncodeBody(#[source] serde_json::Error),
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {operation}.")]
	Network {
		/// Operation label (token endpoint, API endpoint).
		operation: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded its timeout.
	#[error("Request timed out while calling {operation}.")]
	Timeout {
		/// Operation label (token endpoint, API endpoint).
		operation: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the travel API.")]
	Io(#[from] std::io::Error),
	/// Response body could not be decoded as JSON.
	#[error("Response from {operation} was not valid JSON.")]
	Decode {
		/// Operation label.
		operation: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		operation: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { operation, source: Box::new(src) }
	}
}
