//! Client-credentials exchange against the travel API's token endpoint.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	config::Credentials,
	error::{ConfigError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot, WithTimeout},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Token endpoint path relative to the API base URL.
pub const TOKEN_PATH: &str = "/v1/security/oauth2/token";
/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(1700);

const BODY_PREVIEW_LIMIT: usize = 256;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	///
	/// `operation` names the endpoint family ("the token endpoint", "the travel API").
	fn map_transport_error(
		&self,
		operation: &'static str,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		operation: &'static str,
		_meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(operation, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::network(
				operation,
				std::io::Error::other(format!("HTTP client error: {message}")),
			)
			.into(),
			other => TransportError::network(
				operation,
				std::io::Error::other(format!("Unhandled HTTP client error: {other:?}")),
			)
			.into(),
		}
	}
}

/// Token issued by the provider, before it is cached.
#[derive(Clone, Debug)]
pub(crate) struct IssuedToken {
	pub(crate) access_token: String,
	pub(crate) expires_in: Duration,
}

/// Facade over the `oauth2` client configured for the client-credentials grant.
pub(crate) struct ClientCredentialsFacade<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	timeout: std::time::Duration,
}
impl<C, M> ClientCredentialsFacade<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Configures the facade to post `client_id`/`client_secret` in the form body.
	pub(crate) fn new(
		token_url: Url,
		credentials: &Credentials,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
		timeout: std::time::Duration,
	) -> Self {
		let token_url = TokenUrl::from_url(token_url);
		let oauth_client = BasicClient::new(ClientId::new(credentials.key.clone()))
			.set_client_secret(ClientSecret::new(credentials.secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		Self { oauth_client, http_client, error_mapper, timeout }
	}

	pub(crate) fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	pub(crate) fn error_mapper(&self) -> &Arc<M> {
		&self.error_mapper
	}

	/// Runs the client-credentials grant once.
	pub(crate) async fn exchange(&self) -> Result<IssuedToken> {
		let meta = ResponseMetadataSlot::default();
		let instrumented =
			WithTimeout::new(self.http_client.with_metadata(meta.clone()), self.timeout);
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;
		let expires_in = match response.expires_in() {
			Some(lifetime) => Duration::seconds(
				i64::try_from(lifetime.as_secs()).unwrap_or(DEFAULT_EXPIRES_IN.whole_seconds()),
			),
			None => DEFAULT_EXPIRES_IN,
		};

		Ok(IssuedToken { access_token: response.access_token().secret().to_owned(), expires_in })
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error("the token endpoint", meta.as_ref(), error),
		RequestTokenError::Parse(error, body) => Error::TokenRetrievalFailed {
			message: format!(
				"Failed to retrieve API access token. Unreadable token response at {}.",
				error.path()
			),
			status,
			body: Some(body_preview(&body)),
		},
		RequestTokenError::Other(message) => Error::TokenRetrievalFailed {
			message: format!("Failed to retrieve API access token. {message}"),
			status,
			body: None,
		},
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let detail = response
		.error_description()
		.cloned()
		.unwrap_or_else(|| response.error().as_ref().to_owned());

	Error::TokenRetrievalFailed {
		message: format!("Failed to retrieve API access token. {detail}"),
		status,
		body: serde_json::to_string(&response).ok(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(operation: &'static str, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { operation }.into();
	}

	TransportError::network(operation, err).into()
}

/// Truncates a response body for diagnostics.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		config::{Environment, Settings},
		http::ReqwestHttpClient,
	};

	#[test]
	fn builds_request_body_auth_client() {
		let mut settings = Settings::default();

		settings.credentials = Credentials::new("client-id", "secret", Environment::Test);

		let token_url =
			settings.endpoint_url(TOKEN_PATH, "token endpoint").expect("Token URL should resolve.");
		let facade = <ClientCredentialsFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::new(
			token_url,
			&settings.credentials,
			Arc::new(ReqwestHttpClient::new().expect("Default reqwest client should build.")),
			Arc::new(ReqwestTransportErrorMapper),
			std::time::Duration::from_secs(30),
		);

		assert_eq!(
			facade.oauth_client.token_uri().url().as_str(),
			"https://test.api.amadeus.com/v1/security/oauth2/token"
		);
	}

	#[test]
	fn body_preview_truncates_long_payloads() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(long.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(body_preview(b"short"), "short");
	}
}
