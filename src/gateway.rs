//! Authenticated access to the travel API.
//!
//! [`Gateway::request`] is the single primitive every operation is layered on: it obtains a
//! bearer token from the [`TokenCache`], issues the call through the shared [`ApiHttpClient`],
//! and normalizes non-2xx answers into [`Error::UpstreamRequestFailed`]. The operation
//! families live in the `locations`, `flights`, and `hotels` submodules.

pub mod flights;
pub mod hotels;
pub mod locations;

pub use flights::*;
pub use hotels::*;
pub use locations::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenCache,
	config::Settings,
	error::{ConfigError, TransportError},
	http::{ApiHttpClient, RequestTimeout, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Content type for query-style requests.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
/// Content type required by POST search bodies.
pub const VENDOR_JSON_CONTENT_TYPE: &str = "application/vnd.amadeus+json";

const OPERATION: &str = "the travel API";

/// Outcome of a search that completed without error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum SearchOutcome<T> {
	/// The provider returned matches.
	Found(T),
	/// The request was valid but matched nothing.
	NoResults,
}
impl<T> SearchOutcome<T> {
	/// Wraps `items`, mapping an empty collection to [`SearchOutcome::NoResults`].
	pub fn from_items(items: T) -> Self
	where
		T: AsRef<[Value]>,
	{
		if items.as_ref().is_empty() { Self::NoResults } else { Self::Found(items) }
	}

	/// Maps the found value.
	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SearchOutcome<U> {
		match self {
			Self::Found(value) => SearchOutcome::Found(f(value)),
			Self::NoResults => SearchOutcome::NoResults,
		}
	}

	/// Returns the found value, if any.
	pub fn found(self) -> Option<T> {
		match self {
			Self::Found(value) => Some(value),
			Self::NoResults => None,
		}
	}

	/// Returns `true` for [`SearchOutcome::NoResults`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::NoResults)
	}
}

/// Authenticated client for the travel API endpoints.
pub struct Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: TokenCache<C, M>,
	settings: Arc<Settings>,
	base_url: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway that shares the token cache's transport.
	pub fn new(tokens: TokenCache<C, M>, settings: Arc<Settings>) -> Result<Self> {
		let base_url = settings.base_url()?;
		let (http_client, error_mapper) = tokens.transport();

		Ok(Self { tokens, settings, base_url, http_client, error_mapper })
	}

	/// Token cache backing the gateway.
	pub fn tokens(&self) -> &TokenCache<C, M> {
		&self.tokens
	}

	/// Settings the gateway was built from.
	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	/// Issues an authenticated call and returns the decoded JSON body.
	///
	/// GET `params` become the query string; a POST `body` is sent as vendor JSON. A 2xx
	/// answer with an empty body decodes as [`Value::Null`].
	pub async fn request(
		&self,
		endpoint: &str,
		method: Method,
		params: &[(&str, String)],
		body: Option<&Value>,
	) -> Result<Value> {
		let token = self.tokens.get_token().await?;
		let mut url = self.settings.endpoint_url(endpoint, "API endpoint")?;

		if method == Method::GET && !params.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(params.iter().map(|(name, value)| (*name, value.as_str())));
		}

		let (content_type, payload) = match body {
			Some(body) if method == Method::POST => {
				let encoded = serde_json::to_vec(body).map_err(ConfigError::EncodeBody)?;

				(VENDOR_JSON_CONTENT_TYPE, encoded)
			},
			_ => (JSON_CONTENT_TYPE, Vec::new()),
		};
		let mut request = Request::builder()
			.method(method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", token.expose()))
			.header(CONTENT_TYPE, content_type)
			.header(ACCEPT, "application/json")
			.body(payload)
			.map_err(ConfigError::from)?;

		request.extensions_mut().insert(RequestTimeout(self.settings.timeouts.api()));

		tracing::debug!(%method, endpoint, "Calling the travel API.");

		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(OPERATION, meta.take().as_ref(), err)
		})?;

		decode_response(endpoint, response)
	}

	/// Issues a GET with `params`.
	pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
		self.request(endpoint, Method::GET, params, None).await
	}

	/// Issues a POST with a JSON `body`.
	pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
		self.request(endpoint, Method::POST, &[], Some(body)).await
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a reqwest-backed gateway and token cache over `store`.
	pub fn with_store(
		store: Arc<dyn crate::store::TtlStore>,
		settings: Arc<Settings>,
	) -> Result<Self> {
		let tokens = TokenCache::new(store, settings.clone())?;

		Self::new(tokens, settings)
	}
}
impl<C, M> Clone for Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			tokens: self.tokens.clone(),
			settings: self.settings.clone(),
			base_url: self.base_url.clone(),
			http_client: self.http_client.clone(),
			error_mapper: self.error_mapper.clone(),
		}
	}
}
impl<C, M> Debug for Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway").field("base_url", &self.base_url.as_str()).finish()
	}
}

fn decode_response(endpoint: &str, response: HttpResponse) -> Result<Value> {
	let status = response.status();
	let body = response.body();

	tracing::debug!(endpoint, status = status.as_u16(), "Travel API responded.");

	if status.is_success() {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		let mut de = serde_json::Deserializer::from_slice(body);

		return serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TransportError::Decode { operation: OPERATION, source }.into());
	}

	let decoded = serde_json::from_slice::<Value>(body).ok();
	let message = upstream_message(status.as_u16(), decoded.as_ref());

	tracing::warn!(endpoint, status = status.as_u16(), %message, "Travel API request failed.");

	Err(Error::UpstreamRequestFailed { message, status: status.as_u16(), body: decoded })
}

/// Builds the failure summary from the provider's `errors[].title` and `errors[].detail`.
pub(crate) fn upstream_message(status: u16, body: Option<&Value>) -> String {
	let mut message = format!("Travel API request failed with status {status}.");
	let errors = body.and_then(|body| body.get("errors")).and_then(Value::as_array);

	for error in errors.into_iter().flatten() {
		let title = error.get("title").and_then(Value::as_str).unwrap_or_default();

		message.push(' ');
		message.push_str(title);

		if let Some(detail) = error.get("detail").and_then(Value::as_str) {
			message.push_str(": ");
			message.push_str(detail);
		}
	}

	message
}

/// Extracts the `data` array of a list response; missing or `null` data is empty.
pub(crate) fn data_items(response: Value) -> Vec<Value> {
	match response {
		Value::Object(mut map) => match map.remove("data") {
			Some(Value::Array(items)) => items,
			_ => Vec::new(),
		},
		_ => Vec::new(),
	}
}
