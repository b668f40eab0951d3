//! Transport seam shared by the token exchange and the API gateway.
//!
//! Both callers ask an [`ApiHttpClient`] for a fresh handle per call, passing a
//! [`ResponseMetadataSlot`] the handle fills with the response status. Error mappers read the
//! slot afterwards, so a custom transport (or a test fake) reports failures the same way the
//! bundled reqwest one does.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Pluggable transport for the token endpoint and the API.
///
/// Handles are cheap and short-lived; one is built per outbound call so each call gets its
/// own metadata slot.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Error raised by the transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Handle type returned by [`ApiHttpClient::with_metadata`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle bound to `slot`.
	///
	/// The handle clears `slot` before sending, stores the status once a response arrives,
	/// and applies a [`RequestTimeout`] found in the request extensions.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Per-request timeout attached to [`HttpRequest`] extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTimeout(pub std::time::Duration);

/// Handle adapter that stamps a [`RequestTimeout`] on every request it forwards.
pub(crate) struct WithTimeout<H> {
	inner: H,
	timeout: std::time::Duration,
}
impl<H> WithTimeout<H> {
	pub(crate) fn new(inner: H, timeout: std::time::Duration) -> Self {
		Self { inner, timeout }
	}
}
impl<'c, H> AsyncHttpClient<'c> for WithTimeout<H>
where
	H: AsyncHttpClient<'c>,
{
	type Error = H::Error;
	type Future = H::Future;

	fn call(&'c self, mut request: HttpRequest) -> Self::Future {
		request.extensions_mut().insert(RequestTimeout(self.timeout));

		self.inner.call(request)
	}
}

/// Status of the most recent response, read by the error mappers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, when a response arrived.
	pub status: Option<u16>,
}

/// Shared cell a handle writes [`ResponseMetadata`] into.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Replaces the recorded metadata.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Removes and returns the recorded metadata.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// reqwest-backed [`ApiHttpClient`].
///
/// [`ReqwestHttpClient::new`] builds a client that does not follow redirects; the token and API
/// endpoints answer directly.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds the default client with redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps a preconfigured client (proxies, custom TLS roots).
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Per-call handle produced by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let timeout = request.extensions().get::<RequestTimeout>().copied();
			let mut outbound: reqwest::Request = request.try_into().map_err(Box::new)?;

			if let Some(RequestTimeout(limit)) = timeout {
				*outbound.timeout_mut() = Some(limit);
			}

			let response = self.client.execute(outbound).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().clone();

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let body = response.bytes().await.map_err(Box::new)?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}
