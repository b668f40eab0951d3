//! TTL-backed cache for the client-credentials bearer token.
//!
//! [`TokenCache::get_token`] returns the cached token while it is live and otherwise runs the
//! client-credentials grant once, storing the result with a 60 second safety margin. Concurrent
//! misses inside one process share a single-flight guard so only one of them reaches the token
//! endpoint; separate processes sharing a store may still race, which only costs a duplicate
//! fetch.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	clock::{self, Clock},
	config::Settings,
	http::ApiHttpClient,
	oauth::{ClientCredentialsFacade, TOKEN_PATH, TransportErrorMapper},
	store::{self, TtlStore},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Margin subtracted from the provider-declared lifetime before caching.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);
/// Longest lifetime a token is cached for, whatever the provider declares.
pub const MAX_CACHED_LIFETIME: Duration = Duration::days(1);

const KEY_PREFIX: &str = "travel_desk:token";

/// Token record persisted in the [`TtlStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
	/// Bearer token value.
	pub value: TokenSecret,
	/// Instant after which the token must not be used.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns `true` once `now` reaches the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}
}

/// Obtains and caches the bearer token used by every API call.
pub struct TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	store: Arc<dyn TtlStore>,
	settings: Arc<Settings>,
	facade: Arc<ClientCredentialsFacade<C, M>>,
	clock: Arc<dyn Clock>,
	key: Arc<str>,
	singleflight: Arc<AsyncMutex<()>>,
}
impl<C, M> TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a cache that exchanges credentials through the provided HTTP client and mapper.
	pub fn with_http_client(
		store: Arc<dyn TtlStore>,
		settings: Arc<Settings>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = settings.endpoint_url(TOKEN_PATH, "token endpoint")?;
		let facade = ClientCredentialsFacade::new(
			token_url,
			&settings.credentials,
			http_client.into(),
			mapper.into(),
			settings.timeouts.token(),
		);
		let key = cache_key(&settings).into();

		Ok(Self {
			store,
			settings,
			facade: Arc::new(facade),
			clock: clock::system(),
			key,
			singleflight: Default::default(),
		})
	}

	/// Overrides the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Store key holding the cached token.
	pub fn cache_key(&self) -> &str {
		&self.key
	}

	/// Settings the cache was built from.
	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	/// Transport and error mapper shared with the API gateway.
	pub(crate) fn transport(&self) -> (Arc<C>, Arc<M>) {
		(self.facade.http_client().clone(), self.facade.error_mapper().clone())
	}

	/// Returns a live bearer token, fetching a new one when the cache is empty or expired.
	pub async fn get_token(&self) -> Result<TokenSecret> {
		if !self.settings.credentials.is_complete() {
			return Err(Error::CredentialsMissing);
		}
		if let Some(token) = self.cached().await? {
			return Ok(token);
		}

		let _singleflight = self.singleflight.lock().await;

		// Another caller may have refreshed while this one waited.
		if let Some(token) = self.cached().await? {
			return Ok(token);
		}

		tracing::debug!(
			environment = %self.settings.credentials.environment,
			"Requesting a new access token."
		);

		let issued = self.facade.exchange().await?;
		let now = self.clock.now();
		let ttl = (issued.expires_in - EXPIRY_MARGIN).min(MAX_CACHED_LIFETIME);
		let value = TokenSecret::new(issued.access_token);

		if ttl.is_positive() {
			let record = CachedToken { value: value.clone(), expires_at: now.saturating_add(ttl) };

			store::save_typed(self.store.as_ref(), &self.key, &record, ttl).await?;
		} else {
			tracing::warn!(
				expires_in = issued.expires_in.whole_seconds(),
				"Access token lifetime is within the expiry margin; returning it uncached."
			);
		}

		Ok(value)
	}

	/// Drops the cached token so the next call fetches a fresh one.
	pub async fn invalidate(&self) -> Result<bool> {
		Ok(self.store.delete(&self.key).await?)
	}

	async fn cached(&self) -> Result<Option<TokenSecret>> {
		let now = self.clock.now();
		let record = store::fetch_typed::<CachedToken>(self.store.as_ref(), &self.key).await?;

		Ok(record.filter(|token| !token.is_expired_at(now)).map(|token| token.value))
	}
}
#[cfg(feature = "reqwest")]
impl TokenCache<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a cache backed by the default reqwest transport.
	pub fn new(store: Arc<dyn TtlStore>, settings: Arc<Settings>) -> Result<Self> {
		Self::with_http_client(
			store,
			settings,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Clone for TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			settings: self.settings.clone(),
			facade: self.facade.clone(),
			clock: self.clock.clone(),
			key: self.key.clone(),
			singleflight: self.singleflight.clone(),
		}
	}
}
impl<C, M> Debug for TokenCache<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("key", &self.key)
			.field("environment", &self.settings.credentials.environment)
			.finish()
	}
}

/// Cache key scoped to the environment and a fingerprint of the API key.
fn cache_key(settings: &Settings) -> String {
	let digest = Sha256::digest(settings.credentials.key.as_bytes());
	let fingerprint = URL_SAFE_NO_PAD.encode(&digest[..12]);

	format!("{KEY_PREFIX}:{}:{fingerprint}", settings.credentials.environment)
}
