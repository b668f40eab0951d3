//! Inbound actions consumed by the search and booking pages.
//!
//! Each action takes a [`RequestContext`], checks the anti-forgery token (and, for searches,
//! the caller's rate budget), then delegates to the [`Gateway`] or a [`SelectionRelay`].
//! Results convert into the `{success, data}` shape the pages expect through [`Envelope`].

pub mod flights;
pub mod hotels;

pub use flights::*;
pub use hotels::*;

// self
use crate::{
	_prelude::*,
	clock::Clock,
	config::Settings,
	gateway::Gateway,
	http::ApiHttpClient,
	identity::ClientIdentity,
	nonce::{AntiForgery, DESK_SCOPE},
	oauth::TransportErrorMapper,
	obs::{self, ActionKind},
	rate_limit::{ActionBudget, RateLimitDecision, RateLimiter},
	relay::{SelectionKind, SelectionRelay},
	store::TtlStore,
};

/// Per-request inputs shared by every action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
	/// Remote address used for rate limiting.
	pub client_ip: String,
	/// Caller identity used to scope selections.
	pub identity: ClientIdentity,
	/// Anti-forgery token sent with the request.
	pub nonce: String,
}
impl RequestContext {
	/// Creates a context.
	pub fn new(
		client_ip: impl Into<String>,
		identity: ClientIdentity,
		nonce: impl Into<String>,
	) -> Self {
		Self { client_ip: client_ip.into(), identity, nonce: nonce.into() }
	}
}

/// Body of an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload<T> {
	/// Action result.
	Data(T),
	/// Failure description for the visitor.
	Failure {
		/// User-facing message.
		message: String,
	},
}

/// `{success, data}` response shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Envelope<T> {
	/// Whether the action succeeded.
	pub success: bool,
	/// Result or failure message.
	pub data: Payload<T>,
}
impl<T> Envelope<T> {
	/// Successful envelope.
	pub fn success(data: T) -> Self {
		Self { success: true, data: Payload::Data(data) }
	}

	/// Failed envelope.
	pub fn failure(message: impl Into<String>) -> Self {
		Self { success: false, data: Payload::Failure { message: message.into() } }
	}
}
impl<T> From<Result<T>> for Envelope<T> {
	fn from(result: Result<T>) -> Self {
		match result {
			Ok(data) => Self::success(data),
			Err(e) => Self::failure(e.user_message()),
		}
	}
}

/// Action surface over the gateway, rate limiter, and selection relays.
pub struct TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	gateway: Gateway<C, M>,
	limiter: RateLimiter,
	flights: SelectionRelay,
	hotels: SelectionRelay,
	anti_forgery: Arc<dyn AntiForgery>,
}
impl<C, M> TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wires the desk; the limiter and both relays share `store`.
	pub fn new(
		gateway: Gateway<C, M>,
		store: Arc<dyn TtlStore>,
		anti_forgery: Arc<dyn AntiForgery>,
	) -> Self {
		Self {
			gateway,
			limiter: RateLimiter::new(store.clone()),
			flights: SelectionRelay::flights(store.clone()),
			hotels: SelectionRelay::hotels(store),
			anti_forgery,
		}
	}

	/// Overrides the clock used by the rate limiter.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.limiter = self.limiter.with_clock(clock);

		self
	}

	/// Gateway backing the desk.
	pub fn gateway(&self) -> &Gateway<C, M> {
		&self.gateway
	}

	/// Relay for `kind`.
	pub fn relay(&self, kind: SelectionKind) -> &SelectionRelay {
		match kind {
			SelectionKind::Flight => &self.flights,
			SelectionKind::Hotel => &self.hotels,
		}
	}

	/// Anti-forgery token the pages embed for `identity`.
	pub fn issue_nonce(&self, identity: &ClientIdentity) -> String {
		self.anti_forgery.issue(DESK_SCOPE, identity)
	}

	/// Deletes the caller's stored selection of `kind`.
	pub async fn clear_selection(&self, ctx: &RequestContext, kind: SelectionKind) -> Result<bool> {
		obs::observe(ActionKind::ClearSelection, kind.as_str(), async {
			self.verify(ctx)?;
			self.relay(kind).clear(&ctx.identity).await
		})
		.await
	}

	/// Reads the caller's stored selection of `kind` without removing it.
	///
	/// The redirect target renders server-side, so no anti-forgery token is checked here.
	pub async fn retrieve_selection(
		&self,
		ctx: &RequestContext,
		kind: SelectionKind,
	) -> Result<Option<Value>> {
		obs::observe(ActionKind::RetrieveSelection, kind.as_str(), async {
			self.relay(kind).retrieve(&ctx.identity).await
		})
		.await
	}

	fn settings(&self) -> &Settings {
		self.gateway.settings()
	}

	fn verify(&self, ctx: &RequestContext) -> Result<()> {
		if self.anti_forgery.verify(DESK_SCOPE, &ctx.identity, &ctx.nonce) {
			Ok(())
		} else {
			Err(Error::InvalidNonce)
		}
	}

	fn ensure_hotels_enabled(&self) -> Result<()> {
		if self.settings().hotel_search_enabled {
			Ok(())
		} else {
			Err(Error::FeatureDisabled { feature: "hotel search" })
		}
	}

	async fn throttle(&self, ctx: &RequestContext, budget: ActionBudget) -> Result<()> {
		match self.limiter.check_budget(&ctx.client_ip, budget).await? {
			RateLimitDecision::Allow => Ok(()),
			RateLimitDecision::Deny(directive) => Err(Error::RateLimited {
				action: budget.action.to_owned(),
				retry_at: directive.earliest_retry_at,
			}),
		}
	}
}
impl<C, M> Clone for TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			gateway: self.gateway.clone(),
			limiter: self.limiter.clone(),
			flights: self.flights.clone(),
			hotels: self.hotels.clone(),
			anti_forgery: self.anti_forgery.clone(),
		}
	}
}
impl<C, M> Debug for TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TravelDesk").field("gateway", &self.gateway).finish()
	}
}

/// Parses an offer posted by the page; it must be a JSON object.
fn parse_offer(raw: &str, what: &str) -> Result<Value> {
	if raw.trim().is_empty() {
		return Err(Error::invalid_input(format!("No {what} offer data received")));
	}

	match serde_json::from_str::<Value>(raw) {
		Ok(offer @ Value::Object(_)) => Ok(offer),
		_ => Err(Error::invalid_input(format!("Invalid {what} offer data format"))),
	}
}
