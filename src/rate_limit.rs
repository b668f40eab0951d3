//! Fixed-window request budgets per client and action.
//!
//! Counters live in the shared [`TtlStore`] and expire with their window, so a new window
//! starts from scratch. The read-modify-write sequence is not atomic: concurrent requests from
//! the same client may be slightly over-permitted, which is acceptable for abuse mitigation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	clock::{self, Clock},
	store::{self, TtlStore},
};

const KEY_PREFIX: &str = "travel_desk:rate";

/// Request budget for one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionBudget {
	/// Action label.
	pub action: &'static str,
	/// Calls permitted per window.
	pub limit: u32,
	/// Window length.
	pub window: Duration,
}
impl ActionBudget {
	/// Creates a budget of `limit` calls per `window_secs` seconds.
	pub const fn new(action: &'static str, limit: u32, window_secs: i64) -> Self {
		Self { action, limit, window: Duration::seconds(window_secs) }
	}
}

/// Budget of the airport and city autocomplete.
pub const LOCATION_SEARCH: ActionBudget = ActionBudget::new("search_locations", 20, 60);
/// Budget of flight searches.
pub const FLIGHT_SEARCH: ActionBudget = ActionBudget::new("search_flights", 5, 60);

/// Result of [`RateLimiter::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed.
	Allow,
	/// The budget is exhausted for the current window.
	Deny(RetryDirective),
}
impl RateLimitDecision {
	/// Returns `true` for [`RateLimitDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Deny`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when the current window closes.
	pub earliest_retry_at: OffsetDateTime,
	/// Time left until [`RetryDirective::earliest_retry_at`].
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RateLimitCounter {
	count: u32,
	window_expires_at: OffsetDateTime,
}

/// Per-client, per-action request counter.
#[derive(Clone)]
pub struct RateLimiter {
	store: Arc<dyn TtlStore>,
	clock: Arc<dyn Clock>,
}
impl RateLimiter {
	/// Creates a limiter that keeps counters in `store`.
	pub fn new(store: Arc<dyn TtlStore>) -> Self {
		Self { store, clock: clock::system() }
	}

	/// Overrides the clock used for window decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Counts a call and returns whether it is permitted.
	pub async fn allow(
		&self,
		client_key: &str,
		action: &str,
		limit: u32,
		window_seconds: i64,
	) -> Result<bool> {
		let decision =
			self.check(client_key, action, limit, Duration::seconds(window_seconds)).await?;

		Ok(decision.is_allowed())
	}

	/// Counts a call against `budget`.
	pub async fn check_budget(
		&self,
		client_key: &str,
		budget: ActionBudget,
	) -> Result<RateLimitDecision> {
		self.check(client_key, budget.action, budget.limit, budget.window).await
	}

	/// Counts a call and returns the decision, with the retry instant for denied calls.
	///
	/// A `limit` of zero denies every call. Denied calls do not extend the window. A window
	/// that is not positive, or that ends beyond the representable time range, is invalid
	/// input.
	pub async fn check(
		&self,
		client_key: &str,
		action: &str,
		limit: u32,
		window: Duration,
	) -> Result<RateLimitDecision> {
		if !window.is_positive() {
			return Err(Error::invalid_input(format!(
				"Rate limit window for {action} must be positive"
			)));
		}

		let now = self.clock.now();
		let window_end = now.checked_add(window).ok_or_else(|| {
			Error::invalid_input(format!("Rate limit window for {action} is out of range"))
		})?;
		let key = counter_key(client_key, action);
		let current = store::fetch_typed::<RateLimitCounter>(self.store.as_ref(), &key)
			.await?
			.filter(|counter| counter.window_expires_at > now);
		let next = match current {
			_ if limit == 0 => {
				return Ok(deny(action, window_end, now));
			},
			None => RateLimitCounter { count: 1, window_expires_at: window_end },
			Some(counter) if counter.count < limit =>
				RateLimitCounter { count: counter.count + 1, ..counter },
			Some(counter) => {
				tracing::debug!(action, count = counter.count, limit, "Rate limit exceeded.");

				return Ok(deny(action, counter.window_expires_at, now));
			},
		};
		let ttl = next.window_expires_at - now;

		store::save_typed(self.store.as_ref(), &key, &next, ttl).await?;

		Ok(RateLimitDecision::Allow)
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RateLimiter(..)")
	}
}

/// Store key for a (client, action) pair; the client key never appears in clear.
pub fn counter_key(client_key: &str, action: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(client_key.as_bytes());
	hasher.update(action.as_bytes());

	format!("{KEY_PREFIX}:{}", URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

fn deny(action: &str, retry_at: OffsetDateTime, now: OffsetDateTime) -> RateLimitDecision {
	RateLimitDecision::Deny(
		RetryDirective::new(retry_at, retry_at - now)
			.with_reason(format!("{action} budget exhausted for the current window")),
	)
}
