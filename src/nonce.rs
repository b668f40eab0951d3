//! Anti-forgery tokens bound to a scope, a client identity, and a time tick.
//!
//! [`DigestAntiForgery`] rotates its tokens every [`NONCE_TICK`] and accepts the current and
//! previous tick, so a token stays valid for between one and two ticks.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	clock::{self, Clock},
	identity::ClientIdentity,
};

/// Scope shared by every travel desk action.
pub const DESK_SCOPE: &str = "travel_desk_nonce";
/// Rotation period of [`DigestAntiForgery`] tokens.
pub const NONCE_TICK: Duration = Duration::hours(12);

/// Issues and verifies the token each action must carry.
pub trait AntiForgery
where
	Self: Send + Sync,
{
	/// Token for `identity` within `scope`.
	fn issue(&self, scope: &str, identity: &ClientIdentity) -> String;

	/// Checks `token` against `scope` and `identity`.
	fn verify(&self, scope: &str, identity: &ClientIdentity, token: &str) -> bool {
		constant_time_eq(self.issue(scope, identity).as_bytes(), token.as_bytes())
	}
}

/// Derives tokens as base64url(SHA-256(secret, scope, identity, tick)).
#[derive(Clone)]
pub struct DigestAntiForgery {
	secret: TokenSecret,
	clock: Arc<dyn Clock>,
}
impl DigestAntiForgery {
	/// Creates a guard keyed by a site-wide secret.
	pub fn new(secret: impl Into<String>) -> Self {
		Self { secret: TokenSecret::new(secret), clock: clock::system() }
	}

	/// Overrides the clock that selects the current tick.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	fn tick(&self) -> i64 {
		self.clock.now().unix_timestamp().div_euclid(NONCE_TICK.whole_seconds())
	}

	fn digest(&self, scope: &str, identity: &ClientIdentity, tick: i64) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.secret.expose().as_bytes());
		hasher.update([0]);
		hasher.update(scope.as_bytes());
		hasher.update([0]);
		hasher.update(identity.to_string().as_bytes());
		hasher.update([0]);
		hasher.update(tick.to_be_bytes());

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}
impl AntiForgery for DigestAntiForgery {
	fn issue(&self, scope: &str, identity: &ClientIdentity) -> String {
		self.digest(scope, identity, self.tick())
	}

	fn verify(&self, scope: &str, identity: &ClientIdentity, token: &str) -> bool {
		let tick = self.tick();

		[tick, tick - 1].into_iter().any(|tick| {
			constant_time_eq(self.digest(scope, identity, tick).as_bytes(), token.as_bytes())
		})
	}
}
impl Debug for DigestAntiForgery {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DigestAntiForgery").field("secret", &self.secret).finish()
	}
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
