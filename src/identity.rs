//! Client identity used to scope stored selections.
//!
//! Authenticated visitors are keyed by user id. Guests carry a random session id in the
//! [`SESSION_COOKIE_NAME`] cookie; a missing or malformed cookie yields a freshly minted id
//! and a [`SessionCookie`] for the caller to set.

// std
use std::ops::Deref;
// crates.io
use uuid::Uuid;
// self
use crate::_prelude::*;

/// Name of the guest session cookie.
pub const SESSION_COOKIE_NAME: &str = "travel_desk_session_id";
/// Lifetime of the guest session cookie.
pub const SESSION_COOKIE_MAX_AGE: Duration = Duration::days(30);

const SESSION_ID_MAX_LEN: usize = 128;

/// Error returned when a guest session id fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionIdError {
	/// The id was empty.
	#[error("Session identifier cannot be empty.")]
	Empty,
	/// The id contains something other than ASCII letters, digits, and hyphens.
	#[error("Session identifier contains {found:?}; only letters, digits, and '-' are allowed.")]
	InvalidCharacter {
		/// First offending character.
		found: char,
	},
	/// The id exceeded the allowed length.
	#[error("Session identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// Validated guest session id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuestSessionId(String);
impl GuestSessionId {
	/// Creates an id after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SessionIdError> {
		let view = value.as_ref();

		validate_session_id(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Mints a random version 4 UUID.
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}
}
impl Deref for GuestSessionId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for GuestSessionId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<GuestSessionId> for String {
	fn from(value: GuestSessionId) -> Self {
		value.0
	}
}
impl TryFrom<String> for GuestSessionId {
	type Error = SessionIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_session_id(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for GuestSessionId {
	type Err = SessionIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for GuestSessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "GuestSessionId({})", self.0)
	}
}
impl Display for GuestSessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Who is making a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
	/// Authenticated user.
	User(u64),
	/// Anonymous visitor with a session cookie.
	Guest(GuestSessionId),
}
impl ClientIdentity {
	/// Derives the identity from the authenticated user id or the guest cookie.
	///
	/// The returned cookie is `Some` only when a new guest id was minted.
	pub fn resolve(user_id: Option<u64>, cookie: Option<&str>) -> (Self, Option<SessionCookie>) {
		if let Some(user_id) = user_id {
			return (Self::User(user_id), None);
		}
		if let Some(session_id) = cookie.and_then(|raw| GuestSessionId::new(raw).ok()) {
			return (Self::Guest(session_id), None);
		}

		let session_id = GuestSessionId::generate();
		let cookie = SessionCookie::new(session_id.clone());

		(Self::Guest(session_id), Some(cookie))
	}

	/// Returns `true` for guests.
	pub fn is_guest(&self) -> bool {
		matches!(self, Self::Guest(_))
	}
}
impl Display for ClientIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::User(id) => write!(f, "user_{id}"),
			Self::Guest(session_id) => write!(f, "guest_{session_id}"),
		}
	}
}

/// Guest session cookie to send back to the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
	/// Cookie value.
	pub value: GuestSessionId,
	/// Cookie lifetime.
	pub max_age: Duration,
	/// Adds the `Secure` attribute.
	pub secure: bool,
}
impl SessionCookie {
	/// Creates a cookie with the default lifetime.
	pub fn new(value: GuestSessionId) -> Self {
		Self { value, max_age: SESSION_COOKIE_MAX_AGE, secure: false }
	}

	/// Sets the `Secure` attribute, typically when the site is served over HTTPS.
	pub fn with_secure(mut self, secure: bool) -> Self {
		self.secure = secure;

		self
	}

	/// Renders the `Set-Cookie` header value.
	pub fn header_value(&self) -> String {
		let mut header = format!(
			"{SESSION_COOKIE_NAME}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
			self.value,
			self.max_age.whole_seconds()
		);

		if self.secure {
			header.push_str("; Secure");
		}

		header
	}
}

fn validate_session_id(view: &str) -> Result<(), SessionIdError> {
	if view.is_empty() {
		return Err(SessionIdError::Empty);
	}
	if let Some(found) = view.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
		return Err(SessionIdError::InvalidCharacter { found });
	}
	if view.len() > SESSION_ID_MAX_LEN {
		return Err(SessionIdError::TooLong { max: SESSION_ID_MAX_LEN });
	}

	Ok(())
}
