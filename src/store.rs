//! TTL key-value contracts and the built-in in-memory store.
//!
//! The token cache, rate limiter, and selection relay each keep their state in a
//! [`TtlStore`] under their own key prefix. Any backend with per-key expiry (an in-process
//! map, an external cache) can implement the trait.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TtlStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value store whose entries expire after a per-key TTL.
pub trait TtlStore
where
	Self: Send + Sync,
{
	/// Fetches the live value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>>;

	/// Stores `value` under `key`, replacing any previous value and resetting its TTL.
	///
	/// A non-positive `ttl` removes the key instead.
	fn set<'a>(&'a self, key: &'a str, value: Value, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Removes `key`, returning `true` if a live value was present.
	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`TtlStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced while encoding or decoding entries.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Fetches `key` and decodes it into `T`.
pub async fn fetch_typed<T>(store: &dyn TtlStore, key: &str) -> Result<Option<T>, StoreError>
where
	T: DeserializeOwned,
{
	match store.get(key).await? {
		Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to decode entry {key}: {e}") }
		}),
		None => Ok(None),
	}
}

/// Encodes `value` and stores it under `key` for `ttl`.
pub async fn save_typed<T>(
	store: &dyn TtlStore,
	key: &str,
	value: &T,
	ttl: Duration,
) -> Result<(), StoreError>
where
	T: ?Sized + Serialize,
{
	let encoded = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode entry {key}: {e}"),
	})?;

	store.set(key, encoded, ttl).await
}
