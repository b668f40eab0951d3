//! Thread-safe in-memory [`TtlStore`] implementation.

// self
use crate::{
	_prelude::*,
	clock::{self, Clock},
	store::{StoreError, StoreFuture, TtlStore},
};

type StoreMap = Arc<RwLock<HashMap<String, Entry>>>;

#[derive(Clone, Debug)]
struct Entry {
	value: Value,
	expires_at: OffsetDateTime,
}

/// Storage backend that keeps entries in-process and expires them lazily on read.
///
/// Expired entries are dropped when touched; [`MemoryStore::sweep_expired`] clears the rest.
#[derive(Clone)]
pub struct MemoryStore {
	map: StoreMap,
	clock: Arc<dyn Clock>,
}
impl MemoryStore {
	/// Creates a store that reads time from `clock`.
	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self { map: Default::default(), clock }
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn sweep_expired(&self) -> usize {
		let now = self.clock.now();
		let mut guard = self.map.write();
		let before = guard.len();

		guard.retain(|_, entry| entry.expires_at > now);

		before - guard.len()
	}

	/// Number of entries currently held, expired or not.
	pub fn len(&self) -> usize {
		self.map.read().len()
	}

	/// Returns `true` if the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.map.read().is_empty()
	}

	fn get_now(&self, key: &str) -> Option<Value> {
		let now = self.clock.now();

		{
			let guard = self.map.read();

			match guard.get(key) {
				Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = self.map.write();

		if guard.get(key).is_some_and(|entry| entry.expires_at <= now) {
			guard.remove(key);
		}

		None
	}

	fn set_now(&self, key: &str, value: Value, ttl: Duration) {
		let mut guard = self.map.write();

		if !ttl.is_positive() {
			guard.remove(key);

			return;
		}

		let expires_at = self.clock.now().saturating_add(ttl);

		guard.insert(key.to_owned(), Entry { value, expires_at });
	}

	fn delete_now(&self, key: &str) -> bool {
		let now = self.clock.now();

		self.map.write().remove(key).is_some_and(|entry| entry.expires_at > now)
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::with_clock(clock::system())
	}
}
impl Debug for MemoryStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryStore").field("entries", &self.len()).finish()
	}
}
impl TtlStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: Value, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.set_now(key, value, ttl);

			Ok::<_, StoreError>(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.delete_now(key)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::default());
		let store = MemoryStore::with_clock(clock.clone());

		(store, clock)
	}

	#[tokio::test]
	async fn entries_expire_at_their_ttl() {
		let (store, clock) = store_with_clock();

		store
			.set("greeting", json!("hello"), Duration::seconds(10))
			.await
			.expect("Setting an entry should succeed.");
		clock.advance(Duration::seconds(9));

		assert_eq!(
			store.get("greeting").await.expect("Reading a live entry should succeed."),
			Some(json!("hello"))
		);

		clock.advance(Duration::seconds(1));

		let expired = store.get("greeting").await.expect("Reading an expired entry should succeed.");

		assert_eq!(expired, None);
		assert!(store.is_empty(), "Expired entries should be dropped when read.");
	}

	#[tokio::test]
	async fn set_overwrites_and_refreshes_ttl() {
		let (store, clock) = store_with_clock();

		store.set("k", json!(1), Duration::seconds(10)).await.expect("First set should succeed.");
		clock.advance(Duration::seconds(8));
		store.set("k", json!(2), Duration::seconds(10)).await.expect("Second set should succeed.");
		clock.advance(Duration::seconds(8));

		assert_eq!(store.get("k").await.expect("Read should succeed."), Some(json!(2)));
	}

	#[tokio::test]
	async fn non_positive_ttl_removes_the_key() {
		let (store, _clock) = store_with_clock();

		store.set("k", json!(1), Duration::minutes(1)).await.expect("Set should succeed.");
		store.set("k", json!(2), Duration::ZERO).await.expect("Zero-TTL set should succeed.");

		assert_eq!(store.get("k").await.expect("Read should succeed."), None);
	}

	#[tokio::test]
	async fn oversized_ttl_saturates_instead_of_overflowing() {
		let (store, clock) = store_with_clock();

		store
			.set("forever", json!("kept"), Duration::seconds(i64::MAX))
			.await
			.expect("Set with an oversized TTL should succeed.");
		clock.advance(Duration::days(365 * 100));

		assert_eq!(store.get("forever").await.expect("Read should succeed."), Some(json!("kept")));
	}

	#[tokio::test]
	async fn delete_reports_live_entries_only() {
		let (store, clock) = store_with_clock();

		store.set("live", json!(true), Duration::minutes(1)).await.expect("Set should succeed.");
		store.set("stale", json!(true), Duration::seconds(1)).await.expect("Set should succeed.");
		clock.advance(Duration::seconds(2));

		assert!(store.delete("live").await.expect("Delete should succeed."));
		assert!(!store.delete("stale").await.expect("Delete should succeed."));
		assert!(!store.delete("missing").await.expect("Delete should succeed."));
	}

	#[tokio::test]
	async fn sweep_drops_only_expired_entries() {
		let (store, clock) = store_with_clock();

		store.set("short", json!(1), Duration::seconds(5)).await.expect("Set should succeed.");
		store.set("long", json!(2), Duration::minutes(5)).await.expect("Set should succeed.");
		clock.advance(Duration::seconds(6));

		assert_eq!(store.sweep_expired(), 1);
		assert_eq!(store.len(), 1);
	}
}
