//! Flight and hotel search glue for travel booking sites: cached OAuth 2.0 access to the
//! travel API, per-client rate limiting, and a TTL-backed relay that carries a selected offer
//! across a page redirect.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;
pub mod nonce;
pub mod oauth;
pub mod obs;
pub mod rate_limit;
pub mod relay;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::TokenCache,
		clock::{Clock, ManualClock},
		config::{Credentials, Environment, Settings},
		desk::TravelDesk,
		gateway::Gateway,
		http::ReqwestHttpClient,
		nonce::DigestAntiForgery,
		oauth::ReqwestTransportErrorMapper,
		store::{MemoryStore, TtlStore},
	};

	/// Gateway type alias used by reqwest-backed integration tests.
	pub type ReqwestTestGateway = Gateway<ReqwestHttpClient, ReqwestTransportErrorMapper>;
	/// Desk type alias used by reqwest-backed integration tests.
	pub type ReqwestTestDesk = TravelDesk<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Shared secret used by [`test_anti_forgery`].
	pub const TEST_NONCE_SECRET: &str = "integration-test-secret";

	/// Wiring produced by [`build_reqwest_test_gateway`].
	pub struct TestHarness {
		/// Gateway pointed at the mock server.
		pub gateway: ReqwestTestGateway,
		/// Store shared by the token cache and any relay or limiter built on top.
		pub store: Arc<MemoryStore>,
		/// Manually advanced clock driving every TTL decision.
		pub clock: Arc<ManualClock>,
	}

	/// Builds test settings whose API base URL points at `base_url`.
	pub fn test_settings(base_url: &str) -> Settings {
		let mut settings = Settings::default();

		settings.credentials =
			Credentials::new("test-api-key", "test-api-secret", Environment::Test);
		settings.api_base_url =
			Some(Url::parse(base_url).expect("Mock server URL should parse successfully."));
		settings.booking_page_url = Some(
			Url::parse("https://travel.example.com/booking")
				.expect("Booking page fixture URL should parse successfully."),
		);
		settings.hotel_search_enabled = true;

		settings
	}

	/// Builds the anti-forgery guard used across integration tests.
	pub fn test_anti_forgery() -> DigestAntiForgery {
		DigestAntiForgery::new(TEST_NONCE_SECRET)
	}

	/// Constructs a [`Gateway`] backed by an in-memory store, a manual clock, and the reqwest
	/// transport.
	pub fn build_reqwest_test_gateway(settings: Settings) -> TestHarness {
		let clock = Arc::new(ManualClock::default());
		let dyn_clock: Arc<dyn Clock> = clock.clone();
		let store = Arc::new(MemoryStore::with_clock(dyn_clock.clone()));
		let dyn_store: Arc<dyn TtlStore> = store.clone();
		let settings = Arc::new(settings);
		let tokens = TokenCache::with_http_client(
			dyn_store,
			settings.clone(),
			ReqwestHttpClient::new().expect("Default reqwest client should build."),
			ReqwestTransportErrorMapper,
		)
		.expect("Token cache should build from test settings.")
		.with_clock(dyn_clock);
		let gateway = Gateway::new(tokens, settings).expect("Gateway should build from settings.");

		TestHarness { gateway, store, clock }
	}

	/// Constructs a [`TravelDesk`] over [`build_reqwest_test_gateway`].
	pub fn build_reqwest_test_desk(settings: Settings) -> (ReqwestTestDesk, TestHarness) {
		let harness = build_reqwest_test_gateway(settings);
		let store: Arc<dyn TtlStore> = harness.store.clone();
		let desk = TravelDesk::new(harness.gateway.clone(), store, Arc::new(test_anti_forgery()))
			.with_clock(harness.clock.clone());

		(desk, harness)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::{Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
