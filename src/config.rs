//! Settings record, credentials, and the stores that persist them.
//!
//! [`Settings`] is read once and threaded through constructors as an `Arc<Settings>`;
//! nothing in the crate reads configuration from ambient globals. Missing keys fall back to
//! [`Settings::default`] when a stored record is decoded.

pub mod file;

pub use file::FileSettingsStore;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Travel API environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Sandbox environment with synthetic inventory.
	#[default]
	Test,
	/// Live environment.
	Production,
}
impl Environment {
	/// Base URL for the environment.
	pub const fn base_url(self) -> &'static str {
		match self {
			Self::Test => "https://test.api.amadeus.com",
			Self::Production => "https://api.amadeus.com",
		}
	}

	/// Returns a stable label suitable for keys and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Test => "test",
			Self::Production => "production",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// API credentials used for the client-credentials grant.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
	/// API key (OAuth client identifier).
	pub key: String,
	/// API secret (OAuth client secret).
	pub secret: TokenSecret,
	/// Environment the key belongs to.
	pub environment: Environment,
}
impl Credentials {
	/// Creates a credential set.
	pub fn new(
		key: impl Into<String>,
		secret: impl Into<String>,
		environment: Environment,
	) -> Self {
		Self { key: key.into(), secret: TokenSecret::new(secret), environment }
	}

	/// Returns `true` when both key and secret are non-blank.
	pub fn is_complete(&self) -> bool {
		!self.key.trim().is_empty() && !self.secret.is_blank()
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("key", &self.key)
			.field("secret", &self.secret)
			.field("environment", &self.environment)
			.finish()
	}
}

/// Outbound request timeouts, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
	/// Token endpoint timeout.
	pub token_secs: u64,
	/// API endpoint timeout.
	pub api_secs: u64,
}
impl Timeouts {
	/// Token endpoint timeout as a [`std::time::Duration`].
	pub fn token(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.token_secs)
	}

	/// API endpoint timeout as a [`std::time::Duration`].
	pub fn api(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.api_secs)
	}
}
impl Default for Timeouts {
	fn default() -> Self {
		Self { token_secs: 30, api_secs: 45 }
	}
}

/// Field ids of the external booking form, carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFieldMapping {
	/// Booking form identifier.
	pub form_id: Option<u32>,
	/// Flight number field.
	pub flight_number: Option<u32>,
	/// Departure airport field.
	pub departure_airport: Option<u32>,
	/// Departure time field.
	pub departure_time: Option<u32>,
	/// Arrival airport field.
	pub arrival_airport: Option<u32>,
	/// Arrival time field.
	pub arrival_time: Option<u32>,
	/// Outbound origin name field.
	pub origin_name: Option<u32>,
	/// Outbound destination name field.
	pub destination_name: Option<u32>,
	/// Return origin name field.
	pub return_origin_name: Option<u32>,
	/// Return destination name field.
	pub return_destination_name: Option<u32>,
}

/// Complete configuration record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// API credentials.
	pub credentials: Credentials,
	/// Overrides the environment's base URL (proxies, tests).
	pub api_base_url: Option<Url>,
	/// ISO 4217 currency for flight prices.
	pub currency_code: String,
	/// Page that renders search results.
	pub search_results_page_url: Option<Url>,
	/// Page hosting the booking form; selections redirect here.
	pub booking_page_url: Option<Url>,
	/// Enables the hotel actions.
	pub hotel_search_enabled: bool,
	/// Upper bound on flight offers per search.
	pub max_flight_offers: u32,
	/// Outbound request timeouts.
	pub timeouts: Timeouts,
	/// Booking form field ids.
	pub form_mapping: FormFieldMapping,
}
impl Settings {
	/// Resolves the API base URL from the override or the environment.
	pub fn base_url(&self) -> Result<Url, ConfigError> {
		match &self.api_base_url {
			Some(url) => Ok(url.clone()),
			None => Url::parse(self.credentials.environment.base_url())
				.map_err(|source| ConfigError::InvalidUrl { what: "API base", source }),
		}
	}

	/// Resolves `path` against the API base URL, keeping any path prefix of a proxy override.
	pub fn endpoint_url(&self, path: &str, what: &'static str) -> Result<Url, ConfigError> {
		let mut base = self.base_url()?;

		if !base.path().ends_with('/') {
			let prefix = format!("{}/", base.path());

			base.set_path(&prefix);
		}

		base.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidUrl { what, source })
	}

	/// Decodes a stored record, filling missing keys with defaults.
	pub fn from_json(value: Value) -> Result<Self, ConfigError> {
		serde_path_to_error::deserialize(value).map_err(|e| ConfigError::SettingsStore {
			message: format!(
				"Settings do not match the expected shape at {}: {}",
				e.path(),
				e.inner()
			),
		})
	}
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			credentials: Credentials::default(),
			api_base_url: None,
			currency_code: "USD".into(),
			search_results_page_url: None,
			booking_page_url: None,
			hotel_search_enabled: false,
			max_flight_offers: 25,
			timeouts: Timeouts::default(),
			form_mapping: FormFieldMapping::default(),
		}
	}
}

/// Boxed future returned by [`SettingsStore`] operations.
pub type SettingsFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ConfigError>> + 'a + Send>>;

/// Persistence contract for the settings record.
pub trait SettingsStore
where
	Self: Send + Sync,
{
	/// Loads the current settings, or defaults when nothing was saved yet.
	fn load(&self) -> SettingsFuture<'_, Settings>;

	/// Replaces the stored settings.
	fn save(&self, settings: Settings) -> SettingsFuture<'_, ()>;
}

/// In-process [`SettingsStore`] for tests and embedded use.
#[derive(Clone, Debug, Default)]
pub struct MemorySettingsStore(Arc<RwLock<Option<Settings>>>);
impl MemorySettingsStore {
	/// Seeds the store with `settings`.
	pub fn with_settings(settings: Settings) -> Self {
		Self(Arc::new(RwLock::new(Some(settings))))
	}
}
impl SettingsStore for MemorySettingsStore {
	fn load(&self) -> SettingsFuture<'_, Settings> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone().unwrap_or_default()) })
	}

	fn save(&self, settings: Settings) -> SettingsFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(settings);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn partial_records_merge_with_defaults() {
		let settings = Settings::from_json(json!({
			"credentials": { "key": "abc", "secret": "shh" },
			"currency_code": "EUR"
		}))
		.expect("Partial settings should decode.");

		assert_eq!(settings.credentials.key, "abc");
		assert_eq!(settings.credentials.environment, Environment::Test);
		assert_eq!(settings.currency_code, "EUR");
		assert_eq!(settings.max_flight_offers, 25);
		assert_eq!(settings.timeouts, Timeouts { token_secs: 30, api_secs: 45 });
		assert!(!settings.hotel_search_enabled);
	}

	#[test]
	fn shape_errors_report_the_offending_path() {
		let err = Settings::from_json(json!({ "timeouts": { "api_secs": "slow" } }))
			.expect_err("A string timeout should be rejected.");

		assert!(err.to_string().contains("timeouts.api_secs"));
	}

	#[test]
	fn base_url_prefers_override() {
		let mut settings = Settings::default();

		assert_eq!(
			settings.base_url().expect("Default base URL should parse.").as_str(),
			"https://test.api.amadeus.com/"
		);

		settings.credentials.environment = Environment::Production;

		assert_eq!(
			settings.base_url().expect("Production base URL should parse.").as_str(),
			"https://api.amadeus.com/"
		);

		settings.api_base_url =
			Some(Url::parse("http://127.0.0.1:9000").expect("Override URL should parse."));

		assert_eq!(
			settings.base_url().expect("Override should be returned.").as_str(),
			"http://127.0.0.1:9000/"
		);
	}

	#[test]
	fn endpoint_urls_keep_proxy_prefix() {
		let mut settings = Settings::default();

		assert_eq!(
			settings
				.endpoint_url("/v1/reference-data/locations", "API endpoint")
				.expect("Endpoint should resolve.")
				.as_str(),
			"https://test.api.amadeus.com/v1/reference-data/locations"
		);

		for base in ["https://proxy.example/amadeus", "https://proxy.example/amadeus/"] {
			settings.api_base_url = Some(Url::parse(base).expect("Proxy URL should parse."));

			assert_eq!(
				settings
					.endpoint_url("/v1/security/oauth2/token", "token endpoint")
					.expect("Endpoint should resolve.")
					.as_str(),
				"https://proxy.example/amadeus/v1/security/oauth2/token"
			);
		}
	}

	#[test]
	fn credentials_debug_redacts_secret_and_checks_completeness() {
		let credentials = Credentials::new("key-1", "secret-1", Environment::Test);

		assert!(credentials.is_complete());
		assert!(!format!("{credentials:?}").contains("secret-1"));
		assert!(!Credentials::new("key-1", "  ", Environment::Test).is_complete());
		assert!(!Credentials::default().is_complete());
	}

	#[tokio::test]
	async fn memory_store_returns_defaults_until_saved() {
		let store = MemorySettingsStore::default();

		let loaded = store.load().await.expect("Loading defaults should succeed.");

		assert_eq!(loaded, Settings::default());

		let mut settings = Settings::default();

		settings.currency_code = "TRY".into();
		store.save(settings.clone()).await.expect("Saving settings should succeed.");

		assert_eq!(store.load().await.expect("Loading saved settings should succeed."), settings);
	}
}
