//! JSON file-backed [`SettingsStore`] for single-host deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	config::{Settings, SettingsFuture, SettingsStore},
	error::ConfigError,
};

/// Persists the settings record to a JSON file, replacing it atomically on save.
#[derive(Clone, Debug)]
pub struct FileSettingsStore {
	path: PathBuf,
	inner: Arc<RwLock<Settings>>,
}
impl FileSettingsStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Path of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Settings, ConfigError> {
		if !path.exists() {
			return Ok(Settings::default());
		}

		let bytes = fs::read(path).map_err(|e| ConfigError::SettingsStore {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Settings::default());
		}

		let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
			let message = format!("Failed to parse {}: {e}", path.display());

			ConfigError::SettingsStore { message }
		})?;

		Settings::from_json(value)
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), ConfigError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| ConfigError::SettingsStore {
				message: format!("Failed to create settings directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(settings).map_err(|e| ConfigError::SettingsStore {
				message: format!("Failed to serialize settings: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| ConfigError::SettingsStore {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| ConfigError::SettingsStore {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| ConfigError::SettingsStore {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| ConfigError::SettingsStore {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SettingsStore for FileSettingsStore {
	fn load(&self) -> SettingsFuture<'_, Settings> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save(&self, settings: Settings) -> SettingsFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist(&settings)?;
			*guard = settings;

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::config::{Credentials, Environment};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"travel_desk_settings_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileSettingsStore::open(&path).expect("Failed to open settings file.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for settings test.");
		let mut settings = Settings::default();

		settings.credentials = Credentials::new("key", "secret", Environment::Production);
		settings.currency_code = "EUR".into();

		rt.block_on(store.save(settings.clone())).expect("Failed to save settings.");
		drop(store);

		let reopened = FileSettingsStore::open(&path).expect("Failed to reopen settings file.");
		let loaded = rt.block_on(reopened.load()).expect("Failed to load settings.");

		assert_eq!(loaded, settings);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary settings file {}: {e}", path.display())
		});
	}

	#[test]
	fn partial_file_merges_with_defaults() {
		let path = temp_path();

		fs::write(&path, br#"{ "currency_code": "GBP", "hotel_search_enabled": true }"#)
			.expect("Failed to seed settings file.");

		let store = FileSettingsStore::open(&path).expect("Failed to open seeded settings file.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for settings test.");
		let loaded = rt.block_on(store.load()).expect("Failed to load settings.");

		assert_eq!(loaded.currency_code, "GBP");
		assert!(loaded.hotel_search_enabled);
		assert_eq!(loaded.max_flight_offers, 25);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary settings file {}: {e}", path.display())
		});
	}
}
