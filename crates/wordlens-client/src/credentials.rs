//! API key resolution.
//!
//! The key is looked up through an ordered chain of providers, the first
//! non-empty value winning: local settings, then a file bundled next to the
//! binary, then the environment. Only local settings are ever written.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use toml::{Table, Value, from_str, to_string_pretty};
use wordlens_core::config::SETTINGS_FILE;
use wordlens_core::{Credential, Result};

/// Settings key holding the API key.
pub const API_KEY_SETTING: &str = "api_key";
/// Env var consulted last in the default chain.
pub const ENV_API_KEY: &str = "WORDLENS_API_KEY";
/// File name of the bundled fallback configuration.
pub const BUNDLED_FILE: &str = "wordlens.toml";

/// Flat key-value settings persisted as a TOML table.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    /// Location of the settings file.
    path: PathBuf,
}

impl SettingsStore {
    /// Settings stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Settings file inside a wordlens home directory.
    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(SETTINGS_FILE))
    }

    /// Location of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a string value; a missing file reads as empty.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let table = self.read_table()?;
        Ok(table.get(key).and_then(Value::as_str).map(str::to_owned))
    }

    /// Writes a string value, keeping every other entry.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut table = self.read_table()?;
        table.insert(key.to_owned(), Value::String(value.to_owned()));
        self.write_table(&table)
    }

    /// Removes a value, returning whether it was present.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut table = self.read_table()?;
        if table.remove(key).is_none() {
            return Ok(false);
        }
        self.write_table(&table)?;
        Ok(true)
    }

    fn read_table(&self) -> Result<Table> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(from_str(&contents)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Table::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn write_table(&self, table: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, to_string_pretty(table)?)?;
        Ok(())
    }
}

/// One link of the credential lookup chain.
pub trait CredentialProvider: Send + Sync {
    /// Name reported as the key's source.
    fn name(&self) -> &'static str;

    /// The key this provider knows, if any.
    fn load(&self) -> Option<Credential>;
}

/// Reads the key from local settings.
#[derive(Debug, Clone)]
pub struct SettingsProvider {
    /// Backing settings file.
    store: SettingsStore,
}

impl SettingsProvider {
    /// Provider over the given settings.
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }
}

impl CredentialProvider for SettingsProvider {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn load(&self) -> Option<Credential> {
        match self.store.get(API_KEY_SETTING) {
            Ok(value) => value.map(Credential::new),
            Err(error) => {
                tracing::warn!(path = %self.store.path().display(), %error, "ignoring unreadable settings");
                None
            }
        }
    }
}

/// Reads the key from a static file shipped with the application.
#[derive(Debug, Clone)]
pub struct BundledFileProvider {
    /// The bundled file, read with the settings format.
    file: SettingsStore,
}

impl BundledFileProvider {
    /// Provider over a specific file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: SettingsStore::new(path),
        }
    }

    /// Provider over `wordlens.toml` in the directory of the running binary.
    pub fn beside_executable() -> Option<Self> {
        let exe = env::current_exe().ok()?;
        exe.parent().map(|dir| Self::new(dir.join(BUNDLED_FILE)))
    }
}

impl CredentialProvider for BundledFileProvider {
    fn name(&self) -> &'static str {
        "bundled"
    }

    fn load(&self) -> Option<Credential> {
        match self.file.get(API_KEY_SETTING) {
            Ok(value) => value.map(Credential::new),
            Err(error) => {
                tracing::debug!(path = %self.file.path().display(), %error, "no bundled key");
                None
            }
        }
    }
}

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    /// Variable name.
    var: String,
}

impl EnvProvider {
    /// Provider over `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new(ENV_API_KEY)
    }
}

impl CredentialProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn load(&self) -> Option<Credential> {
        env::var(&self.var).ok().map(Credential::new)
    }
}

/// Resolves the API key through a provider chain and persists user input.
pub struct CredentialStore {
    /// Where `save` and `clear` write.
    settings: SettingsStore,
    /// Lookup chain in priority order.
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialStore {
    /// Store whose chain holds only the given settings.
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            providers: vec![Box::new(SettingsProvider::new(settings.clone()))],
            settings,
        }
    }

    /// Settings in `home`, then the bundled file, then `$WORDLENS_API_KEY`.
    pub fn with_default_chain(home: &Path) -> Self {
        let mut store = Self::new(SettingsStore::in_home(home));
        if let Some(bundled) = BundledFileProvider::beside_executable() {
            store = store.with_provider(Box::new(bundled));
        }
        store.with_provider(Box::new(EnvProvider::default()))
    }

    /// Appends a provider at the lowest priority.
    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Provider names in lookup order.
    pub fn providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// First non-empty key in the chain together with its provider's name.
    pub fn resolve(&self) -> Option<(Credential, &'static str)> {
        self.providers.iter().find_map(|provider| {
            provider
                .load()
                .filter(|credential| !credential.is_empty())
                .map(|credential| (credential, provider.name()))
        })
    }

    /// First non-empty key in the chain.
    pub fn load(&self) -> Option<Credential> {
        self.resolve().map(|(credential, _)| credential)
    }

    /// Key from the chain, or an empty one when none is configured.
    pub fn load_or_empty(&self) -> Credential {
        self.load().unwrap_or_else(|| {
            tracing::warn!("no API key configured");
            Credential::default()
        })
    }

    /// Name of the provider that supplies the key.
    pub fn source(&self) -> Option<&'static str> {
        self.resolve().map(|(_, name)| name)
    }

    /// Persists `credential` to local settings.
    ///
    /// # Errors
    /// Returns an error if the settings file cannot be written
    pub fn save(&self, credential: &Credential) -> Result<()> {
        self.settings.set(API_KEY_SETTING, credential.as_str())?;
        tracing::info!(path = %self.settings.path().display(), "saved API key");
        Ok(())
    }

    /// Removes the key from local settings, returning whether one was stored.
    ///
    /// # Errors
    /// Returns an error if the settings file cannot be written
    pub fn clear(&self) -> Result<bool> {
        self.settings.remove(API_KEY_SETTING)
    }
}
