use std::{io, path::Path};

use serde::{Deserialize, Serialize};

/// An optional feature module whose settings are delegated to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Prefixed name counters (`autogenerated_names` key).
    AutogeneratedNames,
    /// Social groups (`social_group_roles` key).
    SocialGroups,
}

/// Configuration for a site settings installation.
///
/// Controls which optional modules are enabled and where the settings and
/// domain-object documents are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Modules whose settings keys are honoured.
    ///
    /// Writes to the key of a disabled module are accepted and ignored.
    enabled_modules: Vec<Module>,

    /// File name of the settings document, relative to the settings
    /// directory.
    pub store_file: String,

    /// File name of the domain-object snapshot consulted before destructive
    /// schema changes, relative to the settings directory.
    pub objects_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled_modules: default_modules(),
            store_file: default_store_file(),
            objects_file: default_objects_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if the TOML
    /// content is invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(format!("Failed to read config file: {e}")),
        };
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the enabled modules.
    #[must_use]
    pub fn enabled_modules(&self) -> &[Module] {
        &self.enabled_modules
    }

    /// Checks if a module is enabled.
    #[must_use]
    pub fn is_module_enabled(&self, module: Module) -> bool {
        self.enabled_modules.contains(&module)
    }

    /// Enables a module.
    ///
    /// Returns `true` if the module was enabled, `false` if it already was.
    pub fn enable_module(&mut self, module: Module) -> bool {
        if self.enabled_modules.contains(&module) {
            false
        } else {
            self.enabled_modules.push(module);
            true
        }
    }

    /// Disables a module.
    ///
    /// Returns `true` if the module was disabled, `false` if it wasn't
    /// enabled.
    pub fn disable_module(&mut self, module: Module) -> bool {
        if let Some(pos) = self.enabled_modules.iter().position(|m| *m == module) {
            self.enabled_modules.remove(pos);
            true
        } else {
            false
        }
    }
}

fn default_modules() -> Vec<Module> {
    vec![Module::AutogeneratedNames, Module::SocialGroups]
}

fn default_store_file() -> String {
    "store.json".to_string()
}

fn default_objects_file() -> String {
    "objects.json".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_modules")]
        enabled_modules: Vec<Module>,

        #[serde(default = "default_store_file")]
        store_file: String,

        #[serde(default = "default_objects_file")]
        objects_file: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                enabled_modules,
                store_file,
                objects_file,
            } => Self {
                enabled_modules,
                store_file,
                objects_file,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            enabled_modules: config.enabled_modules,
            store_file: config.store_file,
            objects_file: config.objects_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nenabled_modules = [\"social_groups\"]\nstore_file = \"settings.json\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.enabled_modules(), &[Module::SocialGroups]);
        assert!(!config.is_module_enabled(Module::AutogeneratedNames));
        assert_eq!(config.store_file, "settings.json");
        assert_eq!(config.objects_file, "objects.json");
    }

    #[test]
    fn load_missing_file_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        assert_eq!(Config::load(&missing).unwrap(), Config::default());
    }

    #[test]
    fn load_unreadable_path_returns_error() {
        let tmp = tempfile::tempdir().unwrap();

        let error = Config::load(tmp.path()).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nenabled_modules = [\"search\"]\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load_preserves_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        assert!(config.disable_module(Module::SocialGroups));
        assert!(!config.disable_module(Module::SocialGroups));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.enabled_modules(), &[Module::AutogeneratedNames]);
        assert!(!loaded.clone().enable_module(Module::AutogeneratedNames));
    }
}
