//! Configuration loading.
//!
//! The config is a JSON document listing module descriptors in bar order,
//! either as a bare array or as `{"tick_interval": 2, "modules": [...]}`.
//! Each descriptor needs a unique `name` and a `module` type; every other
//! key is handed to the module, which deserialises the keys it understands.

use log::{debug, error, warn};
use serde::de::{DeserializeOwned, Error as _, Unexpected};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tick period used when the document does not set one.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Built-in configuration used when no path is given on the command line.
pub const DEFAULT_CONFIG: &str = r#"
[
    {
        "name": "default_time",
        "module": "time"
    },
    {
        "name": "default_battery",
        "module": "battery"
    },
    {
        "name": "wireless_network",
        "module": "net",
        "interface_name": "wlp3s0",
        "format": "<span color=\"{% if up %}green{% else %}red{% endif %}\">{{ interface_name }}</span>: {{ addresses|join(\", \") }}"
    },
    {
        "name": "default_load",
        "module": "load"
    },
    {
        "name": "default_memory",
        "module": "memory"
    }
]
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {0}")]
    Shape(&'static str),

    #[error("key `{key}` must be {expected}")]
    InvalidType { key: String, expected: &'static str },

    #[error("invalid module descriptor: {0}")]
    Descriptor(#[source] serde_json::Error),

    #[error("invalid module settings: {0}")]
    Settings(#[source] serde_json::Error),
}

/// Accepted document shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Modules(Vec<Value>),
    Bar {
        tick_interval: Option<u64>,
        modules: Vec<Value>,
    },
}

/// Keys every descriptor must carry.
#[derive(Deserialize)]
struct DescriptorKeys {
    name: String,
    module: String,
}

/// The keys of one descriptor. Modules deserialise their own settings from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleConfig(Map<String, Value>);

impl ModuleConfig {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Deserialise the descriptor into `T`. Keys `T` does not name are ignored.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(ConfigError::Settings)
    }
}

#[cfg(test)]
impl ModuleConfig {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// `deserialize_with` for optional intervals in whole seconds. Zero is rejected.
pub fn positive_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u64>::deserialize(deserializer)? {
        Some(0) => Err(D::Error::invalid_value(
            Unexpected::Unsigned(0),
            &"a positive number of seconds",
        )),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

/// One configured module instance, in the position it should take on the bar.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleDescriptor {
    pub instance_name: String,
    pub module_type: String,
    pub config: ModuleConfig,
}

impl ModuleDescriptor {
    fn from_value(value: Value) -> Result<Self, ConfigError> {
        let keys = DescriptorKeys::deserialize(&value).map_err(ConfigError::Descriptor)?;
        let Value::Object(map) = value else {
            return Err(ConfigError::Shape("a module descriptor object"));
        };

        Ok(Self {
            instance_name: keys.name,
            module_type: keys.module,
            config: ModuleConfig::new(map),
        })
    }
}

/// The resolved configuration: tick period plus descriptors in bar order.
#[derive(Clone, Debug, PartialEq)]
pub struct BarConfig {
    pub tick_interval: Duration,
    pub modules: Vec<ModuleDescriptor>,
}

/// Load from `path`, or the built-in default when no path is given.
pub fn load(path: Option<&Path>) -> Result<BarConfig, ConfigError> {
    match path {
        Some(path) => {
            debug!("Reading config from {}", path.display());
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse(&text)
        }
        None => {
            debug!("No config given, using built-in default");
            parse(DEFAULT_CONFIG)
        }
    }
}

/// Parse a config document. Bad descriptors are logged and skipped; only a
/// document that is not valid JSON of an accepted shape is an error.
pub fn parse(text: &str) -> Result<BarConfig, ConfigError> {
    let document = serde_json::from_str::<Value>(text)?;
    let (tick_interval, entries) = match Document::deserialize(document) {
        Ok(Document::Modules(entries)) => (DEFAULT_TICK_INTERVAL, entries),
        Ok(Document::Bar {
            tick_interval: Some(0),
            ..
        }) => {
            return Err(ConfigError::InvalidType {
                key: "tick_interval".to_string(),
                expected: "a positive number of seconds",
            });
        }
        Ok(Document::Bar {
            tick_interval,
            modules,
        }) => (
            tick_interval.map_or(DEFAULT_TICK_INTERVAL, Duration::from_secs),
            modules,
        ),
        Err(_) => {
            return Err(ConfigError::Shape(
                "an array of modules or an object with a `modules` array",
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut modules = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        match ModuleDescriptor::from_value(entry) {
            Ok(descriptor) => {
                if !seen.insert(descriptor.instance_name.clone()) {
                    warn!(
                        "Skipping module #{}: name {:?} is already in use",
                        index, descriptor.instance_name
                    );
                    continue;
                }
                debug!(
                    "module: {} ({})",
                    descriptor.instance_name, descriptor.module_type
                );
                modules.push(descriptor);
            }
            Err(e) => error!("Skipping module #{}: {}", index, e),
        }
    }

    Ok(BarConfig {
        tick_interval,
        modules,
    })
}
