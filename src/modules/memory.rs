use crate::config::ModuleConfig;
use crate::functions::formatting::bytes_filter;
use crate::functions::template::{self, SegmentTemplate};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, System};

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_FORMAT: &str =
    "Memory: {{ used_percent|fixed(2) }} % ({{ used|bytes }} / {{ total|bytes }})";

#[derive(Deserialize)]
struct MemoryConfig {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// RAM usage in bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub free: u64,
    pub used_percent: f64,
}

impl MemoryUsage {
    pub fn new(total: u64, used: u64, available: u64, free: u64) -> Self {
        let used_percent = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self {
            total,
            used,
            available,
            free,
            used_percent,
        }
    }
}

pub struct MemoryInstance {
    name: String,
    sys: System,
    template: SegmentTemplate<MemoryUsage>,
}

impl MemoryInstance {
    pub fn new(name: &str, format: &str) -> Result<Self, ModuleError> {
        let mut env = template::environment();
        env.add_filter("bytes", bytes_filter);
        Ok(Self {
            name: name.to_string(),
            sys: System::new(),
            template: SegmentTemplate::compile(env, format)?,
        })
    }

    fn read(&mut self) -> MemoryUsage {
        self.sys
            .refresh_memory_specifics(MemoryRefreshKind::new().with_ram());
        MemoryUsage::new(
            self.sys.total_memory(),
            self.sys.used_memory(),
            self.sys.available_memory(),
            self.sys.free_memory(),
        )
    }
}

impl ModuleInstance for MemoryInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let usage = self.read();
        if usage.total == 0 {
            return Err(ModuleError::Unavailable("memory statistics".to_string()));
        }
        Ok(Some(Segment::pango(&self.name, self.template.render(&usage)?)))
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: MemoryConfig = config.settings()?;
    Ok(Box::new(MemoryInstance::new(name, &settings.format)?))
}
