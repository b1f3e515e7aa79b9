use crate::config::ModuleConfig;
use crate::modules::{ModuleError, ModuleInstance, Segment};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;

const DEFAULT_FORMAT: &str = "%a, %d.%m.%Y %H:%M:%S %Z";
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct TimeConfig {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

type TimeSource = Box<dyn Fn() -> DateTime<Local>>;

/// Local time rendered with a strftime format.
pub struct ClockInstance {
    name: String,
    format: String,
    now: TimeSource,
}

impl ClockInstance {
    pub fn new(name: &str, format: &str) -> Result<Self, ModuleError> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ModuleError::TimeFormat(format.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            format: format.to_string(),
            now: Box::new(Local::now),
        })
    }

    /// Read the time from `source` instead of the system clock.
    #[cfg(test)]
    pub fn with_time_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> DateTime<Local> + 'static,
    {
        self.now = Box::new(source);
        self
    }
}

impl ModuleInstance for ClockInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let now = (self.now)();
        let mut text = String::new();
        write!(text, "{}", now.format(&self.format))
            .map_err(|_| ModuleError::TimeFormat(self.format.clone()))?;
        Ok(Some(Segment::plain(&self.name, text)))
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.name, self.format)
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: TimeConfig = config.settings()?;
    Ok(Box::new(ClockInstance::new(name, &settings.format)?))
}
