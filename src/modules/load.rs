use crate::config::ModuleConfig;
use crate::functions::template::{self, SegmentTemplate};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use log::debug;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use sysinfo::System;

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_FORMAT: &str = concat!(
    r#"<span color="{{ load1|color }}">{{ load1|fixed(2) }}</span> "#,
    r#"<span color="{{ load5|color }}">{{ load5|fixed(2) }}</span> "#,
    r#"<span color="{{ load15|color }}">{{ load15|fixed(2) }}</span>"#,
);

#[derive(Deserialize)]
struct LoadConfig {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Load averages over 1, 5 and 15 minutes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LoadAverages {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub cpus: usize,
}

/// Color for a load value, scaled by the number of logical CPUs.
pub fn load_color(value: f64, cpus: usize) -> &'static str {
    let half = cpus.max(1) as f64 / 2.0;
    match value {
        v if v < 0.5 * half => "grey",
        v if v < 1.5 * half => "#D9FF00",
        v if v < 2.0 * half => "yellow",
        v if v < 4.0 * half => "orange",
        _ => "red",
    }
}

pub struct LoadInstance {
    name: String,
    cpus: usize,
    template: SegmentTemplate<LoadAverages>,
}

impl LoadInstance {
    pub fn new(name: &str, format: &str, cpus: usize) -> Result<Self, ModuleError> {
        let mut env = template::environment();
        env.add_filter("color", move |value: f64| load_color(value, cpus).to_string());
        Ok(Self {
            name: name.to_string(),
            cpus,
            template: SegmentTemplate::compile(env, format)?,
        })
    }

    fn read(&self) -> LoadAverages {
        let avg = System::load_average();
        LoadAverages {
            load1: avg.one,
            load5: avg.five,
            load15: avg.fifteen,
            cpus: self.cpus,
        }
    }
}

impl ModuleInstance for LoadInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let text = self.template.render(&self.read())?;
        debug!("{}: {}", self.name, text);
        Ok(Some(Segment::pango(&self.name, text)))
    }

    fn describe(&self) -> String {
        format!("{} ({} cpus) {:?}", self.name, self.cpus, self.template.source())
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: LoadConfig = config.settings()?;
    let cpus = thread::available_parallelism().map_or(1, |n| n.get());
    Ok(Box::new(LoadInstance::new(name, &settings.format, cpus)?))
}
