//! Battery charge.
//!
//! With `device_path` set, the sysfs `uevent` file of that power supply is
//! parsed directly. Otherwise the first battery reported by the `battery`
//! crate is used, with its readings converted to the same sysfs units
//! (µWh, µW, µV).

use crate::config::ModuleConfig;
use crate::modules::{ModuleError, ModuleInstance, Segment};
use crate::functions::template::{self, SegmentTemplate};
use battery::{Battery, Manager, State};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_FORMAT: &str =
    "{{ name }}: {{ percentage|fixed(1) }} %{% if charging %} ⚇{% endif %}";

const JOULES_PER_MICROWATT_HOUR: f64 = 3600.0 / 1_000_000.0;

#[derive(Deserialize)]
struct BatteryConfig {
    device_path: Option<PathBuf>,
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// One reading of a power supply.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatteryInfo {
    pub name: String,
    pub status: Option<String>,
    pub present: bool,
    pub technology: Option<String>,
    pub cycle_count: Option<i64>,
    pub capacity: Option<i64>,
    pub capacity_level: Option<String>,
    pub energy_now: Option<i64>,
    pub energy_full: Option<i64>,
    pub energy_full_design: Option<i64>,
    pub power_now: Option<i64>,
    pub voltage_now: Option<i64>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub percentage: Option<f64>,
    pub charging: bool,
    pub time_remaining: Option<String>,
    #[serde(skip)]
    charge_now: Option<i64>,
    #[serde(skip)]
    charge_full: Option<i64>,
}

impl BatteryInfo {
    /// Fill `charging` and `percentage` from the raw readings.
    fn derive_fields(&mut self) {
        self.charging = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("charging"));
        let ratio = |now: Option<i64>, full: Option<i64>| match (now, full) {
            (Some(now), Some(full)) if full > 0 => Some(now as f64 / full as f64 * 100.0),
            _ => None,
        };
        self.percentage = ratio(self.energy_now, self.energy_full)
            .or_else(|| ratio(self.charge_now, self.charge_full))
            .or_else(|| self.capacity.map(|c| c as f64));
    }
}

/// Parse the `KEY=value` lines of a power supply `uevent` file.
pub fn parse_uevent(contents: &str) -> BatteryInfo {
    let mut info = BatteryInfo::default();

    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping malformed uevent line: {:?}", line);
            continue;
        };
        let Some(key) = key.strip_prefix("POWER_SUPPLY_") else {
            continue;
        };
        let value = value.trim();
        let int = || value.parse::<i64>().ok();
        let text = || Some(value.to_string());

        match key {
            "NAME" => info.name = value.to_string(),
            "STATUS" => info.status = text(),
            "PRESENT" => info.present = value == "1",
            "TECHNOLOGY" => info.technology = text(),
            "CYCLE_COUNT" => info.cycle_count = int(),
            "CAPACITY" => info.capacity = int(),
            "CAPACITY_LEVEL" => info.capacity_level = text(),
            "ENERGY_NOW" => info.energy_now = int(),
            "ENERGY_FULL" => info.energy_full = int(),
            "ENERGY_FULL_DESIGN" => info.energy_full_design = int(),
            "CHARGE_NOW" => info.charge_now = int(),
            "CHARGE_FULL" => info.charge_full = int(),
            "POWER_NOW" => info.power_now = int(),
            "VOLTAGE_NOW" => info.voltage_now = int(),
            "MANUFACTURER" => info.manufacturer = text(),
            "MODEL_NAME" => info.model_name = text(),
            _ => {}
        }
    }

    info.derive_fields();
    info
}

fn status_name(state: State) -> &'static str {
    match state {
        State::Charging => "Charging",
        State::Discharging => "Discharging",
        State::Full => "Full",
        State::Empty => "Empty",
        _ => "Unknown",
    }
}

fn format_time_remaining(battery: &Battery) -> Option<String> {
    let state = battery.state();

    let time = match state {
        State::Charging => battery.time_to_full(),
        State::Discharging => battery.time_to_empty(),
        _ => None,
    }?;

    let total_minutes = (time.value / 60.0) as i64;
    let suffix = if state == State::Charging {
        "until charged"
    } else {
        "remaining"
    };
    Some(format!("{}:{:02} {}", total_minutes / 60, total_minutes % 60, suffix))
}

fn info_from_battery(index: usize, battery: &Battery) -> BatteryInfo {
    let micro = |value: f32| Some((f64::from(value) * 1_000_000.0).round() as i64);
    let energy = |joules: f32| Some((f64::from(joules) / JOULES_PER_MICROWATT_HOUR).round() as i64);
    let charge = battery.state_of_charge().value;

    BatteryInfo {
        name: format!("BAT{index}"),
        status: Some(status_name(battery.state()).to_string()),
        present: true,
        technology: Some(battery.technology().to_string()),
        cycle_count: battery.cycle_count().map(i64::from),
        capacity: Some((charge * 100.0).round() as i64),
        energy_now: energy(battery.energy().value),
        energy_full: energy(battery.energy_full().value),
        energy_full_design: energy(battery.energy_full_design().value),
        power_now: micro(battery.energy_rate().value),
        voltage_now: micro(battery.voltage().value),
        manufacturer: battery.vendor().map(str::to_string),
        model_name: battery.model().map(str::to_string),
        percentage: Some(f64::from(charge) * 100.0),
        charging: battery.state() == State::Charging,
        time_remaining: format_time_remaining(battery),
        ..Default::default()
    }
}

enum Source {
    Uevent(PathBuf),
    System,
}

pub struct BatteryInstance {
    name: String,
    source: Source,
    template: SegmentTemplate<BatteryInfo>,
}

impl BatteryInstance {
    /// Read from the `uevent` file at `device_path`, or from the system battery API.
    pub fn new(name: &str, device_path: Option<&Path>, format: &str) -> Result<Self, ModuleError> {
        let source = match device_path {
            Some(path) => Source::Uevent(path.to_path_buf()),
            None => Source::System,
        };
        Ok(Self {
            name: name.to_string(),
            source,
            template: SegmentTemplate::compile(template::environment(), format)?,
        })
    }

    fn read(&self) -> Result<BatteryInfo, ModuleError> {
        match &self.source {
            Source::Uevent(path) => Ok(parse_uevent(&fs::read_to_string(path)?)),
            Source::System => {
                let manager = Manager::new()?;
                let mut batteries = manager.batteries()?;
                let mut battery = batteries
                    .next()
                    .ok_or_else(|| ModuleError::Unavailable("no battery found".to_string()))??;
                manager.refresh(&mut battery)?;
                Ok(info_from_battery(0, &battery))
            }
        }
    }
}

impl ModuleInstance for BatteryInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let info = self.read()?;
        debug!("{}: {:?}", self.name, info);
        Ok(Some(Segment::plain(&self.name, self.template.render(&info)?)))
    }

    fn describe(&self) -> String {
        match &self.source {
            Source::Uevent(path) => format!("{} ({})", self.name, path.display()),
            Source::System => format!("{} (system battery)", self.name),
        }
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: BatteryConfig = config.settings()?;
    Ok(Box::new(BatteryInstance::new(
        name,
        settings.device_path.as_deref(),
        &settings.format,
    )?))
}
