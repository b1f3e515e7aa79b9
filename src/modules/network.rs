use crate::config::ModuleConfig;
use crate::functions::formatting::bytes_filter;
use crate::functions::template::{self, SegmentTemplate};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::Networks;

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_FORMAT: &str = r#"{{ interface_name }}: {{ addresses|join(", ") }}"#;
const SYSFS_NET: &str = "/sys/class/net";

#[derive(Deserialize)]
struct NetConfig {
    interface_name: String,
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// State of one network interface at render time.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InterfaceStatus {
    pub name: String,
    pub interface_name: String,
    pub up: bool,
    pub addresses: Vec<String>,
    pub mac: Option<String>,
    pub received: u64,
    pub transmitted: u64,
}

/// IPv6 link-local (fe80::/10) and unique-local (fd00::/8) addresses are not shown.
pub fn is_hidden_address(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            first & 0xffc0 == 0xfe80 || first & 0xff00 == 0xfd00
        }
    }
}

/// `operstate` values that count as up. Loopback and most tunnels report `unknown`.
fn operstate_is_up(state: &str) -> bool {
    matches!(state.trim(), "up" | "unknown")
}

pub struct NetworkInstance {
    name: String,
    interface_name: String,
    sysfs_root: PathBuf,
    networks: Networks,
    last_totals: Option<(u64, u64)>,
    template: SegmentTemplate<InterfaceStatus>,
}

impl NetworkInstance {
    pub fn new(name: &str, interface_name: &str, format: &str) -> Result<Self, ModuleError> {
        let mut env = template::environment();
        env.add_filter("bytes", bytes_filter);
        Ok(Self {
            name: name.to_string(),
            interface_name: interface_name.to_string(),
            sysfs_root: PathBuf::from(SYSFS_NET),
            networks: Networks::new(),
            last_totals: None,
            template: SegmentTemplate::compile(env, format)?,
        })
    }

    /// Read link state from another sysfs directory.
    #[cfg(test)]
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    fn link_up(&self) -> bool {
        let path = self.sysfs_root.join(&self.interface_name).join("operstate");
        match fs::read_to_string(&path) {
            Ok(state) => operstate_is_up(&state),
            Err(e) => {
                debug!("{}: cannot read {}: {}", self.name, path.display(), e);
                false
            }
        }
    }

    fn read(&mut self) -> InterfaceStatus {
        let mut status = InterfaceStatus {
            name: self.name.clone(),
            interface_name: self.interface_name.clone(),
            up: self.link_up(),
            ..Default::default()
        };

        self.networks.refresh_list();
        let Some(data) = self.networks.list().get(&self.interface_name) else {
            debug!("{}: interface {} not present", self.name, self.interface_name);
            self.last_totals = None;
            return status;
        };

        status.addresses = data
            .ip_networks()
            .iter()
            .filter(|net| !is_hidden_address(&net.addr))
            .map(|net| format!("{}/{}", net.addr, net.prefix))
            .collect();
        status.mac = Some(data.mac_address().to_string());

        let totals = (data.total_received(), data.total_transmitted());
        if let Some((rx, tx)) = self.last_totals {
            status.received = totals.0.saturating_sub(rx);
            status.transmitted = totals.1.saturating_sub(tx);
        }
        self.last_totals = Some(totals);
        status
    }
}

impl ModuleInstance for NetworkInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let status = self.read();
        Ok(Some(Segment::pango(&self.name, self.template.render(&status)?)))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.interface_name)
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: NetConfig = config.settings()?;
    Ok(Box::new(NetworkInstance::new(
        name,
        &settings.interface_name,
        &settings.format,
    )?))
}
