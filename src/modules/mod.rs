//! Data-source modules for the status line.
//!
//! Every module type exposes the same three operations through
//! [`ModuleInstance`]; the pipeline never looks past them.
//!
//! - `time` - Local clock with a strftime format
//! - `battery` - Battery charge from sysfs or the system battery API
//! - `net` - Interface state and addresses
//! - `mpd` - Music Player Daemon playback state
//! - `load` - System load averages
//! - `memory` - RAM usage
//! - `idlerpg` - Remote IdleRPG player status

pub mod battery;
pub mod clock;
pub mod error;
pub mod idlerpg;
pub mod load;
pub mod memory;
pub mod mpd;
pub mod network;

pub use error::ModuleError;

use crate::module_manager::ModuleRegistry;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the bar host should interpret `full_text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Markup {
    #[default]
    #[serde(rename = "none")]
    Plain,
    #[serde(rename = "pango")]
    Pango,
}

/// One rendered block of the bar, contributed by exactly one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub full_text: String,
    #[serde(default)]
    pub markup: Markup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,
}

impl Segment {
    pub fn plain(name: &str, full_text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            full_text: full_text.into(),
            markup: Markup::Plain,
            color: None,
            separator_block_width: None,
        }
    }

    pub fn pango(name: &str, full_text: impl Into<String>) -> Self {
        Self {
            markup: Markup::Pango,
            ..Self::plain(name, full_text)
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_separator_block_width(mut self, width: u32) -> Self {
        self.separator_block_width = Some(width);
        self
    }
}

/// The contract between the pipeline and a configured data source.
pub trait ModuleInstance {
    /// Stable name, equal to the descriptor's instance name.
    fn name(&self) -> &str;

    /// Minimum time a rendered segment is reused. Constant for the instance's lifetime.
    fn refresh_interval(&self) -> Duration;

    /// Produce a fresh segment. `Ok(None)` means there is nothing to show right now.
    /// May block on I/O.
    fn render(&mut self) -> Result<Option<Segment>, ModuleError>;

    /// One-line summary for logs.
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Registry with every built-in module type.
pub fn default_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register("time", clock::create);
    registry.register("battery", battery::create);
    registry.register("net", network::create);
    registry.register("mpd", mpd::create);
    registry.register("load", load::create);
    registry.register("memory", memory::create);
    registry.register("idlerpg", idlerpg::create);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    #[test]
    fn test_segment_serializes_host_keys() {
        let segment = Segment::pango("load", "<b>0.42</b>")
            .with_color("#AAAAAA")
            .with_separator_block_width(0);
        let json: Value = serde_json::to_value(&segment).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "load",
                "full_text": "<b>0.42</b>",
                "markup": "pango",
                "color": "#AAAAAA",
                "separator_block_width": 0
            })
        );
    }

    #[test]
    fn test_optional_keys_are_omitted() {
        let text = serde_json::to_string(&Segment::plain("clock", "12:00:00")).unwrap();
        assert_eq!(
            text,
            r#"{"name":"clock","full_text":"12:00:00","markup":"none"}"#
        );
    }

    #[test]
    fn test_segment_round_trips_through_generic_json() {
        let segment = Segment::plain("net", "wlp3s0: 10.0.0.2/24").with_color("red");
        let text = serde_json::to_string(&segment).unwrap();
        let parsed: Segment = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, segment);
    }

    #[test]
    fn test_default_registry_knows_all_types() {
        let registry = default_registry();
        for type_name in ["time", "battery", "net", "mpd", "load", "memory", "idlerpg"] {
            assert!(registry.contains(type_name), "missing {type_name}");
        }
        assert!(!registry.contains("volume"));
    }

    #[test]
    fn test_built_in_config_constructs_every_instance() {
        let config = crate::config::load(None).unwrap();
        let instances = default_registry().construct_all(&config.modules);
        assert_eq!(instances.len(), config.modules.len());
    }
}
