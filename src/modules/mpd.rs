use crate::config::ModuleConfig;
use crate::functions::template::{self, SegmentTemplate};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use capy_mpd::{MpdClient, PlaybackState, Song};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 6600;
const DEFAULT_FORMAT: &str = "[{{ state }}] {{ artist }} - {{ title }}";

#[derive(Deserialize)]
struct MpdConfig {
    #[serde(default = "default_host")]
    host_name: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_format")]
    format: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Template context: `state` plus every tag of the current song at top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    #[serde(flatten)]
    pub song: Song,
}

/// Run one `status` + `currentsong` exchange and close the session.
pub fn query<S: Read + Write>(mut client: MpdClient<S>) -> Result<PlayerStatus, ModuleError> {
    let status = client.status()?;
    let state = status
        .get("state")
        .ok_or_else(|| ModuleError::Unavailable("mpd status without state".to_string()))?
        .parse::<PlaybackState>()
        .unwrap_or_default();
    let song = client.current_song()?;
    client.close()?;
    Ok(PlayerStatus { state, song })
}

pub struct MpdInstance {
    name: String,
    host: String,
    port: u16,
    template: SegmentTemplate<PlayerStatus>,
}

impl MpdInstance {
    pub fn new(name: &str, host: &str, port: u16, format: &str) -> Result<Self, ModuleError> {
        Ok(Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
            template: SegmentTemplate::compile(template::environment(), format)?,
        })
    }
}

impl ModuleInstance for MpdInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let client = MpdClient::connect(&self.host, self.port, CONNECT_TIMEOUT)?;
        debug!("{}: MPD {} at {}:{}", self.name, client.version(), self.host, self.port);
        let status = query(client)?;
        debug!("{}: {}", self.name, status.state.as_str());
        Ok(Some(Segment::pango(&self.name, self.template.render(&status)?)))
    }

    fn describe(&self) -> String {
        format!("{} ({}:{})", self.name, self.host, self.port)
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: MpdConfig = config.settings()?;
    Ok(Box::new(MpdInstance::new(
        name,
        &settings.host_name,
        settings.port,
        &settings.format,
    )?))
}
