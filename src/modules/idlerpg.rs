use crate::config::ModuleConfig;
use crate::functions::template::{self, SegmentTemplate};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use log::debug;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_secs(900);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BASE_URI: &str = "http://irpg.bspar.org/xml.php?player=";
const DEFAULT_FORMAT: &str = r#"irpg {{ username }}: <span color="{% if online %}green{% else %}red{% endif %}">{{ level }}</span>"#;

#[derive(Deserialize)]
struct IdleRpgConfig {
    player: String,
    #[serde(default = "default_base_uri")]
    base_uri: String,
    #[serde(default = "default_format")]
    format: String,
}

fn default_base_uri() -> String {
    DEFAULT_BASE_URI.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Player record from the IdleRPG XML feed. Unknown elements are ignored.
///
/// As a template context the flags serialise as booleans and `totalidled`
/// and `isadmin` are exposed as `idled` and `admin`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Player {
    pub username: String,
    #[serde(rename(serialize = "admin"), serialize_with = "flag")]
    pub isadmin: i64,
    pub level: i64,
    pub class: String,
    pub ttl: i64,
    #[serde(serialize_with = "flag")]
    pub online: i64,
    #[serde(rename(serialize = "idled"))]
    pub totalidled: i64,
    pub xpos: i64,
    pub ypos: i64,
}

fn flag<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(*value != 0)
}

pub fn parse_player(xml: &str) -> Result<Player, ModuleError> {
    Ok(quick_xml::de::from_str(xml)?)
}

pub struct IdleRpgInstance {
    name: String,
    uri: String,
    agent: ureq::Agent,
    template: SegmentTemplate<Player>,
}

impl IdleRpgInstance {
    pub fn new(name: &str, uri: &str, format: &str) -> Result<Self, ModuleError> {
        Ok(Self {
            name: name.to_string(),
            uri: uri.to_string(),
            agent: ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build(),
            template: SegmentTemplate::compile(template::environment(), format)?,
        })
    }

    fn fetch(&self) -> Result<Player, ModuleError> {
        debug!("{}: downloading {}", self.name, self.uri);
        let body = self
            .agent
            .get(&self.uri)
            .call()
            .map_err(|e| ModuleError::Http(e.to_string()))?
            .into_string()?;
        parse_player(&body)
    }
}

impl ModuleInstance for IdleRpgInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        REFRESH_INTERVAL
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let player = self.fetch()?;
        Ok(Some(Segment::pango(&self.name, self.template.render(&player)?)))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.uri)
    }
}

pub fn create(name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let settings: IdleRpgConfig = config.settings()?;
    let uri = format!("{}{}", settings.base_uri, settings.player);
    Ok(Box::new(IdleRpgInstance::new(name, &uri, &settings.format)?))
}
