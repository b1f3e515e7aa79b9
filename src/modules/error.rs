//! Errors raised while constructing or rendering a module instance.

use crate::config::ConfigError;
use crate::functions::template::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid time format {0:?}")]
    TimeFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MPD error: {0}")]
    Mpd(#[from] capy_mpd::MpdError),

    #[error("battery error: {0}")]
    Battery(#[from] battery::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("{0}")]
    Unavailable(String),
}
