//! Core types for capy-mpd

use serde::Serialize;
use std::convert::Infallible;
use std::str::FromStr;

/// Playback state reported by `status`. Serialises to the protocol spelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    #[serde(rename = "play")]
    Playing,
    #[serde(rename = "pause")]
    Paused,
    #[default]
    #[serde(rename = "stop")]
    Stopped,
}

/// Unknown states parse as `Stopped`.
impl FromStr for PlaybackState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "play" => PlaybackState::Playing,
            "pause" => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        })
    }
}

impl PlaybackState {
    /// The protocol spelling, e.g. "play".
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Playing => "play",
            PlaybackState::Paused => "pause",
            PlaybackState::Stopped => "stop",
        }
    }
}

/// The current song as returned by `currentsong`.
///
/// Only the tags listed here are kept; anything else the server sends is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Song {
    pub file: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub track: Option<String>,
    pub disc: Option<String>,
    /// Duration in whole seconds, as sent in the `Time` tag
    pub time: Option<String>,
    pub pos: Option<String>,
    pub id: Option<String>,
    /// Stream name for radio stations
    pub name: Option<String>,
}

impl Song {
    /// Build a song from `key: value` pairs. Repeated tags keep the first value.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut song = Song::default();
        for (key, value) in pairs {
            let slot = match key {
                "file" => &mut song.file,
                "Artist" => &mut song.artist,
                "Title" => &mut song.title,
                "Album" => &mut song.album,
                "Date" => &mut song.date,
                "Genre" => &mut song.genre,
                "Composer" => &mut song.composer,
                "Track" => &mut song.track,
                "Disc" => &mut song.disc,
                "Time" => &mut song.time,
                "Pos" => &mut song.pos,
                "Id" => &mut song.id,
                "Name" => &mut song.name,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.trim().to_string());
            }
        }
        song
    }
}
