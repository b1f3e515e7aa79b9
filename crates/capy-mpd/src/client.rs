//! MPD client implementation
//!
//! Plain request/response over the text protocol:
//! - Server greets with `OK MPD <version>`
//! - Each command is answered by `key: value` lines and a final `OK`
//! - Errors come back as a single `ACK [code@index] {command} message` line

use crate::error::MpdError;
use crate::types::Song;
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const GREETING_PREFIX: &str = "OK MPD ";

/// MPD client over any bidirectional byte stream
pub struct MpdClient<S: Read + Write> {
    stream: BufReader<S>,
    version: String,
}

impl MpdClient<TcpStream> {
    /// Connect over TCP. `timeout` bounds the connect and every read/write.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, MpdError> {
        let target = format!("{host}:{port}");
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| MpdError::Resolve(target.clone()))?;

        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        debug!("Connected to MPD at {}", target);

        Self::from_stream(stream)
    }
}

impl<S: Read + Write> MpdClient<S> {
    /// Wrap an already connected stream and consume the server greeting.
    pub fn from_stream(stream: S) -> Result<Self, MpdError> {
        let mut stream = BufReader::new(stream);
        let greeting = read_line(&mut stream)?;
        let version = greeting
            .strip_prefix(GREETING_PREFIX)
            .ok_or_else(|| MpdError::Greeting(greeting.clone()))?
            .to_string();

        trace!("MPD protocol version {}", version);
        Ok(Self { stream, version })
    }

    /// Protocol version announced by the server.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `status` as raw key/value pairs (`state`, `volume`, `elapsed`, ...).
    pub fn status(&mut self) -> Result<HashMap<String, String>, MpdError> {
        Ok(self.command("status")?.into_iter().collect())
    }

    pub fn current_song(&mut self) -> Result<Song, MpdError> {
        let pairs = self.command("currentsong")?;
        Ok(Song::from_pairs(
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }

    /// Politely end the session. The server closes without a reply.
    pub fn close(mut self) -> Result<(), MpdError> {
        let stream = self.stream.get_mut();
        stream.write_all(b"close\n")?;
        stream.flush()?;
        Ok(())
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn command(&mut self, command: &str) -> Result<Vec<(String, String)>, MpdError> {
        let stream = self.stream.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut pairs = Vec::new();
        loop {
            let line = read_line(&mut self.stream)?;
            if line == "OK" {
                break;
            }
            if let Some(message) = line.strip_prefix("ACK ") {
                return Err(MpdError::Ack(message.to_string()));
            }
            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| MpdError::Malformed(line.clone()))?;
            pairs.push((key.to_string(), value.to_string()));
        }

        trace!("{} returned {} pairs", command, pairs.len());
        Ok(pairs)
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, MpdError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(MpdError::Disconnected);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
