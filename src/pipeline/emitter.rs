//! i3bar protocol output.
//!
//! The stream is a header line followed by an endless JSON array of frames:
//!
//! ```text
//! {"stop_signal":20,"click_events":true,"version":1,"cont_signal":18}
//! [
//! [],
//! [{"name":"clock","full_text":"12:00:00","markup":"none"}],
//! ```

use crate::modules::Segment;
use crate::pipeline::pause::{CONT_SIGNAL, STOP_SIGNAL};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Header {
    stop_signal: i32,
    click_events: bool,
    version: u32,
    cont_signal: i32,
}

/// Writes protocol frames to the bar host.
pub struct Emitter<W: Write> {
    out: W,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Header, opening bracket and the empty warm-up frame. Written once.
    pub fn write_header(&mut self) -> io::Result<()> {
        let header = Header {
            stop_signal: STOP_SIGNAL,
            click_events: true,
            version: 1,
            cont_signal: CONT_SIGNAL,
        };
        serde_json::to_writer(&mut self.out, &header)?;
        self.out.write_all(b"\n[\n[],\n")?;
        self.out.flush()
    }

    /// One frame on its own line. An empty slice is still a valid frame.
    pub fn write_frame(&mut self, segments: &[Segment]) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, segments)?;
        self.out.write_all(b",\n")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
