//! Frame source: newline-delimited JSON from stdin, a file or a FIFO.

use anyhow::{Result, anyhow};
use log::warn;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
};

use handcalc::FrameMessage;
use handcalc::config::Input;

#[derive(Debug, Clone)]
pub enum FrameSource {
    Stdin,
    Path(PathBuf),
}

impl FrameSource {
    pub fn from_config(input: &Input) -> Self {
        match input.source_path() {
            Some(p) => FrameSource::Path(p),
            None => FrameSource::Stdin,
        }
    }

    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            FrameSource::Stdin
        } else {
            FrameSource::Path(PathBuf::from(arg))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FrameSource::Stdin => "stdin".to_string(),
            FrameSource::Path(p) => p.display().to_string(),
        }
    }

    /// Opening a FIFO blocks until a writer shows up.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            FrameSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            FrameSource::Path(p) => {
                let f = File::open(p)
                    .map_err(|e| anyhow!("failed to open frame source {}: {e}", p.display()))?;
                Ok(Box::new(BufReader::new(f)))
            }
        }
    }
}

/// Blank lines are skipped; undecodable ones are logged and skipped.
pub fn decode_line(line: &str, lineno: usize) -> Option<FrameMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match FrameMessage::parse(line) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("frame line {lineno}: {e}");
            None
        }
    }
}

pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = FrameMessage> {
    reader
        .lines()
        .enumerate()
        .map_while(|(i, line)| match line {
            Ok(l) => Some((i + 1, l)),
            Err(e) => {
                warn!("frame source read failed: {e}");
                None
            }
        })
        .filter_map(|(lineno, l)| decode_line(&l, lineno))
}
