//! # Replay Transport
//!
//! Serves frames from a capture file of back-to-back raw frames, for offline
//! decoding and for running the bridge without hardware.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::SensorTransport;
use crate::error::{Result, VueError};
use crate::frame::protocol::FRAME_SIZE;

/// Frame source backed by a capture file
#[derive(Debug)]
pub struct ReplayTransport {
    reader: BufReader<File>,
    path: PathBuf,
    looping: bool,
    frame_count: u64,
}

impl ReplayTransport {
    /// Opens a capture file.
    ///
    /// # Arguments
    ///
    /// * `path` - Capture file holding concatenated frames
    /// * `looping` - Start over at the end of the file instead of stopping
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or holds no complete frame
    pub fn open<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            VueError::Transport(format!("Failed to open replay file {}: {}", path.display(), e))
        })?;

        let len = file.metadata()?.len();
        let frame_count = len / FRAME_SIZE as u64;
        if frame_count == 0 {
            return Err(VueError::Transport(format!(
                "Replay file {} holds no complete frame ({} bytes)",
                path.display(),
                len
            )));
        }
        if len % FRAME_SIZE as u64 != 0 {
            debug!(
                "Replay file {} has {} trailing bytes, ignoring them",
                path.display(),
                len % FRAME_SIZE as u64
            );
        }

        info!("Replaying {} frame(s) from {}", frame_count, path.display());
        Ok(Self {
            reader: BufReader::new(file),
            path,
            looping,
            frame_count,
        })
    }

    /// Number of complete frames in the capture.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn rewind(&mut self) -> Result<()> {
        debug!("Rewinding replay file {}", self.path.display());
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl SensorTransport for ReplayTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                if !self.looping {
                    return Err(VueError::ReplayExhausted);
                }
                self.rewind()?;
                self.reader.read_exact(buf).map_err(VueError::from)
            }
            Err(e) => Err(VueError::Transport(format!(
                "Failed to read replay file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.path.display())
    }
}
