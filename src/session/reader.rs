//! Background reader
//!
//! A program's output is read on its own thread and handed to the session
//! over a channel, so the session (and the engine inside it) never blocks
//! on I/O. `None` on the channel marks the end of the stream.

use std::io::{self, Read};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::{Packet, WriteSink};
use crate::error::{Error, Result};

/// Where program output comes from
pub trait OutputSource: Send + 'static {
    /// Block until the next packet is available. `Ok(None)` means the
    /// source is exhausted.
    fn read(&mut self) -> Result<Option<Packet>>;
}

/// Handle to a running reader thread
pub struct Reader {
    receiver: Receiver<Option<Packet>>,
    handle: JoinHandle<()>,
}

impl Reader {
    /// Start reading `source` on a new thread
    pub fn spawn<S: OutputSource>(mut source: S) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("replterm-reader".to_string())
            .spawn(move || {
                debug!("reader thread started");
                loop {
                    match source.read() {
                        Ok(Some(packet)) => {
                            if sender.send(Some(packet)).is_err() {
                                debug!("session dropped, reader exiting");
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("reader error: {}", e);
                            break;
                        }
                    }
                }
                let _ = sender.send(None);
                debug!("reader thread finished");
            })?;
        Ok(Self { receiver, handle })
    }

    /// Channel the session drains with [`Session::pump`](super::Session::pump)
    pub fn receiver(&self) -> &Receiver<Option<Packet>> {
        &self.receiver
    }

    /// Wait for the thread to exit
    pub fn join(self) -> Result<()> {
        drop(self.receiver);
        self.handle
            .join()
            .map_err(|_| Error::Io(io::Error::other("reader thread panicked")))
    }
}

/// Output source over a byte stream, typically a child's stdout.
///
/// Bytes are decoded as UTF-8 (lossily); a character split across reads is
/// held until its remaining bytes arrive. `\r\n` is folded to `\n`.
pub struct ChildSource<R> {
    reader: R,
    buf: Vec<u8>,
    partial: Vec<u8>,
}

impl<R: Read + Send + 'static> ChildSource<R> {
    /// Read up to `read_buffer` bytes at a time from `reader`
    pub fn new(reader: R, read_buffer: usize) -> Self {
        Self {
            reader,
            buf: vec![0; read_buffer.max(1)],
            partial: Vec::new(),
        }
    }
}

impl<R: Read + Send + 'static> OutputSource for ChildSource<R> {
    fn read(&mut self) -> Result<Option<Packet>> {
        loop {
            let n = match self.reader.read(&mut self.buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                if self.partial.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.partial);
                return Ok(Some(Packet::Output(
                    String::from_utf8_lossy(&rest).into_owned(),
                )));
            }

            self.partial.extend_from_slice(&self.buf[..n]);
            let text = take_utf8(&mut self.partial);
            if !text.is_empty() {
                return Ok(Some(Packet::Output(text.replace("\r\n", "\n"))));
            }
        }
    }
}

/// Decode the longest complete prefix of `bytes`, leaving an unfinished
/// trailing character in place
fn take_utf8(bytes: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => bytes.len(),
    };
    let rest = bytes.split_off(complete);
    let text = String::from_utf8_lossy(bytes).into_owned();
    *bytes = rest;
    text
}

/// Spawn `command` with piped stdio.
///
/// Returns the child, a source over its stdout and a sink for its stdin.
pub fn spawn_child(
    command: &mut Command,
    read_buffer: usize,
) -> Result<(Child, ChildSource<ChildStdout>, WriteSink<ChildStdin>)> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Io(io::Error::other("child stdout not captured")))?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Io(io::Error::other("child stdin not captured")))?;
    Ok((
        child,
        ChildSource::new(stdout, read_buffer),
        WriteSink::new(stdin),
    ))
}
