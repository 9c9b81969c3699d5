//! Stream drainers: one thread per child output stream.
//!
//! Each drainer reads fixed-size chunks from its stream until end-of-stream
//! and forwards them, followed by a single [`StreamEvent::Eof`], into its
//! own queue. The two drainers share nothing, so a silent stream never
//! holds up the other one.

use std::io::{self, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// An item on a drainer's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty chunk, in stream order.
    Chunk(Vec<u8>),
    /// End of stream. Sent exactly once, last.
    Eof,
}

/// Accumulated chunks for one stream, plus whether it has ended.
#[derive(Debug, Clone, Default)]
pub struct StreamBuffer {
    chunks: Vec<Vec<u8>>,
    complete: bool,
}

impl StreamBuffer {
    pub fn push(&mut self, chunk: Vec<u8>) {
        self.chunks.push(chunk);
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stream's bytes exactly as read.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    /// Decode the whole stream as UTF-8, replacing invalid sequences.
    ///
    /// Decoding happens after concatenation so a multi-byte character split
    /// across two chunks survives intact.
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

/// Spawn a named thread that drains `reader` into `queue`.
pub fn spawn_drainer<R>(
    name: &str,
    reader: R,
    chunk_size: usize,
    queue: Sender<StreamEvent>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let stream = name.to_string();
    thread::Builder::new()
        .name(format!("drain-{}", name))
        .spawn(move || drain(&stream, reader, chunk_size, &queue))
}

/// Read until end-of-stream, forwarding every non-empty chunk, then `Eof`.
///
/// A read error ends the stream the same way EOF does. Send failures mean
/// the watchdog has stopped listening and are ignored.
pub fn drain<R: Read>(stream: &str, mut reader: R, chunk_size: usize, queue: &Sender<StreamEvent>) {
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if queue.send(StreamEvent::Chunk(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(stream, error = %e, "stream read failed, treating as end of stream");
                break;
            }
        }
    }

    let _ = queue.send(StreamEvent::Eof);
}
