//! Async line readers for backend stdout/stderr.
//!
//! Python tracebacks and native extensions can emit non-UTF-8 bytes.
//! `BufReader::lines()` would end the reader on the first such byte, so
//! lines are read byte-wise and decoded lossily instead. A line longer than
//! [`MAX_LINE_BYTES`] is cut to that prefix and the rest of it is skipped.

use std::io;
use std::sync::Arc;

use kirlian_core::{ServerLogSinkPort, StreamKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Longest line kept from a child stream.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Spawn a task that reads `stream` line by line until EOF.
///
/// Each line goes to `tracing` at debug level, then to `sink`, then to
/// `on_line`. Lines are delivered in the order the child wrote them.
pub fn spawn_stream_reader<R, F>(
    stream: R,
    port: u16,
    kind: StreamKind,
    sink: Arc<dyn ServerLogSinkPort>,
    mut on_line: F,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        let stream = kind.as_str();

        loop {
            buf.clear();
            match read_capped_line(&mut reader, &mut buf, MAX_LINE_BYTES).await {
                Ok((0, _)) => break,
                Ok((read, truncated)) => {
                    if truncated {
                        warn!(port, stream, bytes = read, "Output line cut to {MAX_LINE_BYTES} bytes");
                    }
                    trim_line_ending(&mut buf);
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    debug!(port, stream, "{line}");
                    sink.append(port, kind, line.clone());
                    on_line(&line);
                }
                Err(e) => {
                    debug!(port, stream, error = %e, "Output reader exiting on read error");
                    break;
                }
            }
        }

        debug!(port, stream, "Output reader reached end of stream");
    })
}

/// Read one line into `buf`, keeping at most `max` bytes of it.
///
/// Returns the number of bytes consumed from `reader`, including the
/// dropped tail and the newline (0 means EOF), and whether content was
/// dropped.
async fn read_capped_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<(usize, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    let mut truncated = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((consumed, truncated));
        }
        let (len, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = max.saturating_sub(buf.len());
        let content = if done { len - 1 } else { len };
        truncated |= content > room;
        buf.extend_from_slice(&available[..len.min(room)]);
        reader.consume(len);
        consumed += len;
        if done {
            return Ok((consumed, truncated));
        }
    }
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
