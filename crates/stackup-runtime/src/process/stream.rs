//! Async stream log readers (non-UTF8-safe).
//!
//! Managed services (llama-server in particular) can emit non-UTF8 bytes on
//! stdout/stderr. `BufReader::lines()` would end the reader task on invalid
//! UTF-8, and a reader that stops draining lets the pipe fill up and stall
//! the child. Lines are therefore read as bytes and decoded lossily.

use std::sync::Arc;

use stackup_core::{OutputStream, ServiceLogSink};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    service: Arc<str>,
    kind: OutputStream,
    sink: Arc<dyn ServiceLogSink>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    sink.append(&service, kind, line);
                }
                Err(e) => {
                    debug!(service = %service, stream = %kind, error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(service = %service, stream = %kind, "output reader task exiting");
    });
}
