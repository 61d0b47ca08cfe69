//! Line-delimited JSON transport.
//!
//! Each input line is one [`Request`]; each output line is one [`Response`].

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::Error;
use crate::handler::RequestHandler;
use crate::request::{error_codes, Request, Response};

/// Transport metrics for monitoring.
#[derive(Debug)]
pub struct TransportMetrics {
    /// Total number of requests received.
    pub requests_total: AtomicU64,
    /// Number of successful requests.
    pub requests_success: AtomicU64,
    /// Number of failed requests, malformed lines included.
    pub requests_failed: AtomicU64,
    /// Transport start time.
    pub started_at: Instant,
}

impl TransportMetrics {
    fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    fn record(&self, response: &Response) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if response.is_ok() {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Requests handled so far.
    pub fn total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }
}

/// Serves requests read from `reader`, writing responses to `writer`.
pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
    handler: Arc<RequestHandler>,
    metrics: TransportMetrics,
}

impl<R: BufRead, W: Write> StdioTransport<R, W> {
    pub fn new(reader: R, writer: W, handler: Arc<RequestHandler>) -> Self {
        Self {
            reader,
            writer,
            handler,
            metrics: TransportMetrics::new(),
        }
    }

    /// Get transport metrics.
    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }

    /// Serve until end of input. Returns the number of requests answered.
    pub fn run(&mut self) -> Result<u64, Error> {
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|e| Error::Transport(format!("read failed: {}", e)))?;
            if read == 0 {
                break;
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // Invalid UTF-8 is a malformed line like any other.
            let response = match serde_json::from_slice::<Request>(&line) {
                Ok(request) => {
                    tracing::trace!(
                        request_id = request.id,
                        operation = request.operation.name(),
                        "request received"
                    );
                    self.handler.handle(&request)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed request");
                    Response::error(0, error_codes::BAD_REQUEST, format!("malformed request: {}", e))
                }
            };

            self.metrics.record(&response);
            self.write_response(&response)?;
        }

        tracing::info!(
            requests = self.metrics.total(),
            failed = self.metrics.requests_failed.load(Ordering::Relaxed),
            uptime_ms = self.metrics.started_at.elapsed().as_millis() as u64,
            "input closed"
        );
        Ok(self.metrics.total())
    }

    fn write_response(&mut self, response: &Response) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::Transport(format!("write failed: {}", e)))
    }
}

/// Transport over the process's stdin and stdout.
pub fn stdio(
    handler: Arc<RequestHandler>,
) -> StdioTransport<io::StdinLock<'static>, io::StdoutLock<'static>> {
    StdioTransport::new(io::stdin().lock(), io::stdout().lock(), handler)
}
