//! Keep-alive emission for long-running streamed responses.
//!
//! Combining parts can take far longer than a client's idle timeout. While
//! the work runs, [`KeepAlive`] pushes one unit into its [`ChunkSink`]
//! whenever the [`IdleTimer`] reports that the interval has passed without
//! output. The first unit is the XML declaration, every later one a single
//! space, so the final document stays well-formed whatever was sent before.

use std::time::{Duration, Instant};

use bytes::Bytes;
use harbor_s3_xml::XML_DECLARATION;
use tracing::debug;

const FILLER: &[u8] = b" ";

/// Destination for response chunks.
pub trait ChunkSink {
    /// Deliver one chunk. Returns `false` once the receiving side is gone.
    fn send_chunk(&mut self, chunk: Bytes) -> bool;
}

impl ChunkSink for Vec<Bytes> {
    fn send_chunk(&mut self, chunk: Bytes) -> bool {
        self.push(chunk);
        true
    }
}

/// Reports when `interval` has passed since it was last reset.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    interval: Duration,
    last: Instant,
}

impl IdleTimer {
    /// Start a timer that becomes due `interval` from now.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    /// Whether the interval has elapsed since the last reset.
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.last.elapsed() >= self.interval
    }

    /// Restart the interval from now.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Reset and return `true` if due, otherwise return `false`.
    pub fn fire(&mut self) -> bool {
        if self.is_due() {
            self.reset();
            true
        } else {
            false
        }
    }
}

/// Emits preamble and filler units into a sink while work is in progress.
#[derive(Debug)]
pub struct KeepAlive<S: ChunkSink> {
    sink: S,
    timer: IdleTimer,
    preamble_sent: bool,
    receiver_gone: bool,
}

impl<S: ChunkSink> KeepAlive<S> {
    /// Wrap `sink`, emitting at most once per `interval` of silence.
    pub fn new(sink: S, interval: Duration) -> Self {
        Self {
            sink,
            timer: IdleTimer::new(interval),
            preamble_sent: false,
            receiver_gone: false,
        }
    }

    /// Emit one unit if the idle interval has elapsed.
    pub fn tick(&mut self) {
        if self.timer.fire() {
            self.emit();
        }
    }

    /// Emit one unit now and restart the idle interval.
    pub fn emit(&mut self) {
        let unit = if self.preamble_sent {
            FILLER
        } else {
            self.preamble_sent = true;
            XML_DECLARATION
        };
        self.send(Bytes::from_static(unit));
        self.timer.reset();
    }

    /// Whether the XML declaration has already gone out.
    #[must_use]
    pub fn preamble_sent(&self) -> bool {
        self.preamble_sent
    }

    /// Send the terminal document and hand back the sink.
    ///
    /// `document` is a root element without a declaration; the declaration
    /// is prepended unless a keep-alive unit already carried it.
    pub fn finish(mut self, document: Vec<u8>) -> S {
        if !self.preamble_sent {
            self.preamble_sent = true;
            self.send(Bytes::from_static(XML_DECLARATION));
        }
        self.send(Bytes::from(document));
        self.sink
    }

    fn send(&mut self, chunk: Bytes) {
        // Work continues after a disconnect; only the output is dropped.
        if !self.receiver_gone && !self.sink.send_chunk(chunk) {
            debug!("response receiver dropped, discarding further output");
            self.receiver_gone = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[Bytes]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }

    #[test]
    fn test_should_emit_nothing_before_interval() {
        let mut keepalive = KeepAlive::new(Vec::new(), Duration::from_secs(3600));
        keepalive.tick();
        keepalive.tick();
        assert!(!keepalive.preamble_sent());

        let chunks = keepalive.finish(b"<Done/>".to_vec());
        assert_eq!(joined(&chunks), [XML_DECLARATION, b"<Done/>".as_slice()].concat());
    }

    #[test]
    fn test_should_send_preamble_first_then_spaces() {
        let mut keepalive = KeepAlive::new(Vec::new(), Duration::ZERO);
        keepalive.tick();
        keepalive.tick();
        keepalive.tick();
        assert!(keepalive.preamble_sent());

        let chunks = keepalive.finish(b"<Done/>".to_vec());
        assert_eq!(chunks[0], Bytes::from_static(XML_DECLARATION));
        assert_eq!(chunks[1], Bytes::from_static(b" "));
        assert_eq!(chunks[2], Bytes::from_static(b" "));
        assert_eq!(chunks[3], Bytes::from_static(b"<Done/>"));
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_should_report_timer_due_only_after_interval() {
        let mut timer = IdleTimer::new(Duration::from_secs(3600));
        assert!(!timer.is_due());
        assert!(!timer.fire());

        let mut zero = IdleTimer::new(Duration::ZERO);
        assert!(zero.fire());
    }

    struct ClosedSink(usize);

    impl ChunkSink for ClosedSink {
        fn send_chunk(&mut self, _chunk: Bytes) -> bool {
            self.0 += 1;
            false
        }
    }

    #[test]
    fn test_should_stop_sending_after_receiver_gone() {
        let mut keepalive = KeepAlive::new(ClosedSink(0), Duration::ZERO);
        keepalive.emit();
        keepalive.emit();
        let sink = keepalive.finish(b"<Done/>".to_vec());
        assert_eq!(sink.0, 1);
    }
}
