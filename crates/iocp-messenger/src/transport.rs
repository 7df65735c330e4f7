//! Byte-stream transport contract.
//!
//! The messenger never opens ports or configures baud rates. It only needs a
//! link that can report how many bytes are waiting, read them, and write.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};

/// A byte-stream link to the peer (typically a serial port).
pub trait Transport {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes. Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `bytes`.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
}

// ============================================================================
// In-Memory Transport
// ============================================================================

/// An in-memory link.
///
/// Bytes pushed with [`push_rx`](Self::push_rx) are what the messenger reads;
/// everything the messenger writes is captured for inspection.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    /// Bytes waiting to be read.
    rx: BytesMut,
    /// Bytes written so far.
    tx: BytesMut,
    /// Upper bound on bytes returned by a single read.
    max_read: Option<usize>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many bytes a single read may return.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = Some(max_read.max(1));
        self
    }

    /// Queue bytes for the messenger to read.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    /// Number of queued bytes not yet read.
    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Take everything written so far, leaving the capture empty.
    pub fn take_written(&mut self) -> Bytes {
        self.tx.split().freeze()
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = buf.len().min(self.rx.len());
        if let Some(max) = self.max_read {
            n = n.min(max);
        }
        buf[..n].copy_from_slice(&self.rx[..n]);
        self.rx.advance(n);
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tx.extend_from_slice(bytes);
        Ok(())
    }
}

// ============================================================================
// Stream Transport
// ============================================================================

/// Size of a single non-blocking pull from the underlying stream.
const STREAM_READ_CHUNK: usize = 256;

/// How long `write` waits for a full send buffer to drain by default.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between write attempts while the stream reports `WouldBlock`.
const WRITE_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Adapts a std byte stream to [`Transport`].
///
/// The stream should be in non-blocking mode (e.g. a `TcpStream` after
/// `set_nonblocking(true)`); `available()` drains whatever is ready into an
/// internal buffer and never waits. End of stream is reported as
/// [`io::ErrorKind::UnexpectedEof`].
///
/// Writes wait for a full send buffer to drain, up to the write timeout, and
/// then fail with [`io::ErrorKind::TimedOut`].
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    rx: BytesMut,
    closed: bool,
    write_timeout: Duration,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a stream.
    pub fn new(stream: S) -> Self {
        StreamTransport {
            stream,
            rx: BytesMut::with_capacity(STREAM_READ_CHUNK),
            closed: false,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Set how long a write may wait for the peer to drain the stream.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Access the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream, discarding buffered bytes.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Pull ready bytes from the stream into the receive buffer.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; STREAM_READ_CHUNK];
        while !self.closed {
            match self.stream.read(&mut chunk) {
                Ok(0) => self.closed = true,
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn available(&mut self) -> io::Result<usize> {
        self.fill()?;
        if self.closed && self.rx.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the stream",
            ));
        }
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        let n = buf.len().min(self.rx.len());
        buf[..n].copy_from_slice(&self.rx[..n]);
        self.rx.advance(n);
        Ok(n)
    }

    fn write(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + self.write_timeout;
        while !bytes.is_empty() {
            match self.stream.write(bytes) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "peer stopped reading",
                        ));
                    }
                    thread::sleep(WRITE_RETRY_INTERVAL);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
