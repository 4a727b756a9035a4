//! Line transport to the MPD server.
//!
//! Handles TCP connections and, on Unix, local sockets addressed by an
//! absolute path. No retries happen here; reconnect policy belongs to the
//! connection state machine.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::error::TransportError;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half: yields complete protocol lines without their terminator.
pub struct LineReader {
  inner: BufReader<BoxedReader>,
  buf: Vec<u8>,
}

impl LineReader {
  pub fn new<R>(reader: R) -> Self
  where
    R: AsyncRead + Send + Unpin + 'static,
  {
    Self {
      inner: BufReader::new(Box::new(reader)),
      buf: Vec::with_capacity(256),
    }
  }

  /// Wait for the next full line. `Ok(None)` means the stream was closed;
  /// a trailing fragment without terminator counts as closed as well.
  pub async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
    self.buf.clear();
    let read = self.inner.read_until(b'\n', &mut self.buf).await?;
    if read == 0 || self.buf.last() != Some(&b'\n') {
      return Ok(None);
    }

    self.buf.pop();
    if self.buf.last() == Some(&b'\r') {
      self.buf.pop();
    }

    let line = String::from_utf8_lossy(&self.buf).into_owned();
    log::trace!("MPD read: {}", line);
    Ok(Some(line))
  }

  /// Like [`read_line`](Self::read_line), but gives up after `timeout`.
  pub async fn read_line_timeout(
    &mut self,
    timeout: Duration,
  ) -> Result<Option<String>, TransportError> {
    match tokio::time::timeout(timeout, self.read_line()).await {
      Ok(result) => result,
      Err(_) => Err(TransportError::Timeout),
    }
  }
}

/// Write half: one command per line, flushed immediately.
pub struct LineWriter {
  inner: BoxedWriter,
  closed: bool,
}

impl LineWriter {
  pub fn new<W>(writer: W) -> Self
  where
    W: AsyncWrite + Send + Unpin + 'static,
  {
    Self {
      inner: Box::new(writer),
      closed: false,
    }
  }

  /// Append the line terminator and flush.
  pub async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
    if self.closed {
      return Err(TransportError::Closed);
    }
    self.inner.write_all(line.as_bytes()).await?;
    self.inner.write_all(b"\n").await?;
    self.inner.flush().await?;
    log::debug!("MPD write: {}", redact(line));
    Ok(())
  }

  /// Shut the write side down. Safe to call more than once.
  pub async fn close(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    if let Err(e) = self.inner.shutdown().await {
      log::debug!("MPD transport shutdown error: {}", e);
    }
  }
}

/// Both halves of one server connection.
pub struct LineTransport {
  reader: LineReader,
  writer: LineWriter,
}

impl LineTransport {
  /// Open a connection. `host` may be a hostname, an IP address or, on Unix,
  /// the absolute path of a local socket.
  pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
    match tokio::time::timeout(timeout, Self::open(host, port)).await {
      Ok(result) => result,
      Err(_) => Err(TransportError::Timeout),
    }
  }

  #[cfg(unix)]
  async fn open(host: &str, port: u16) -> Result<Self, TransportError> {
    if host.starts_with('/') {
      let stream = tokio::net::UnixStream::connect(host)
        .await
        .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", host, e)))?;
      return Ok(Self::from_stream(stream));
    }
    Self::open_tcp(host, port).await
  }

  #[cfg(not(unix))]
  async fn open(host: &str, port: u16) -> Result<Self, TransportError> {
    Self::open_tcp(host, port).await
  }

  async fn open_tcp(host: &str, port: u16) -> Result<Self, TransportError> {
    let stream = tokio::net::TcpStream::connect((host, port))
      .await
      .map_err(|e| TransportError::ConnectFailed(format!("{}:{}: {}", host, port, e)))?;
    if let Err(e) = stream.set_nodelay(true) {
      log::debug!("Could not disable Nagle: {}", e);
    }
    Ok(Self::from_stream(stream))
  }

  /// Wrap an already connected byte stream.
  pub fn from_stream<S>(stream: S) -> Self
  where
    S: AsyncRead + AsyncWrite + Send + 'static,
  {
    let (reader, writer) = tokio::io::split(stream);
    Self {
      reader: LineReader::new(reader),
      writer: LineWriter::new(writer),
    }
  }

  pub fn into_split(self) -> (LineReader, LineWriter) {
    (self.reader, self.writer)
  }
}

/// Keep passwords out of the logs.
fn redact(line: &str) -> &str {
  if line.starts_with("password ") {
    "password ***"
  } else {
    line
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_test::io::Builder;

  #[tokio::test]
  async fn test_read_lines_strips_terminators() {
    let mock = Builder::new()
      .read(b"OK MPD 0.23.5\n")
      .read(b"volume: 50\r\nstate: pl")
      .read(b"ay\n")
      .build();
    let mut reader = LineReader::new(mock);

    assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("OK MPD 0.23.5"));
    assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("volume: 50"));
    assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("state: play"));
    assert_eq!(reader.read_line().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_fragment_before_close_is_end_of_stream() {
    let mock = Builder::new().read(b"file: a.mp3\nTitle: cut").build();
    let mut reader = LineReader::new(mock);

    assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("file: a.mp3"));
    assert_eq!(reader.read_line().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_write_appends_newline() {
    let mock = Builder::new().write(b"status").write(b"\n").build();
    let mut writer = LineWriter::new(mock);
    writer.write_line("status").await.unwrap();
  }

  #[tokio::test]
  async fn test_write_after_close_fails() {
    let mock = Builder::new().build();
    let mut writer = LineWriter::new(mock);
    writer.close().await;
    writer.close().await;
    assert!(matches!(
      writer.write_line("status").await,
      Err(TransportError::Closed)
    ));
  }

  #[tokio::test]
  async fn test_connect_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = LineTransport::connect("127.0.0.1", port, Duration::from_secs(2)).await;
    assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
  }

  #[test]
  fn test_password_is_redacted() {
    assert_eq!(redact("password hunter2"), "password ***");
    assert_eq!(redact("status"), "status");
  }
}
