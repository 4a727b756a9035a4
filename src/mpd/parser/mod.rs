//! Response parsers.
//!
//! A parser sees one `Key: value` pair at a time and accumulates typed
//! records. [`read_response`] drives a parser over the transport until the
//! terminating `OK` or `ACK` line, or until the stream ends. Malformed values
//! never abort a response; they are recorded as [`ParseWarning`]s and the
//! field keeps its default.

mod albums;
mod artists;
mod lists;
mod outputs;
mod stats;
mod status;
mod tracks;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use albums::AlbumParser;
pub use artists::ArtistParser;
pub use lists::{LinesParser, StickerParser, ValueListParser};
pub use outputs::OutputParser;
pub use stats::StatsParser;
pub use status::StatusParser;
pub use tracks::{TrackFilter, TrackParser};

use super::error::{AckError, MpdError, TransportError};
use super::protocol::Line;
use super::transport::LineReader;

/// A field the parser could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
  pub key: String,
  pub value: String,
  pub reason: String,
}

/// Collected parse warnings of one response.
#[derive(Debug, Default)]
pub struct Warnings {
  items: Vec<ParseWarning>,
}

impl Warnings {
  pub fn record(&mut self, key: &str, value: &str, reason: impl fmt::Display) {
    let reason = reason.to_string();
    log::warn!("Skipping field {}{:?}: {}", key, value, reason);
    self.items.push(ParseWarning {
      key: key.trim_end_matches([':', ' ']).to_string(),
      value: value.to_string(),
      reason,
    });
  }

  /// Parse a numeric field, recording a warning on failure.
  pub fn number<T>(&mut self, key: &str, value: &str) -> Option<T>
  where
    T: FromStr,
    T::Err: fmt::Display,
  {
    match value.trim().parse() {
      Ok(v) => Some(v),
      Err(e) => {
        self.record(key, value, e);
        None
      }
    }
  }

  /// Parse a float and round it to whole seconds.
  pub fn seconds(&mut self, key: &str, value: &str) -> Option<u32> {
    self
      .number::<f64>(key, value)
      .map(|secs| secs.round().max(0.0) as u32)
  }

  pub fn into_vec(self) -> Vec<ParseWarning> {
    self.items
  }
}

/// Stateful consumer of response fields.
pub trait ResponseParser {
  type Output;

  /// Handle one `Key: value` pair. `key` includes the `": "` separator so it
  /// can be matched against the constants in `protocol`.
  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings);

  /// Flush in-progress records and produce the result.
  fn finish(self, warnings: &mut Warnings) -> Self::Output;
}

/// Parser for responses whose data lines carry nothing of interest.
#[derive(Debug, Default)]
pub struct Discard;

impl ResponseParser for Discard {
  type Output = ();

  fn field(&mut self, _key: &str, _value: &str, _warnings: &mut Warnings) {}

  fn finish(self, _warnings: &mut Warnings) {}
}

/// How a response ended.
#[derive(Debug)]
pub enum ReplyStatus {
  Ok,
  Ack(AckError),
  /// Stream ended before a terminal line.
  Closed,
  /// Transport failed before a terminal line.
  Failed(TransportError),
}

impl ReplyStatus {
  pub fn is_connection_lost(&self) -> bool {
    matches!(self, ReplyStatus::Closed | ReplyStatus::Failed(_))
  }

  /// `Ok` for a confirmed response. An ACK about unparsable arguments is a
  /// [`MpdError::CapabilityMismatch`].
  pub fn into_result(self) -> Result<(), MpdError> {
    match self {
      ReplyStatus::Ok => Ok(()),
      ReplyStatus::Ack(ack) if ack.is_parse_args_error() => Err(MpdError::CapabilityMismatch(ack)),
      ReplyStatus::Ack(ack) => Err(MpdError::Ack(ack)),
      ReplyStatus::Closed => Err(MpdError::Transport(TransportError::Closed)),
      ReplyStatus::Failed(e) => Err(MpdError::Transport(e)),
    }
  }
}

/// Parsed response plus the way it ended.
#[derive(Debug)]
pub struct Reply<T> {
  pub value: T,
  pub status: ReplyStatus,
  pub warnings: Vec<ParseWarning>,
}

impl<T> Reply<T> {
  pub fn is_ok(&self) -> bool {
    matches!(self.status, ReplyStatus::Ok)
  }

  /// Drop partial data unless the server confirmed the response.
  pub fn into_result(self) -> Result<T, MpdError> {
    self.status.into_result()?;
    Ok(self.value)
  }
}

/// Split `Key: value`, keeping the separator on the key.
pub fn split_field(line: &str) -> Option<(&str, &str)> {
  let idx = line.find(": ")?;
  Some(line.split_at(idx + 2))
}

/// Feed response lines from `reader` to `parser` until the response ends.
///
/// `timeout` bounds the wait for each line. A closed stream or transport
/// error still yields whatever the parser accumulated.
pub async fn read_response<P>(
  reader: &mut LineReader,
  mut parser: P,
  timeout: Option<Duration>,
) -> Reply<P::Output>
where
  P: ResponseParser,
{
  let mut warnings = Warnings::default();

  let status = loop {
    let next = match timeout {
      Some(timeout) => reader.read_line_timeout(timeout).await,
      None => reader.read_line().await,
    };

    let line = match next {
      Ok(Some(line)) => line,
      Ok(None) => break ReplyStatus::Closed,
      Err(e) => break ReplyStatus::Failed(e),
    };

    match Line::classify(&line) {
      Line::Ok => break ReplyStatus::Ok,
      Line::Ack(raw) => {
        let ack = AckError::parse(raw);
        log::warn!("MPD refused command: {}", ack);
        break ReplyStatus::Ack(ack);
      }
      Line::Data(data) => match split_field(data) {
        Some((key, value)) => parser.field(key, value, &mut warnings),
        None => log::debug!("Ignoring line without field separator: {}", data),
      },
    }
  };

  let value = parser.finish(&mut warnings);
  Reply {
    value,
    status,
    warnings: warnings.into_vec(),
  }
}

/// Run `parser` over in-memory lines up to the first terminal line.
#[cfg(test)]
pub(crate) fn feed<P>(mut parser: P, lines: &[&str]) -> (P::Output, Vec<ParseWarning>)
where
  P: ResponseParser,
{
  let mut warnings = Warnings::default();
  for line in lines {
    match Line::classify(line) {
      Line::Data(data) => {
        if let Some((key, value)) = split_field(data) {
          parser.field(key, value, &mut warnings);
        }
      }
      _ => break,
    }
  }
  let value = parser.finish(&mut warnings);
  (value, warnings.into_vec())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_test::io::Builder;

  #[test]
  fn test_split_field() {
    assert_eq!(split_field("Title: A: B"), Some(("Title: ", "A: B")));
    assert_eq!(split_field("Title: "), Some(("Title: ", "")));
    assert_eq!(split_field("list_OK"), None);
  }

  #[test]
  fn test_warning_keeps_key_without_separator() {
    let mut warnings = Warnings::default();
    assert_eq!(warnings.number::<u32>("Track: ", "x"), None);
    assert_eq!(warnings.seconds("elapsed: ", "12.6"), Some(13));
    let items = warnings.into_vec();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "Track");
    assert_eq!(items[0].value, "x");
  }

  #[tokio::test]
  async fn test_read_response_reports_ack() {
    let mock = Builder::new()
      .read(b"ACK [50@0] {lsinfo} No such directory\n")
      .build();
    let mut reader = LineReader::new(mock);

    let reply = read_response(&mut reader, Discard, None).await;
    match reply.into_result() {
      Err(MpdError::Ack(ack)) => {
        assert_eq!(ack.command, "lsinfo");
        assert_eq!(ack.code, Some(50));
      }
      other => panic!("unexpected result {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_read_response_until_ok() {
    let mock = Builder::new()
      .read(b"command: add\ncommand: idle\nOK\n")
      .build();
    let mut reader = LineReader::new(mock);

    let reply = read_response(&mut reader, ValueListParser::commands(), None).await;
    assert!(reply.is_ok());
    assert_eq!(reply.value, ["add", "idle"]);
  }

  #[tokio::test]
  async fn test_close_mid_response_keeps_complete_records() {
    let mock = Builder::new()
      .read(b"file: a.mp3\nTitle: A\nfile: b.mp3\nTitle: B\nfile: c.mp3\nTi")
      .build();
    let mut reader = LineReader::new(mock);

    let reply = read_response(&mut reader, TrackParser::default(), None).await;
    assert!(matches!(reply.status, ReplyStatus::Closed));
    assert!(reply.status.is_connection_lost());
    let paths: Vec<_> = reply.value.iter().map(|e| e.path()).collect();
    assert_eq!(paths, ["a.mp3", "b.mp3", "c.mp3"]);
  }
}
