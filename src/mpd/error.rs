//! MPD error types.

use std::fmt;

use thiserror::Error;

use super::protocol::{PARSE_ARGS_LIST_ERROR, RESPONSE_ACK};

/// Socket-level failures raised by the line transport.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("Connection failed: {0}")]
  ConnectFailed(String),

  #[error("Timed out waiting for server")]
  Timeout,

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Connection closed")]
  Closed,
}

/// Errors surfaced to callers of mutating operations.
#[derive(Debug, Error)]
pub enum MpdError {
  #[error("Not connected")]
  NotReady,

  #[error("Transport error: {0}")]
  Transport(#[from] TransportError),

  #[error("Server error: {0}")]
  Ack(AckError),

  #[error("Server rejected a supported command variant: {0}")]
  CapabilityMismatch(AckError),

  #[error("Unexpected greeting: {0}")]
  InvalidGreeting(String),

  #[error("No song selected")]
  NoCurrentSong,
}

impl MpdError {
  /// ACK details if the server refused the command.
  pub fn ack(&self) -> Option<&AckError> {
    match self {
      MpdError::Ack(ack) | MpdError::CapabilityMismatch(ack) => Some(ack),
      _ => None,
    }
  }
}

/// Parsed `ACK [error@command_listNum] {current_command} message_text` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckError {
  /// Numeric error code (`ACK_ERROR_*` on the server side).
  pub code: Option<u32>,
  /// Offset of the failing command inside a command list.
  pub list_index: Option<u32>,
  /// Name of the command that failed, empty if unknown.
  pub command: String,
  pub message: String,
  /// The line as received.
  pub raw: String,
}

impl AckError {
  /// Parse an ACK line. Parts that do not follow the documented layout are
  /// left empty; the raw line is always kept.
  pub fn parse(line: &str) -> Self {
    let mut ack = AckError {
      code: None,
      list_index: None,
      command: String::new(),
      message: String::new(),
      raw: line.to_string(),
    };

    let mut rest = line.strip_prefix(RESPONSE_ACK).unwrap_or(line).trim_start();

    if let Some(body) = rest.strip_prefix('[') {
      if let Some((location, tail)) = body.split_once(']') {
        if let Some((code, index)) = location.split_once('@') {
          ack.code = code.trim().parse().ok();
          ack.list_index = index.trim().parse().ok();
        }
        rest = tail.trim_start();
      }
    }

    if let Some(body) = rest.strip_prefix('{') {
      if let Some((command, tail)) = body.split_once('}') {
        ack.command = command.to_string();
        rest = tail.trim_start();
      }
    }

    ack.message = rest.to_string();
    ack
  }

  /// True when the server could not parse arguments it should accept,
  /// the signature of a server misreporting its `list` grouping support.
  pub fn is_parse_args_error(&self) -> bool {
    self.raw.contains(PARSE_ARGS_LIST_ERROR)
  }
}

impl fmt::Display for AckError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.message.is_empty() {
      f.write_str(&self.raw)
    } else if self.command.is_empty() {
      f.write_str(&self.message)
    } else {
      write!(f, "{} ({})", self.message, self.command)
    }
  }
}
