//! MPD client module - talks the Music Player Daemon line protocol.
//!
//! Architecture:
//! - `transport.rs` - TCP / Unix socket line reader and writer
//! - `protocol.rs` - Greeting, terminal lines and response field keys
//! - `capabilities.rs` - Feature flags negotiated from version, commands and tag types
//! - `commands.rs` - Command line construction and argument quoting
//! - `parser/` - Field-by-field response parsers into domain objects
//! - `connection.rs` - Connection state machine with the idle/noidle handshake
//! - `types.rs` - Tracks, albums, artists, status and statistics

mod capabilities;
mod commands;
mod connection;
mod error;
mod parser;
mod protocol;
mod transport;
mod types;


pub use capabilities::Capabilities;
pub use commands::{MpdCommand, SearchType};
pub use connection::{
  CommandList, ConnectionEvent, ConnectionOptions, ConnectionState, MpdConnection, DEFAULT_PORT,
};
pub use error::{AckError, MpdError, TransportError};
pub use parser::ParseWarning;
pub use protocol::ProtocolVersion;
pub use types::{
  Album, Artist, CurrentStatus, Directory, FileEntry, Output, PlaybackState, Playlist, Statistics,
  Track,
};
