//! MPD line protocol vocabulary.
//!
//! Reference: https://mpd.readthedocs.io/en/latest/protocol.html

/// Greeting sent by the server right after the TCP handshake.
pub const GREETING_PREFIX: &str = "OK MPD ";

/// Successful end of a response.
pub const RESPONSE_OK: &str = "OK";
/// Failed end of a response, followed by the error description.
pub const RESPONSE_ACK: &str = "ACK";

/// First line of an idle response when another client changed server state.
pub const IDLE_CHANGED: &str = "changed: ";

/// ACK text of a server rejecting `group` clauses it claims to support.
pub const PARSE_ARGS_LIST_ERROR: &str = "not able to parse args";

// Track, directory and playlist listings
pub const FILE: &str = "file: ";
pub const DIRECTORY: &str = "directory: ";
pub const PLAYLIST: &str = "playlist: ";
pub const LAST_MODIFIED: &str = "Last-Modified: ";
pub const TITLE: &str = "Title: ";
pub const ARTIST: &str = "Artist: ";
pub const ALBUM_ARTIST: &str = "AlbumArtist: ";
pub const ALBUM: &str = "Album: ";
pub const DATE: &str = "Date: ";
pub const TIME: &str = "Time: ";
pub const TRACK_DURATION: &str = "duration: ";
pub const TRACK_NUMBER: &str = "Track: ";
pub const DISC_NUMBER: &str = "Disc: ";
pub const SONG_POS: &str = "Pos: ";
pub const SONG_ID: &str = "Id: ";
pub const ALBUM_MBID: &str = "MUSICBRAINZ_ALBUMID: ";
pub const ARTIST_MBID: &str = "MUSICBRAINZ_ARTISTID: ";
pub const TRACK_MBID: &str = "MUSICBRAINZ_TRACKID: ";
pub const ALBUM_ARTIST_MBID: &str = "MUSICBRAINZ_ALBUMARTISTID: ";

// status
pub const VOLUME: &str = "volume: ";
pub const REPEAT: &str = "repeat: ";
pub const RANDOM: &str = "random: ";
pub const SINGLE: &str = "single: ";
pub const CONSUME: &str = "consume: ";
pub const PLAYLIST_VERSION: &str = "playlist: ";
pub const PLAYLIST_LENGTH: &str = "playlistlength: ";
pub const SONG_INDEX: &str = "song: ";
pub const NEXT_SONG_INDEX: &str = "nextsong: ";
pub const TIME_LEGACY: &str = "time: ";
pub const ELAPSED: &str = "elapsed: ";
pub const DURATION: &str = "duration: ";
pub const BITRATE: &str = "bitrate: ";
pub const AUDIO: &str = "audio: ";
pub const UPDATING_DB: &str = "updating_db: ";
pub const STATE: &str = "state: ";

pub const STATE_PLAY: &str = "play";
pub const STATE_PAUSE: &str = "pause";
pub const STATE_STOP: &str = "stop";

// outputs
pub const OUTPUT_ID: &str = "outputid: ";
pub const OUTPUT_NAME: &str = "outputname: ";
pub const OUTPUT_ENABLED: &str = "outputenabled: ";

// stats
pub const STATS_UPTIME: &str = "uptime: ";
pub const STATS_PLAYTIME: &str = "playtime: ";
pub const STATS_ARTISTS: &str = "artists: ";
pub const STATS_ALBUMS: &str = "albums: ";
pub const STATS_SONGS: &str = "songs: ";
pub const STATS_DB_PLAYTIME: &str = "db_playtime: ";
pub const STATS_DB_UPDATE: &str = "db_update: ";

pub const COMMAND: &str = "command: ";
pub const TAGTYPE: &str = "tagtype: ";
pub const STICKER: &str = "sticker: ";

/// Classification of a single response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
  /// `OK` (including the `OK MPD x.y.z` greeting).
  Ok,
  /// `ACK ...`, carrying the full line.
  Ack(&'a str),
  /// Any data line.
  Data(&'a str),
}

impl<'a> Line<'a> {
  pub fn classify(line: &'a str) -> Self {
    if line.starts_with(RESPONSE_OK) {
      Line::Ok
    } else if line.starts_with(RESPONSE_ACK) {
      Line::Ack(line)
    } else {
      Line::Data(line)
    }
  }
}

/// Server protocol version announced in the greeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl ProtocolVersion {
  /// Parse `major.minor.patch`. Anything else yields `None`.
  pub fn parse(version: &str) -> Option<Self> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
      return None;
    }
    Some(Self {
      major,
      minor,
      patch,
    })
  }

  /// Extract the version from a greeting line (`OK MPD 0.23.5`).
  pub fn from_greeting(line: &str) -> Option<Self> {
    line.strip_prefix(GREETING_PREFIX).and_then(Self::parse)
  }
}

impl std::fmt::Display for ProtocolVersion {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}
