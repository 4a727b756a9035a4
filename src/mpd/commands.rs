//! Command builder.
//!
//! Every function here is pure: it maps an operation and its parameters to
//! the exact line sent to the server. Capability-dependent variants take the
//! current [`Capabilities`] snapshot.

use std::fmt;

use super::capabilities::Capabilities;

pub const IDLE: &str = "idle";
pub const NOIDLE: &str = "noidle";
pub const SEARCH_ADD: &str = "searchadd";
pub const COMMAND_LIST_BEGIN: &str = "command_list_begin";
pub const COMMAND_LIST_END: &str = "command_list_end";

/// Sticker holding a track's rating.
pub const RATING_STICKER: &str = "rating";

/// Field a search is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
  Track,
  Album,
  Artist,
  File,
  Any,
}

impl SearchType {
  /// Protocol tag name for this search type.
  pub fn tag(self) -> &'static str {
    match self {
      SearchType::Track => "title",
      SearchType::Album => "album",
      SearchType::Artist => "artist",
      SearchType::File => "file",
      SearchType::Any => "any",
    }
  }
}

impl std::str::FromStr for SearchType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "track" | "title" => Ok(SearchType::Track),
      "album" => Ok(SearchType::Album),
      "artist" => Ok(SearchType::Artist),
      "file" => Ok(SearchType::File),
      "any" => Ok(SearchType::Any),
      other => Err(format!("unknown search type: {}", other)),
    }
  }
}

/// Escape embedded double quotes as `\\"`.
///
/// The doubled backslash is what servers in the field accept; keep it.
pub fn escape(value: &str) -> String {
  value.replace('"', r#"\\""#)
}

/// Wrap an argument in double quotes after escaping it.
pub fn quote(value: &str) -> String {
  format!("\"{}\"", escape(value))
}

fn flag(value: bool) -> &'static str {
  if value {
    "1"
  } else {
    "0"
  }
}

/// `group` clauses for album listings, in fixed order.
pub fn album_group_clause(caps: &Capabilities) -> String {
  let mut groups = String::new();
  if caps.has_tag_album_artist() {
    groups.push_str(" group albumartist");
  }
  if caps.has_musicbrainz_tags() {
    groups.push_str(" group musicbrainz_albumid");
  }
  if caps.has_tag_date() {
    groups.push_str(" group date");
  }
  groups
}

/// One line of the MPD protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpdCommand {
  line: String,
}

impl MpdCommand {
  pub fn new(line: impl Into<String>) -> Self {
    Self { line: line.into() }
  }

  pub fn as_str(&self) -> &str {
    &self.line
  }

  /// Command name, the first word of the line.
  pub fn name(&self) -> &str {
    self.line.split_whitespace().next().unwrap_or("")
  }

  // Session

  pub fn password(password: &str) -> Self {
    Self::new(format!("password {}", quote(password)))
  }

  pub fn close() -> Self {
    Self::new("close")
  }

  pub fn idle() -> Self {
    Self::new(IDLE)
  }

  pub fn noidle() -> Self {
    Self::new(NOIDLE)
  }

  pub fn command_list_begin() -> Self {
    Self::new(COMMAND_LIST_BEGIN)
  }

  pub fn command_list_end() -> Self {
    Self::new(COMMAND_LIST_END)
  }

  pub fn commands() -> Self {
    Self::new("commands")
  }

  pub fn tagtypes() -> Self {
    Self::new("tagtypes")
  }

  // Database

  /// All albums, grouped as far as the server allows.
  pub fn list_albums(caps: &Capabilities) -> Self {
    if caps.has_list_group() {
      Self::new(format!("list album{}", album_group_clause(caps)))
    } else {
      Self::new("list album")
    }
  }

  /// Albums of one artist. Without grouping support the legacy
  /// `list album <artist>` form is used.
  pub fn list_artist_albums(artist: &str, caps: &Capabilities) -> Self {
    if caps.has_list_group() {
      Self::new(format!(
        "list album artist {}{}",
        quote(artist),
        album_group_clause(caps)
      ))
    } else {
      Self::new(format!("list album {}", quote(artist)))
    }
  }

  pub fn list_album_artist_albums(artist: &str, caps: &Capabilities) -> Self {
    Self::new(format!(
      "list album AlbumArtist {}{}",
      quote(artist),
      album_group_clause(caps)
    ))
  }

  /// Albums below a directory. Servers without grouping lack `base` as
  /// well, so they get the plain album listing.
  pub fn list_albums_in_path(path: &str, caps: &Capabilities) -> Self {
    if caps.has_list_group() {
      Self::new(format!(
        "list album base {}{}",
        quote(path),
        album_group_clause(caps)
      ))
    } else {
      Self::new("list album")
    }
  }

  pub fn list_artists(group_mbid: bool) -> Self {
    if group_mbid {
      Self::new("list artist group MUSICBRAINZ_ARTISTID")
    } else {
      Self::new("list artist")
    }
  }

  pub fn list_album_artists(group_mbid: bool) -> Self {
    if group_mbid {
      Self::new("list albumartist group MUSICBRAINZ_ARTISTID")
    } else {
      Self::new("list albumartist")
    }
  }

  pub fn find_album(album: &str) -> Self {
    Self::new(format!("find album {}", quote(album)))
  }

  pub fn listallinfo() -> Self {
    Self::new("listallinfo")
  }

  pub fn lsinfo(path: &str) -> Self {
    Self::new(format!("lsinfo {}", quote(path)))
  }

  pub fn search(term: &str, kind: SearchType) -> Self {
    Self::new(format!("search {} {}", kind.tag(), quote(term)))
  }

  pub fn search_add(term: &str, kind: SearchType) -> Self {
    Self::new(format!("{} {} {}", SEARCH_ADD, kind.tag(), quote(term)))
  }

  /// Empty path updates the whole database.
  pub fn update(path: Option<&str>) -> Self {
    match path {
      Some(path) if !path.is_empty() => Self::new(format!("update {}", quote(path))),
      _ => Self::new("update"),
    }
  }

  // Playback

  pub fn pause(pause: bool) -> Self {
    Self::new(format!("pause {}", flag(pause)))
  }

  pub fn next() -> Self {
    Self::new("next")
  }

  pub fn previous() -> Self {
    Self::new("previous")
  }

  pub fn stop() -> Self {
    Self::new("stop")
  }

  pub fn play(index: u32) -> Self {
    Self::new(format!("play {}", index))
  }

  pub fn seek(index: u32, seconds: u32) -> Self {
    Self::new(format!("seek {} {}", index, seconds))
  }

  /// Volume is clamped to `0..=100` before it reaches the wire.
  pub fn set_volume(volume: i32) -> Self {
    Self::new(format!("setvol {}", volume.clamp(0, 100)))
  }

  pub fn random(on: bool) -> Self {
    Self::new(format!("random {}", flag(on)))
  }

  pub fn repeat(on: bool) -> Self {
    Self::new(format!("repeat {}", flag(on)))
  }

  pub fn single(on: bool) -> Self {
    Self::new(format!("single {}", flag(on)))
  }

  pub fn consume(on: bool) -> Self {
    Self::new(format!("consume {}", flag(on)))
  }

  pub fn status() -> Self {
    Self::new("status")
  }

  pub fn stats() -> Self {
    Self::new("stats")
  }

  pub fn current_song() -> Self {
    Self::new("currentsong")
  }

  pub fn outputs() -> Self {
    Self::new("outputs")
  }

  pub fn toggle_output(id: u32) -> Self {
    Self::new(format!("toggleoutput {}", id))
  }

  // Current playlist

  pub fn playlistinfo() -> Self {
    Self::new("playlistinfo")
  }

  /// Songs at positions `start..end`.
  pub fn playlistinfo_window(start: u32, end: u32) -> Self {
    Self::new(format!("playlistinfo {}:{}", start, end))
  }

  pub fn playlist_find_uri(uri: &str) -> Self {
    Self::new(format!("playlistfind file {}", quote(uri)))
  }

  pub fn add(uri: &str) -> Self {
    Self::new(format!("add {}", quote(uri)))
  }

  pub fn add_at(uri: &str, index: u32) -> Self {
    Self::new(format!("addid {} {}", quote(uri), index))
  }

  pub fn delete(index: u32) -> Self {
    Self::new(format!("delete {}", index))
  }

  /// Remove positions `start..end`.
  pub fn delete_range(start: u32, end: u32) -> Self {
    Self::new(format!("delete {}:{}", start, end))
  }

  /// Remove everything from `start` to the end of the queue.
  pub fn delete_from(start: u32) -> Self {
    Self::new(format!("delete {}:", start))
  }

  pub fn move_song(from: u32, to: u32) -> Self {
    Self::new(format!("move {} {}", from, to))
  }

  pub fn clear() -> Self {
    Self::new("clear")
  }

  pub fn shuffle() -> Self {
    Self::new("shuffle")
  }

  // Stored playlists

  pub fn listplaylists() -> Self {
    Self::new("listplaylists")
  }

  pub fn listplaylistinfo(name: &str) -> Self {
    Self::new(format!("listplaylistinfo {}", quote(name)))
  }

  pub fn save(name: &str) -> Self {
    Self::new(format!("save {}", quote(name)))
  }

  pub fn rm(name: &str) -> Self {
    Self::new(format!("rm {}", quote(name)))
  }

  pub fn load(name: &str) -> Self {
    Self::new(format!("load {}", quote(name)))
  }

  pub fn playlist_add(name: &str, uri: &str) -> Self {
    Self::new(format!("playlistadd {} {}", quote(name), quote(uri)))
  }

  pub fn playlist_delete(name: &str, position: u32) -> Self {
    Self::new(format!("playlistdelete {} {}", quote(name), position))
  }

  // Stickers

  pub fn sticker_get(uri: &str, name: &str) -> Self {
    Self::new(format!("sticker get song {} {}", quote(uri), quote(name)))
  }

  pub fn sticker_set(uri: &str, name: &str, value: &str) -> Self {
    Self::new(format!(
      "sticker set song {} {} {}",
      quote(uri),
      quote(name),
      quote(value)
    ))
  }

  /// Songs below `path` carrying sticker `name`, optionally with the given value.
  pub fn sticker_find(path: &str, name: &str, value: Option<&str>) -> Self {
    match value {
      Some(value) => Self::new(format!(
        "sticker find song {} {} = {}",
        quote(path),
        quote(name),
        quote(value)
      )),
      None => Self::new(format!("sticker find song {} {}", quote(path), quote(name))),
    }
  }
}

impl fmt::Display for MpdCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.line)
  }
}

impl From<&str> for MpdCommand {
  fn from(line: &str) -> Self {
    Self::new(line)
  }
}

impl From<String> for MpdCommand {
  fn from(line: String) -> Self {
    Self::new(line)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mpd::protocol::ProtocolVersion;

  fn caps(minor: u32, tags: &[&str]) -> Capabilities {
    let version = ProtocolVersion {
      major: 0,
      minor,
      patch: 0,
    };
    Capabilities::new(version, &["idle"], tags)
  }

  #[test]
  fn test_delete_ranges() {
    assert_eq!(MpdCommand::delete_range(2, 5).as_str(), "delete 2:5");
    assert_eq!(MpdCommand::delete_from(7).as_str(), "delete 7:");
  }

  #[test]
  fn test_volume_is_clamped() {
    assert_eq!(MpdCommand::set_volume(150).as_str(), "setvol 100");
    assert_eq!(MpdCommand::set_volume(-5).as_str(), "setvol 0");
    assert_eq!(MpdCommand::set_volume(42).as_str(), "setvol 42");
  }

  #[test]
  fn test_quote_escaping_is_exact() {
    assert_eq!(quote(r#"foo"bar"#), r#""foo\\"bar""#);
    assert_eq!(
      MpdCommand::find_album(r#"12" Mixes"#).as_str().as_bytes(),
      br#"find album "12\\" Mixes""#
    );
  }

  #[test]
  fn test_album_group_order() {
    let full = caps(21, &["MUSICBRAINZ_ALBUMID", "Date", "AlbumArtist"]);
    assert_eq!(
      MpdCommand::list_albums(&full).as_str(),
      "list album group albumartist group musicbrainz_albumid group date"
    );

    let partial = caps(21, &["Date"]);
    assert_eq!(
      MpdCommand::list_artist_albums("Björk", &partial).as_str(),
      "list album artist \"Björk\" group date"
    );
  }

  #[test]
  fn test_legacy_album_listing_without_group() {
    let old = caps(18, &["AlbumArtist", "Date"]);
    assert_eq!(MpdCommand::list_albums(&old).as_str(), "list album");
    assert_eq!(
      MpdCommand::list_artist_albums("Air", &old).as_str(),
      "list album \"Air\""
    );
    assert_eq!(MpdCommand::list_albums_in_path("x/y", &old).as_str(), "list album");
  }

  #[test]
  fn test_search_field_names() {
    let cases = [
      (SearchType::Track, "title"),
      (SearchType::Album, "album"),
      (SearchType::Artist, "artist"),
      (SearchType::File, "file"),
      (SearchType::Any, "any"),
    ];
    for (kind, tag) in cases {
      assert_eq!(
        MpdCommand::search("x", kind).as_str(),
        format!("search {} \"x\"", tag)
      );
      assert_eq!(
        MpdCommand::search_add("x", kind).as_str(),
        format!("searchadd {} \"x\"", tag)
      );
    }
    assert_eq!("Title".parse::<SearchType>(), Ok(SearchType::Track));
    assert!("genre".parse::<SearchType>().is_err());
  }

  #[test]
  fn test_misc_commands() {
    assert_eq!(MpdCommand::pause(true).as_str(), "pause 1");
    assert_eq!(MpdCommand::consume(false).as_str(), "consume 0");
    assert_eq!(MpdCommand::delete_range(3, 7).as_str(), "delete 3:7");
    assert_eq!(MpdCommand::playlistinfo_window(0, 50).as_str(), "playlistinfo 0:50");
    assert_eq!(MpdCommand::update(None).as_str(), "update");
    assert_eq!(MpdCommand::update(Some("")).as_str(), "update");
    assert_eq!(MpdCommand::update(Some("rock")).as_str(), "update \"rock\"");
    assert_eq!(
      MpdCommand::sticker_get("a.mp3", RATING_STICKER).as_str(),
      "sticker get song \"a.mp3\" \"rating\""
    );
    assert_eq!(
      MpdCommand::sticker_find("", "mood", Some("chill")).as_str(),
      "sticker find song \"\" \"mood\" = \"chill\""
    );
    assert_eq!(MpdCommand::add_at("a.mp3", 2).name(), "addid");
  }
}
