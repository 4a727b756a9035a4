//! Typed values returned by the MPD client.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Song metadata as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
  pub path: String,
  pub last_modified: String,
  pub title: String,
  pub artist: String,
  pub album: String,
  pub album_artist: String,
  pub date: String,
  pub artist_mbid: String,
  pub track_mbid: String,
  pub album_mbid: String,
  pub album_artist_mbid: String,
  /// Length in whole seconds.
  pub length: u32,
  pub track_number: u32,
  pub track_count: u32,
  pub disc_number: u32,
  pub disc_count: u32,
  /// Position in the current playlist, only set for queue listings.
  pub position: Option<u32>,
  /// Song id in the current playlist, only set for queue listings.
  pub song_id: Option<u32>,
}

impl Track {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      ..Self::default()
    }
  }

  /// `mm:ss`, or `hh:mm:ss` once the track is an hour or longer.
  pub fn duration_string(&self) -> String {
    let hours = self.length / 3600;
    let minutes = self.length / 60 % 60;
    let seconds = self.length % 60;
    if hours != 0 {
      format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
      format!("{:02}:{:02}", minutes, seconds)
    }
  }

  /// Title, or the path for untagged files.
  pub fn section_title(&self) -> &str {
    if self.title.is_empty() {
      &self.path
    } else {
      &self.title
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
  pub path: String,
  pub last_modified: String,
}

/// Stored playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
  pub path: String,
  pub last_modified: String,
}

/// Entry of a directory, search or playlist listing.
///
/// Two entries are equal when they are the same kind and share a path. The
/// natural order lists directories first, then tracks, then playlists, each
/// group sorted case-insensitively by file name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FileEntry {
  Directory(Directory),
  Track(Track),
  Playlist(Playlist),
}

impl FileEntry {
  pub fn path(&self) -> &str {
    match self {
      FileEntry::Directory(d) => &d.path,
      FileEntry::Track(t) => &t.path,
      FileEntry::Playlist(p) => &p.path,
    }
  }

  pub fn last_modified(&self) -> &str {
    match self {
      FileEntry::Directory(d) => &d.last_modified,
      FileEntry::Track(t) => &t.last_modified,
      FileEntry::Playlist(p) => &p.last_modified,
    }
  }

  pub(crate) fn set_last_modified(&mut self, value: String) {
    match self {
      FileEntry::Directory(d) => d.last_modified = value,
      FileEntry::Track(t) => t.last_modified = value,
      FileEntry::Playlist(p) => p.last_modified = value,
    }
  }

  /// Label used when grouping entries into sections.
  pub fn section_title(&self) -> &str {
    match self {
      FileEntry::Track(t) => t.section_title(),
      _ => self.path(),
    }
  }

  pub fn as_track(&self) -> Option<&Track> {
    match self {
      FileEntry::Track(t) => Some(t),
      _ => None,
    }
  }

  pub fn into_track(self) -> Option<Track> {
    match self {
      FileEntry::Track(t) => Some(t),
      _ => None,
    }
  }

  fn rank(&self) -> u8 {
    match self {
      FileEntry::Directory(_) => 0,
      FileEntry::Track(_) => 1,
      FileEntry::Playlist(_) => 2,
    }
  }

  fn basename(&self) -> String {
    let path = self.path();
    path.rsplit('/').next().unwrap_or(path).to_lowercase()
  }

  /// Album order: tracks by album MBID, disc and track number; other
  /// entries keep their natural order.
  pub fn cmp_by_album_index(&self, other: &Self) -> Ordering {
    match (self, other) {
      (FileEntry::Track(a), FileEntry::Track(b)) => a
        .album_mbid
        .cmp(&b.album_mbid)
        .then(a.disc_number.cmp(&b.disc_number))
        .then(a.track_number.cmp(&b.track_number)),
      _ => self.cmp(other),
    }
  }
}

impl PartialEq for FileEntry {
  fn eq(&self, other: &Self) -> bool {
    self.rank() == other.rank() && self.path() == other.path()
  }
}

impl Eq for FileEntry {}

impl Hash for FileEntry {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.rank().hash(state);
    self.path().hash(state);
  }
}

impl Ord for FileEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .rank()
      .cmp(&other.rank())
      .then_with(|| self.basename().cmp(&other.basename()))
      .then_with(|| self.path().cmp(other.path()))
  }
}

impl PartialOrd for FileEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
  pub name: String,
  /// Album artist, empty when the server did not group by it.
  pub artist: String,
  pub mbid: String,
  pub date: Option<NaiveDate>,
}

impl Album {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }
}

impl Ord for Album {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .name
      .to_lowercase()
      .cmp(&other.name.to_lowercase())
      .then_with(|| self.name.cmp(&other.name))
      .then_with(|| self.artist.cmp(&other.artist))
      .then_with(|| self.mbid.cmp(&other.mbid))
      .then_with(|| self.date.cmp(&other.date))
  }
}

impl PartialOrd for Album {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Artist with every MusicBrainz id the server grouped under the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
  pub name: String,
  pub mbids: Vec<String>,
}

impl Artist {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      mbids: Vec::new(),
    }
  }
}

/// Case-insensitive by name; same names are ordered by how many ids they carry.
impl Ord for Artist {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .name
      .to_lowercase()
      .cmp(&other.name.to_lowercase())
      .then(self.mbids.len().cmp(&other.mbids.len()))
      .then_with(|| self.name.cmp(&other.name))
      .then_with(|| self.mbids.cmp(&other.mbids))
  }
}

impl PartialOrd for Artist {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
  Playing,
  Paused,
  #[default]
  Stopped,
}

/// Snapshot of the `status` response.
///
/// Volume and the playback mode flags only accept valid values; out of
/// range input leaves the previous value in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
  volume: u32,
  repeat: u8,
  random: u8,
  single: u8,
  consume: u8,
  pub playlist_version: u32,
  pub playlist_length: u32,
  pub current_song_index: Option<u32>,
  pub next_song_index: Option<u32>,
  pub sample_rate: u32,
  pub bit_depth: String,
  pub channel_count: u32,
  pub bitrate: u32,
  /// Whole seconds, rounded.
  pub elapsed_time: u32,
  /// Whole seconds, rounded.
  pub track_length: u32,
  /// Pending database update job, -1 when none.
  pub update_db_job: i32,
  pub playback_state: PlaybackState,
}

impl Default for CurrentStatus {
  fn default() -> Self {
    Self {
      volume: 0,
      repeat: 0,
      random: 0,
      single: 0,
      consume: 0,
      playlist_version: 0,
      playlist_length: 0,
      current_song_index: None,
      next_song_index: None,
      sample_rate: 0,
      bit_depth: String::new(),
      channel_count: 0,
      bitrate: 0,
      elapsed_time: 0,
      track_length: 0,
      update_db_job: -1,
      playback_state: PlaybackState::Stopped,
    }
  }
}

fn set_flag(field: &mut u8, value: i64) -> bool {
  match value {
    0 | 1 => {
      *field = value as u8;
      true
    }
    _ => false,
  }
}

impl CurrentStatus {
  pub fn volume(&self) -> u32 {
    self.volume
  }

  pub fn repeat(&self) -> u8 {
    self.repeat
  }

  pub fn random(&self) -> u8 {
    self.random
  }

  pub fn single(&self) -> u8 {
    self.single
  }

  pub fn consume(&self) -> u8 {
    self.consume
  }

  /// Returns false and keeps the old value unless `volume` is within 0..=100.
  pub fn set_volume(&mut self, volume: i64) -> bool {
    match u32::try_from(volume) {
      Ok(v) if v <= 100 => {
        self.volume = v;
        true
      }
      _ => false,
    }
  }

  pub fn set_repeat(&mut self, value: i64) -> bool {
    set_flag(&mut self.repeat, value)
  }

  pub fn set_random(&mut self, value: i64) -> bool {
    set_flag(&mut self.random, value)
  }

  pub fn set_single(&mut self, value: i64) -> bool {
    set_flag(&mut self.single, value)
  }

  pub fn set_consume(&mut self, value: i64) -> bool {
    set_flag(&mut self.consume, value)
  }
}

/// Server-wide counters from `stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
  pub artists_count: u32,
  pub albums_count: u32,
  pub songs_count: u32,
  /// Seconds.
  pub uptime: u64,
  /// Seconds of audio in the database.
  pub db_playtime: u64,
  /// Seconds spent playing.
  pub playtime: u64,
  /// Unix timestamp of the last database update.
  pub last_db_update: i64,
}

impl Statistics {
  pub fn last_db_update_time(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.last_db_update, 0)
  }
}

/// Audio output as listed by `outputs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
  pub id: u32,
  pub name: String,
  pub enabled: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dir(path: &str) -> FileEntry {
    FileEntry::Directory(Directory {
      path: path.to_string(),
      ..Default::default()
    })
  }

  fn playlist(path: &str) -> FileEntry {
    FileEntry::Playlist(Playlist {
      path: path.to_string(),
      ..Default::default()
    })
  }

  fn track(path: &str, disc: u32, number: u32) -> FileEntry {
    FileEntry::Track(Track {
      disc_number: disc,
      track_number: number,
      ..Track::new(path)
    })
  }

  #[test]
  fn test_file_entry_order() {
    let mut entries = vec![
      playlist("b.m3u"),
      track("music/Zebra.flac", 1, 1),
      dir("music/zz"),
      track("other/apple.flac", 1, 2),
      dir("music/AA"),
    ];
    entries.sort();
    let paths: Vec<_> = entries.iter().map(FileEntry::path).collect();
    assert_eq!(
      paths,
      ["music/AA", "music/zz", "other/apple.flac", "music/Zebra.flac", "b.m3u"]
    );
  }

  #[test]
  fn test_file_entry_equality_is_kind_and_path() {
    assert_eq!(track("a.mp3", 1, 1), track("a.mp3", 2, 9));
    assert_ne!(dir("a"), playlist("a"));
  }

  #[test]
  fn test_album_index_order() {
    let mut entries = vec![track("c", 2, 1), track("a", 1, 2), track("b", 1, 1)];
    entries.sort_by(FileEntry::cmp_by_album_index);
    let paths: Vec<_> = entries.iter().map(FileEntry::path).collect();
    assert_eq!(paths, ["b", "a", "c"]);
  }

  #[test]
  fn test_duration_string() {
    let mut t = Track::new("x");
    t.length = 245;
    assert_eq!(t.duration_string(), "04:05");
    t.length = 3 * 3600 + 7;
    assert_eq!(t.duration_string(), "03:00:07");
    assert_eq!(t.section_title(), "x");
  }

  #[test]
  fn test_artist_order_groups_by_mbid_count() {
    let plain = Artist::new("Queen");
    let tagged = Artist {
      name: "Queen".into(),
      mbids: vec!["0383dadf".into()],
    };
    let lower = Artist::new("abba");
    let mut artists = vec![tagged.clone(), plain.clone(), lower.clone()];
    artists.sort();
    assert_eq!(artists, [lower, plain.clone(), tagged.clone()]);
    assert_ne!(plain, tagged);
  }

  #[test]
  fn test_album_order_is_case_insensitive() {
    let mut albums = vec![Album::new("zulu"), Album::new("Alpha"), Album::new("beta")];
    albums.sort();
    let names: Vec<_> = albums.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "beta", "zulu"]);
  }

  #[test]
  fn test_status_setters_reject_invalid_values() {
    let mut status = CurrentStatus::default();
    assert_eq!(status.update_db_job, -1);
    assert_eq!(status.playback_state, PlaybackState::Stopped);

    assert!(status.set_volume(80));
    assert!(!status.set_volume(101));
    assert!(!status.set_volume(-1));
    assert_eq!(status.volume(), 80);

    assert!(status.set_repeat(1));
    assert!(!status.set_repeat(2));
    assert_eq!(status.repeat(), 1);
  }

  #[test]
  fn test_db_update_timestamp() {
    let stats = Statistics {
      last_db_update: 1_700_000_000,
      ..Default::default()
    };
    let time = stats.last_db_update_time().unwrap();
    assert_eq!(time.timestamp(), 1_700_000_000);
  }
}
