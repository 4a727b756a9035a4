//! Track, directory and playlist listings.

use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::{Directory, FileEntry, Playlist, Track};

/// Post-parse filter for track entries. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
  /// Matched against both artist and album artist.
  pub artist: String,
  pub album_mbid: String,
}

impl TrackFilter {
  pub fn new(artist: impl Into<String>, album_mbid: impl Into<String>) -> Self {
    Self {
      artist: artist.into(),
      album_mbid: album_mbid.into(),
    }
  }

  pub fn accepts(&self, entry: &FileEntry) -> bool {
    let FileEntry::Track(track) = entry else {
      return true;
    };
    let artist_ok = self.artist.is_empty()
      || self.artist == track.artist
      || self.artist == track.album_artist;
    let mbid_ok = self.album_mbid.is_empty() || self.album_mbid == track.album_mbid;
    artist_ok && mbid_ok
  }
}

/// Builds [`FileEntry`] records. `file:`, `directory:` and `playlist:`
/// start a new record; metadata keys only apply to tracks.
#[derive(Debug, Default)]
pub struct TrackParser {
  filter: TrackFilter,
  current: Option<FileEntry>,
  entries: Vec<FileEntry>,
}

impl TrackParser {
  pub fn with_filter(filter: TrackFilter) -> Self {
    Self {
      filter,
      ..Self::default()
    }
  }

  fn start(&mut self, entry: FileEntry) {
    self.flush();
    self.current = Some(entry);
  }

  fn flush(&mut self) {
    if let Some(entry) = self.current.take() {
      if self.filter.accepts(&entry) {
        self.entries.push(entry);
      }
    }
  }
}

/// Parse `N` or `N/M`. Either half may be rejected on its own.
fn number_pair(
  key: &str,
  value: &str,
  warnings: &mut Warnings,
) -> (Option<u32>, Option<u32>) {
  match value.split_once('/') {
    Some((number, count)) => (
      warnings.number(key, number),
      warnings.number(key, count),
    ),
    None => (warnings.number(key, value), None),
  }
}

impl ResponseParser for TrackParser {
  type Output = Vec<FileEntry>;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    match key {
      protocol::FILE => return self.start(FileEntry::Track(Track::new(value))),
      protocol::DIRECTORY => {
        return self.start(FileEntry::Directory(Directory {
          path: value.to_string(),
          ..Default::default()
        }))
      }
      protocol::PLAYLIST => {
        return self.start(FileEntry::Playlist(Playlist {
          path: value.to_string(),
          ..Default::default()
        }))
      }
      protocol::LAST_MODIFIED => {
        if let Some(entry) = self.current.as_mut() {
          entry.set_last_modified(value.to_string());
        }
        return;
      }
      _ => {}
    }

    let Some(FileEntry::Track(track)) = self.current.as_mut() else {
      return;
    };

    match key {
      protocol::TITLE => track.title = value.to_string(),
      protocol::ARTIST => track.artist = value.to_string(),
      protocol::ALBUM_ARTIST => track.album_artist = value.to_string(),
      protocol::ALBUM => track.album = value.to_string(),
      protocol::DATE => track.date = value.to_string(),
      protocol::ALBUM_MBID => track.album_mbid = value.to_string(),
      protocol::ARTIST_MBID => track.artist_mbid = value.to_string(),
      protocol::ALBUM_ARTIST_MBID => track.album_artist_mbid = value.to_string(),
      protocol::TRACK_MBID => track.track_mbid = value.to_string(),
      protocol::TIME => {
        if let Some(length) = warnings.number(key, value) {
          track.length = length;
        }
      }
      protocol::TRACK_DURATION => {
        if let Some(length) = warnings.seconds(key, value) {
          track.length = length;
        }
      }
      protocol::SONG_POS => track.position = warnings.number(key, value),
      protocol::SONG_ID => track.song_id = warnings.number(key, value),
      protocol::TRACK_NUMBER => {
        let (number, count) = number_pair(key, value, warnings);
        if let Some(number) = number {
          track.track_number = number;
        }
        if let Some(count) = count {
          track.track_count = count;
        }
      }
      protocol::DISC_NUMBER => {
        let (number, count) = number_pair(key, value, warnings);
        if let Some(number) = number {
          track.disc_number = number;
        }
        if let Some(count) = count {
          track.disc_count = count;
        }
      }
      _ => {}
    }
  }

  fn finish(mut self, _warnings: &mut Warnings) -> Self::Output {
    self.flush();
    log::debug!("Parsed {} file entries", self.entries.len());
    self.entries
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_track_and_disc_counts() {
    let (entries, warnings) = feed(
      TrackParser::default(),
      &[
        "file: a.mp3",
        "Title: Song A",
        "Artist: X",
        "Track: 3/10",
        "Disc: 1/2",
        "OK",
      ],
    );
    assert!(warnings.is_empty());
    assert_eq!(entries.len(), 1);
    let track = entries[0].as_track().unwrap();
    assert_eq!(track.title, "Song A");
    assert_eq!(track.artist, "X");
    assert_eq!(track.track_number, 3);
    assert_eq!(track.track_count, 10);
    assert_eq!(track.disc_number, 1);
    assert_eq!(track.disc_count, 2);
  }

  #[test]
  fn test_mixed_listing_and_metadata_scope() {
    let (entries, _) = feed(
      TrackParser::default(),
      &[
        "directory: music/rock",
        "Title: ignored",
        "Last-Modified: 2021-01-01T10:00:00Z",
        "file: music/a.flac",
        "Time: 200",
        "duration: 201.4",
        "Pos: 4",
        "Id: 17",
        "playlist: mix.m3u",
        "OK",
      ],
    );
    assert_eq!(entries.len(), 3);
    assert!(matches!(&entries[0], FileEntry::Directory(d) if d.path == "music/rock"));
    assert_eq!(entries[0].last_modified(), "2021-01-01T10:00:00Z");
    let track = entries[1].as_track().unwrap();
    assert_eq!(track.length, 201);
    assert_eq!(track.position, Some(4));
    assert_eq!(track.song_id, Some(17));
    assert!(matches!(&entries[2], FileEntry::Playlist(p) if p.path == "mix.m3u"));
  }

  #[test]
  fn test_malformed_numbers_are_skipped() {
    let (entries, warnings) = feed(
      TrackParser::default(),
      &["file: a.mp3", "Track: x/12", "Disc: 2", "Time: soon", "OK"],
    );
    let track = entries[0].as_track().unwrap();
    assert_eq!(track.track_number, 0);
    assert_eq!(track.track_count, 12);
    assert_eq!(track.disc_number, 2);
    assert_eq!(track.length, 0);
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].key, "Track");
    assert_eq!(warnings[1].key, "Time");
  }

  #[test]
  fn test_filter_by_artist_and_album_mbid() {
    let lines = [
      "file: 1.mp3",
      "Artist: A",
      "MUSICBRAINZ_ALBUMID: m1",
      "file: 2.mp3",
      "Artist: B",
      "AlbumArtist: A",
      "MUSICBRAINZ_ALBUMID: m2",
      "file: 3.mp3",
      "Artist: C",
      "MUSICBRAINZ_ALBUMID: m1",
      "directory: d",
      "OK",
    ];

    let (entries, _) = feed(TrackParser::with_filter(TrackFilter::new("A", "")), &lines);
    let paths: Vec<_> = entries.iter().map(FileEntry::path).collect();
    assert_eq!(paths, ["1.mp3", "2.mp3", "d"]);

    let (entries, _) = feed(TrackParser::with_filter(TrackFilter::new("A", "m1")), &lines);
    let paths: Vec<_> = entries.iter().map(FileEntry::path).collect();
    assert_eq!(paths, ["1.mp3", "d"]);
  }
}
