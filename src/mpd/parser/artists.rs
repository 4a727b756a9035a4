use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::Artist;

/// Builds [`Artist`]s from `list artist` or `list albumartist` output.
#[derive(Debug, Default)]
pub struct ArtistParser {
  collapse_duplicates: bool,
  current: Option<Artist>,
  artists: Vec<Artist>,
}

impl ArtistParser {
  /// `collapse_duplicates` should be set when the listing was grouped by
  /// MusicBrainz id, which can report one name with and without ids.
  pub fn new(collapse_duplicates: bool) -> Self {
    Self {
      collapse_duplicates,
      ..Self::default()
    }
  }
}

/// Keep only the last entry of each run of equally named artists. Runs come
/// from sorting, so the kept entry is the one with the most ids.
pub fn collapse_duplicates(artists: Vec<Artist>) -> Vec<Artist> {
  let mut collapsed: Vec<Artist> = Vec::with_capacity(artists.len());
  for artist in artists {
    match collapsed.last_mut() {
      Some(last) if last.name == artist.name => *last = artist,
      _ => collapsed.push(artist),
    }
  }
  collapsed
}

impl ResponseParser for ArtistParser {
  type Output = Vec<Artist>;

  fn field(&mut self, key: &str, value: &str, _warnings: &mut Warnings) {
    match key {
      protocol::ARTIST | protocol::ALBUM_ARTIST => {
        if let Some(artist) = self.current.take() {
          self.artists.push(artist);
        }
        self.current = Some(Artist::new(value));
      }
      protocol::ARTIST_MBID => match self.current.as_mut() {
        Some(artist) => artist.mbids.push(value.to_string()),
        None => log::debug!("MusicBrainz id {} before first artist", value),
      },
      _ => {}
    }
  }

  fn finish(mut self, _warnings: &mut Warnings) -> Self::Output {
    if let Some(artist) = self.current.take() {
      self.artists.push(artist);
    }
    self.artists.sort();
    log::debug!("Parsed {} artists", self.artists.len());
    if self.collapse_duplicates {
      collapse_duplicates(self.artists)
    } else {
      self.artists
    }
  }
}
