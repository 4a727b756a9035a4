use chrono::NaiveDate;

use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::Album;

/// Builds [`Album`]s from `list album` output. Each `Album:` line starts a
/// new record; the result is sorted.
#[derive(Debug, Default)]
pub struct AlbumParser {
  current: Option<Album>,
  albums: Vec<Album>,
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM` and `YYYY`.
fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
  let value = value.trim();
  match value.len() {
    4 => NaiveDate::parse_from_str(&format!("{}-01-01", value), "%Y-%m-%d"),
    7 => NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d"),
    _ => NaiveDate::parse_from_str(value, "%Y-%m-%d"),
  }
}

impl ResponseParser for AlbumParser {
  type Output = Vec<Album>;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    if key == protocol::ALBUM {
      if let Some(album) = self.current.take() {
        self.albums.push(album);
      }
      self.current = Some(Album::new(value));
      return;
    }

    let Some(album) = self.current.as_mut() else {
      log::debug!("{}{} before first album", key, value);
      return;
    };

    match key {
      protocol::ALBUM_MBID => album.mbid = value.to_string(),
      protocol::ALBUM_ARTIST => album.artist = value.to_string(),
      protocol::DATE => match parse_date(value) {
        Ok(date) => album.date = Some(date),
        Err(e) => warnings.record(key, value, e),
      },
      _ => {}
    }
  }

  fn finish(mut self, _warnings: &mut Warnings) -> Self::Output {
    if let Some(album) = self.current.take() {
      self.albums.push(album);
    }
    self.albums.sort();
    log::debug!("Parsed {} albums", self.albums.len());
    self.albums
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_grouped_albums() {
    let (albums, warnings) = feed(
      AlbumParser::default(),
      &[
        "AlbumArtist: Björk",
        "MUSICBRAINZ_ALBUMID: 1234",
        "Date: 1997-09-22",
        "Album: homogenic",
        "Album: Debut",
        "Date: 1993",
        "Album: Post",
        "Date: sometime",
        "OK",
      ],
    );

    let names: Vec<_> = albums.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Debut", "homogenic", "Post"]);
    assert_eq!(albums[0].date, NaiveDate::from_ymd_opt(1993, 1, 1));
    assert_eq!(albums[2].date, None);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "Date");
  }

  #[test]
  fn test_album_fields_follow_album_line() {
    let (albums, _) = feed(
      AlbumParser::default(),
      &[
        "Album: Vespertine",
        "AlbumArtist: Björk",
        "MUSICBRAINZ_ALBUMID: abcd",
        "Date: 2001-08",
        "OK",
      ],
    );
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].artist, "Björk");
    assert_eq!(albums[0].mbid, "abcd");
    assert_eq!(albums[0].date, NaiveDate::from_ymd_opt(2001, 8, 1));
  }

  #[test]
  fn test_date_formats() {
    assert!(parse_date("2004-05-12").is_ok());
    assert!(parse_date("2004").is_ok());
    assert!(parse_date("12.05.2004").is_err());
  }
}
