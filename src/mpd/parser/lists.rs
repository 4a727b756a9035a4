use super::{ResponseParser, Warnings};
use crate::mpd::protocol;

/// Collects the values of one key, e.g. `command:` or `file:`.
#[derive(Debug)]
pub struct ValueListParser {
  key: &'static str,
  values: Vec<String>,
}

impl ValueListParser {
  pub fn new(key: &'static str) -> Self {
    Self {
      key,
      values: Vec::new(),
    }
  }

  pub fn commands() -> Self {
    Self::new(protocol::COMMAND)
  }

  pub fn tagtypes() -> Self {
    Self::new(protocol::TAGTYPE)
  }

  pub fn files() -> Self {
    Self::new(protocol::FILE)
  }
}

impl ResponseParser for ValueListParser {
  type Output = Vec<String>;

  fn field(&mut self, key: &str, value: &str, _warnings: &mut Warnings) {
    if key == self.key {
      self.values.push(value.to_string());
    }
  }

  fn finish(self, _warnings: &mut Warnings) -> Self::Output {
    self.values
  }
}

/// Every data line of a response, as received.
#[derive(Debug, Default)]
pub struct LinesParser {
  lines: Vec<String>,
}

impl ResponseParser for LinesParser {
  type Output = Vec<String>;

  fn field(&mut self, key: &str, value: &str, _warnings: &mut Warnings) {
    self.lines.push(format!("{}{}", key, value));
  }

  fn finish(self, _warnings: &mut Warnings) -> Self::Output {
    self.lines
  }
}

/// Value of one named sticker from `sticker: name=value` lines.
#[derive(Debug)]
pub struct StickerParser {
  name: String,
  value: Option<String>,
}

impl StickerParser {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: None,
    }
  }
}

impl ResponseParser for StickerParser {
  type Output = Option<String>;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    if key != protocol::STICKER {
      return;
    }
    match value.split_once('=') {
      Some((name, v)) if name == self.name => self.value = Some(v.to_string()),
      Some(_) => {}
      None => warnings.record(key, value, "expected name=value"),
    }
  }

  fn finish(self, _warnings: &mut Warnings) -> Self::Output {
    self.value
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_tagtypes() {
    let (tags, _) = feed(
      ValueListParser::tagtypes(),
      &["tagtype: Artist", "tagtype: AlbumArtist", "OK"],
    );
    assert_eq!(tags, ["Artist", "AlbumArtist"]);
  }

  #[test]
  fn test_sticker_find_returns_uris() {
    let (files, _) = feed(
      ValueListParser::files(),
      &[
        "file: a.mp3",
        "sticker: mood=chill",
        "file: b.mp3",
        "sticker: mood=chill",
        "OK",
      ],
    );
    assert_eq!(files, ["a.mp3", "b.mp3"]);
  }

  #[test]
  fn test_raw_lines() {
    let (lines, _) = feed(LinesParser::default(), &["volume: 5", "state: stop", "OK"]);
    assert_eq!(lines, ["volume: 5", "state: stop"]);
  }

  #[test]
  fn test_sticker_value() {
    let (value, _) = feed(StickerParser::new("rating"), &["sticker: rating=8", "OK"]);
    assert_eq!(value.as_deref(), Some("8"));

    let (value, warnings) = feed(StickerParser::new("rating"), &["sticker: broken", "OK"]);
    assert_eq!(value, None);
    assert_eq!(warnings.len(), 1);
  }
}
