//! Server capability snapshot derived from version, `commands` and `tagtypes`.

use std::fmt;

use super::commands::{IDLE, SEARCH_ADD};
use super::protocol::ProtocolVersion;

const TAG_MUSICBRAINZ: &str = "musicbrainz";
const TAG_ALBUM_ARTIST: &str = "albumartist";
const TAG_DATE: &str = "date";

/// Feature flags gating which command variants may be sent.
///
/// Built once per (re)connection that detects a relevant change. The only
/// later modification is [`with_mopidy_workaround`](Self::with_mopidy_workaround),
/// which produces a new snapshot instead of mutating a shared one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
  version: ProtocolVersion,
  idle: bool,
  ranged_current_playlist: bool,
  search_add: bool,
  list_group: bool,
  list_filtering: bool,
  current_playlist_remove_range: bool,
  musicbrainz_tags: bool,
  tag_album_artist: bool,
  tag_date: bool,
  mopidy_detected: bool,
}

impl Capabilities {
  /// Derive the flags from the negotiated protocol data.
  pub fn new<C, T>(version: ProtocolVersion, commands: &[C], tags: &[T]) -> Self
  where
    C: AsRef<str>,
    T: AsRef<str>,
  {
    let ProtocolVersion { major, minor, .. } = version;

    let mut caps = Self {
      version,
      ranged_current_playlist: minor > 14 || major > 0,
      list_group: minor >= 19 || major > 0,
      list_filtering: minor >= 19 || major > 0,
      current_playlist_remove_range: minor >= 16 || major > 0,
      idle: commands.iter().any(|c| c.as_ref() == IDLE),
      search_add: commands.iter().any(|c| c.as_ref() == SEARCH_ADD),
      ..Self::default()
    };

    for tag in tags {
      let tag = tag.as_ref().to_lowercase();
      if tag.contains(TAG_MUSICBRAINZ) {
        caps.musicbrainz_tags = true;
      } else if tag == TAG_ALBUM_ARTIST {
        caps.tag_album_artist = true;
      } else if tag == TAG_DATE {
        caps.tag_date = true;
      }
    }

    caps
  }

  /// Snapshot for a server that claims `group`/filter support it lacks.
  pub fn with_mopidy_workaround(&self) -> Self {
    log::warn!("Enabling workarounds for detected Mopidy server");
    Self {
      list_group: false,
      list_filtering: false,
      mopidy_detected: true,
      ..self.clone()
    }
  }

  pub fn version(&self) -> ProtocolVersion {
    self.version
  }

  pub fn major_version(&self) -> u32 {
    self.version.major
  }

  pub fn minor_version(&self) -> u32 {
    self.version.minor
  }

  pub fn has_idle(&self) -> bool {
    self.idle
  }

  pub fn has_ranged_current_playlist(&self) -> bool {
    self.ranged_current_playlist
  }

  pub fn has_search_add(&self) -> bool {
    self.search_add
  }

  pub fn has_list_group(&self) -> bool {
    self.list_group
  }

  pub fn has_list_filtering(&self) -> bool {
    self.list_filtering
  }

  pub fn has_current_playlist_remove_range(&self) -> bool {
    self.current_playlist_remove_range
  }

  pub fn has_musicbrainz_tags(&self) -> bool {
    self.musicbrainz_tags
  }

  pub fn has_tag_album_artist(&self) -> bool {
    self.tag_album_artist
  }

  pub fn has_tag_date(&self) -> bool {
    self.tag_date
  }

  pub fn mopidy_detected(&self) -> bool {
    self.mopidy_detected
  }

  /// Whether a newly announced version invalidates this snapshot.
  pub fn is_stale_for(&self, version: ProtocolVersion) -> bool {
    self.version.major != version.major || self.version.minor != version.minor
  }
}

impl fmt::Display for Capabilities {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "MPD protocol version: {}.{}",
      self.version.major, self.version.minor
    )?;
    writeln!(f, "TAGS:")?;
    writeln!(f, "MUSICBRAINZ: {}", self.musicbrainz_tags)?;
    writeln!(f, "AlbumArtist: {}", self.tag_album_artist)?;
    writeln!(f, "Date: {}", self.tag_date)?;
    writeln!(f, "IDLE support: {}", self.idle)?;
    writeln!(f, "Windowed playlist: {}", self.ranged_current_playlist)?;
    writeln!(f, "Fast search add: {}", self.search_add)?;
    writeln!(f, "List grouping: {}", self.list_group)?;
    writeln!(f, "List filtering: {}", self.list_filtering)?;
    write!(
      f,
      "Fast ranged currentplaylist delete: {}",
      self.current_playlist_remove_range
    )?;
    if self.mopidy_detected {
      write!(
        f,
        "\nMopidy detected, consider using the real MPD server (www.musicpd.org)!"
      )?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NONE: &[&str] = &[];

  fn version(major: u32, minor: u32) -> ProtocolVersion {
    ProtocolVersion {
      major,
      minor,
      patch: 0,
    }
  }

  #[test]
  fn test_list_group_threshold() {
    for minor in 0..40 {
      let caps = Capabilities::new(version(0, minor), NONE, NONE);
      assert_eq!(caps.has_list_group(), minor >= 19, "0.{}", minor);
      assert_eq!(caps.has_list_filtering(), minor >= 19, "0.{}", minor);
    }
    for minor in [0, 5, 18, 19, 30] {
      let caps = Capabilities::new(version(1, minor), NONE, NONE);
      assert!(caps.has_list_group());
      assert!(caps.has_list_filtering());
    }
  }

  #[test]
  fn test_version_gated_playlist_features() {
    let old = Capabilities::new(version(0, 14), NONE, NONE);
    assert!(!old.has_ranged_current_playlist());
    assert!(!old.has_current_playlist_remove_range());

    let mid = Capabilities::new(version(0, 15), NONE, NONE);
    assert!(mid.has_ranged_current_playlist());
    assert!(!mid.has_current_playlist_remove_range());

    let new = Capabilities::new(version(0, 16), NONE, NONE);
    assert!(new.has_current_playlist_remove_range());
  }

  #[test]
  fn test_command_derived_flags() {
    let caps = Capabilities::new(version(0, 21), &["add", "idle", "searchadd"], NONE);
    assert!(caps.has_idle());
    assert!(caps.has_search_add());

    let caps = Capabilities::new(version(0, 21), &["add", "noidle", "search"], NONE);
    assert!(!caps.has_idle());
    assert!(!caps.has_search_add());
  }

  #[test]
  fn test_tag_flags_are_case_insensitive() {
    let tags = ["Artist", "AlbumArtist", "Date", "MUSICBRAINZ_ALBUMID"];
    let caps = Capabilities::new(version(0, 21), NONE, &tags);
    assert!(caps.has_tag_album_artist());
    assert!(caps.has_tag_date());
    assert!(caps.has_musicbrainz_tags());

    let caps = Capabilities::new(version(0, 21), NONE, &["Artist", "AlbumArtistSort"]);
    assert!(!caps.has_tag_album_artist());
    assert!(!caps.has_musicbrainz_tags());
  }

  #[test]
  fn test_mopidy_workaround_downgrades_listing() {
    let caps = Capabilities::new(version(0, 19), &["idle"], &["date"]);
    let downgraded = caps.with_mopidy_workaround();

    assert!(!downgraded.has_list_group());
    assert!(!downgraded.has_list_filtering());
    assert!(downgraded.mopidy_detected());
    assert!(downgraded.has_idle());
    assert!(downgraded.has_tag_date());
    assert!(caps.has_list_group());
    assert!(downgraded.to_string().contains("Mopidy detected"));
  }

  #[test]
  fn test_stale_detection() {
    let caps = Capabilities::new(version(0, 21), NONE, NONE);
    assert!(!caps.is_stale_for(ProtocolVersion {
      major: 0,
      minor: 21,
      patch: 4
    }));
    assert!(caps.is_stale_for(version(0, 22)));
    assert!(Capabilities::default().is_stale_for(version(0, 21)));
  }
}
