use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::Statistics;

#[derive(Debug, Default)]
pub struct StatsParser {
  stats: Statistics,
}

fn store<T>(target: &mut T, key: &str, value: &str, warnings: &mut Warnings)
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  if let Some(v) = warnings.number(key, value) {
    *target = v;
  }
}

impl ResponseParser for StatsParser {
  type Output = Statistics;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    let stats = &mut self.stats;
    match key {
      protocol::STATS_UPTIME => store(&mut stats.uptime, key, value, warnings),
      protocol::STATS_PLAYTIME => store(&mut stats.playtime, key, value, warnings),
      protocol::STATS_ARTISTS => store(&mut stats.artists_count, key, value, warnings),
      protocol::STATS_ALBUMS => store(&mut stats.albums_count, key, value, warnings),
      protocol::STATS_SONGS => store(&mut stats.songs_count, key, value, warnings),
      protocol::STATS_DB_PLAYTIME => store(&mut stats.db_playtime, key, value, warnings),
      protocol::STATS_DB_UPDATE => store(&mut stats.last_db_update, key, value, warnings),
      _ => {}
    }
  }

  fn finish(self, _warnings: &mut Warnings) -> Self::Output {
    self.stats
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_stats() {
    let (stats, warnings) = feed(
      StatsParser::default(),
      &[
        "uptime: 4242",
        "playtime: 120",
        "artists: 12",
        "albums: 34",
        "songs: 560",
        "db_playtime: 99999",
        "db_update: 1700000000",
        "OK",
      ],
    );
    assert!(warnings.is_empty());
    assert_eq!(stats.uptime, 4242);
    assert_eq!(stats.playtime, 120);
    assert_eq!(stats.artists_count, 12);
    assert_eq!(stats.albums_count, 34);
    assert_eq!(stats.songs_count, 560);
    assert_eq!(stats.db_playtime, 99999);
    assert_eq!(stats.last_db_update, 1_700_000_000);
  }

  #[test]
  fn test_bad_counter_does_not_stop_parsing() {
    let (stats, warnings) = feed(
      StatsParser::default(),
      &["artists: many", "songs: 3", "OK"],
    );
    assert_eq!(stats.artists_count, 0);
    assert_eq!(stats.songs_count, 3);
    assert_eq!(warnings.len(), 1);
  }
}
