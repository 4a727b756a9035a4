use super::{ResponseParser, Warnings};
use crate::mpd::protocol;
use crate::mpd::types::{CurrentStatus, PlaybackState};

/// Volume reported by servers without a mixer.
const NO_MIXER_VOLUME: i64 = -1;

/// Flat mapping of `status` fields onto [`CurrentStatus`].
#[derive(Debug, Default)]
pub struct StatusParser {
  status: CurrentStatus,
}

fn set_flag(
  key: &str,
  value: &str,
  warnings: &mut Warnings,
  setter: impl FnOnce(i64) -> bool,
) {
  if let Some(v) = warnings.number::<i64>(key, value) {
    if !setter(v) {
      warnings.record(key, value, "expected 0 or 1");
    }
  }
}

impl ResponseParser for StatusParser {
  type Output = CurrentStatus;

  fn field(&mut self, key: &str, value: &str, warnings: &mut Warnings) {
    let status = &mut self.status;
    match key {
      protocol::VOLUME => {
        if let Some(volume) = warnings.number::<i64>(key, value) {
          if !status.set_volume(volume) && volume != NO_MIXER_VOLUME {
            warnings.record(key, value, "volume out of range");
          }
        }
      }
      protocol::REPEAT => set_flag(key, value, warnings, |v| status.set_repeat(v)),
      protocol::RANDOM => set_flag(key, value, warnings, |v| status.set_random(v)),
      protocol::SINGLE => set_flag(key, value, warnings, |v| status.set_single(v)),
      protocol::CONSUME => set_flag(key, value, warnings, |v| status.set_consume(v)),
      protocol::PLAYLIST_VERSION => {
        if let Some(v) = warnings.number(key, value) {
          status.playlist_version = v;
        }
      }
      protocol::PLAYLIST_LENGTH => {
        if let Some(v) = warnings.number(key, value) {
          status.playlist_length = v;
        }
      }
      protocol::SONG_INDEX => status.current_song_index = warnings.number(key, value),
      protocol::NEXT_SONG_INDEX => status.next_song_index = warnings.number(key, value),
      protocol::TIME_LEGACY => match value.split_once(':') {
        Some((elapsed, total)) => {
          if let Some(elapsed) = warnings.number(key, elapsed) {
            status.elapsed_time = elapsed;
          }
          if let Some(total) = warnings.number(key, total) {
            status.track_length = total;
          }
        }
        None => warnings.record(key, value, "expected elapsed:total"),
      },
      protocol::ELAPSED => {
        if let Some(secs) = warnings.seconds(key, value) {
          status.elapsed_time = secs;
        }
      }
      protocol::DURATION => {
        if let Some(secs) = warnings.seconds(key, value) {
          status.track_length = secs;
        }
      }
      protocol::BITRATE => {
        if let Some(v) = warnings.number(key, value) {
          status.bitrate = v;
        }
      }
      protocol::AUDIO => {
        let parts: Vec<&str> = value.split(':').collect();
        if let [rate, bits, channels] = parts.as_slice() {
          if let Some(rate) = warnings.number(key, rate) {
            status.sample_rate = rate;
          }
          status.bit_depth = bits.to_string();
          if let Some(channels) = warnings.number(key, channels) {
            status.channel_count = channels;
          }
        } else {
          warnings.record(key, value, "expected rate:bits:channels");
        }
      }
      protocol::UPDATING_DB => {
        if let Some(job) = warnings.number(key, value) {
          status.update_db_job = job;
        }
      }
      protocol::STATE => match value {
        protocol::STATE_PLAY => status.playback_state = PlaybackState::Playing,
        protocol::STATE_PAUSE => status.playback_state = PlaybackState::Paused,
        protocol::STATE_STOP => status.playback_state = PlaybackState::Stopped,
        _ => warnings.record(key, value, "unknown playback state"),
      },
      _ => {}
    }
  }

  fn finish(self, _warnings: &mut Warnings) -> Self::Output {
    self.status
  }
}

#[cfg(test)]
mod tests {
  use super::super::feed;
  use super::*;

  #[test]
  fn test_modern_status() {
    let (status, warnings) = feed(
      StatusParser::default(),
      &[
        "volume: 80",
        "repeat: 1",
        "random: 0",
        "elapsed: 12.6",
        "duration: 245.2",
        "state: play",
        "OK",
      ],
    );
    assert!(warnings.is_empty());
    assert_eq!(status.volume(), 80);
    assert_eq!(status.repeat(), 1);
    assert_eq!(status.random(), 0);
    assert_eq!(status.elapsed_time, 13);
    assert_eq!(status.track_length, 245);
    assert_eq!(status.playback_state, PlaybackState::Playing);
    assert_eq!(status.update_db_job, -1);
  }

  #[test]
  fn test_legacy_time_and_audio_format() {
    let (status, _) = feed(
      StatusParser::default(),
      &[
        "playlist: 12",
        "playlistlength: 30",
        "song: 4",
        "nextsong: 5",
        "time: 61:300",
        "bitrate: 320",
        "audio: 44100:24:2",
        "updating_db: 7",
        "state: pause",
        "OK",
      ],
    );
    assert_eq!(status.playlist_version, 12);
    assert_eq!(status.playlist_length, 30);
    assert_eq!(status.current_song_index, Some(4));
    assert_eq!(status.next_song_index, Some(5));
    assert_eq!(status.elapsed_time, 61);
    assert_eq!(status.track_length, 300);
    assert_eq!(status.bitrate, 320);
    assert_eq!(status.sample_rate, 44100);
    assert_eq!(status.bit_depth, "24");
    assert_eq!(status.channel_count, 2);
    assert_eq!(status.update_db_job, 7);
    assert_eq!(status.playback_state, PlaybackState::Paused);
  }

  #[test]
  fn test_invalid_values_leave_defaults() {
    let (status, warnings) = feed(
      StatusParser::default(),
      &[
        "volume: -1",
        "repeat: 3",
        "single: oneshot",
        "elapsed: later",
        "audio: dsd64",
        "OK",
      ],
    );
    assert_eq!(status.volume(), 0);
    assert_eq!(status.repeat(), 0);
    assert_eq!(status.single(), 0);
    assert_eq!(status.elapsed_time, 0);
    assert_eq!(status.sample_rate, 0);
    let keys: Vec<_> = warnings.iter().map(|w| w.key.as_str()).collect();
    assert_eq!(keys, ["repeat", "single", "elapsed", "audio"]);
  }
}
