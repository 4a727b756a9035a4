use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::mpd::{MpdConnection, SearchType};

/// Remote control for a Music Player Daemon.
#[derive(Debug, Parser)]
#[command(name = "mpdremote", version, about)]
pub struct Cli {
  /// Server hostname, IP address or socket path.
  #[arg(long)]
  pub host: Option<String>,

  #[arg(short, long)]
  pub port: Option<u16>,

  #[arg(long)]
  pub password: Option<String>,

  /// Log protocol traffic.
  #[arg(short, long)]
  pub verbose: bool,

  /// Store the effective server settings as the new defaults.
  #[arg(long)]
  pub save_config: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Player status.
  Status,
  /// Database statistics.
  Stats,
  /// Audio outputs.
  Outputs,
  /// Features negotiated with the server.
  Features,
  /// Albums, optionally restricted to one artist.
  Albums { artist: Option<String> },
  /// Artists, or album artists with `--album-artists`.
  Artists {
    #[arg(long)]
    album_artists: bool,
  },
  /// Directory listing.
  Ls {
    #[arg(default_value = "")]
    path: String,
  },
  /// Search the database. Type is one of track, album, artist, file, any.
  Search { kind: SearchType, term: String },
  /// Show the queue.
  Queue,
  /// Start playback at a queue position.
  Play {
    #[arg(default_value_t = 0)]
    index: u32,
  },
  Pause,
  Resume,
  Stop,
  Next,
  Prev,
  /// Set the volume (0-100).
  Volume {
    #[arg(allow_negative_numbers = true)]
    volume: i32,
  },
  /// Enable or disable an output.
  ToggleOutput { id: u32 },
  /// Rescan the library or a part of it.
  Update { path: Option<String> },
  /// Send a raw protocol command.
  Raw { command: String },
  /// Print connection and idle events until interrupted.
  Watch,
}

impl Cli {
  /// Stored config with command line overrides applied.
  pub fn config(&self) -> Result<ClientConfig, String> {
    let mut config = ClientConfig::load();
    if let Some(host) = &self.host {
      config.host = host.clone();
    }
    if let Some(port) = self.port {
      config.port = port;
    }
    if let Some(password) = &self.password {
      config.password = Some(password.clone()).filter(|p| !p.is_empty());
    }
    config.validate()?;
    Ok(config)
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
  let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
  println!("{}", json);
  Ok(())
}

/// Connect, run `command` and disconnect again.
pub async fn execute(config: &ClientConfig, command: Command) -> Result<(), String> {
  let conn = MpdConnection::new(config.connection_options());
  conn
    .set_server_parameters(&config.host, config.password.as_deref(), config.port)
    .await;
  conn.connect().await.map_err(|e| e.to_string())?;

  let result = dispatch(&conn, command).await;
  conn.disconnect().await;
  result
}

async fn dispatch(conn: &MpdConnection, command: Command) -> Result<(), String> {
  match command {
    // ========================================================================
    // Information
    // ========================================================================
    Command::Status => match conn.status().await {
      Some(status) => print_json(&status),
      None => Err("Could not read player status".to_string()),
    },
    Command::Stats => match conn.statistics().await {
      Some(stats) => print_json(&stats),
      None => Err("Could not read statistics".to_string()),
    },
    Command::Outputs => print_json(&conn.outputs().await),
    Command::Features => {
      println!("{}", conn.capabilities());
      Ok(())
    }

    // ========================================================================
    // Library
    // ========================================================================
    Command::Albums { artist } => {
      let albums = match artist {
        Some(artist) => conn.artist_albums(&artist).await,
        None => conn.albums().await,
      };
      print_json(&albums)
    }
    Command::Artists { album_artists } => {
      let artists = if album_artists {
        conn.album_artists().await
      } else {
        conn.artists().await
      };
      print_json(&artists)
    }
    Command::Ls { path } => print_json(&conn.files(&path).await),
    Command::Search { kind, term } => print_json(&conn.search(&term, kind).await),
    Command::Queue => print_json(&conn.current_playlist().await),
    Command::Update { path } => conn
      .update_database(path.as_deref())
      .await
      .map_err(|e| e.to_string()),

    // ========================================================================
    // Playback
    // ========================================================================
    Command::Play { index } => conn.play(index).await.map_err(|e| e.to_string()),
    Command::Pause => conn.pause(true).await.map_err(|e| e.to_string()),
    Command::Resume => conn.pause(false).await.map_err(|e| e.to_string()),
    Command::Stop => conn.stop().await.map_err(|e| e.to_string()),
    Command::Next => conn.next().await.map_err(|e| e.to_string()),
    Command::Prev => conn.previous().await.map_err(|e| e.to_string()),
    Command::Volume { volume } => conn.set_volume(volume).await.map_err(|e| e.to_string()),
    Command::ToggleOutput { id } => conn.toggle_output(id).await.map_err(|e| e.to_string()),

    // ========================================================================
    // Passthrough
    // ========================================================================
    Command::Raw { command } => {
      let lines = conn.raw(&command).await.map_err(|e| e.to_string())?;
      for line in lines {
        println!("{}", line);
      }
      Ok(())
    }
    Command::Watch => watch(conn).await,
  }
}

async fn watch(conn: &MpdConnection) -> Result<(), String> {
  let events = conn.events();
  loop {
    tokio::select! {
      event = events.recv() => {
        let Ok(event) = event else {
          return Ok(());
        };
        println!("{} {:?}", chrono::Local::now().format("%H:%M:%S%.3f"), event);
        if !conn.is_connected() {
          return Err("Connection lost".to_string());
        }
      }
      _ = tokio::signal::ctrl_c() => return Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_search() {
    let cli = Cli::try_parse_from(["mpdremote", "--host", "music.lan", "search", "album", "Post"])
      .unwrap();
    assert_eq!(cli.host.as_deref(), Some("music.lan"));
    match cli.command {
      Command::Search { kind, term } => {
        assert_eq!(kind, SearchType::Album);
        assert_eq!(term, "Post");
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_defaults_and_kebab_case() {
    let cli = Cli::try_parse_from(["mpdremote", "-p", "6601", "toggle-output", "2"]).unwrap();
    assert_eq!(cli.port, Some(6601));
    assert!(matches!(cli.command, Command::ToggleOutput { id: 2 }));

    let cli = Cli::try_parse_from(["mpdremote", "play"]).unwrap();
    assert!(matches!(cli.command, Command::Play { index: 0 }));

    let cli = Cli::try_parse_from(["mpdremote", "ls"]).unwrap();
    assert!(matches!(cli.command, Command::Ls { path } if path.is_empty()));
  }

  #[test]
  fn test_rejects_unknown_search_type() {
    assert!(Cli::try_parse_from(["mpdremote", "search", "genre", "jazz"]).is_err());
    assert!(Cli::try_parse_from(["mpdremote", "volume"]).is_err());
  }

  #[test]
  fn test_volume_accepts_negative_values() {
    let cli = Cli::try_parse_from(["mpdremote", "volume", "-5"]).unwrap();
    assert!(matches!(cli.command, Command::Volume { volume: -5 }));
  }
}
