//! Connection state machine.
//!
//! One [`MpdConnection`] drives one server session. Every operation holds the
//! session lock for its whole command/response cycle, so callers on several
//! tasks never interleave on the wire.
//!
//! After `idle_delay` without commands the connection enters MPD's idle mode.
//! The read half then moves into a listener task which waits for the idle
//! response and hands the reader back through its join handle. A command
//! issued while idling writes `noidle`, waits for that hand-back (which drains
//! the idle response) and only then writes the command itself.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::capabilities::Capabilities;
use super::commands::{MpdCommand, SearchType, RATING_STICKER};
use super::error::{MpdError, TransportError};
use super::parser::{
  read_response, AlbumParser, ArtistParser, Discard, LinesParser, OutputParser, Reply,
  ReplyStatus, ResponseParser, StatsParser, StatusParser, StickerParser, TrackFilter,
  TrackParser, ValueListParser, Warnings,
};
use super::protocol::{self, ProtocolVersion};
use super::transport::{LineReader, LineTransport, LineWriter};
use super::types::{Album, Artist, CurrentStatus, FileEntry, Output, Statistics, Track};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub const DEFAULT_PORT: u16 = 6600;

/// Timing and buffering knobs of a connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
  /// Quiet period after the last command before idling starts.
  pub idle_delay: Duration,
  /// Bound on each wait for a response line outside idle.
  pub response_timeout: Duration,
  /// Queued events beyond this are dropped.
  pub event_capacity: usize,
}

impl Default for ConnectionOptions {
  fn default() -> Self {
    Self {
      idle_delay: Duration::from_millis(500),
      response_timeout: Duration::from_secs(5),
      event_capacity: 64,
    }
  }
}

/// Notifications about the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionEvent {
  Connected,
  Disconnected,
  IdleStarted,
  IdleEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
  Disconnected,
  Connecting,
  /// Connected, idle timer armed.
  Ready,
  /// Waiting in MPD's idle mode.
  Idle,
  /// A command is in flight.
  Busy,
}

/// Commands sent as one batch with a single aggregate response.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
  commands: Vec<MpdCommand>,
}

impl CommandList {
  /// Empty list.
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue `command` for the next send.
  pub fn push(&mut self, command: impl Into<MpdCommand>) {
    self.commands.push(command.into());
  }

  /// Number of queued commands.
  pub fn len(&self) -> usize {
    self.commands.len()
  }

  /// True when nothing is queued.
  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }
}

impl FromIterator<MpdCommand> for CommandList {
  fn from_iter<I: IntoIterator<Item = MpdCommand>>(iter: I) -> Self {
    Self {
      commands: iter.into_iter().collect(),
    }
  }
}

/// What the idle listener hands back.
enum IdleOutcome {
  Ended {
    reader: LineReader,
    changed: Vec<String>,
  },
  Lost,
}

struct IdleTask {
  handle: JoinHandle<IdleOutcome>,
  generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerParams {
  host: String,
  port: u16,
  password: Option<String>,
}

struct Session {
  params: ServerParams,
  reader: Option<LineReader>,
  writer: Option<LineWriter>,
  idle: Option<IdleTask>,
  refresh_capabilities: bool,
  /// Bumped whenever a transport is opened or dropped.
  epoch: u64,
  idle_generation: u64,
}

impl Session {
  fn is_connected(&self) -> bool {
    self.writer.is_some()
  }

  async fn write(&mut self, command: &MpdCommand) -> Result<(), TransportError> {
    match self.writer.as_mut() {
      Some(writer) => writer.write_line(command.as_str()).await,
      None => Err(TransportError::Closed),
    }
  }

  async fn read<P: ResponseParser>(&mut self, parser: P, timeout: Duration) -> Reply<P::Output> {
    match self.reader.as_mut() {
      Some(reader) => read_response(reader, parser, Some(timeout)).await,
      None => {
        let mut warnings = Warnings::default();
        Reply {
          value: parser.finish(&mut warnings),
          status: ReplyStatus::Failed(TransportError::Closed),
          warnings: warnings.into_vec(),
        }
      }
    }
  }

  /// Close and forget the transport. Returns whether one was open.
  async fn drop_transport(&mut self) -> bool {
    if let Some(task) = self.idle.take() {
      task.handle.abort();
    }
    self.reader = None;
    self.epoch += 1;
    match self.writer.take() {
      Some(mut writer) => {
        writer.close().await;
        true
      }
      None => false,
    }
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if let Some(task) = self.idle.take() {
      task.handle.abort();
    }
  }
}

struct Inner {
  session: tokio::sync::Mutex<Session>,
  capabilities: RwLock<Arc<Capabilities>>,
  state: Mutex<ConnectionState>,
  idle_timer: Mutex<Option<CancellationToken>>,
  event_tx: Sender<ConnectionEvent>,
  event_rx: Receiver<ConnectionEvent>,
  options: ConnectionOptions,
}

impl Inner {
  fn caps(&self) -> Arc<Capabilities> {
    self.capabilities.read().clone()
  }

  fn set_state(&self, state: ConnectionState) {
    let mut current = self.state.lock();
    if *current != state {
      log::debug!("MPD connection {:?} -> {:?}", *current, state);
      *current = state;
    }
  }

  fn emit(&self, event: ConnectionEvent) {
    if let Err(e) = self.event_tx.try_send(event) {
      log::debug!("Dropping connection event {:?}: {}", event, e);
    }
  }

  fn cancel_idle_timer(&self) {
    if let Some(token) = self.idle_timer.lock().take() {
      token.cancel();
    }
  }

  /// Start idling after a quiet period. Re-arming cancels the previous timer.
  fn arm_idle_timer(self: &Arc<Self>) {
    if !self.caps().has_idle() {
      return;
    }

    let token = CancellationToken::new();
    if let Some(previous) = self.idle_timer.lock().replace(token.clone()) {
      previous.cancel();
    }

    let weak = Arc::downgrade(self);
    let delay = self.options.idle_delay;
    tokio::spawn(async move {
      tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(delay) => {
          let Some(inner) = weak.upgrade() else {
            return;
          };
          let mut session = inner.session.lock().await;
          if token.is_cancelled() {
            return;
          }
          inner.idle_timer.lock().take();
          inner.start_idling(&mut session).await;
        }
      }
    });
  }

  async fn start_idling(self: &Arc<Self>, session: &mut Session) {
    if session.idle.is_some() || session.reader.is_none() || !self.caps().has_idle() {
      return;
    }

    if let Err(e) = session.write(&MpdCommand::idle()).await {
      log::error!("Failed to enter idle: {}", e);
      self.teardown(session).await;
      return;
    }

    let Some(reader) = session.reader.take() else {
      return;
    };
    session.idle_generation += 1;
    let generation = session.idle_generation;
    let handle = tokio::spawn(idle_listener(
      Arc::downgrade(self),
      reader,
      session.epoch,
      generation,
    ));
    session.idle = Some(IdleTask { handle, generation });

    self.set_state(ConnectionState::Idle);
    self.emit(ConnectionEvent::IdleStarted);
  }

  /// Leave idle mode: `noidle`, then wait for the listener to drain the
  /// idle response and return the reader.
  async fn deidle(&self, session: &mut Session) -> Result<(), MpdError> {
    let Some(mut task) = session.idle.take() else {
      return Ok(());
    };

    // A finished listener already consumed the idle response.
    if !task.handle.is_finished() {
      if let Err(e) = session.write(&MpdCommand::noidle()).await {
        log::error!("Failed to leave idle: {}", e);
        task.handle.abort();
        self.teardown(session).await;
        return Err(e.into());
      }
    }

    match tokio::time::timeout(self.options.response_timeout, &mut task.handle).await {
      Ok(Ok(IdleOutcome::Ended { reader, changed })) => {
        session.reader = Some(reader);
        if !changed.is_empty() {
          log::debug!("Idle ended with changes: {}", changed.join(", "));
        }
        self.set_state(ConnectionState::Ready);
        self.emit(ConnectionEvent::IdleEnded);
        Ok(())
      }
      Ok(Ok(IdleOutcome::Lost)) => {
        self.teardown(session).await;
        Err(TransportError::Closed.into())
      }
      Ok(Err(e)) => {
        log::error!("Idle listener failed: {}", e);
        self.teardown(session).await;
        Err(TransportError::Closed.into())
      }
      Err(_) => {
        log::error!("Server did not answer noidle");
        task.handle.abort();
        self.teardown(session).await;
        Err(TransportError::Timeout.into())
      }
    }
  }

  /// Take back the reader after another client ended idle, then idle again.
  fn reclaim_idle(self: Arc<Self>, generation: u64) -> BoxFuture {
    Box::pin(async move {
      let mut session = self.session.lock().await;
      match &session.idle {
        Some(task) if task.generation == generation => {}
        _ => return,
      }
      let Some(task) = session.idle.take() else {
        return;
      };

      match task.handle.await {
        Ok(IdleOutcome::Ended { reader, .. }) => {
          session.reader = Some(reader);
          self.set_state(ConnectionState::Ready);
          self.emit(ConnectionEvent::IdleEnded);
          self.start_idling(&mut session).await;
        }
        Ok(IdleOutcome::Lost) => self.teardown(&mut session).await,
        Err(e) => {
          log::error!("Idle listener failed: {}", e);
          self.teardown(&mut session).await;
        }
      }
    })
  }

  /// Tear down after the idle listener lost the socket, unless the session
  /// moved on to another transport meanwhile.
  fn connection_lost(self: Arc<Self>, epoch: u64) -> BoxFuture {
    Box::pin(async move {
      let mut session = self.session.lock().await;
      if session.epoch == epoch {
        self.teardown(&mut session).await;
      }
    })
  }

  /// Socket failure path: drop everything and report the disconnect.
  async fn teardown(&self, session: &mut Session) {
    self.cancel_idle_timer();
    let was_connected = session.drop_transport().await;
    self.set_state(ConnectionState::Disconnected);
    if was_connected {
      log::warn!("Lost connection to MPD");
      self.emit(ConnectionEvent::Disconnected);
    }
  }

  /// Deidle if needed and write `command`.
  async fn send(&self, session: &mut Session, command: &MpdCommand) -> Result<(), MpdError> {
    self.cancel_idle_timer();
    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }
    self.deidle(session).await?;

    self.set_state(ConnectionState::Busy);
    if let Err(e) = session.write(command).await {
      log::error!("Failed to send {}: {}", command.name(), e);
      self.teardown(session).await;
      return Err(e.into());
    }
    Ok(())
  }

  /// Bookkeeping once a response has been read completely.
  async fn complete(self: &Arc<Self>, session: &mut Session, status: &ReplyStatus) {
    match status {
      ReplyStatus::Closed | ReplyStatus::Failed(_) => {
        log::error!("Connection lost while reading response: {:?}", status);
        self.teardown(session).await;
      }
      ReplyStatus::Ack(ack) if ack.is_parse_args_error() => {
        self.enable_mopidy_workaround(session).await;
      }
      _ => {
        self.set_state(ConnectionState::Ready);
        self.arm_idle_timer();
      }
    }
  }

  async fn execute<P: ResponseParser>(
    self: &Arc<Self>,
    session: &mut Session,
    command: MpdCommand,
    parser: P,
  ) -> Result<Reply<P::Output>, MpdError> {
    self.send(session, &command).await?;
    let reply = session.read(parser, self.options.response_timeout).await;
    self.complete(session, &reply.status).await;
    Ok(reply)
  }

  /// Run a command that returns a list. Yields what was parsed even when the
  /// connection dropped mid-response, and an empty value when not connected.
  async fn fetch<P>(self: &Arc<Self>, session: &mut Session, command: MpdCommand, parser: P) -> P::Output
  where
    P: ResponseParser,
    P::Output: Default,
  {
    let name = command.name().to_string();
    match self.execute(session, command, parser).await {
      Ok(reply) => {
        if !reply.warnings.is_empty() {
          log::info!("{} reply had {} unusable fields", name, reply.warnings.len());
        }
        reply.value
      }
      Err(e) => {
        log::debug!("{} skipped: {}", name, e);
        P::Output::default()
      }
    }
  }

  /// Run a command that returns a single record, only kept on `OK`.
  async fn fetch_one<P>(
    self: &Arc<Self>,
    session: &mut Session,
    command: MpdCommand,
    parser: P,
  ) -> Option<P::Output>
  where
    P: ResponseParser,
  {
    let name = command.name().to_string();
    match self.execute(session, command, parser).await {
      Ok(reply) if reply.is_ok() => Some(reply.value),
      Ok(_) => None,
      Err(e) => {
        log::debug!("{} skipped: {}", name, e);
        None
      }
    }
  }

  async fn run(self: &Arc<Self>, session: &mut Session, command: MpdCommand) -> Result<(), MpdError> {
    let reply = self.execute(session, command, Discard).await?;
    reply.status.into_result()
  }

  /// Send `commands` between `command_list_begin` and `command_list_end`.
  /// Only the aggregate response is read.
  async fn run_list(
    self: &Arc<Self>,
    session: &mut Session,
    commands: &[MpdCommand],
  ) -> Result<(), MpdError> {
    if commands.is_empty() {
      return if session.is_connected() {
        Ok(())
      } else {
        Err(MpdError::NotReady)
      };
    }

    self.send(session, &MpdCommand::command_list_begin()).await?;
    let end = MpdCommand::command_list_end();
    for command in commands.iter().chain(std::iter::once(&end)) {
      if let Err(e) = session.write(command).await {
        log::error!("Failed to send command list: {}", e);
        self.teardown(session).await;
        return Err(e.into());
      }
    }
    log::debug!("Sent command list of {} commands", commands.len());

    let reply = session.read(Discard, self.options.response_timeout).await;
    self.complete(session, &reply.status).await;
    reply.status.into_result()
  }

  async fn connect(self: &Arc<Self>, session: &mut Session) -> Result<(), MpdError> {
    if session.is_connected() {
      self.disconnect(session).await;
    }

    self.set_state(ConnectionState::Connecting);
    let result = self.open(session).await;
    if result.is_err() {
      session.drop_transport().await;
      self.set_state(ConnectionState::Disconnected);
      return result;
    }

    self.set_state(ConnectionState::Ready);
    self.emit(ConnectionEvent::Connected);
    self.arm_idle_timer();
    Ok(())
  }

  /// Transport, greeting, authentication and capability negotiation.
  async fn open(&self, session: &mut Session) -> Result<(), MpdError> {
    let timeout = self.options.response_timeout;
    let ServerParams {
      host,
      port,
      password,
    } = session.params.clone();

    log::info!("Connecting to MPD at {}:{}", host, port);
    let (mut reader, writer) = LineTransport::connect(&host, port, timeout)
      .await?
      .into_split();

    let greeting = reader
      .read_line_timeout(timeout)
      .await?
      .ok_or(TransportError::Closed)?;
    if !greeting.starts_with(protocol::GREETING_PREFIX) {
      return Err(MpdError::InvalidGreeting(greeting));
    }
    let version = ProtocolVersion::from_greeting(&greeting).unwrap_or_else(|| {
      log::warn!("Could not parse server version from {:?}", greeting);
      ProtocolVersion::default()
    });
    log::info!("Connected to MPD {}", version);

    session.reader = Some(reader);
    session.writer = Some(writer);
    session.epoch += 1;

    if let Some(password) = password {
      session.write(&MpdCommand::password(&password)).await?;
      let reply = session.read(Discard, timeout).await;
      match reply.status {
        ReplyStatus::Ok => log::debug!("Authenticated"),
        // Commands needing permissions will be refused from here on.
        ReplyStatus::Ack(ack) => log::warn!("MPD authentication failed: {}", ack),
        lost => return lost.into_result(),
      }
    }

    if session.refresh_capabilities || self.caps().is_stale_for(version) {
      session.write(&MpdCommand::commands()).await?;
      let commands = session.read(ValueListParser::commands(), timeout).await;
      if commands.status.is_connection_lost() {
        return commands.status.into_result();
      }

      session.write(&MpdCommand::tagtypes()).await?;
      let tags = session.read(ValueListParser::tagtypes(), timeout).await;
      if tags.status.is_connection_lost() {
        return tags.status.into_result();
      }

      let caps = Capabilities::new(version, &commands.value, &tags.value);
      log::info!("MPD server features:\n{}", caps);
      *self.capabilities.write() = Arc::new(caps);
      session.refresh_capabilities = false;
    }

    Ok(())
  }

  async fn disconnect(&self, session: &mut Session) {
    self.cancel_idle_timer();
    if !session.is_connected() {
      self.set_state(ConnectionState::Disconnected);
      return;
    }

    if self.deidle(session).await.is_ok() {
      if let Err(e) = session.write(&MpdCommand::close()).await {
        log::debug!("Failed to send close: {}", e);
      }
    }

    if session.drop_transport().await {
      log::info!("Disconnected from MPD");
      self.emit(ConnectionEvent::Disconnected);
    }
    self.set_state(ConnectionState::Disconnected);
  }

  /// Downgrade grouping support and start a fresh session with it.
  async fn enable_mopidy_workaround(self: &Arc<Self>, session: &mut Session) {
    let caps = self.caps().with_mopidy_workaround();
    *self.capabilities.write() = Arc::new(caps);

    self.disconnect(session).await;
    if let Err(e) = self.connect(session).await {
      log::error!("Reconnect after enabling workarounds failed: {}", e);
    }
  }

  async fn artist_albums(self: &Arc<Self>, session: &mut Session, artist: &str) -> Vec<Album> {
    let caps = self.caps();
    let mut albums = self
      .fetch(
        session,
        MpdCommand::list_artist_albums(artist, &caps),
        AlbumParser::default(),
      )
      .await;

    let caps = self.caps();
    if caps.has_tag_album_artist() && caps.has_list_group() {
      let by_album_artist = self
        .fetch(
          session,
          MpdCommand::list_album_artist_albums(artist, &caps),
          AlbumParser::default(),
        )
        .await;
      let unique: HashSet<Album> = albums.into_iter().chain(by_album_artist).collect();
      albums = unique.into_iter().collect();
      albums.sort();
    }
    albums.retain(|album| !album.name.is_empty());
    albums
  }

  async fn artist_album_tracks(
    self: &Arc<Self>,
    session: &mut Session,
    album: &str,
    artist: &str,
    mbid: &str,
  ) -> Vec<FileEntry> {
    let parser = TrackParser::with_filter(TrackFilter::new(artist, mbid));
    let mut tracks = self.fetch(session, MpdCommand::find_album(album), parser).await;
    tracks.sort_by(FileEntry::cmp_by_album_index);
    tracks
  }

  async fn add_entries(
    self: &Arc<Self>,
    session: &mut Session,
    entries: &[FileEntry],
  ) -> Result<(), MpdError> {
    let commands: Vec<MpdCommand> = entries
      .iter()
      .filter_map(FileEntry::as_track)
      .map(|track| MpdCommand::add(&track.path))
      .collect();
    self.run_list(session, &commands).await
  }
}

/// Wait for the idle response on `reader` and return it to the session.
async fn idle_listener(
  inner: Weak<Inner>,
  mut reader: LineReader,
  epoch: u64,
  generation: u64,
) -> IdleOutcome {
  let reply = read_response(&mut reader, ValueListParser::new(protocol::IDLE_CHANGED), None).await;

  match reply.status {
    ReplyStatus::Ok | ReplyStatus::Ack(_) => {
      if !reply.value.is_empty() {
        log::info!("MPD state changed: {}", reply.value.join(", "));
        if let Some(inner) = inner.upgrade() {
          tokio::spawn(inner.reclaim_idle(generation));
        }
      }
      IdleOutcome::Ended {
        reader,
        changed: reply.value,
      }
    }
    ReplyStatus::Closed | ReplyStatus::Failed(_) => {
      log::warn!("MPD connection closed while idling");
      if let Some(inner) = inner.upgrade() {
        tokio::spawn(inner.connection_lost(epoch));
      }
      IdleOutcome::Lost
    }
  }
}

/// Client for one MPD server. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct MpdConnection {
  inner: Arc<Inner>,
}

impl MpdConnection {
  /// A disconnected client; call [`connect`](Self::connect) to open a session.
  pub fn new(options: ConnectionOptions) -> Self {
    let (event_tx, event_rx) = async_channel::bounded(options.event_capacity.max(1));
    let session = Session {
      params: ServerParams {
        host: "localhost".to_string(),
        port: DEFAULT_PORT,
        password: None,
      },
      reader: None,
      writer: None,
      idle: None,
      refresh_capabilities: true,
      epoch: 0,
      idle_generation: 0,
    };

    Self {
      inner: Arc::new(Inner {
        session: tokio::sync::Mutex::new(session),
        capabilities: RwLock::new(Arc::new(Capabilities::default())),
        state: Mutex::new(ConnectionState::Disconnected),
        idle_timer: Mutex::new(None),
        event_tx,
        event_rx,
        options,
      }),
    }
  }

  /// Server to use on the next [`connect`](Self::connect). An empty password
  /// clears it. Changed parameters force capability renegotiation.
  pub async fn set_server_parameters(&self, host: &str, password: Option<&str>, port: u16) {
    let params = ServerParams {
      host: host.to_string(),
      port,
      password: password.filter(|p| !p.is_empty()).map(str::to_string),
    };
    let mut session = self.inner.session.lock().await;
    if session.params != params {
      session.params = params;
      session.refresh_capabilities = true;
    }
  }

  /// Connect, replacing any existing session.
  pub async fn connect(&self) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    self.inner.connect(&mut session).await
  }

  /// Leave idle, say goodbye and close the socket. Safe to call repeatedly.
  pub async fn disconnect(&self) {
    self.inner.cancel_idle_timer();
    let mut session = self.inner.session.lock().await;
    self.inner.disconnect(&mut session).await;
  }

  /// True while a server session is open.
  pub fn is_connected(&self) -> bool {
    matches!(
      self.state(),
      ConnectionState::Ready | ConnectionState::Idle | ConnectionState::Busy
    )
  }

  /// Current lifecycle state.
  pub fn state(&self) -> ConnectionState {
    *self.inner.state.lock()
  }

  /// Current capability snapshot.
  pub fn capabilities(&self) -> Arc<Capabilities> {
    self.inner.caps()
  }

  /// Connection and idle notifications. Each event goes to one receiver.
  pub fn events(&self) -> Receiver<ConnectionEvent> {
    self.inner.event_rx.clone()
  }

  async fn fetch<P>(&self, command: MpdCommand, parser: P) -> P::Output
  where
    P: ResponseParser,
    P::Output: Default,
  {
    let mut session = self.inner.session.lock().await;
    self.inner.fetch(&mut session, command, parser).await
  }

  async fn fetch_one<P: ResponseParser>(&self, command: MpdCommand, parser: P) -> Option<P::Output> {
    let mut session = self.inner.session.lock().await;
    self.inner.fetch_one(&mut session, command, parser).await
  }

  async fn run(&self, command: MpdCommand) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    self.inner.run(&mut session, command).await
  }

  // Database

  /// All albums in the library, unnamed ones dropped.
  pub async fn albums(&self) -> Vec<Album> {
    let command = MpdCommand::list_albums(&self.capabilities());
    let mut albums = self.fetch(command, AlbumParser::default()).await;
    albums.retain(|album| !album.name.is_empty());
    albums
  }

  /// Albums with tracks below `path`.
  pub async fn albums_in_path(&self, path: &str) -> Vec<Album> {
    let command = MpdCommand::list_albums_in_path(path, &self.capabilities());
    let mut albums = self.fetch(command, AlbumParser::default()).await;
    albums.retain(|album| !album.name.is_empty());
    albums
  }

  /// Albums where `artist` is the artist or the album artist.
  pub async fn artist_albums(&self, artist: &str) -> Vec<Album> {
    let mut session = self.inner.session.lock().await;
    self.inner.artist_albums(&mut session, artist).await
  }

  /// All artists, grouped by MusicBrainz id when supported.
  pub async fn artists(&self) -> Vec<Artist> {
    let caps = self.capabilities();
    let group = caps.has_musicbrainz_tags() && caps.has_list_group();
    self
      .fetch(MpdCommand::list_artists(group), ArtistParser::new(group))
      .await
  }

  /// All album artists, grouped by MusicBrainz id when supported.
  pub async fn album_artists(&self) -> Vec<Artist> {
    let caps = self.capabilities();
    let group = caps.has_musicbrainz_tags() && caps.has_list_group();
    self
      .fetch(MpdCommand::list_album_artists(group), ArtistParser::new(group))
      .await
  }

  /// Every file in the library.
  pub async fn all_tracks(&self) -> Vec<FileEntry> {
    self
      .fetch(MpdCommand::listallinfo(), TrackParser::default())
      .await
  }

  /// Tracks of an album, optionally narrowed to one release by `mbid`.
  pub async fn album_tracks(&self, album: &str, mbid: &str) -> Vec<FileEntry> {
    let parser = TrackParser::with_filter(TrackFilter::new("", mbid));
    let mut tracks = self.fetch(MpdCommand::find_album(album), parser).await;
    tracks.sort_by(FileEntry::cmp_by_album_index);
    tracks
  }

  /// Tracks of an album by `artist`, in disc and track order.
  pub async fn artist_album_tracks(&self, album: &str, artist: &str, mbid: &str) -> Vec<FileEntry> {
    let mut session = self.inner.session.lock().await;
    self
      .inner
      .artist_album_tracks(&mut session, album, artist, mbid)
      .await
  }

  /// Directory listing, directories first.
  pub async fn files(&self, path: &str) -> Vec<FileEntry> {
    let mut entries = self
      .fetch(MpdCommand::lsinfo(path), TrackParser::default())
      .await;
    entries.sort();
    entries
  }

  /// Case-insensitive search on one tag.
  pub async fn search(&self, term: &str, kind: SearchType) -> Vec<FileEntry> {
    self
      .fetch(MpdCommand::search(term, kind), TrackParser::default())
      .await
  }

  // Playlists

  /// Stored playlists, sorted by name.
  pub async fn playlists(&self) -> Vec<FileEntry> {
    let mut playlists = self
      .fetch(MpdCommand::listplaylists(), TrackParser::default())
      .await;
    playlists.sort();
    playlists
  }

  /// Tracks of stored playlist `name`.
  pub async fn saved_playlist(&self, name: &str) -> Vec<FileEntry> {
    self
      .fetch(MpdCommand::listplaylistinfo(name), TrackParser::default())
      .await
  }

  /// The whole queue.
  pub async fn current_playlist(&self) -> Vec<FileEntry> {
    self
      .fetch(MpdCommand::playlistinfo(), TrackParser::default())
      .await
  }

  /// Queue positions `start..end`. Old servers get the full queue sliced.
  pub async fn current_playlist_window(&self, start: u32, end: u32) -> Vec<FileEntry> {
    if self.capabilities().has_ranged_current_playlist() {
      return self
        .fetch(
          MpdCommand::playlistinfo_window(start, end),
          TrackParser::default(),
        )
        .await;
    }

    let queue = self.current_playlist().await;
    let end = (end as usize).min(queue.len());
    let start = (start as usize).min(end);
    queue[start..end].to_vec()
  }

  /// Queue entries for `uri`.
  pub async fn playlist_find(&self, uri: &str) -> Vec<FileEntry> {
    self
      .fetch(MpdCommand::playlist_find_uri(uri), TrackParser::default())
      .await
  }

  // Status

  /// Player status, `None` when unavailable.
  pub async fn status(&self) -> Option<CurrentStatus> {
    self
      .fetch_one(MpdCommand::status(), StatusParser::default())
      .await
  }

  /// Database statistics.
  pub async fn statistics(&self) -> Option<Statistics> {
    self
      .fetch_one(MpdCommand::stats(), StatsParser::default())
      .await
  }

  /// The playing or paused track.
  pub async fn current_song(&self) -> Option<Track> {
    let mut entries = self
      .fetch_one(MpdCommand::current_song(), TrackParser::default())
      .await?;
    if entries.len() == 1 {
      entries.pop().and_then(FileEntry::into_track)
    } else {
      None
    }
  }

  /// Audio outputs.
  pub async fn outputs(&self) -> Vec<Output> {
    self
      .fetch(MpdCommand::outputs(), OutputParser::default())
      .await
  }

  // Playback

  /// Pause or resume playback.
  pub async fn pause(&self, pause: bool) -> Result<(), MpdError> {
    self.run(MpdCommand::pause(pause)).await
  }

  /// Skip to the next queue entry.
  pub async fn next(&self) -> Result<(), MpdError> {
    self.run(MpdCommand::next()).await
  }

  /// Go back to the previous queue entry.
  pub async fn previous(&self) -> Result<(), MpdError> {
    self.run(MpdCommand::previous()).await
  }

  /// Stop playback.
  pub async fn stop(&self) -> Result<(), MpdError> {
    self.run(MpdCommand::stop()).await
  }

  /// Toggle random mode.
  pub async fn set_random(&self, on: bool) -> Result<(), MpdError> {
    self.run(MpdCommand::random(on)).await
  }

  /// Toggle repeat mode.
  pub async fn set_repeat(&self, on: bool) -> Result<(), MpdError> {
    self.run(MpdCommand::repeat(on)).await
  }

  /// Toggle single mode.
  pub async fn set_single(&self, on: bool) -> Result<(), MpdError> {
    self.run(MpdCommand::single(on)).await
  }

  /// Toggle consume mode.
  pub async fn set_consume(&self, on: bool) -> Result<(), MpdError> {
    self.run(MpdCommand::consume(on)).await
  }

  /// Play queue position `index`.
  pub async fn play(&self, index: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::play(index)).await
  }

  /// Seek within the current song.
  pub async fn seek(&self, seconds: u32) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }
    let status = self
      .inner
      .fetch_one(&mut session, MpdCommand::status(), StatusParser::default())
      .await
      .ok_or(MpdError::NotReady)?;
    let index = status.current_song_index.ok_or(MpdError::NoCurrentSong)?;
    self
      .inner
      .run(&mut session, MpdCommand::seek(index, seconds))
      .await
  }

  /// Clamped to 0..=100.
  pub async fn set_volume(&self, volume: i32) -> Result<(), MpdError> {
    self.run(MpdCommand::set_volume(volume)).await
  }

  /// Flip output `id` on or off.
  pub async fn toggle_output(&self, id: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::toggle_output(id)).await
  }

  /// Rescan `path`, or the whole library.
  pub async fn update_database(&self, path: Option<&str>) -> Result<(), MpdError> {
    self.run(MpdCommand::update(path)).await
  }

  // Queue

  /// Append the tracks among `entries` with one command list.
  pub async fn add_tracks(&self, entries: &[FileEntry]) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    self.inner.add_entries(&mut session, entries).await
  }

  /// Append `uris` with one command list.
  pub async fn add_uris<S: AsRef<str>>(&self, uris: &[S]) -> Result<(), MpdError> {
    let commands: Vec<MpdCommand> = uris.iter().map(|uri| MpdCommand::add(uri.as_ref())).collect();
    self.send_command_list(commands.into_iter().collect()).await
  }

  /// Append one album of `artist`, in disc and track order.
  pub async fn add_album_tracks(&self, album: &str, artist: &str, mbid: &str) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }
    let tracks = self
      .inner
      .artist_album_tracks(&mut session, album, artist, mbid)
      .await;
    self.inner.add_entries(&mut session, &tracks).await
  }

  /// Append every album of `artist`. Keeps going after a failed album and
  /// reports the last failure.
  pub async fn add_artist(&self, artist: &str) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }

    let albums = self.inner.artist_albums(&mut session, artist).await;
    let mut result = Ok(());
    for album in albums {
      let tracks = self
        .inner
        .artist_album_tracks(&mut session, &album.name, artist, "")
        .await;
      if let Err(e) = self.inner.add_entries(&mut session, &tracks).await {
        log::warn!("Could not add album {}: {}", album.name, e);
        result = Err(e);
      }
    }
    result
  }

  /// Add a file or a whole directory.
  pub async fn add_song(&self, uri: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::add(uri)).await
  }

  /// Insert `uri` at queue position `index`.
  pub async fn add_song_at(&self, uri: &str, index: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::add_at(uri, index)).await
  }

  /// Enqueue search results, server side when `searchadd` is available.
  pub async fn add_search_results(&self, term: &str, kind: SearchType) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    if self.capabilities().has_search_add() {
      return self
        .inner
        .run(&mut session, MpdCommand::search_add(term, kind))
        .await;
    }

    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }
    let results = self
      .inner
      .fetch(&mut session, MpdCommand::search(term, kind), TrackParser::default())
      .await;
    self.inner.add_entries(&mut session, &results).await
  }

  /// Empty the queue.
  pub async fn clear_playlist(&self) -> Result<(), MpdError> {
    self.run(MpdCommand::clear()).await
  }

  /// Shuffle the queue.
  pub async fn shuffle_playlist(&self) -> Result<(), MpdError> {
    self.run(MpdCommand::shuffle()).await
  }

  /// Remove queue position `index`.
  pub async fn remove_index(&self, index: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::delete(index)).await
  }

  /// Remove queue positions `start..=end`.
  pub async fn remove_range(&self, start: u32, end: u32) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    if !session.is_connected() {
      return Err(MpdError::NotReady);
    }
    if end < start {
      return Ok(());
    }

    if self.capabilities().has_current_playlist_remove_range() {
      let command = match end.checked_add(1) {
        Some(stop) => MpdCommand::delete_range(start, stop),
        None => MpdCommand::delete_from(start),
      };
      return self.inner.run(&mut session, command).await;
    }

    // One delete per entry that actually exists; later entries move up after
    // each delete.
    let status = self
      .inner
      .fetch_one(&mut session, MpdCommand::status(), StatusParser::default())
      .await
      .ok_or(MpdError::NotReady)?;
    let Some(last) = status.playlist_length.checked_sub(1) else {
      return Ok(());
    };
    if start > last {
      return Ok(());
    }
    let count = end.min(last) - start + 1;
    let commands: Vec<MpdCommand> = (0..count).map(|_| MpdCommand::delete(start)).collect();
    self.inner.run_list(&mut session, &commands).await
  }

  /// Move the entry at `from` to `to`.
  pub async fn move_song(&self, from: u32, to: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::move_song(from, to)).await
  }

  // Stored playlists

  /// Save the queue as stored playlist `name`.
  pub async fn save_playlist(&self, name: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::save(name)).await
  }

  /// Append stored playlist `name` to the queue.
  pub async fn load_playlist(&self, name: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::load(name)).await
  }

  /// Delete stored playlist `name`.
  pub async fn remove_playlist(&self, name: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::rm(name)).await
  }

  /// Append `uri` to stored playlist `name`.
  pub async fn add_to_playlist(&self, name: &str, uri: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::playlist_add(name, uri)).await
  }

  /// Remove `position` from stored playlist `name`.
  pub async fn remove_from_playlist(&self, name: &str, position: u32) -> Result<(), MpdError> {
    self.run(MpdCommand::playlist_delete(name, position)).await
  }

  // Stickers

  /// Value of sticker `name` on a song.
  pub async fn sticker(&self, uri: &str, name: &str) -> Option<String> {
    self
      .fetch_one(MpdCommand::sticker_get(uri, name), StickerParser::new(name))
      .await
      .flatten()
  }

  /// Set sticker `name` on a song.
  pub async fn set_sticker(&self, uri: &str, name: &str, value: &str) -> Result<(), MpdError> {
    self.run(MpdCommand::sticker_set(uri, name, value)).await
  }

  /// URIs below `path` carrying sticker `name`, optionally with `value`.
  pub async fn sticker_files(&self, path: &str, name: &str, value: Option<&str>) -> Vec<String> {
    self
      .fetch(
        MpdCommand::sticker_find(path, name, value),
        ValueListParser::files(),
      )
      .await
  }

  /// Rating sticker of a song.
  pub async fn rating(&self, uri: &str) -> Option<u32> {
    let value = self.sticker(uri, RATING_STICKER).await?;
    match value.trim().parse() {
      Ok(rating) => Some(rating),
      Err(e) => {
        log::warn!("Invalid rating {:?} on {}: {}", value, uri, e);
        None
      }
    }
  }

  /// Store a rating sticker on a song.
  pub async fn set_rating(&self, uri: &str, rating: u32) -> Result<(), MpdError> {
    self
      .set_sticker(uri, RATING_STICKER, &rating.to_string())
      .await
  }

  // Passthrough

  /// Send a command verbatim and return its data lines.
  pub async fn raw(&self, command: &str) -> Result<Vec<String>, MpdError> {
    let mut session = self.inner.session.lock().await;
    let reply = self
      .inner
      .execute(&mut session, MpdCommand::new(command), LinesParser::default())
      .await?;
    reply.into_result()
  }

  /// Apply several commands with one round trip.
  pub async fn send_command_list(&self, list: CommandList) -> Result<(), MpdError> {
    let mut session = self.inner.session.lock().await;
    self.inner.run_list(&mut session, &list.commands).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mpd::error::AckError;

  #[test]
  fn test_command_list_collects() {
    let mut list: CommandList = ["next", "play 2"].into_iter().map(MpdCommand::from).collect();
    list.push("stop");
    assert_eq!(list.len(), 3);
    assert!(!list.is_empty());
    assert_eq!(list.commands[2].as_str(), "stop");
    assert!(CommandList::new().is_empty());
  }

  #[test]
  fn test_reply_status_classifies_acks() {
    assert!(ReplyStatus::Ok.into_result().is_ok());

    let ack = AckError::parse("ACK [2@0] {list} not able to parse args");
    assert!(matches!(
      ReplyStatus::Ack(ack).into_result(),
      Err(MpdError::CapabilityMismatch(_))
    ));

    let ack = AckError::parse("ACK [50@0] {load} No such playlist");
    assert!(matches!(ReplyStatus::Ack(ack).into_result(), Err(MpdError::Ack(_))));
    assert!(matches!(
      ReplyStatus::Closed.into_result(),
      Err(MpdError::Transport(TransportError::Closed))
    ));
  }

  #[test]
  fn test_default_options() {
    let options = ConnectionOptions::default();
    assert_eq!(options.idle_delay, Duration::from_millis(500));
    assert_eq!(options.response_timeout, Duration::from_secs(5));
    assert_eq!(options.event_capacity, 64);
  }

  #[tokio::test]
  async fn test_new_connection_is_disconnected() {
    let conn = MpdConnection::new(ConnectionOptions::default());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.is_connected());
    assert_eq!(*conn.capabilities(), Capabilities::default());
    assert!(conn.raw("status").await.is_err());
    assert!(conn.current_playlist_window(0, 10).await.is_empty());
    assert!(conn.rating("a.mp3").await.is_none());
  }
}
