// src/session.rs
//
// One terminal session: a configuration, the transport built from it, the
// poll loop and repeat sender driving it, and the session log.
//
// Everything runs on the host loop's thread. Operations that need timers take
// the host's `Scheduler`; timers that come due are handed back through
// `on_timer`. Received bytes and status changes go out through the handlers
// registered at start.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, Theme, COMMAND_SLOTS};
use crate::io::{
    LinkStatus, PortOpener, SystemPortOpener, Transport, TransportError, TransportState,
};
use crate::poll::{PollOutcome, PollScheduler, DEFAULT_POLL_INTERVAL};
use crate::profiles::{ProfileError, ProfileStore};
use crate::scheduler::{FiredTimer, Scheduler, TimerKind};
use crate::session_log::{LogError, SendOrigin, SessionLog};
use crate::settings::AppSettings;
use crate::transmit::{RepeatRejected, RepeatSender};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("cannot start repeat: {0}")]
    Repeat(RepeatRejected),

    #[error("{0}")]
    Config(String),

    #[error("session is closed")]
    Closed,
}

impl From<SessionError> for String {
    fn from(e: SessionError) -> String {
        e.to_string()
    }
}

/// Callbacks into the display side. Both are called synchronously from
/// session operations and must not block.
pub struct Handlers {
    on_receive: Box<dyn FnMut(&[u8])>,
    on_status: Box<dyn FnMut(&LinkStatus)>,
}

impl Handlers {
    pub fn new(
        on_receive: impl FnMut(&[u8]) + 'static,
        on_status: impl FnMut(&LinkStatus) + 'static,
    ) -> Self {
        Self {
            on_receive: Box::new(on_receive),
            on_status: Box::new(on_status),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    /// Appended to every sent line
    pub line_terminator: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            line_terminator: "\r".to_string(),
        }
    }
}

impl From<&AppSettings> for SessionOptions {
    fn from(settings: &AppSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            line_terminator: settings.line_terminator.clone(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    config: Config,
    transport: Transport,
    opener: Box<dyn PortOpener>,
    log: SessionLog,
    poll: PollScheduler,
    repeat: RepeatSender,
    last_command: String,
    line_terminator: String,
    handlers: Handlers,
    closed: bool,
}

impl Session {
    /// Open the configured port through the OS and start polling.
    pub fn start(
        config: Config,
        options: SessionOptions,
        handlers: Handlers,
        sched: &mut dyn Scheduler,
    ) -> Session {
        Self::start_with(config, options, Box::new(SystemPortOpener), handlers, sched)
    }

    /// Like `start`, opening physical ports through `opener`.
    pub fn start_with(
        config: Config,
        options: SessionOptions,
        opener: Box<dyn PortOpener>,
        handlers: Handlers,
        sched: &mut dyn Scheduler,
    ) -> Session {
        let transport = Transport::open_with(&config, opener.as_ref());
        let mut session = Session {
            config,
            transport,
            opener,
            log: SessionLog::new(),
            poll: PollScheduler::new(options.poll_interval),
            repeat: RepeatSender::new(),
            last_command: String::new(),
            line_terminator: options.line_terminator,
            handlers,
            closed: false,
        };
        session.activated(sched);
        session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport_state(&self) -> &TransportState {
        self.transport.state()
    }

    pub fn last_command(&self) -> &str {
        &self.last_command
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn hex_view(&self) -> &str {
        self.log.hex_view()
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat.is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ------------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------------

    /// Dispatch a timer that came due. Stale and post-close timers are no-ops.
    pub fn on_timer(&mut self, fired: FiredTimer, sched: &mut dyn Scheduler) {
        if self.closed {
            return;
        }
        match fired.kind {
            TimerKind::PollTick => {
                match self.poll.on_tick(fired.handle, &mut self.transport, sched) {
                    PollOutcome::Data(bytes) => self.deliver(&bytes),
                    PollOutcome::Failed(e) => self.report(LinkStatus::Disconnected(e.to_string())),
                    PollOutcome::Idle | PollOutcome::Stale => {}
                }
            }
            TimerKind::RepeatFire => {
                if self.repeat.on_fire(fired.handle, sched) {
                    self.fire_repeat(sched);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Transmit
    // ------------------------------------------------------------------------

    /// Send `text` plus the line terminator as a manual send and remember it
    /// as the last command. Empty text is ignored.
    pub fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        if text.is_empty() {
            return Ok(());
        }
        self.last_command = text.to_string();
        let line = self.last_command.clone();
        match self.transmit(&line, SendOrigin::Manual) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.report(LinkStatus::WriteFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Send the command stored in slot `index`. Returns `false` for an empty slot.
    pub fn send_slot(&mut self, index: usize) -> Result<bool, SessionError> {
        let text = self
            .config
            .command(index)
            .ok_or_else(|| slot_out_of_range(index))?
            .trim()
            .to_string();
        if text.is_empty() {
            return Ok(false);
        }
        self.send(&text)?;
        Ok(true)
    }

    pub fn set_command(&mut self, index: usize, text: &str) -> Result<(), SessionError> {
        self.config
            .set_command(index, text)
            .map_err(SessionError::Config)
    }

    /// Feed `text` (plus a newline) in as if the device had sent it.
    /// Only a virtual session accepts this; otherwise nothing is logged.
    pub fn inject_virtual(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let bytes = self.transport.inject_virtual(&format!("{}\n", text))?;
        self.deliver(&bytes);
        Ok(())
    }

    fn transmit(&mut self, line: &str, origin: SendOrigin) -> Result<(), TransportError> {
        let mut bytes = line.as_bytes().to_vec();
        bytes.extend_from_slice(self.line_terminator.as_bytes());

        let echo = self.transport.write(&bytes)?;
        self.log.record_sent(line, &bytes, origin);
        if let Some(echo) = echo {
            self.deliver(&echo);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Repeat
    // ------------------------------------------------------------------------

    /// Start repeating the last command with the configured interval and
    /// count, replacing any running repeat.
    pub fn start_repeat(&mut self, sched: &mut dyn Scheduler) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.repeat
            .start(
                &self.last_command,
                self.config.repeat_interval_secs,
                self.config.repeat_limit(),
                sched,
            )
            .map_err(SessionError::Repeat)
    }

    /// Stop an active repeat or start one. Returns whether a repeat is now running.
    pub fn toggle_repeat(&mut self, sched: &mut dyn Scheduler) -> Result<bool, SessionError> {
        if self.repeat.stop(sched) {
            return Ok(false);
        }
        self.start_repeat(sched)?;
        Ok(true)
    }

    pub fn stop_repeat(&mut self, sched: &mut dyn Scheduler) -> bool {
        self.repeat.stop(sched)
    }

    fn fire_repeat(&mut self, sched: &mut dyn Scheduler) {
        let line = self.last_command.clone();
        if let Err(e) = self.transmit(&line, SendOrigin::Repeat) {
            if e.is_permanent() {
                self.repeat.stop(sched);
                self.report(LinkStatus::RepeatStopped(e.to_string()));
            } else {
                self.report(LinkStatus::WriteFailed(e.to_string()));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    pub fn set_theme(&mut self, theme: Theme) {
        self.config.theme = theme;
    }

    /// Baud for the next open of the port (profile load or `reconnect`).
    pub fn set_baud(&mut self, baud: u32) -> Result<(), SessionError> {
        if baud == 0 {
            return Err(SessionError::Config(
                "baud must be a positive integer".to_string(),
            ));
        }
        self.config.baud = baud;
        Ok(())
    }

    /// Interval and count used by the next `start_repeat`.
    pub fn set_repeat_settings(&mut self, interval_secs: f64, count: u32) -> Result<(), SessionError> {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(SessionError::Config(format!(
                "repeat interval must be positive (got {})",
                interval_secs
            )));
        }
        self.config.repeat_interval_secs = interval_secs;
        self.config.repeat_count = count;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Log
    // ------------------------------------------------------------------------

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn export_log(&self, path: &Path) -> Result<(), SessionError> {
        Ok(self.log.export_to(path)?)
    }

    pub fn save_log_auto(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        Ok(self.log.save_auto(dir)?)
    }

    // ------------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------------

    pub fn save_profile(&self, store: &ProfileStore, name: &str) -> Result<PathBuf, SessionError> {
        Ok(store.save(name, &self.config)?)
    }

    pub fn save_default(&self, store: &ProfileStore) -> Result<PathBuf, SessionError> {
        Ok(store.save_default(&self.config)?)
    }

    /// Replace the configuration with profile `name` and reopen the port.
    /// On a load failure the current configuration and transport are kept.
    pub fn load_profile(
        &mut self,
        store: &ProfileStore,
        name: &str,
        sched: &mut dyn Scheduler,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let config = store.load(name)?;
        self.apply_config(config, sched)
    }

    pub fn load_profile_path(
        &mut self,
        store: &ProfileStore,
        path: &Path,
        sched: &mut dyn Scheduler,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let config = store.load_path(path)?;
        self.apply_config(config, sched)
    }

    /// Switch to `config`. The old transport is closed and its timers
    /// cancelled before the new transport is opened.
    pub fn apply_config(&mut self, config: Config, sched: &mut dyn Scheduler) -> Result<(), SessionError> {
        self.ensure_open()?;
        config.validate().map_err(SessionError::Config)?;

        self.deactivate(sched);
        self.config = config;
        self.transport = Transport::open_with(&self.config, self.opener.as_ref());
        self.activated(sched);
        Ok(())
    }

    /// Build a fresh transport from the current configuration.
    pub fn reconnect(&mut self, sched: &mut dyn Scheduler) -> Result<(), SessionError> {
        let config = self.config.clone();
        self.apply_config(config, sched)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stop everything and release the port. Safe to call more than once.
    pub fn close(&mut self, sched: &mut dyn Scheduler) {
        if self.closed {
            return;
        }
        self.deactivate(sched);
        self.closed = true;
        self.report(LinkStatus::Closed);
    }

    fn activated(&mut self, sched: &mut dyn Scheduler) {
        let status = match self.transport.state() {
            TransportState::Virtual => LinkStatus::Virtual,
            TransportState::Connected => LinkStatus::Connected(format!(
                "{} @ {}",
                self.transport.port(),
                self.transport.baud()
            )),
            TransportState::Disconnected(reason) => LinkStatus::OpenFailed(reason.clone()),
        };
        let usable = !status.is_error();
        self.report(status);
        if usable {
            self.poll.start(sched);
        }
    }

    fn deactivate(&mut self, sched: &mut dyn Scheduler) {
        self.repeat.stop(sched);
        self.poll.cancel(sched);
        self.transport.close();
    }

    fn deliver(&mut self, bytes: &[u8]) {
        self.log.record_received(bytes);
        (self.handlers.on_receive)(bytes);
    }

    fn report(&mut self, status: LinkStatus) {
        tlog!("[session] {}", status);
        (self.handlers.on_status)(&status);
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}

fn slot_out_of_range(index: usize) -> SessionError {
    SessionError::Config(format!(
        "Command slot {} out of range (0-{})",
        index,
        COMMAND_SLOTS - 1
    ))
}
