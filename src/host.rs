// src/host.rs
//
// Real-time host loop for the console front end.
//
// The loop owns the timer queue and maps it onto wall time: every iteration
// dispatches the timers that came due since `epoch`, then waits for either
// the next deadline or a line of input. Input arrives over a channel fed by a
// plain thread, so blocking stdin reads never stall timers.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::config::Theme;
use crate::console::{self, ConsoleCommand, HELP};
use crate::io::list_serial_ports;
use crate::profiles::ProfileStore;
use crate::scheduler::{Scheduler, TimerQueue};
use crate::session::Session;

/// Longest wait when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Host {
    queue: TimerQueue,
    epoch: Instant,
    session: Session,
    store: ProfileStore,
    log_dir: PathBuf,
    out: Box<dyn FnMut(&str)>,
}

impl Host {
    /// `queue` must be the one `session` was started with.
    pub fn new(
        queue: TimerQueue,
        session: Session,
        store: ProfileStore,
        log_dir: PathBuf,
        out: impl FnMut(&str) + 'static,
    ) -> Self {
        Self {
            epoch: Instant::now() - queue.now(),
            queue,
            session,
            store,
            log_dir,
            out: Box::new(out),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until `:quit` or end of input, then close the session.
    pub async fn run(&mut self, mut input: mpsc::UnboundedReceiver<String>) {
        loop {
            self.dispatch_due();
            let wait = self
                .queue
                .next_deadline()
                .map(|due| due.saturating_sub(self.epoch.elapsed()))
                .unwrap_or(IDLE_WAIT)
                .min(IDLE_WAIT);

            tokio::select! {
                line = input.recv() => {
                    let Some(line) = line else { break };
                    if self.handle_line(&line) == Flow::Quit {
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
        self.dispatch_due();
        self.session.close(&mut self.queue);
        tlog!("[host] Stopped");
    }

    /// Deliver every timer due by now.
    pub fn dispatch_due(&mut self) {
        let now = self.epoch.elapsed();
        while let Some(fired) = self.queue.pop_due(now) {
            self.session.on_timer(fired, &mut self.queue);
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Flow {
        self.dispatch_due();
        match console::parse(line) {
            Ok(cmd) => self.execute(cmd),
            Err(e) => {
                self.say(&e);
                Flow::Continue
            }
        }
    }

    fn execute(&mut self, cmd: ConsoleCommand) -> Flow {
        let q = &mut self.queue;
        let session = &mut self.session;
        let result: Result<Option<String>, String> = match cmd {
            ConsoleCommand::Empty => Ok(None),
            ConsoleCommand::Send(text) => session.send(&text).map(|_| None).map_err(String::from),
            ConsoleCommand::SendSlot(slot) => match session.send_slot(slot) {
                Ok(true) => Ok(None),
                Ok(false) => Ok(Some(format!("slot {} is empty", slot))),
                Err(e) => Err(e.into()),
            },
            ConsoleCommand::SetCommand(slot, text) => session
                .set_command(slot, &text)
                .map(|_| Some(format!("slot {} = '{}'", slot, text)))
                .map_err(String::from),
            ConsoleCommand::Slots => Ok(Some(
                session
                    .config()
                    .commands
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !c.is_empty())
                    .map(|(i, c)| format!("{:2}: {}", i, c))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
            ConsoleCommand::Repeat => session
                .toggle_repeat(q)
                .map(|on| Some(if on { "repeat on" } else { "repeat off" }.to_string()))
                .map_err(String::from),
            ConsoleCommand::Stop => {
                session.stop_repeat(q);
                Ok(Some("repeat off".to_string()))
            }
            ConsoleCommand::Inject(text) => session
                .inject_virtual(&text)
                .map(|_| None)
                .map_err(String::from),
            ConsoleCommand::Hex => Ok(Some(format!("HEX: {}", session.hex_view()))),
            ConsoleCommand::Clear => {
                session.clear_log();
                Ok(Some("log cleared".to_string()))
            }
            ConsoleCommand::Theme(name) => match Theme::from_name(&name) {
                Some(theme) => {
                    session.set_theme(theme);
                    let colours = theme.colours();
                    Ok(Some(format!(
                        "theme {} ({} on {})",
                        theme, colours.foreground, colours.background
                    )))
                }
                None => Err(format!(
                    "Unknown theme '{}' (one of: {})",
                    name,
                    Theme::ALL.iter().map(Theme::name).collect::<Vec<_>>().join(", ")
                )),
            },
            ConsoleCommand::Baud(baud) => session
                .set_baud(baud)
                .map(|_| Some(format!("baud {} (applies on :reconnect)", baud)))
                .map_err(String::from),
            ConsoleCommand::Interval(secs) => {
                let count = session.config().repeat_count;
                session
                    .set_repeat_settings(secs, count)
                    .map(|_| None)
                    .map_err(String::from)
            }
            ConsoleCommand::Count(count) => {
                let secs = session.config().repeat_interval_secs;
                session
                    .set_repeat_settings(secs, count)
                    .map(|_| None)
                    .map_err(String::from)
            }
            ConsoleCommand::Reconnect => session.reconnect(q).map(|_| None).map_err(String::from),
            ConsoleCommand::Ports => list_serial_ports().map(|ports| {
                Some(
                    ports
                        .iter()
                        .map(|p| p.describe())
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            }),
            ConsoleCommand::Save(name) => session
                .save_profile(&self.store, &name)
                .map(|path| Some(format!("saved {}", path.display())))
                .map_err(String::from),
            ConsoleCommand::Load(name) => session
                .load_profile(&self.store, &name, q)
                .map(|_| None)
                .map_err(String::from),
            ConsoleCommand::Profiles => self
                .store
                .list()
                .map(|names| Some(names.join("\n")))
                .map_err(String::from),
            ConsoleCommand::SaveDefault => session
                .save_default(&self.store)
                .map(|path| Some(format!("saved {}", path.display())))
                .map_err(String::from),
            ConsoleCommand::ExportLog(path) => session
                .export_log(&path)
                .map(|_| Some(format!("log written to {}", path.display())))
                .map_err(String::from),
            ConsoleCommand::SaveLog => session
                .save_log_auto(&self.log_dir)
                .map(|path| Some(format!("log written to {}", path.display())))
                .map_err(String::from),
            ConsoleCommand::Help => Ok(Some(HELP.to_string())),
            ConsoleCommand::Quit => return Flow::Quit,
        };

        match result {
            Ok(Some(msg)) => self.say(&msg),
            Ok(None) => {}
            Err(e) => self.say(&format!("error: {}", e)),
        }
        Flow::Continue
    }

    fn say(&mut self, msg: &str) {
        (self.out)(msg);
    }
}

/// Read stdin lines on a plain thread and forward them. The channel closes
/// at end of input.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
