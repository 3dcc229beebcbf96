// Serial terminal core.
//
// Layering, leaves first:
// - `config` / `profiles`: session configuration and named profile documents
// - `io`: physical and virtual transports behind one `Transport`
// - `scheduler`: timers with cancellable handles, driven by the host loop
// - `poll` / `transmit`: the read loop and the repeat sender
// - `session_log` / `session`: the log and the session tying it all together
// - `console` / `host`: the line-command front end and its real-time loop

#[macro_use]
pub mod logging;

pub mod config;
pub mod console;
pub mod host;
pub mod io;
pub mod poll;
pub mod port_tracker;
pub mod profiles;
pub mod scheduler;
pub mod session;
pub mod session_log;
pub mod settings;
pub mod transmit;

pub use config::{Config, Theme, COMMAND_SLOTS, VIRTUAL_PORT};
pub use io::{LinkStatus, Transport, TransportError, TransportState};
pub use profiles::{ProfileError, ProfileStore};
pub use scheduler::{Scheduler, TimerQueue};
pub use session::{Handlers, Session, SessionError, SessionOptions};
pub use session_log::SessionLog;
