// src/console.rs
//
// Line commands for the console front end. A line that does not start with
// ':' is sent as-is; "::" escapes a literal leading colon.

use std::path::PathBuf;

pub const HELP: &str = "\
text              send text (plus line terminator)
::text            send text starting with ':'
:N                send command slot N (0-39)
:set N text       store text in slot N
:slots            list non-empty slots
:repeat           toggle repeat of the last sent line
:stop             stop repeating
:inject text      feed text in as received (virtual port only)
:hex              show the last received chunk as hex
:clear            clear the session log
:theme name       dark | amber | blue | white_on_black | white_on_blue
:baud n           baud for the next :reconnect or profile load
:interval secs    repeat interval
:count n          repeat count (0 = until stopped)
:reconnect        reopen the port with the current settings
:ports            list serial ports
:save name        save profile
:load name        load profile
:profiles         list saved profiles
:default          save current settings as the startup profile
:log path         export the session log to path
:savelog          save the session log with a timestamped name
:help             this text
:quit             exit";

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    Empty,
    Send(String),
    SendSlot(usize),
    SetCommand(usize, String),
    Slots,
    Repeat,
    Stop,
    Inject(String),
    Hex,
    Clear,
    Theme(String),
    Baud(u32),
    Interval(f64),
    Count(u32),
    Reconnect,
    Ports,
    Save(String),
    Load(String),
    Profiles,
    SaveDefault,
    ExportLog(PathBuf),
    SaveLog,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Empty);
    }
    if let Some(escaped) = line.strip_prefix("::") {
        return Ok(ConsoleCommand::Send(format!(":{}", escaped)));
    }
    let Some(body) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Send(line.to_string()));
    };

    let (word, rest) = match body.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (body, ""),
    };

    if let Ok(slot) = word.parse::<usize>() {
        return Ok(ConsoleCommand::SendSlot(slot));
    }

    let cmd = match word {
        "set" => {
            let (slot, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            ConsoleCommand::SetCommand(parse_num(slot, "slot")?, text.trim().to_string())
        }
        "slots" => ConsoleCommand::Slots,
        "repeat" => ConsoleCommand::Repeat,
        "stop" => ConsoleCommand::Stop,
        "inject" => ConsoleCommand::Inject(required(rest, "inject")?),
        "hex" => ConsoleCommand::Hex,
        "clear" => ConsoleCommand::Clear,
        "theme" => ConsoleCommand::Theme(required(rest, "theme")?),
        "baud" => ConsoleCommand::Baud(parse_num(rest, "baud")?),
        "interval" => ConsoleCommand::Interval(parse_num(rest, "interval")?),
        "count" => ConsoleCommand::Count(parse_num(rest, "count")?),
        "reconnect" => ConsoleCommand::Reconnect,
        "ports" => ConsoleCommand::Ports,
        "save" => ConsoleCommand::Save(required(rest, "save")?),
        "load" => ConsoleCommand::Load(required(rest, "load")?),
        "profiles" => ConsoleCommand::Profiles,
        "default" => ConsoleCommand::SaveDefault,
        "log" => ConsoleCommand::ExportLog(PathBuf::from(required(rest, "log")?)),
        "savelog" => ConsoleCommand::SaveLog,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("Unknown command ':{}' (try :help)", other)),
    };
    Ok(cmd)
}

fn required(rest: &str, what: &str) -> Result<String, String> {
    if rest.is_empty() {
        return Err(format!(":{} needs an argument", what));
    }
    Ok(rest.to_string())
}

fn parse_num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("Invalid {}: '{}'", what, text.trim()))
}
