// serialtap: line-oriented serial terminal on the console.

use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use serialtap_lib::host::{spawn_stdin_reader, Host};
use serialtap_lib::io::{list_serial_ports, port_needs_selection, ports_for_picker, SerialPortInfo};
use serialtap_lib::logging::{init_file_logging, stop_file_logging};
use serialtap_lib::settings::{default_settings_path, load_settings_or_default, save_settings};
use serialtap_lib::{tlog, Config, Handlers, LinkStatus, Session, SessionOptions, TimerQueue};

#[derive(Parser, Debug)]
#[command(name = "serialtap", version, about = "Serial terminal with quick-send slots and repeat")]
struct Args {
    /// Port to open (device path or VIRTUAL), overrides the profile
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides the profile
    #[arg(short, long)]
    baud: Option<u32>,

    /// Profile to load instead of the default profile
    #[arg(long)]
    profile: Option<String>,

    /// Settings file (default: <config dir>/serialtap/settings.toml)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Write diagnostics to a log file in the log directory
    #[arg(long)]
    log_file: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings_or_default(&settings_path);
    if !settings_path.exists() {
        // First run: write the defaults so there is a file to edit
        if let Err(e) = save_settings(&settings_path, &settings) {
            tlog!("[settings] {}", e);
        }
    }

    if args.log_file || settings.file_logging {
        init_file_logging(&settings.log_dir())?;
    }

    if args.list_ports {
        for port in list_serial_ports()? {
            println!("{}", port.describe());
        }
        return Ok(());
    }

    let store = settings.profile_store();
    let mut config = match &args.profile {
        Some(name) => store.load(name)?,
        None => match store.load_default() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                tlog!("[profile] {}, using defaults", e);
                Config::default()
            }
        },
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(baud) = args.baud {
        config.baud = baud;
    }
    config.validate()?;

    if !config.is_virtual() {
        let ports = ports_for_picker(list_serial_ports());
        if port_needs_selection(&config.port, &ports) {
            config.port = choose_port(&config.port, &ports)?;
        }
    }

    let mut queue = TimerQueue::new();
    let handlers = Handlers::new(
        |bytes: &[u8]| {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(String::from_utf8_lossy(bytes).as_bytes());
            let _ = stdout.flush();
        },
        |status: &LinkStatus| println!("[{}]", status),
    );
    let session = Session::start(config, SessionOptions::from(&settings), handlers, &mut queue);
    println!("type :help for commands");

    let mut host = Host::new(queue, session, store, settings.log_dir(), |msg: &str| {
        println!("{}", msg)
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;
    rt.block_on(host.run(spawn_stdin_reader()));
    stop_file_logging();
    Ok(())
}

/// Ask on stdin for a port when the configured one is not present.
fn choose_port(configured: &str, ports: &[SerialPortInfo]) -> Result<String, String> {
    println!("Port '{}' is not available. Choose a port:", configured);
    for (i, port) in ports.iter().enumerate() {
        println!("  {}) {}", i, port.describe());
    }
    print!("> ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read choice: {}", e))?;
    let choice = line.trim();

    if let Ok(index) = choice.parse::<usize>() {
        if let Some(port) = ports.get(index) {
            return Ok(port.port_name.clone());
        }
    }
    ports
        .iter()
        .find(|p| p.port_name == choice)
        .map(|p| p.port_name.clone())
        .ok_or_else(|| format!("No such port: '{}'", choice))
}
