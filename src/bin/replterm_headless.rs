//! replterm headless runner
//!
//! Feeds a byte stream through a session over an in-memory buffer and prints
//! the resulting state. Input comes from a file, stdin, or a spawned program.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use replterm::session::{spawn_child, NullSink, Reader};
use replterm::{Config, Session, Snapshot, TextBuffer};

/// Interval between drains of the reader channel
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(name = "replterm-headless")]
#[command(version)]
#[command(about = "Run output through the REPL terminal engine and print the buffer", long_about = None)]
struct Args {
    /// Read input from this file instead of stdin
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Feed input in chunks of this many characters
    #[arg(short = 'n', long, value_name = "CHARS")]
    chunk_size: Option<usize>,

    /// Output a JSON snapshot instead of the buffer text
    #[arg(short, long)]
    json: bool,

    /// Path to a config file (default: ~/.config/replterm/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Line to send to the program once it starts; may be repeated
    #[arg(short, long, value_name = "LINE")]
    send: Vec<String>,

    /// Run this program and read its output until it exits
    #[arg(short, long, num_args = 1.., value_name = "CMD", allow_hyphen_values = true)]
    exec: Vec<String>,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::load_or_default(),
    };

    let result = if args.exec.is_empty() {
        run_stream(&args, config)
    } else {
        run_program(&args, config)
    };
    match result {
        Ok(snapshot) => print(&snapshot, args.json),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Feed a file or stdin through a session
fn run_stream(args: &Args, config: Config) -> replterm::Result<Snapshot> {
    let data = match &args.input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            data
        }
    };
    let input = String::from_utf8_lossy(&data);

    let mut session = Session::new(TextBuffer::new(), NullSink, config);
    match args.chunk_size {
        Some(size) if size > 0 => {
            let chars: Vec<char> = input.chars().collect();
            for chunk in chars.chunks(size) {
                session.write(&chunk.iter().collect::<String>())?;
            }
        }
        _ => session.write(&input)?,
    }
    session.flush()?;
    Ok(Snapshot::from_session(&session))
}

/// Run a program and pump its output until it exits
fn run_program(args: &Args, config: Config) -> replterm::Result<Snapshot> {
    let mut command = Command::new(&args.exec[0]);
    command.args(&args.exec[1..]);
    let (mut child, source, sink) = spawn_child(&mut command, config.read_buffer)?;
    tracing::debug!(pid = child.id(), "spawned {}", args.exec[0]);

    let reader = Reader::spawn(source)?;
    let mut session = Session::new(TextBuffer::new(), sink, config);
    for line in &args.send {
        session.type_input(line)?;
        session.commit_input()?;
    }
    // Closing stdin lets the program see end of input
    let (mut session, sink) = session.with_sink(NullSink);
    drop(sink);

    while session.pump(reader.receiver())? {
        thread::sleep(POLL_INTERVAL);
    }
    reader.join()?;
    let status = child.wait()?;
    tracing::debug!(%status, "program exited");
    Ok(Snapshot::from_session(&session))
}

fn print(snapshot: &Snapshot, json: bool) -> ExitCode {
    if json {
        match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", snapshot.text);
        if !snapshot.text.ends_with('\n') {
            println!();
        }
    }
    ExitCode::SUCCESS
}
