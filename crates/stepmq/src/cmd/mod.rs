use std::path::PathBuf;

use clap::{Args, Subcommand};
use stepmq_wire::MessageKind;

use crate::exit::CliResult;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a consumer and print received messages.
    Listen(ListenArgs),
    /// Run a producer and publish one or more messages.
    Send(SendArgs),
    /// Show version information.
    Version,
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args),
        Command::Send(args) => send::run(args),
        Command::Version => version::run(),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Identity token to attach to the endpoint.
    #[arg(long)]
    pub identity: Option<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print messages as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Correlation id of the first message.
    #[arg(long, default_value = "1")]
    pub id: u64,
    /// Message kind (message, broadcast, kill, offline).
    #[arg(long, default_value = "message")]
    pub kind: MessageKind,
    /// Extension payload as a string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the extension payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Publish the message N times with consecutive ids.
    #[arg(long, default_value = "1")]
    pub repeat: u64,
    /// Maximum time in milliseconds to wait for the queue to drain.
    #[arg(long, default_value = "5000")]
    pub linger_ms: u64,
}
