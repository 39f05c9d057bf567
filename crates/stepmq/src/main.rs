mod cmd;
mod exit;

use clap::Parser;
use tracing::Level;

use crate::cmd::Command;

#[derive(Parser, Debug)]
#[command(name = "stepmq", version, about = "Reliable request/reply messaging CLI")]
struct Cli {
    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: Level,

    /// Emit logs as JSON (stderr).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(level: Level, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_json);

    match cmd::run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
