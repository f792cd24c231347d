//! CLI for exercising xbridge peers and capture files.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod capture;
mod peer;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xbridge", version, about = "Tagged-value bridge tooling")]
struct Cli {
    /// Log protocol activity to stderr (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an echo peer that writes every message back unchanged.
    Serve(peer::ServeArgs),

    /// Send values to a peer and print its replies.
    ///
    /// Values are JSON, e.g. `{"Int32":5}` or `{"Objects":[{"String":"a"},"Null"]}`.
    Send(peer::SendArgs),

    /// Encode values into a capture file.
    Encode(capture::EncodeArgs),

    /// Decode and print every message in a capture file.
    Dump(capture::DumpArgs),

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for printed values.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// One `tag value` line per message.
    #[default]
    Table,
    /// One JSON document per line.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = cli.dispatch() {
        eprintln!("xbridge: {e:#}");
        std::process::exit(1);
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, or `debug` when verbose.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Serve(args) => peer::serve(&args),
            Command::Send(args) => peer::send(&args),
            Command::Encode(args) => capture::encode(&args),
            Command::Dump(args) => capture::dump(&args),
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "xbridge",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }
}

/// Parses a JSON argument into a value.
pub(crate) fn parse_value(arg: &str) -> Result<xbridge::Value> {
    serde_json::from_str(arg).map_err(|e| anyhow::anyhow!("invalid value `{arg}`: {e}"))
}

/// Renders a value in the requested format.
pub(crate) fn render(value: &xbridge::Value, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Table => format!("{:<10} {value:?}", value.tag().name()),
        OutputFormat::Json => serde_json::to_string(value)?,
    })
}

#[cfg(test)]
mod tests {
    use xbridge::Value;

    use super::*;

    #[test]
    fn parses_tagged_json() {
        let v = parse_value(r#"{"Objects":[{"Int64":-3},{"Float64":0.5},"Null"]}"#).unwrap();
        assert_eq!(
            v,
            Value::Objects(vec![Value::Int64(-3), Value::Float64(0.5), Value::Null])
        );
    }

    #[test]
    fn rejects_untagged_json() {
        let err = parse_value("42").unwrap_err();
        assert!(err.to_string().contains("invalid value `42`"));
    }

    #[test]
    fn renders_both_formats() {
        let v = Value::Int32Array(vec![1, 2]);
        assert_eq!(render(&v, OutputFormat::Json).unwrap(), r#"{"Int32Array":[1,2]}"#);
        assert!(render(&v, OutputFormat::Table).unwrap().starts_with("int32[]"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
