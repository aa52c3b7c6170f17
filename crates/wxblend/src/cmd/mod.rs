use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use wxblend_buffer::ReleasePolicy;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod inspect;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Blend fanout feed connections into one ordered frame stream.
    Run(RunArgs),
    /// Decode frames from a capture file and print their headers.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PolicyArg {
    /// Hold every frame for the release delay (default).
    BoundedDelay,
    /// Release direct successors immediately, others after the delay.
    Successor,
    /// Release as soon as a frame is buffered.
    Immediate,
}

impl From<PolicyArg> for ReleasePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::BoundedDelay => ReleasePolicy::BoundedDelay,
            PolicyArg::Successor => ReleasePolicy::Successor,
            PolicyArg::Immediate => ReleasePolicy::Immediate,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Fanout servers to read frames from (host:port), one connection each.
    #[arg(required = true)]
    pub servers: Vec<String>,
    /// Seconds to hold each frame for reordering before release.
    #[arg(long, short = 't', default_value_t = 2.0)]
    pub delay: f64,
    /// Head release policy.
    #[arg(long, value_enum, default_value_t = PolicyArg::BoundedDelay)]
    pub policy: PolicyArg,
    /// Write ordered frames to this named pipe or file instead of stdout.
    #[arg(long, short = 'p')]
    pub pipe: Option<PathBuf>,
    /// Seconds to wait before reconnecting to a lost fanout server.
    #[arg(long, default_value_t = 60)]
    pub reconnect_delay: u64,
    /// Seconds between buffer depth/counter log lines (0 disables).
    #[arg(long, default_value_t = 60)]
    pub stats_interval: u64,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Capture file to decode ("-" for stdin).
    pub path: PathBuf,
    /// Stop after decoding N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
