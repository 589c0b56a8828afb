mod conf;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use wrr_core::{Clock, PoolBuilder, ReleaseOutcome, Selector, SystemClock};

use conf::PoolConf;

#[derive(Parser)]
#[command(name = "wrr", about = "Weighted smooth round-robin peer selector")]
struct Cli {
    /// Path to a TOML config file listing `[[server]]` entries.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity: -v for debug, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run `n` deterministic request cycles against the configured pool and
    /// print a per-peer selection histogram.
    Simulate {
        n: usize,
        /// Outcome for each selected peer, cycled over the run: 'O' for Ok,
        /// 'F' for Failed.
        #[arg(long, default_value = "O")]
        pattern: String,
    },
}

fn setup_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}]{}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .unwrap_or_else(|e| eprintln!("failed to setup logger: {}", e));
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    let servers = match &cli.config {
        Some(path) => match PoolConf::from_path(path) {
            Ok(conf) => conf.server,
            Err(e) => {
                log::error!("[wrr] {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            log::error!("[wrr] no --config given; nothing to do");
            return ExitCode::FAILURE;
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pool = match PoolBuilder::build(&servers, clock) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("[wrr] failed to build pool: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("[wrr] pool '{}' built with {} peers", pool.name, pool.len());

    match cli.command {
        Command::Simulate { n, pattern } => run_simulation(&pool, n, &pattern),
    }

    ExitCode::SUCCESS
}

fn run_simulation(pool: &Arc<wrr_core::PeerPool>, n: usize, pattern: &str) {
    let outcomes: Vec<char> = pattern.chars().filter(|c| *c == 'O' || *c == 'F').collect();
    let outcomes = if outcomes.is_empty() { vec!['O'] } else { outcomes };

    let mut counts = vec![0usize; pool.len()];
    let mut busy = 0usize;

    for i in 0..n {
        let mut state = Selector::init_attempt(pool.clone());
        match Selector::choose(&mut state) {
            wrr_core::ChooseResult::Selected => {
                let idx = state.current_index().expect("choose just selected a peer");
                if idx < counts.len() {
                    counts[idx] += 1;
                }
                let outcome = match outcomes[i % outcomes.len()] {
                    'F' => ReleaseOutcome::Failed,
                    _ => ReleaseOutcome::Ok,
                };
                Selector::release(&mut state, outcome);
            }
            wrr_core::ChooseResult::Busy => busy += 1,
        }
    }

    println!("{:<24} {:>10} {:>10}", "peer", "weight", "selected");
    for (i, count) in counts.iter().enumerate() {
        let peer = pool.peer(i);
        println!("{:<24} {:>10} {:>10}", peer.addr.name, peer.weight, count);
    }
    if busy > 0 {
        println!("busy: {busy} of {n} cycles found no eligible peer");
    }
}
