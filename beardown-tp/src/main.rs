//! Entry point for `beardown`.
//!
//! Parses CLI arguments and dispatches into **grade**, **send** or
//! **receive** mode.  All actual protocol work is delegated to library
//! modules; `main.rs` owns only process setup (logging, argument parsing,
//! file I/O).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use beardown_tp::connection::{self, SendOptions, DEFAULT_MAX_RETRIES};
use beardown_tp::scenario;
use beardown_tp::simulator::{Simulator, SimulatorConfig};
use beardown_tp::socket::Socket;
use beardown_tp::timer::TimerConfig;

/// Stop-and-wait reliable transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    mode: Mode,
}

/// Timer and fault-injection overrides.
#[derive(Args)]
struct Tuning {
    /// RTO used before the first RTT sample, in milliseconds.
    #[arg(long, global = true, default_value_t = 500)]
    initial_rto_ms: u64,

    /// Retransmissions of one segment before giving up.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Probability of dropping an outgoing datagram.
    #[arg(long, global = true, default_value_t = 0.0)]
    loss: f64,

    /// Probability of flipping a bit in an outgoing datagram.
    #[arg(long, global = true, default_value_t = 0.0)]
    corrupt: f64,

    /// Probability of sending an outgoing datagram twice.
    #[arg(long, global = true, default_value_t = 0.0)]
    duplicate: f64,

    /// Upper bound of the random delay added to outgoing datagrams, in milliseconds.
    #[arg(long, global = true, default_value_t = 0)]
    delay_ms: u64,

    /// Seed for the fault model; random when omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl Tuning {
    fn timer(&self) -> TimerConfig {
        TimerConfig {
            initial_rto: Duration::from_millis(self.initial_rto_ms),
            ..TimerConfig::default()
        }
    }

    fn faults(&self) -> SimulatorConfig {
        SimulatorConfig {
            loss_rate: self.loss,
            corruption_rate: self.corrupt,
            duplicate_rate: self.duplicate,
            delay: Duration::ZERO..Duration::from_millis(self.delay_ms),
        }
    }

    fn simulator(&self) -> Result<Simulator> {
        let sim = match self.seed {
            Some(seed) => Simulator::with_seed(self.faults(), seed)?,
            None => Simulator::from_entropy(self.faults())?,
        };
        Ok(sim)
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Run the reference fault scenarios and print the scorecard.
    Grade,
    /// Send a file to a waiting receiver.
    Send {
        /// Receiver address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
    },
    /// Receive one file and write it to disk.
    Receive {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Where to write the received bytes.
        #[arg(short, long)]
        out: PathBuf,
        /// Finish after the sender has been silent this long, in milliseconds.
        #[arg(long, default_value_t = 5000)]
        idle_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Grade => {
            let seed = cli.tuning.seed.unwrap_or_default();
            log::info!("Running standard suite with seed {seed}");
            let card = scenario::run_suite(&scenario::standard_suite(), seed, &cli.tuning.timer())
                .await?;
            println!("{card}");
            if !card.all_passed() {
                bail!("{} of {} points earned", card.earned(), card.total());
            }
        }
        Mode::Send { peer, file, bind } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let socket = Socket::bind(bind).await.context("binding socket")?;
            let options = SendOptions {
                timer: cli.tuning.timer(),
                max_retries: cli.tuning.max_retries,
            };
            let mut channel = cli.tuning.simulator()?;
            log::info!("Sending {} to {peer} from {}", file.display(), socket.local_addr);

            let stats = connection::send(&socket, peer, &data, &options, &mut channel).await?;
            println!("{stats}");
        }
        Mode::Receive { bind, out, idle_ms } => {
            let socket = Socket::bind(bind).await.context("binding socket")?;
            log::info!("Receiving on {}", socket.local_addr);

            let (data, stats) =
                connection::receive(&socket, Duration::from_millis(idle_ms)).await?;
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{stats}");
        }
    }
    Ok(())
}
