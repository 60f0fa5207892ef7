//! # Shell Module
//!
//! Line-oriented operator commands on stdin.
//!
//! This module handles:
//! - One-shot fetches across all sensor domains
//! - Starting and stopping per-domain producer tasks
//! - Requesting a log clear from the writer task
//!
//! The shell sits outside the aggregation core: it only invokes the
//! operations the core already exposes. Producer tasks own their sensor
//! sources, so the one-shot `fetch` reads dedicated short-lived sources
//! instead of going through the running tasks.
//!
//! The shell is the single manager of producer task handles. `main` hands
//! over the handles of the producers it spawned at startup, so `status`,
//! `start`, and `stop` always see the real task set and a domain can never
//! end up with two producers updating its snapshot fields.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::queue::SampleQueue;
use crate::sensors::{sim, SensorDomain};
use crate::snapshot::SnapshotStore;
use crate::tasks::{run_producer, WriterCommand};

/// A parsed shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// One-shot fetch across all domains
    Fetch,

    /// Start the producer task for a domain
    Start(SensorDomain),

    /// Stop the producer task for a domain
    Stop(SensorDomain),

    /// Reinitialize the persistent log
    Clear,

    /// Report which producer tasks are running
    Status,

    /// Print usage
    Help,
}

/// Parse one input line into a command
///
/// # Returns
///
/// * `Ok(None)` - Blank line, nothing to do
/// * `Err(message)` - Unknown command or bad argument
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "fetch" => Command::Fetch,
        "start" | "stop" => {
            let Some(name) = words.next() else {
                return Err(format!("usage: {} <hum_temp|pressure|imu>", verb));
            };
            let Some(domain) = SensorDomain::parse(name) else {
                return Err(format!("unknown domain '{}'", name));
            };
            if verb == "start" {
                Command::Start(domain)
            } else {
                Command::Stop(domain)
            }
        }
        "clear" => Command::Clear,
        "status" => Command::Status,
        "help" => Command::Help,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };

    if words.next().is_some() {
        return Err(format!("trailing arguments after '{}'", verb));
    }
    Ok(Some(command))
}

/// Shell state: the producer task registry plus the handles the commands
/// need
///
/// Owns the `JoinHandle` of every running producer task, including the ones
/// `main` spawned at startup. Exactly one producer may exist per domain.
pub struct ShellState {
    config: Config,
    store: Arc<SnapshotStore>,
    queue: Arc<SampleQueue>,
    writer_tx: mpsc::Sender<WriterCommand>,
    producers: HashMap<SensorDomain, JoinHandle<()>>,
}

impl ShellState {
    /// Create the shell state
    ///
    /// # Arguments
    ///
    /// * `config` - Sampling intervals for started producers
    /// * `store` - Shared snapshot store handed to started producers
    /// * `queue` - Sample queue handed to started producers
    /// * `writer_tx` - Control channel to the log writer
    /// * `producers` - Handles of producer tasks already running
    pub fn new(
        config: Config,
        store: Arc<SnapshotStore>,
        queue: Arc<SampleQueue>,
        writer_tx: mpsc::Sender<WriterCommand>,
        producers: HashMap<SensorDomain, JoinHandle<()>>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            writer_tx,
            producers,
        }
    }

    /// Whether a producer task is currently running for a domain
    pub fn is_running(&mut self, domain: SensorDomain) -> bool {
        self.reap_finished();
        self.producers.contains_key(&domain)
    }

    /// Execute one command, returning the lines to print
    pub async fn execute(&mut self, command: Command) -> Vec<String> {
        self.reap_finished();

        match command {
            Command::Fetch => fetch_all().await,
            Command::Start(domain) => {
                if self.producers.contains_key(&domain) {
                    vec![format!("{} logging already running", domain)]
                } else {
                    let handle = tokio::spawn(run_producer(
                        sim::source_for(domain),
                        Arc::clone(&self.store),
                        Arc::clone(&self.queue),
                        self.config.interval_for(domain),
                    ));
                    self.producers.insert(domain, handle);
                    vec![format!("{} logging started", domain)]
                }
            }
            Command::Stop(domain) => match self.producers.remove(&domain) {
                Some(handle) => {
                    handle.abort();
                    vec![format!("{} logging stopped", domain)]
                }
                None => vec![format!("{} logging not running", domain)],
            },
            Command::Clear => {
                if self.writer_tx.send(WriterCommand::Clear).await.is_ok() {
                    vec!["log clear requested".to_string()]
                } else {
                    warn!("writer task gone, cannot clear log");
                    vec!["log writer is not running".to_string()]
                }
            }
            Command::Status => SensorDomain::ALL
                .iter()
                .map(|domain| {
                    let state = if self.producers.contains_key(domain) {
                        "running"
                    } else {
                        "stopped"
                    };
                    format!("{}: {}", domain, state)
                })
                .collect(),
            Command::Help => vec![
                "commands:".to_string(),
                "  fetch                     one-shot read of all sensors".to_string(),
                "  start <hum_temp|pressure|imu>   start a logging task".to_string(),
                "  stop  <hum_temp|pressure|imu>   stop a logging task".to_string(),
                "  clear                     reinitialize the persistent log".to_string(),
                "  status                    show running logging tasks".to_string(),
            ],
        }
    }

    /// Drop handles of tasks that exited on their own (fatal sensor init)
    fn reap_finished(&mut self) {
        self.producers.retain(|_, handle| !handle.is_finished());
    }
}

/// Shell task body: read stdin lines and execute commands until EOF
pub async fn run_shell(mut state: ShellState) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("senlog shell ready (type 'help')");

    while let Ok(Some(line)) = lines.next_line().await {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        for output in state.execute(command).await {
            println!("{}", output);
        }
    }

    info!("shell input closed");
}

/// One-shot fetch across all domains with dedicated sources
async fn fetch_all() -> Vec<String> {
    let mut output = Vec::new();
    for domain in SensorDomain::ALL {
        let mut source = sim::source_for(domain);
        if let Err(e) = source.init().await {
            output.push(format!("{}: init failed: {}", domain, e));
            continue;
        }
        match source.fetch().await {
            Ok(reading) => output.push(format!("{}: {}", domain, reading)),
            Err(e) => output.push(format!("{}: fetch failed: {}", domain, e)),
        }
    }
    output
}
