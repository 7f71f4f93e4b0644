use std::{env, path::PathBuf};

use anyhow::Context as _;
use lazy_static::lazy_static;
use structopt::StructOpt;
use terminal_size as term;

use auditor_config as config;

mod commands;
mod view;

pub fn from_args() -> Cli {
    Cli::from_args()
}

pub fn exec(command: Cli) -> anyhow::Result<()> {
    let Cli {
        config,
        network,
        debug,
        trace,
        no_timestamp,
        no_module_path,
        cmd,
    } = command;

    let mut log_opts = LogOptions::default();
    let mut config = get_config(config.or_else(config::dirs::find_config))?;
    if let Some(network) = network {
        config = config.with_network(&network)?;
    }

    log_opts.level = config.log.level;
    log_opts.source = LogOptionsSource::Config;
    log_opts.timestamp = !no_timestamp;
    log_opts.module_path = !no_module_path;

    if let Ok(rust_log) = env::var("RUST_LOG") {
        if rust_log.contains("auditor") {
            log_opts.level = env_logger::Logger::from_default_env().filter();
            log_opts.source = LogOptionsSource::Env;
        }
    }

    if trace {
        log_opts.level = log::LevelFilter::Trace;
        log_opts.source = LogOptionsSource::Flag;
    } else if debug {
        log_opts.level = log::LevelFilter::Debug;
        log_opts.source = LogOptionsSource::Flag;
    }

    init_logger(log_opts);

    commands::exec_cmd(cmd, config)
}

fn init_logger(opts: LogOptions) {
    eprintln!(
        "Setting log level to: {}, source: {:?}",
        opts.level, opts.source
    );
    env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp(if opts.timestamp {
            Some(env_logger::TimestampPrecision::Seconds)
        } else {
            None
        })
        .format_module_path(opts.module_path)
        .filter_level(log::LevelFilter::Info)
        .filter_module("auditor", opts.level)
        .init();
}

fn get_config(path: Option<PathBuf>) -> anyhow::Result<config::Config> {
    match path {
        Some(p) => {
            eprintln!("Loading config from: {}", p.display());
            config::loaders::toml::from_file(&p)
                .with_context(|| format!("Error reading configuration file {}", p.display()))
        }
        None if using_env() => {
            eprintln!(
                "Loading config from {}* environment variables",
                config::defaults::ENV_PREFIX
            );
            config::loaders::env::from_env()
                .context("Error reading configuration from environment")
        }
        None => {
            eprintln!("HEADS UP! No configuration specified/found. Using default one!");
            Ok(config::Config::default())
        }
    }
}

fn using_env() -> bool {
    env::vars_os().any(|(key, _)| {
        key.to_string_lossy()
            .starts_with(config::defaults::ENV_PREFIX)
    })
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "auditor",
    about = "Register audited transactions and follow them as they are confirmed.",
    max_term_width = *TERM_WIDTH
)]
pub struct Cli {
    #[structopt(short = "c", long = "config", help = CONFIG_HELP)]
    config: Option<PathBuf>,
    /// Use this network from the configuration instead of the selected one.
    #[structopt(short = "n", long = "network")]
    network: Option<String>,
    /// Turn on DEBUG logging.
    #[structopt(long = "debug")]
    debug: bool,
    /// Turn on TRACE logging.
    #[structopt(long = "trace")]
    trace: bool,
    /// Do not show timestamps in logs.
    #[structopt(long = "no-timestamp")]
    no_timestamp: bool,
    /// Do not show module path in logs.
    #[structopt(long = "no-module-path")]
    no_module_path: bool,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Register a transaction in the auditor contract and wait until it is confirmed.
    #[structopt(name = "register")]
    Register {
        /// Recipient address, in hex. Short addresses are padded with zeros on the left.
        #[structopt(long = "to")]
        to: String,
        /// Amount, in ether.
        #[structopt(long = "amount")]
        amount: String,
        /// Free-text description.
        #[structopt(long = "description")]
        description: String,
        /// Category label.
        #[structopt(long = "category")]
        category: String,
    },
    /// Follow the transactions registered in the auditor contract until interrupted.
    #[structopt(name = "watch")]
    Watch {
        /// Refresh period, in milliseconds.
        #[structopt(long = "interval", default_value = "1000")]
        interval_ms: u64,
        /// Also show the reputation of this user.
        #[structopt(long = "user")]
        user: Option<String>,
        /// Auditor whose reputation is shown along with the user's. Defaults to the wallet
        /// account.
        #[structopt(long = "auditor")]
        auditor: Option<String>,
        /// Print the transaction log as JSON.
        #[structopt(long = "json")]
        json: bool,
    },
    /// Show the reputation scores of a user and an auditor.
    #[structopt(name = "reputation")]
    Reputation {
        /// User address, in hex.
        #[structopt(long = "user")]
        user: String,
        /// Auditor address, in hex. Defaults to the wallet account.
        #[structopt(long = "auditor")]
        auditor: Option<String>,
        /// Print the scores as JSON.
        #[structopt(long = "json")]
        json: bool,
    },
    /// List the networks in the configuration.
    #[structopt(name = "networks")]
    Networks,
}

struct LogOptions {
    level: log::LevelFilter,
    timestamp: bool,
    module_path: bool,
    source: LogOptionsSource,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Error,
            timestamp: true,
            module_path: true,
            source: LogOptionsSource::Defaults,
        }
    }
}

#[derive(Debug)]
enum LogOptionsSource {
    Defaults,
    Config,
    Env,
    Flag,
}

lazy_static! {
    static ref TERM_WIDTH: usize = {
        let size = term::terminal_size();
        if let Some((term::Width(w), _)) = size {
            w as usize
        } else {
            120
        }
    };
}

static CONFIG_HELP: &str =
    r#"Load configuration from this file. If not specified will try to find a configuration
in these paths:
- current path
- standard configuration path:
  - $XDG_CONFIG_HOME/auditor/auditor.toml in Gnu/Linux
  - $HOME/Library/Preferences/io.witnet.auditor/auditor.toml in MacOS
  - C:\Users\<YOUR USER>\AppData\Roaming\witnet\auditor\config\auditor.toml
- /etc/auditor/auditor.toml if in a *nix platform
If no configuration is found, variables prefixed with AUDITOR_ are read from the environment.
Otherwise the default configuration is used."#;
