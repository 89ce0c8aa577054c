pub mod command;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;
use std::path::PathBuf;
use thiserror::Error;

pub use command::{Command, DraftCommand};

use crate::store::{DraftStore, FileStore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "post-scheduler", version, about)]
pub struct Config {
    /// Where drafts and the saved API key are kept
    #[arg(long, global = true, default_value = "./drafts.json", env = "DRAFT_STORE")]
    store: PathBuf,
    #[command(subcommand)]
    pub command: Command,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Config {
    /// Parse the configuration from the environment and command line arguments
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }
    /// Create a logger with the configured verbosity level
    pub fn init_logger(&self) {
        env_logger::Builder::new()
            .filter_level(self.verbose.log_level_filter())
            .format_target(false)
            .init();
    }
    pub const fn store(&self) -> &PathBuf {
        &self.store
    }
    /// Open the draft store backing this run
    pub fn open_store(&self) -> DraftStore<FileStore> {
        DraftStore::new(FileStore::open(&self.store))
    }
}
