use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use memchk::{report, Config};

pub trait LogArgs {
    fn log_level(&self) -> LevelFilter;
}

impl LogArgs for Args {
    fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

/// Accepts `off`, `error`, `warn`, `info`, `debug` or `trace`, in any case
fn parse_log_level(src: &str) -> Result<LevelFilter, String> {
    src.parse()
        .map_err(|_| format!("`{src}` is not one of off, error, warn, info, debug, trace"))
}

#[derive(Parser, Debug)]
#[command(
    name = "memchk",
    version,
    about = "memchk",
    long_about = "Leak checks, comment stripping and statistics for kernel VM test logs"
)]
pub struct Args {
    #[arg(short = 'L', long, help = "Log level", global = true, default_value = "warn", value_parser = parse_log_level)]
    log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Write a resource report (<LOG stem>.rsc) and print a one-line summary")]
    Check {
        #[arg(help = "Test output to check")]
        log: PathBuf,
        #[arg(short, long, help = "Report path, defaults to the log path with an .rsc extension")]
        output: Option<PathBuf>,
        #[command(flatten)]
        kinds: KindArgs,
    },
    #[command(about = "Append per-kind counts and leaks to <LOG>-memchk")]
    Memchk {
        #[arg(help = "Test output to check")]
        log: PathBuf,
        #[command(flatten)]
        kinds: KindArgs,
    },
    #[command(about = "Copy a test output without its ##### lines to <PATH>-without-comments")]
    Strip {
        #[arg(help = "A test output, or a directory of test outputs")]
        path: PathBuf,
    },
    #[command(about = "Append the failures of one test to a statistics file")]
    Stat {
        #[arg(help = "Test path without extension; <TEST>.result and <TEST>.rsc are read")]
        test: PathBuf,
        #[arg(help = "Statistics file to append to")]
        stat: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct KindArgs {
    #[arg(short, long, help = "TOML file describing the tracked resource kinds")]
    config: Option<PathBuf>,

    #[arg(long, help = "Template of the frame allocate line, e.g. for `is malloced and locked.`")]
    frame_alloc: Option<String>,
}

impl KindArgs {
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(template) = &self.frame_alloc {
            config.set_alloc("frame", template)?;
        }
        Ok(config)
    }
}

/// Where `check` writes its report
pub fn rsc_output(log: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| report::rsc_path(log))
}
