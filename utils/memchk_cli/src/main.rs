mod args;
mod logger;

#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::Parser;
use memchk::{report, stat, strip, FileReport};

use crate::{
    args::{rsc_output, Args, Command},
    logger::Logger,
};

fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(&args)?;

    debug!("Args: {args:#?}");

    run(args.command)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Check { log, output, kinds } => {
            let checker = kinds.config()?.compile()?;
            let report = FileReport::from_log(&log, &checker)
                .with_context(|| format!("Failed to check {}", log.display()))?;
            let output = rsc_output(&log, output);
            report
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {}", output.display());
            println!("{}", report.summary());
        }
        Command::Memchk { log, kinds } => {
            let checker = kinds.config()?.compile()?;
            let report = FileReport::from_log(&log, &checker)
                .with_context(|| format!("Failed to check {}", log.display()))?;
            let output = report::legacy_path(&log);
            report
                .append_legacy(&output)
                .with_context(|| format!("Failed to append to {}", output.display()))?;
            info!("Appended to {}", output.display());
        }
        Command::Strip { path } => {
            if path.is_dir() {
                let written = strip::strip_dir(&path)
                    .with_context(|| format!("Failed to strip files in {}", path.display()))?;
                info!("Stripped {} files in {}", written.len(), path.display());
            } else {
                let written = strip::strip_file(&path)
                    .with_context(|| format!("Failed to strip {}", path.display()))?;
                info!("Stripped {} into {}", path.display(), written.display());
            }
        }
        Command::Stat { test, stat } => {
            let outcome = stat::record_test(&test, &stat).with_context(|| {
                format!(
                    "Failed to record {} in {}",
                    test.display(),
                    stat.display()
                )
            })?;
            if !outcome.passed() {
                warn!("{} failed", outcome.test);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::run;
    use crate::args::{Command, KindArgs};

    #[test]
    fn missing_files_are_named_in_errors() {
        let log = env::temp_dir().join(format!("memchk_cli_missing_{}.output", std::process::id()));

        let err = run(Command::Check {
            log: log.clone(),
            output: None,
            kinds: KindArgs::default(),
        })
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("Failed to check "));
        assert!(message.contains(&*log.to_string_lossy()));

        let err = run(Command::Memchk {
            log: log.clone(),
            kinds: KindArgs::default(),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains(&*log.to_string_lossy()));

        let err = run(Command::Strip { path: log.clone() }).unwrap_err();
        assert!(format!("{err:#}").contains(&*log.to_string_lossy()));

        let stat = log.with_extension("stat");
        let err = run(Command::Stat {
            test: log.clone(),
            stat: stat.clone(),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains(&*log.to_string_lossy()));
        assert!(!stat.exists());
    }
}
