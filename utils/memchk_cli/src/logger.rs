use anyhow::{anyhow, Result};
use env_logger::Builder;

use crate::args::LogArgs;

pub struct Logger;

impl Logger {
    /// Log to stderr at the requested level; `RUST_LOG` takes precedence when set.
    pub fn init(args: &impl LogArgs) -> Result<()> {
        Builder::new()
            .filter_level(args.log_level())
            .parse_default_env()
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logger: {e:}"))
    }
}
