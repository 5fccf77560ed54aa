use crate::config::MergerConfig;
use crate::server;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod merge;

const MEGABYTE: usize = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "rusty-sheet-merger", version)]
#[command(about = "Merge Excel files that share a column layout into one deduplicated workbook", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long, global = true, env = "SHEET_MERGER_BIND")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, global = true, env = "SHEET_MERGER_PORT")]
    port: Option<u16>,

    /// Maximum upload size in megabytes
    #[arg(long, global = true, env = "SHEET_MERGER_MAX_UPLOAD_MB")]
    max_upload_mb: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SHEET_MERGER_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the upload server (default)
    Serve,
    /// Merge files from disk into one workbook
    Merge(merge::MergeArgs),
}

impl Cli {
    /// Resolves configuration: defaults, then the TOML file, then environment, then flags.
    pub fn load_config(&self) -> anyhow::Result<MergerConfig> {
        let mut config = match &self.config {
            Some(path) => MergerConfig::from_file(path)?,
            None => MergerConfig::default(),
        };
        config.apply_env()?;

        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(megabytes) = self.max_upload_mb {
            config.server.max_upload_bytes = megabytes.saturating_mul(MEGABYTE);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(Command::Merge(args)) = &self.command {
            if let Some(rows) = args.preview_rows {
                config.merge.preview_rows = rows;
            }
        }
        Ok(config)
    }

    pub fn dispatch(self, config: MergerConfig) -> anyhow::Result<ExitCode> {
        match self.command {
            Some(Command::Merge(args)) => merge::handle(args, &config),
            Some(Command::Serve) | None => {
                let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
                runtime.block_on(server::serve(config))?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Installs the fmt subscriber on stderr; `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["rusty-sheet-merger"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = "[server]\nport = 9000\n\n[merge]\npreview_rows = 20\ncache_entries = 3";
        writeln!(file, "{content}").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "rusty-sheet-merger",
            "--config",
            path,
            "--bind",
            "10.0.0.1",
            "--port",
            "9100",
            "--max-upload-mb",
            "3",
            "--log-level",
            "debug",
            "merge",
            "a.xlsx",
            "--preview-rows",
            "5",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.server.bind_address, "10.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.max_upload_bytes, 3 * 1024 * 1024);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.merge.preview_rows, 5);
        assert_eq!(config.merge.cache_entries, 3);
    }

    #[test]
    fn merge_requires_inputs() {
        assert!(Cli::try_parse_from(["rusty-sheet-merger", "merge"]).is_err());
    }
}
