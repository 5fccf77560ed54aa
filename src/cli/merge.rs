use crate::config::MergerConfig;
use crate::error::MergerError;
use crate::error::ResultMessage;
use crate::export::EXPORT_FILE_NAME;
use crate::pipeline::Pipeline;
use crate::pipeline::StatusLevel;
use crate::pipeline::UploadedFile;
use clap::Args;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing::warn;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input files or glob patterns, merged in the given order
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output workbook path
    #[arg(short, long, default_value = EXPORT_FILE_NAME)]
    output: PathBuf,

    /// Rows shown in the preview
    #[arg(long, env = "SHEET_MERGER_PREVIEW_ROWS")]
    pub(crate) preview_rows: Option<usize>,
}

pub fn handle(args: MergeArgs, config: &MergerConfig) -> anyhow::Result<ExitCode> {
    let paths = expand_inputs(&args.inputs)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match std::fs::read(path) {
            Ok(content) => files.push(UploadedFile::new(display_name(path), content)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable input");
                eprintln!("error: Error reading file {}: {}", path.display(), e);
            }
        }
    }

    let pipeline = Pipeline::from_settings(&config.merge);
    let report = pipeline.run(&files)?;
    for message in report.messages() {
        eprintln!("{}: {}", level_label(message.level), message.text);
    }

    let Some(result) = report.merged() else {
        return Ok(ExitCode::FAILURE);
    };
    print!("{}", result.preview);
    std::fs::write(&args.output, &result.export.bytes)
        .map_err(MergerError::from)
        .with_prefix(&format!("Write {} failed", args.output.display()))?;
    info!(path = %args.output.display(), bytes = result.export.bytes.len(), "Wrote merged workbook");
    eprintln!("Wrote {}", args.output.display());
    Ok(ExitCode::SUCCESS)
}

/// Expands each input in order. Inputs with glob characters are matched against the
/// file system; a pattern matching nothing is reported and skipped. Plain paths pass through.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, MergerError> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        let before = paths.len();
        for entry in glob::glob(input)? {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!(pattern = %input, error = %e, "Skipping unreadable glob match"),
            }
        }
        if paths.len() == before {
            warn!(pattern = %input, "Pattern matched no files");
            eprintln!("warning: {} matched no files", input);
        }
    }
    Ok(paths)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn level_label(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Info => "info",
        StatusLevel::Warning => "warning",
        StatusLevel::Success => "success",
        StatusLevel::Error => "error",
    }
}
