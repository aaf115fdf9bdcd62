use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::config::ToolsConfig;
use crate::error::{Result, ToolsError};
use crate::mixer::{blend, BlendMode, BlendRequest};
use crate::vault::{decode_png, Frame, ImageVault, SaveMode};
use crate::workflow::{WorkflowChannels, WorkflowRecord};

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ToolsConfig> {
    match path {
        Some(path) => ToolsConfig::load(path),
        None => Ok(ToolsConfig::default()),
    }
}

fn read_workflow(path: &Path) -> Result<WorkflowRecord> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| ToolsError::Config(format!("{}: {}", path.display(), e)))
}

fn read_frame(path: &Path) -> Result<Frame> {
    let file = File::open(path)?;
    decode_png(BufReader::new(file))
        .map(|decoded| decoded.frame)
        .map_err(|e| match e {
            ToolsError::Encoding(msg) => {
                ToolsError::Encoding(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
}

#[allow(clippy::too_many_arguments)]
pub fn handle_save(
    config_path: Option<PathBuf>,
    images: Vec<PathBuf>,
    mode: SaveMode,
    prefix: String,
    workflow: Option<PathBuf>,
    extra: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(dir) = output_dir {
        config.vault.output_dir = dir;
    }

    let channels = WorkflowChannels::new(
        workflow.as_deref().map(read_workflow).transpose()?,
        extra.as_deref().map(read_workflow).transpose()?,
    );
    let frames = images
        .iter()
        .map(|path| read_frame(path))
        .collect::<Result<Vec<_>>>()?;

    let vault = ImageVault::new(config.vault);
    let report = vault.save(&frames, mode, &prefix, &channels)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for artifact in &report.written {
            let suffix = if artifact.with_workflow {
                " (with workflow)"
            } else {
                ""
            };
            println!("Saved {} {}{}", artifact.kind, artifact.path.display(), suffix);
        }
        for failure in &report.failures {
            eprintln!(
                "Warning: {} for image {} failed: {}",
                failure.kind, failure.batch_index, failure.message
            );
        }
    }

    if report.written.is_empty() && !report.failures.is_empty() {
        return Err(ToolsError::NothingSaved(report.failures.len()));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_mix(
    config_path: Option<PathBuf>,
    main: String,
    secondary: String,
    blend_percent: Option<i64>,
    mode: Option<String>,
    seed: Option<u64>,
    max_length: Option<usize>,
    json: bool,
) -> Result<()> {
    let defaults = load_config(config_path.as_deref())?.mixer;

    let request = BlendRequest::new(main, secondary)
        .with_percent(blend_percent.unwrap_or(defaults.blend_percent))
        .with_mode(mode.as_deref().map_or(defaults.mode, BlendMode::parse_lenient))
        .with_seed(seed.unwrap_or(defaults.seed))
        .with_max_length(max_length.unwrap_or(defaults.max_length));

    let outcome = blend(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.prompt);
    }
    Ok(())
}
