//! Image vault: saves generated images together with their workflow.
//!
//! A save takes a batch of frames, a [`SaveMode`] and the workflow channels
//! supplied by the host, and writes:
//!
//! | mode                      | output dir            | snapshot dir              |
//! |---------------------------|-----------------------|---------------------------|
//! | `image_only`              | image                 |                           |
//! | `image_with_metadata`     | image + workflow text |                           |
//! | `thumbnail_with_metadata` | image                 | thumbnail + workflow text |
//! | `json_with_workflow`      | image                 | `{"workflow": ...}` JSON  |
//!
//! Every artifact is named independently (see [`naming`]), so a batch never
//! reuses an index. Failures are per artifact: they are logged and collected
//! in the [`SaveReport`] while the remaining artifacts are still attempted.

pub mod encoder;
pub mod frame;
pub mod naming;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::VaultConfig;
use crate::error::{Result, ToolsError};
use crate::workflow::{WorkflowChannels, WorkflowRecord, WORKFLOW_KEY};

pub use self::encoder::{decode_png, DecodedPng, ImageEncoder, PngEncoder, TextEntry};
pub use self::frame::{ColorLayout, Frame};
pub use self::naming::OutputTarget;

/// Extension of sidecar workflow files.
pub const SIDECAR_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    #[default]
    ImageOnly,
    ImageWithMetadata,
    ThumbnailWithMetadata,
    JsonWithWorkflow,
}

impl SaveMode {
    pub const ALL: [SaveMode; 4] = [
        SaveMode::ImageOnly,
        SaveMode::ImageWithMetadata,
        SaveMode::ThumbnailWithMetadata,
        SaveMode::JsonWithWorkflow,
    ];

    fn embeds_workflow(&self) -> bool {
        matches!(
            self,
            SaveMode::ImageWithMetadata | SaveMode::ThumbnailWithMetadata
        )
    }
}

impl std::fmt::Display for SaveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveMode::ImageOnly => write!(f, "image_only"),
            SaveMode::ImageWithMetadata => write!(f, "image_with_metadata"),
            SaveMode::ThumbnailWithMetadata => write!(f, "thumbnail_with_metadata"),
            SaveMode::JsonWithWorkflow => write!(f, "json_with_workflow"),
        }
    }
}

impl std::str::FromStr for SaveMode {
    type Err = ToolsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image_only" => Ok(SaveMode::ImageOnly),
            "image_with_metadata" => Ok(SaveMode::ImageWithMetadata),
            "thumbnail_with_metadata" => Ok(SaveMode::ThumbnailWithMetadata),
            "json_with_workflow" => Ok(SaveMode::JsonWithWorkflow),
            _ => Err(ToolsError::Config(format!("Invalid save mode: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Full-size image in the output directory.
    Image,
    /// Downscaled image in the snapshot directory.
    Thumbnail,
    /// Workflow JSON in the snapshot directory.
    Sidecar,
    /// Workflow text embedded into an image.
    EmbeddedWorkflow,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::Thumbnail => write!(f, "thumbnail"),
            ArtifactKind::Sidecar => write!(f, "sidecar"),
            ArtifactKind::EmbeddedWorkflow => write!(f, "embedded workflow"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    /// Position of the source frame in the batch.
    pub batch_index: usize,
    pub path: PathBuf,
    pub with_workflow: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFailure {
    pub kind: ArtifactKind,
    pub batch_index: usize,
    pub path: Option<PathBuf>,
    pub error_kind: &'static str,
    pub message: String,
}

/// Everything one save attempted.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub mode: SaveMode,
    pub written: Vec<WrittenArtifact>,
    pub failures: Vec<ArtifactFailure>,
}

impl SaveReport {
    fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            written: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when nothing failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn paths(&self, kind: ArtifactKind) -> Vec<&Path> {
        self.written
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.path.as_path())
            .collect()
    }

    fn fail(&mut self, kind: ArtifactKind, batch_index: usize, error: &ToolsError) {
        self.failures.push(ArtifactFailure {
            kind,
            batch_index,
            path: None,
            error_kind: error.kind(),
            message: error.to_string(),
        });
    }
}

/// Metadata prepared once per save and shared by every frame of the batch.
enum Prepared {
    /// Nothing to attach.
    None,
    /// JSON text to embed or write.
    Text(String),
    /// Serialization failed; the message is reported per artifact.
    Failed(String),
}

impl Prepared {
    fn from_result(result: Result<String>, mode: SaveMode) -> Self {
        match result {
            Ok(text) => Prepared::Text(text),
            Err(e) => {
                tracing::error!(%mode, error = %e, "workflow serialization failed");
                Prepared::Failed(e.to_string())
            }
        }
    }
}

/// The vault writer. Generic over the image encoder so hosts can supply their own.
pub struct ImageVault<E: ImageEncoder = PngEncoder> {
    config: VaultConfig,
    encoder: E,
}

impl ImageVault<PngEncoder> {
    pub fn new(config: VaultConfig) -> Self {
        Self::with_encoder(config, PngEncoder)
    }
}

impl<E: ImageEncoder> ImageVault<E> {
    pub fn with_encoder(config: VaultConfig, encoder: E) -> Self {
        Self { config, encoder }
    }

    /// Save a batch of frames.
    ///
    /// Only an invalid prefix makes this return `Err`; filesystem and encoding
    /// problems are recorded in the report.
    pub fn save(
        &self,
        frames: &[Frame],
        mode: SaveMode,
        prefix: &str,
        channels: &WorkflowChannels,
    ) -> Result<SaveReport> {
        naming::validate_prefix(prefix)?;
        tracing::info!(
            %mode,
            prefix,
            frames = frames.len(),
            output_dir = %self.config.output_dir.display(),
            "saving images"
        );

        let mut report = SaveReport::new(mode);
        if frames.is_empty() {
            tracing::warn!(%mode, "no images to save");
            return Ok(report);
        }

        let workflow = channels.resolve();
        let prepared = self.prepare(mode, workflow);
        let output_dir = self.config.output_dir.clone();
        let snapshot_dir = self.config.snapshot_dir();

        for (batch_index, frame) in frames.iter().enumerate() {
            match mode {
                SaveMode::ImageOnly => {
                    self.write_image(&output_dir, prefix, frame, batch_index, None, &mut report);
                }
                SaveMode::ImageWithMetadata => {
                    let text = self.embedded_text(&prepared, batch_index, &mut report);
                    self.write_image(&output_dir, prefix, frame, batch_index, text, &mut report);
                }
                SaveMode::ThumbnailWithMetadata => {
                    self.write_image(&output_dir, prefix, frame, batch_index, None, &mut report);
                    let thumb = frame.thumbnail(self.config.thumbnail_size);
                    let text = self.embedded_text(&prepared, batch_index, &mut report);
                    self.write_thumbnail(&snapshot_dir, prefix, &thumb, batch_index, text, &mut report);
                }
                SaveMode::JsonWithWorkflow => {
                    self.write_image(&output_dir, prefix, frame, batch_index, None, &mut report);
                    self.write_sidecar(&snapshot_dir, prefix, &prepared, batch_index, &mut report);
                }
            }
        }

        if report.is_complete() {
            tracing::info!(%mode, written = report.written.len(), "save completed");
        } else {
            tracing::warn!(
                %mode,
                written = report.written.len(),
                failed = report.failures.len(),
                "save completed with failures"
            );
        }
        Ok(report)
    }

    fn prepare(&self, mode: SaveMode, workflow: Option<&WorkflowRecord>) -> Prepared {
        if mode.embeds_workflow() {
            return match workflow {
                Some(wf) if wf.is_versioned() => Prepared::from_result(wf.to_json_string(), mode),
                Some(_) => {
                    tracing::warn!(%mode, "workflow has no 'version' key, metadata will not be embedded");
                    Prepared::None
                }
                None => Prepared::None,
            };
        }

        if mode == SaveMode::JsonWithWorkflow {
            let mut envelope = IndexMap::new();
            envelope.insert(
                WORKFLOW_KEY.to_string(),
                workflow.cloned().unwrap_or_default(),
            );
            return Prepared::from_result(WorkflowRecord::Mapping(envelope).to_json_pretty(), mode);
        }

        Prepared::None
    }

    /// Text entries to embed, recording a failure when serialization failed.
    fn embedded_text(
        &self,
        prepared: &Prepared,
        batch_index: usize,
        report: &mut SaveReport,
    ) -> Option<TextEntry> {
        match prepared {
            Prepared::Text(json) => Some(TextEntry::new(WORKFLOW_KEY, json.clone())),
            Prepared::Failed(message) => {
                let error = ToolsError::Encoding(message.clone());
                tracing::warn!(
                    batch_index,
                    error = %error,
                    "writing image without embedded workflow"
                );
                report.fail(ArtifactKind::EmbeddedWorkflow, batch_index, &error);
                None
            }
            Prepared::None => None,
        }
    }

    fn write_image(
        &self,
        directory: &Path,
        prefix: &str,
        frame: &Frame,
        batch_index: usize,
        text: Option<TextEntry>,
        report: &mut SaveReport,
    ) {
        self.write_frame(ArtifactKind::Image, directory, prefix, frame, batch_index, text, report);
    }

    fn write_thumbnail(
        &self,
        directory: &Path,
        prefix: &str,
        frame: &Frame,
        batch_index: usize,
        text: Option<TextEntry>,
        report: &mut SaveReport,
    ) {
        self.write_frame(ArtifactKind::Thumbnail, directory, prefix, frame, batch_index, text, report);
    }

    #[allow(clippy::too_many_arguments)]
    fn write_frame(
        &self,
        kind: ArtifactKind,
        directory: &Path,
        prefix: &str,
        frame: &Frame,
        batch_index: usize,
        text: Option<TextEntry>,
        report: &mut SaveReport,
    ) {
        let with_workflow = text.is_some();
        let entries: Vec<TextEntry> = text.into_iter().collect();
        let result = self.write_artifact(directory, prefix, self.encoder.extension(), |out| {
            self.encoder.encode(frame, &entries, out)
        });
        record(report, kind, batch_index, with_workflow, result);
    }

    fn write_sidecar(
        &self,
        directory: &Path,
        prefix: &str,
        prepared: &Prepared,
        batch_index: usize,
        report: &mut SaveReport,
    ) {
        let json = match prepared {
            Prepared::Text(json) => json,
            Prepared::Failed(message) => {
                let error = ToolsError::Encoding(message.clone());
                tracing::error!(batch_index, error = %error, "sidecar not written");
                report.fail(ArtifactKind::Sidecar, batch_index, &error);
                return;
            }
            Prepared::None => return,
        };
        let result = self.write_artifact(directory, prefix, SIDECAR_EXTENSION, |out| {
            out.write_all(json.as_bytes())?;
            Ok(())
        });
        record(report, ArtifactKind::Sidecar, batch_index, true, result);
    }

    /// Resolve a fresh name in `directory` and fill it with `write`.
    ///
    /// A file whose content could not be written is removed again.
    fn write_artifact<F>(
        &self,
        directory: &Path,
        prefix: &str,
        extension: &str,
        write: F,
    ) -> std::result::Result<PathBuf, (Option<PathBuf>, ToolsError)>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        let (target, file) = self
            .open_target(directory, prefix, extension)
            .map_err(|e| (None, e))?;
        let path = target.path();

        let mut out = BufWriter::new(file);
        let written = write(&mut out).and_then(|()| out.flush().map_err(ToolsError::from));
        if let Err(e) = written {
            drop(out);
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial file");
            }
            return Err((Some(path), e));
        }
        Ok(path)
    }

    fn open_target(
        &self,
        directory: &Path,
        prefix: &str,
        extension: &str,
    ) -> Result<(OutputTarget, File)> {
        fs::create_dir_all(directory)?;
        if self.config.exclusive_create {
            naming::claim_next(directory, prefix, extension, self.config.max_claim_attempts)
        } else {
            let target = naming::next_target(directory, prefix, extension)?;
            let file = File::create(target.path())?;
            Ok((target, file))
        }
    }
}

fn record(
    report: &mut SaveReport,
    kind: ArtifactKind,
    batch_index: usize,
    with_workflow: bool,
    result: std::result::Result<PathBuf, (Option<PathBuf>, ToolsError)>,
) {
    match result {
        Ok(path) => {
            tracing::info!(%kind, batch_index, with_workflow, path = %path.display(), "artifact written");
            report.written.push(WrittenArtifact {
                kind,
                batch_index,
                path,
                with_workflow,
            });
        }
        Err((path, error)) => {
            tracing::error!(
                %kind,
                batch_index,
                path = ?path,
                error = %error,
                "artifact write failed"
            );
            report.failures.push(ArtifactFailure {
                kind,
                batch_index,
                path,
                error_kind: error.kind(),
                message: error.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs::File;
    use tempfile::TempDir;

    fn vault_in(tmp: &TempDir) -> ImageVault {
        let config = VaultConfig {
            output_dir: tmp.path().join("output"),
            ..VaultConfig::default()
        };
        ImageVault::new(config)
    }

    fn frame(width: u32, height: u32) -> Frame {
        let pixels = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        Frame::new(width, height, ColorLayout::Rgb, pixels).unwrap()
    }

    fn versioned() -> WorkflowChannels {
        WorkflowChannels::new(
            Some(WorkflowRecord::from(json!({"version": 0.4, "nodes": [{"id": 1}]}))),
            None,
        )
    }

    fn broken() -> WorkflowChannels {
        let mut map = IndexMap::new();
        map.insert("version".to_string(), WorkflowRecord::Integer(1));
        map.insert(
            "model".to_string(),
            WorkflowRecord::Opaque {
                type_name: "ModelPatcher".to_string(),
            },
        );
        WorkflowChannels::new(Some(WorkflowRecord::Mapping(map)), None)
    }

    fn read_png(path: &Path) -> DecodedPng {
        decode_png(File::open(path).unwrap()).unwrap()
    }

    #[test]
    fn test_save_mode_parse_and_display() {
        for mode in SaveMode::ALL {
            assert_eq!(mode.to_string().parse::<SaveMode>().unwrap(), mode);
        }
        assert!("raw".parse::<SaveMode>().is_err());
    }

    #[test]
    fn test_image_only_writes_plain_image() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(4, 4)], SaveMode::ImageOnly, "vault", &versioned())
            .unwrap();

        assert!(report.is_complete());
        let images = report.paths(ArtifactKind::Image);
        assert_eq!(images, vec![tmp.path().join("output/vault_00000.png")]);
        assert!(read_png(images[0]).text.is_empty());
        assert!(!tmp.path().join("output/snapshot").exists());
    }

    #[test]
    fn test_image_with_metadata_embeds_workflow() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(4, 4)], SaveMode::ImageWithMetadata, "vault", &versioned())
            .unwrap();

        assert!(report.is_complete());
        assert!(report.written[0].with_workflow);
        let decoded = read_png(&report.written[0].path);
        let text = decoded.text_for("workflow").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["version"], json!(0.4));
        assert_eq!(decoded.frame, frame(4, 4));
    }

    #[test]
    fn test_unversioned_workflow_is_not_embedded() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);
        let channels = WorkflowChannels::new(
            None,
            Some(WorkflowRecord::from(json!({"workflow": {"nodes": []}}))),
        );

        let report = vault
            .save(&[frame(2, 2)], SaveMode::ImageWithMetadata, "vault", &channels)
            .unwrap();

        assert!(report.is_complete());
        assert!(!report.written[0].with_workflow);
        assert!(read_png(&report.written[0].path).text.is_empty());
    }

    #[test]
    fn test_thumbnail_mode_writes_both_directories() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(600, 300)], SaveMode::ThumbnailWithMetadata, "vault", &versioned())
            .unwrap();

        assert!(report.is_complete());
        let image = read_png(&tmp.path().join("output/vault_00000.png"));
        assert_eq!(image.frame.width(), 600);
        assert!(image.text.is_empty());

        let thumb = read_png(&tmp.path().join("output/snapshot/vault_00000.png"));
        assert_eq!((thumb.frame.width(), thumb.frame.height()), (256, 128));
        assert!(thumb.text_for("workflow").is_some());
    }

    #[test]
    fn test_json_mode_writes_sidecar_envelope() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::JsonWithWorkflow, "vault", &versioned())
            .unwrap();

        assert!(report.is_complete());
        let sidecar = tmp.path().join("output/snapshot/vault_00000.json");
        assert_eq!(report.paths(ArtifactKind::Sidecar), vec![sidecar.as_path()]);
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(parsed["workflow"]["version"], json!(0.4));
        assert_eq!(parsed["workflow"]["nodes"][0]["id"], json!(1));
    }

    #[test]
    fn test_json_mode_without_workflow_writes_empty_envelope() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        vault
            .save(&[frame(2, 2)], SaveMode::JsonWithWorkflow, "vault", &WorkflowChannels::default())
            .unwrap();

        let text = fs::read_to_string(tmp.path().join("output/snapshot/vault_00000.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"workflow": {}}));
    }

    #[test]
    fn test_batch_gets_distinct_names() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);
        let frames = vec![frame(2, 2), frame(3, 3), frame(4, 4)];

        let report = vault
            .save(&frames, SaveMode::JsonWithWorkflow, "batch", &versioned())
            .unwrap();

        let images: Vec<String> = report
            .paths(ArtifactKind::Image)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(images, vec!["batch_00000.png", "batch_00001.png", "batch_00002.png"]);
        assert_eq!(report.paths(ArtifactKind::Sidecar).len(), 3);
        assert_eq!(report.written[2].batch_index, 1);
    }

    #[test]
    fn test_repeated_saves_never_overwrite() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);
        fs::create_dir_all(tmp.path().join("output")).unwrap();
        fs::write(tmp.path().join("output/vault_00003.png"), b"keep").unwrap();

        let report = vault
            .save(&[frame(2, 2)], SaveMode::ImageOnly, "vault", &versioned())
            .unwrap();

        assert_eq!(
            report.paths(ArtifactKind::Image),
            vec![tmp.path().join("output/vault_00004.png")]
        );
        assert_eq!(fs::read(tmp.path().join("output/vault_00003.png")).unwrap(), b"keep");
    }

    #[test]
    fn test_serialization_failure_still_writes_plain_image() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::ImageWithMetadata, "vault", &broken())
            .unwrap();

        assert_eq!(report.written.len(), 1);
        assert!(!report.written[0].with_workflow);
        assert!(read_png(&report.written[0].path).text.is_empty());

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ArtifactKind::EmbeddedWorkflow);
        assert_eq!(report.failures[0].error_kind, "encoding");
        assert!(report.failures[0].message.contains("ModelPatcher"));
    }

    #[test]
    fn test_serialization_failure_skips_sidecar_only() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::JsonWithWorkflow, "vault", &broken())
            .unwrap();

        assert_eq!(report.paths(ArtifactKind::Image).len(), 1);
        assert!(report.paths(ArtifactKind::Sidecar).is_empty());
        assert_eq!(report.failures[0].kind, ArtifactKind::Sidecar);
        assert!(!tmp.path().join("output/snapshot/vault_00000.json").exists());
    }

    #[test]
    fn test_unwritable_output_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the output directory should be.
        let blocker = tmp.path().join("output");
        fs::write(&blocker, b"").unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::ImageOnly, "vault", &versioned())
            .unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error_kind, "io");
    }

    #[test]
    fn test_exhausted_index_space_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("output")).unwrap();
        fs::write(tmp.path().join(format!("output/vault_{}.png", u64::MAX)), b"").unwrap();
        let vault = vault_in(&tmp);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::ImageOnly, "vault", &versioned())
            .unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.failures[0].error_kind, "io");
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let vault = vault_in(&tmp);

        let err = vault
            .save(&[frame(2, 2)], SaveMode::ImageOnly, "../up", &versioned())
            .unwrap_err();
        assert!(matches!(err, ToolsError::Config(_)));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let report = vault_in(&tmp)
            .save(&[], SaveMode::ImageOnly, "vault", &versioned())
            .unwrap();
        assert!(report.written.is_empty());
        assert!(report.is_complete());
    }

    struct FailingEncoder;

    impl ImageEncoder for FailingEncoder {
        fn extension(&self) -> &'static str {
            "png"
        }

        fn encode(&self, _frame: &Frame, _text: &[TextEntry], out: &mut dyn Write) -> Result<()> {
            out.write_all(b"partial")?;
            Err(ToolsError::Encoding("encoder crashed".to_string()))
        }
    }

    #[test]
    fn test_encoder_failure_removes_partial_file() {
        let tmp = TempDir::new().unwrap();
        let config = VaultConfig {
            output_dir: tmp.path().join("output"),
            ..VaultConfig::default()
        };
        let vault = ImageVault::with_encoder(config, FailingEncoder);

        let report = vault
            .save(&[frame(2, 2)], SaveMode::JsonWithWorkflow, "vault", &versioned())
            .unwrap();

        assert!(report.paths(ArtifactKind::Image).is_empty());
        assert_eq!(report.paths(ArtifactKind::Sidecar).len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.kind, ArtifactKind::Image);
        let path = failure.path.as_ref().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_best_effort_naming_without_exclusive_create() {
        let tmp = TempDir::new().unwrap();
        let config = VaultConfig {
            output_dir: tmp.path().join("output"),
            exclusive_create: false,
            ..VaultConfig::default()
        };
        let vault = ImageVault::new(config);

        for _ in 0..3 {
            vault
                .save(&[frame(2, 2)], SaveMode::ImageOnly, "plain", &versioned())
                .unwrap();
        }
        for i in 0..3 {
            assert!(tmp.path().join(format!("output/plain_{:05}.png", i)).exists());
        }
    }
}
