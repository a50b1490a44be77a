use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One candidate pathology found by the detection service.
///
/// Coordinates are in the natural (unscaled) pixel space of the source
/// image and are center-anchored: `center_x`/`center_y` name the box
/// center, not its top-left corner. The wire names (`class`, `x`, `y`)
/// follow the detection service envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,
    /// Probability in [0, 1].
    pub confidence: f32,
    #[serde(rename = "x")]
    pub center_x: f32,
    #[serde(rename = "y")]
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

/// The active analysis unit: one selected radiograph and everything the
/// pipeline has produced for it so far.
///
/// A Session is created on file selection and discarded wholesale when a
/// new file is chosen; step results supersede, they never merge. `token`
/// is the session identity used to recognize stale service responses.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: Uuid,
    /// Name of the selected candidate file ("" = nothing selected).
    pub file_name: String,
    /// Identifier assigned by the conversion service ("" = no upload yet).
    pub file_id: String,
    /// Locator for the rendered preview image.
    pub preview_url: String,
    pub detections: Vec<Detection>,
    pub report: String,
}

impl Session {
    /// Fresh session for a newly selected file. Everything downstream of
    /// the selection starts empty.
    pub fn for_file(file_name: &str) -> Self {
        Self {
            token: Uuid::new_v4(),
            file_name: file_name.to_string(),
            file_id: String::new(),
            preview_url: String::new(),
            detections: Vec::new(),
            report: String::new(),
        }
    }

    pub fn empty() -> Self {
        Self::for_file("")
    }

    pub fn has_file(&self) -> bool {
        !self.file_name.is_empty()
    }

    pub fn has_upload(&self) -> bool {
        !self.file_id.is_empty()
    }
}

/// Whether a filename looks like a radiograph we accept for upload.
///
/// DICOM-family files are identified by extension only (`.dcm`, `.rvg`),
/// case-insensitive; contents are never sniffed.
pub fn is_supported_radiograph(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".dcm") || lower.ends_with(".rvg")
}

/// One step of the Upload -> Detect -> Report pipeline.
///
/// `Idle` is the only rest state; every remote operation moves
/// Idle -> in-flight stage -> Idle, whether it succeeds or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Uploading,
    Detecting,
    Reporting,
}

impl PipelineStage {
    pub fn is_busy(&self) -> bool {
        !matches!(self, PipelineStage::Idle)
    }

    /// Human-readable status line while this stage is in flight.
    pub fn status_line(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "",
            PipelineStage::Uploading => "Uploading and converting DICOM file...",
            PipelineStage::Detecting => "Analyzing X-ray for pathologies...",
            PipelineStage::Reporting => "Generating diagnostic report...",
        }
    }
}

/// Presentational summary of how far the pipeline has progressed.
///
/// Derived from the Session on demand; a step counts as completed once
/// its result is present, independent of what is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineProgress {
    pub uploaded: bool,
    pub detected: bool,
    pub reported: bool,
    pub active: PipelineStage,
}

impl PipelineProgress {
    pub fn of(session: &Session, stage: PipelineStage) -> Self {
        Self {
            uploaded: !session.file_id.is_empty(),
            detected: !session.detections.is_empty(),
            reported: !session.report.is_empty(),
            active: stage,
        }
    }

    /// Number of completed steps, 0..=3.
    pub fn completed_steps(&self) -> usize {
        [self.uploaded, self.detected, self.reported]
            .iter()
            .filter(|done| **done)
            .count()
    }
}
