//! The Upload -> Detect -> Report workflow controller.
//!
//! Owns the Session / PipelineStage pair and mediates the three remote
//! operations. Each operation is split into a `begin_*` that checks
//! preconditions and flips the in-flight stage, and a `finish_*` that
//! applies the service's response, so a response arriving for a
//! superseded session can be recognized by its [`StageTicket`] and
//! dropped. The async `upload`/`detect`/`report` helpers run the two
//! phases around a backend call for straight-line drivers.

use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::models::{
    is_supported_radiograph, Detection, PipelineProgress, PipelineStage, Session,
};
use crate::remote::{AnalysisBackend, ConvertedUpload, ServiceError};

/// How long a transient success notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Transient success notification; expires after [`NOTICE_TTL`] and is
/// replaced, never queued, by the next notice or error.
#[derive(Debug, Clone)]
pub struct Notice {
    text: String,
    posted: Instant,
}

impl Notice {
    fn new(text: String) -> Self {
        Self {
            text,
            posted: Instant::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.posted) >= NOTICE_TTL
    }
}

/// Proof that a stage was started for a particular session. A
/// `finish_*` call only applies when the ticket's session token still
/// matches the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTicket {
    session: Uuid,
    stage: PipelineStage,
}

impl StageTicket {
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }
}

/// Linear pipeline state machine: Idle is the only rest state, every
/// remote operation moves Idle -> in-flight -> Idle, and steps never
/// chain automatically. At most one operation is in flight; `begin_*`
/// while busy is a no-op returning `None`.
#[derive(Debug)]
pub struct WorkflowController {
    session: Session,
    stage: PipelineStage,
    error: Option<String>,
    notice: Option<Notice>,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self {
            session: Session::empty(),
            stage: PipelineStage::Idle,
            error: None,
            notice: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn is_busy(&self) -> bool {
        self.stage.is_busy()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Current transient notice, if it has not yet expired.
    pub fn notice_at(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|notice| !notice.is_expired_at(now))
            .map(Notice::text)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice_at(Instant::now())
    }

    /// Drop an expired notice. Safe to call on every tick.
    pub fn expire_notice(&mut self, now: Instant) {
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| notice.is_expired_at(now))
        {
            self.notice = None;
        }
    }

    pub fn progress(&self) -> PipelineProgress {
        PipelineProgress::of(&self.session, self.stage)
    }

    /// Whether the triggering control for each action should be live.
    pub fn can_upload(&self) -> bool {
        !self.is_busy()
            && self.session.has_file()
            && is_supported_radiograph(&self.session.file_name)
    }

    pub fn can_detect(&self) -> bool {
        !self.is_busy() && self.session.has_upload()
    }

    pub fn can_report(&self) -> bool {
        !self.is_busy() && self.session.has_upload() && !self.session.detections.is_empty()
    }

    /// Record a newly chosen file, discarding the previous Session
    /// entirely: any earlier file id, detections, and report become
    /// invalid and must not be reused. No remote call is made.
    pub fn select_file(&mut self, file_name: &str) {
        self.session = Session::for_file(file_name);
        self.stage = PipelineStage::Idle;
        self.error = None;
        self.notice = if file_name.is_empty() {
            None
        } else {
            Some(Notice::new(format!("Selected: {file_name}")))
        };
    }

    fn begin(&mut self, stage: PipelineStage) -> StageTicket {
        self.stage = stage;
        self.error = None;
        self.notice = None;
        StageTicket {
            session: self.session.token,
            stage,
        }
    }

    /// A response belongs to the live session or it is stale.
    fn accept(&mut self, ticket: &StageTicket) -> bool {
        if ticket.session == self.session.token {
            self.stage = PipelineStage::Idle;
            true
        } else {
            debug!(
                stage = ?ticket.stage,
                "discarding stale response for superseded session"
            );
            false
        }
    }

    fn fail(&mut self, err: &ServiceError, fallback: &str) {
        self.error = Some(err.detail().unwrap_or(fallback).to_string());
    }

    /// Start the upload stage. `None` when no acceptable file is
    /// selected or another stage is in flight (no state change).
    pub fn begin_upload(&mut self) -> Option<StageTicket> {
        if !self.can_upload() {
            return None;
        }
        let ticket = self.begin(PipelineStage::Uploading);
        // A new upload invalidates any stale downstream results.
        self.session.detections.clear();
        self.session.report.clear();
        Some(ticket)
    }

    pub fn finish_upload(
        &mut self,
        ticket: StageTicket,
        outcome: Result<ConvertedUpload, ServiceError>,
    ) {
        if !self.accept(&ticket) {
            return;
        }
        match outcome {
            Ok(converted) => {
                self.session.file_id = converted.file_id;
                self.session.preview_url = converted.preview_url;
                self.session.detections.clear();
                self.session.report.clear();
                self.notice = Some(Notice::new(
                    "DICOM file uploaded and converted successfully!".to_string(),
                ));
            }
            Err(err) => self.fail(&err, "Upload failed."),
        }
    }

    /// Start the detection stage. Requires a completed upload and an
    /// idle pipeline. Prior detections and report are cleared up front
    /// so a report can never reference stale detections.
    pub fn begin_detect(&mut self) -> Option<StageTicket> {
        if !self.can_detect() {
            return None;
        }
        let ticket = self.begin(PipelineStage::Detecting);
        self.session.detections.clear();
        self.session.report.clear();
        Some(ticket)
    }

    pub fn finish_detect(
        &mut self,
        ticket: StageTicket,
        outcome: Result<Vec<Detection>, ServiceError>,
    ) {
        if !self.accept(&ticket) {
            return;
        }
        match outcome {
            Ok(detections) => {
                self.notice = Some(Notice::new(detection_summary(detections.len())));
                self.session.detections = detections;
            }
            Err(err) => self.fail(&err, "Prediction failed."),
        }
    }

    /// Start the report stage. Requires a completed upload, at least
    /// one detection, and an idle pipeline.
    pub fn begin_report(&mut self) -> Option<StageTicket> {
        if !self.can_report() {
            return None;
        }
        let ticket = self.begin(PipelineStage::Reporting);
        self.session.report.clear();
        Some(ticket)
    }

    pub fn finish_report(&mut self, ticket: StageTicket, outcome: Result<String, ServiceError>) {
        if !self.accept(&ticket) {
            return;
        }
        match outcome {
            Ok(report) => {
                self.session.report = report;
                self.notice = Some(Notice::new(
                    "Diagnostic report generated successfully!".to_string(),
                ));
            }
            Err(err) => self.fail(&err, "Report generation failed."),
        }
    }

    /// Run the upload stage end to end against a backend. Returns
    /// `false` when preconditions rejected the attempt.
    pub async fn upload<B>(&mut self, backend: &B, bytes: Vec<u8>) -> bool
    where
        B: AnalysisBackend + ?Sized,
    {
        let Some(ticket) = self.begin_upload() else {
            return false;
        };
        let file_name = self.session.file_name.clone();
        let outcome = backend.convert(&file_name, bytes).await;
        self.finish_upload(ticket, outcome);
        true
    }

    pub async fn detect<B>(&mut self, backend: &B) -> bool
    where
        B: AnalysisBackend + ?Sized,
    {
        let Some(ticket) = self.begin_detect() else {
            return false;
        };
        let file_id = self.session.file_id.clone();
        let outcome = backend.detect(&file_id).await;
        self.finish_detect(ticket, outcome);
        true
    }

    pub async fn report<B>(&mut self, backend: &B) -> bool
    where
        B: AnalysisBackend + ?Sized,
    {
        let Some(ticket) = self.begin_report() else {
            return false;
        };
        let file_id = self.session.file_id.clone();
        let outcome = backend.generate_report(&file_id).await;
        self.finish_report(ticket, outcome);
        true
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

/// Count-aware summary for a completed detection run, grammatically
/// singular or plural.
pub fn detection_summary(count: usize) -> String {
    match count {
        0 => "No pathologies detected in this X-ray.".to_string(),
        1 => "Found 1 potential pathology!".to_string(),
        n => format!("Found {n} potential pathologies!"),
    }
}
