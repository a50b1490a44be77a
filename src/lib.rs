pub mod config;
pub mod models;
pub mod overlay;
pub mod remote;
pub mod workflow;

pub use models::{
    is_supported_radiograph, Detection, PipelineProgress, PipelineStage, Session,
};
pub use overlay::{
    project_detections, Debounce, OverlayPlanner, RenderGeometry, ScreenRect, ViewEvent,
};
pub use remote::{http::ServiceClient, AnalysisBackend, ConvertedUpload, ServiceError};
pub use workflow::{detection_summary, StageTicket, WorkflowController, NOTICE_TTL};
