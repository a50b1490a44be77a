use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dentiscan::{AnalysisBackend, ConvertedUpload, Detection, ServiceError};

/// Scripted stand-in for the three remote services.
///
/// Each operation pops the next queued response and counts the call;
/// an exhausted queue is a transport failure, so a test that triggers
/// more remote calls than it scripted fails loudly.
#[derive(Default)]
pub struct MockBackend {
    convert_responses: Mutex<VecDeque<Result<ConvertedUpload, ServiceError>>>,
    detect_responses: Mutex<VecDeque<Result<Vec<Detection>, ServiceError>>>,
    report_responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    pub convert_calls: AtomicUsize,
    pub detect_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_convert(&self, response: Result<ConvertedUpload, ServiceError>) -> &Self {
        self.convert_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn queue_detect(&self, response: Result<Vec<Detection>, ServiceError>) -> &Self {
        self.detect_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn queue_report(&self, response: Result<String, ServiceError>) -> &Self {
        self.report_responses.lock().unwrap().push_back(response);
        self
    }

    fn unscripted(op: &str) -> ServiceError {
        ServiceError::Transport(format!("mock backend: unscripted {op} call"))
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn convert(
        &self,
        _file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<ConvertedUpload, ServiceError> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        self.convert_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("convert")))
    }

    async fn detect(&self, _file_id: &str) -> Result<Vec<Detection>, ServiceError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.detect_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("detect")))
    }

    async fn generate_report(&self, _file_id: &str) -> Result<String, ServiceError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.report_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("report")))
    }
}

/// Upload result for the canonical test file id "abc".
pub fn converted_abc() -> ConvertedUpload {
    ConvertedUpload {
        file_id: "abc".to_string(),
        preview_url: "http://localhost:8000/file/abc.png".to_string(),
    }
}

pub fn make_detection(label: &str, cx: f32, cy: f32, w: f32, h: f32) -> Detection {
    Detection {
        label: label.to_string(),
        confidence: 0.72,
        center_x: cx,
        center_y: cy,
        width: w,
        height: h,
    }
}

/// Two plausible pathologies on a periapical radiograph.
pub fn two_detections() -> Vec<Detection> {
    vec![
        make_detection("caries", 412.0, 263.0, 96.0, 74.0),
        make_detection("periapical lesion", 150.5, 402.0, 60.0, 58.0),
    ]
}
