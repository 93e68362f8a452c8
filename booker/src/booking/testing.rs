use super::api::{ApiRequest, ApiResponse, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned responses in order and keeps every request it was sent.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    responses: Arc<Mutex<VecDeque<ApiResponse>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl RecordingTransport {
    pub fn with_responses(responses: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        let transport = Self::default();
        transport.responses.lock().unwrap().extend(
            responses
                .into_iter()
                .map(|(status, body)| ApiResponse::new(status, body)),
        );
        transport
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let res = self.responses.lock().unwrap().pop_front();
        Ok(res.unwrap_or_else(|| ApiResponse::new(500, "no canned response")))
    }
}
