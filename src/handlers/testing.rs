//! Canned transport for handler tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::base::HandlerContext;
use crate::config::FetchSettings;
use crate::fetch::{FetchError, Transport, TransportRequest, TransportResponse};
use crate::humanize::HumanDuration;

/// Answers by exact URL; anything unrouted is a 404
#[derive(Default)]
pub struct RouteTransport {
    routes: Mutex<HashMap<String, (u16, String)>>,
    seen: Mutex<Vec<TransportRequest>>,
}

impl RouteTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn context(self: &Arc<Self>) -> HandlerContext {
        let settings = FetchSettings {
            rate_limit_wait: HumanDuration::from_millis(0),
            ..FetchSettings::default()
        };
        HandlerContext::new(self.clone(), settings)
    }
}

#[async_trait]
impl Transport for RouteTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, FetchError> {
        self.seen.lock().unwrap().push(request.clone());

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or((404, String::new()));

        Ok(TransportResponse {
            status,
            reason: "routed".to_string(),
            body,
        })
    }
}
