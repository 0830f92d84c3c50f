use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::debug;

/// Aggregate view of the client's outbound traffic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub quota_hits: u64,
    pub average_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
}

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub success: bool,
    pub quota_hit: bool,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: RwLock<ApiMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request: RequestMetrics) {
        debug!(
            "Recorded {} ({:?}) in {:?}",
            request.endpoint, request.status_code, request.response_time
        );

        let mut metrics = self.metrics.write().await;
        let completed = metrics.total_requests as u32;

        metrics.total_requests += 1;
        if request.success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }
        if request.quota_hit {
            metrics.quota_hits += 1;
        }

        let total_time = metrics.average_response_time * completed + request.response_time;
        metrics.average_response_time = total_time / (completed + 1);
        metrics.last_request_time = Some(SystemTime::now());
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = ApiMetrics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(success: bool, quota_hit: bool, millis: u64) -> RequestMetrics {
        RequestMetrics {
            endpoint: "/r/test/hot.json".to_string(),
            status_code: Some(if success { 200 } else { 429 }),
            response_time: Duration::from_millis(millis),
            success,
            quota_hit,
        }
    }

    #[tokio::test]
    async fn test_counts_and_average() {
        let collector = MetricsCollector::new();
        collector.record_request(request(true, false, 100)).await;
        collector.record_request(request(false, true, 300)).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.quota_hits, 1);
        assert_eq!(metrics.average_response_time, Duration::from_millis(200));
        assert!(metrics.last_request_time.is_some());
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();
        collector.record_request(request(true, false, 50)).await;
        collector.reset_metrics().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 0);
        assert!(metrics.last_request_time.is_none());
    }
}
