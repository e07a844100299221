use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use vpp_client::domain::LoadRecord;

use crate::{
    collectors::truncate_to_second,
    pipeline::{Envelope, PipelineError, Source},
    transform::coerce::lenient_f64,
};

#[derive(Clone)]
struct SharedSender {
    tx: mpsc::Sender<Envelope<LoadRecord>>,
}

/// Device upload endpoint (`POST /api/upload`) feeding accepted readings into
/// a bounded channel. A full channel applies backpressure to the request.
pub struct HttpUploadSource {
    local_addr: SocketAddr,
    receiver: Arc<tokio::sync::Mutex<Option<mpsc::Receiver<Envelope<LoadRecord>>>>>,
}

#[derive(serde::Deserialize)]
struct IncomingUpload {
    #[serde(default)]
    site_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    data: Option<IncomingData>,
}

#[derive(serde::Deserialize)]
struct IncomingData {
    #[serde(default)]
    value: Option<Value>,
}

/// Build a reading from an upload body. A missing or unparseable timestamp
/// falls back to `received_at`.
fn upload_to_record(body: Value, received_at: OffsetDateTime) -> Result<LoadRecord, String> {
    let incoming: IncomingUpload =
        serde_json::from_value(body).map_err(|e| format!("invalid request body: {e}"))?;

    let site_id = match incoming.site_id {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err("site_id is required".to_string()),
    };
    let data = incoming.data.ok_or_else(|| "data is required".to_string())?;

    let ts = incoming
        .timestamp
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or(received_at);

    Ok(LoadRecord {
        site_id,
        ts: truncate_to_second(ts),
        load_value: lenient_f64(data.value.as_ref()),
    })
}

impl HttpUploadSource {
    pub async fn bind(bind_addr: &str, channel_capacity: usize) -> Result<Self, PipelineError> {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));

        let app = Router::new()
            .route("/api/upload", post(upload))
            .with_state(SharedSender { tx });

        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| PipelineError::Source(format!("invalid bind addr: {e}")))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| PipelineError::Source(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| PipelineError::Source(e.to_string()))?;

        tracing::info!(addr = %local_addr, "upload endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                tracing::error!(error = %e, "upload server error");
            }
        });

        Ok(Self {
            local_addr,
            receiver: Arc::new(tokio::sync::Mutex::new(Some(rx))),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait::async_trait]
impl Source<LoadRecord> for HttpUploadSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<LoadRecord>, PipelineError>> + Send>> {
        match self.receiver.lock().await.take() {
            Some(rx) => Box::pin(ReceiverStream::new(rx).map(Ok)),
            None => Box::pin(futures::stream::once(async {
                Err(PipelineError::Source("upload stream already taken".to_string()))
            })),
        }
    }
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    metrics::counter!("upload_rejected_total").increment(1);
    tracing::debug!(error = %message, "upload rejected");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

async fn upload(
    State(sender): State<SharedSender>,
    payload: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    metrics::counter!("upload_requests_total").increment(1);

    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let record = match upload_to_record(body, OffsetDateTime::now_utc()) {
        Ok(r) => r,
        Err(message) => return bad_request(message),
    };

    let site_id = record.site_id.clone();
    let timestamp = record.ts.format(&Rfc3339).unwrap_or_default();

    if sender.tx.send(Envelope::now(record)).await.is_err() {
        tracing::error!("upload pipeline is closed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "upload pipeline unavailable" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": "data uploaded",
            "site_id": site_id,
            "timestamp": timestamp,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const RECEIVED: OffsetDateTime = datetime!(2024-06-01 09:30:12.900 UTC);

    #[test]
    fn full_body_is_converted() {
        let body = json!({
            "site_id": "north",
            "timestamp": "2024-06-01T08:00:00+08:00",
            "data": { "value": 42.5 }
        });

        let r = upload_to_record(body, RECEIVED).unwrap();

        assert_eq!(r.site_id, "north");
        assert_eq!(r.ts, datetime!(2024-06-01 00:00:00 UTC));
        assert_eq!(r.load_value, 42.5);
    }

    #[test]
    fn bad_or_missing_timestamp_uses_receive_time() {
        for ts in [json!(null), json!(""), json!("yesterday")] {
            let body = json!({ "site_id": "south", "timestamp": ts, "data": { "value": 1 } });
            let r = upload_to_record(body, RECEIVED).unwrap();
            assert_eq!(r.ts, datetime!(2024-06-01 09:30:12 UTC));
        }
    }

    #[test]
    fn value_is_coerced_leniently() {
        let value_of = |v: Value| {
            upload_to_record(json!({ "site_id": "north", "data": { "value": v } }), RECEIVED)
                .unwrap()
                .load_value
        };

        assert_eq!(value_of(json!("17.25")), 17.25);
        assert_eq!(value_of(json!("n/a")), 0.0);
        assert_eq!(value_of(json!(null)), 0.0);
        assert_eq!(
            upload_to_record(json!({ "site_id": "north", "data": {} }), RECEIVED)
                .unwrap()
                .load_value,
            0.0
        );
    }

    #[test]
    fn site_and_data_are_required() {
        assert!(upload_to_record(json!({ "data": { "value": 1 } }), RECEIVED).is_err());
        assert!(upload_to_record(json!({ "site_id": " ", "data": { "value": 1 } }), RECEIVED).is_err());
        assert!(upload_to_record(json!({ "site_id": "north" }), RECEIVED).is_err());
        assert!(upload_to_record(json!([1, 2, 3]), RECEIVED).is_err());
    }

    #[tokio::test]
    async fn accepted_upload_reaches_stream() {
        let source = HttpUploadSource::bind("127.0.0.1:0", 8).await.unwrap();
        let url = format!("http://{}/api/upload", source.local_addr());
        let mut stream = source.stream().await;

        let resp = reqwest::Client::new()
            .post(&url)
            .json(&json!({
                "site_id": "central",
                "timestamp": "2024-06-01T12:00:00Z",
                "data": { "value": "3.5" }
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let reply: Value = resp.json().await.unwrap();
        assert_eq!(reply["site_id"], "central");
        assert_eq!(reply["timestamp"], "2024-06-01T12:00:00Z");

        let env = stream.next().await.unwrap().unwrap();
        assert_eq!(env.payload.site_id, "central");
        assert_eq!(env.payload.load_value, 3.5);
    }

    #[tokio::test]
    async fn invalid_uploads_get_400() {
        let source = HttpUploadSource::bind("127.0.0.1:0", 8).await.unwrap();
        let url = format!("http://{}/api/upload", source.local_addr());
        let client = reqwest::Client::new();

        let missing_site = client
            .post(&url)
            .json(&json!({ "data": { "value": 1 } }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing_site.status(), 400);

        let not_json = client
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(not_json.status(), 400);
        let reply: Value = not_json.json().await.unwrap();
        assert!(reply["error"].is_string());
    }

    #[tokio::test]
    async fn stream_can_only_be_taken_once() {
        let source = HttpUploadSource::bind("127.0.0.1:0", 1).await.unwrap();
        let _first = source.stream().await;

        let second = source.stream().await.next().await.unwrap();
        assert!(matches!(second, Err(PipelineError::Source(_))));
    }
}
