use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pixboard_shared::{CanvasId, Color, Coordinate, RemotePixel};
use tracing::debug;

use crate::error::RemoteError;
use crate::geometry::ViewportRect;

/// Everything a poll is scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    pub canvas_id: CanvasId,
    pub since: DateTime<Utc>,
    pub rect: ViewportRect,
}

/// The canvas service as seen from the client.
#[async_trait]
pub trait CanvasRemote: Send + Sync {
    async fn put_pixel(&self, canvas_id: CanvasId, at: Coordinate, color: Color) -> Result<(), RemoteError>;
    async fn erase_pixel(&self, canvas_id: CanvasId, at: Coordinate) -> Result<(), RemoteError>;
    async fn poll(&self, request: &PollRequest) -> Result<Vec<RemotePixel>, RemoteError>;
}

pub struct HttpRemote {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl CanvasRemote for HttpRemote {
    async fn put_pixel(&self, canvas_id: CanvasId, at: Coordinate, color: Color) -> Result<(), RemoteError> {
        let url = format!(
            "{}/pixel/{canvas_id}/{}/{}/{}/{}/{}/{}",
            self.endpoint, at.x, at.y, color.r, color.g, color.b, color.a
        );
        let response = self
            .client
            .put(url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Self::expect_success(response)?;
        debug!("put pixel canvas={canvas_id} at={at}");
        Ok(())
    }

    async fn erase_pixel(&self, canvas_id: CanvasId, at: Coordinate) -> Result<(), RemoteError> {
        let url = format!("{}/pixel/{canvas_id}/{}/{}", self.endpoint, at.x, at.y);
        let response = self
            .client
            .delete(url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Self::expect_success(response)?;
        debug!("erase pixel canvas={canvas_id} at={at}");
        Ok(())
    }

    async fn poll(&self, request: &PollRequest) -> Result<Vec<RemotePixel>, RemoteError> {
        let rect = request.rect;
        let query = [
            ("cid", request.canvas_id.to_string()),
            ("from", request.since.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("tlx", rect.top_left.x.to_string()),
            ("tly", rect.top_left.y.to_string()),
            ("brx", rect.bottom_right.x.to_string()),
            ("bry", rect.bottom_right.y.to_string()),
        ];
        let response = self
            .client
            .get(format!("{}/poll", self.endpoint))
            .query(&query)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let body = Self::expect_success(response)?
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        parse_poll_body(&body)
    }
}

/// Decodes a poll response. The service answers `null` when nothing changed.
pub fn parse_poll_body(body: &str) -> Result<Vec<RemotePixel>, RemoteError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Option<Vec<RemotePixel>>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| {
            let snippet: String = body.chars().take(200).collect();
            RemoteError::Malformed(format!("{e} payload={snippet:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn null_and_empty_bodies_mean_no_changes() {
        assert!(parse_poll_body("null").unwrap().is_empty());
        assert!(parse_poll_body("[]").unwrap().is_empty());
        assert!(parse_poll_body("  ").unwrap().is_empty());
    }

    #[test]
    fn parses_pixel_list() {
        let body = r#"[{"X":1,"Y":2,"RGBA":{"R":9,"G":8,"B":7,"A":255}}]"#;
        let pixels = parse_poll_body(body).unwrap();
        assert_eq!(pixels.len(), 1);
        assert_eq!(pixels[0].coordinate(), Coordinate::new(1, 2));
        assert_eq!(pixels[0].color(), Color::rgba(9, 8, 7, 255));
    }

    #[test]
    fn garbage_is_malformed() {
        let error = parse_poll_body("<html>oops</html>").unwrap_err();
        assert_eq!(error.kind(), FailureKind::MalformedResponse);
        let error = parse_poll_body(r#"[{"X":"one"}]"#).unwrap_err();
        assert_eq!(error.kind(), FailureKind::MalformedResponse);
    }

    #[test]
    fn status_errors_count_as_network_failures() {
        assert_eq!(RemoteError::Status(500).kind(), FailureKind::NetworkFailure);
    }
}
