use crate::board::{DashboardBoard, SharedBoard};
use crate::monitor::{MonitorHandle, MonitorStatsSnapshot, RefreshOutcome};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::PoisonError;

#[derive(Clone)]
pub struct HttpState {
    pub board: SharedBoard,
    pub monitor: MonitorHandle,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    board: DashboardBoard,
    monitor: MonitorStatsSnapshot,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    status: RefreshOutcome,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_dashboard(State(state): State<HttpState>) -> Json<DashboardResponse> {
    let board = state
        .board
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(DashboardResponse {
        board,
        monitor: state.monitor.stats().snapshot(),
    })
}

async fn post_refresh(
    State(state): State<HttpState>,
) -> Result<(StatusCode, Json<RefreshResponse>), (StatusCode, String)> {
    match state.monitor.request_refresh() {
        RefreshOutcome::Closed => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "monitor is not running".to_string(),
        )),
        status => Ok((StatusCode::ACCEPTED, Json(RefreshResponse { status }))),
    }
}

async fn post_dismiss_full_alert(
    State(state): State<HttpState>,
) -> Result<StatusCode, (StatusCode, String)> {
    let dismissed = state
        .board
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .dismiss_full_alert();
    if dismissed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::CONFLICT,
            "no full-screen alert is showing".to_string(),
        ))
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/dashboard", get(get_dashboard))
        .route("/v1/refresh", post(post_refresh))
        .route("/v1/alerts/full/dismiss", post(post_dismiss_full_alert))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::REFILL_REMINDER;
    use crate::monitor::{MonitorStats, Trigger};
    use crate::presenter::{AlertKind, Presenter, Slot};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value as JsonValue;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn state() -> (HttpState, mpsc::Receiver<Trigger>) {
        let (monitor, rx) = MonitorHandle::channel(Arc::new(MonitorStats::new()));
        (
            HttpState {
                board: DashboardBoard::shared(),
                monitor,
            },
            rx,
        )
    }

    fn post_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> JsonValue {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn dashboard_returns_rendered_slots() {
        let (state, _rx) = state();
        state
            .board
            .lock()
            .unwrap()
            .set_text(Slot::CurrentWeight, "312.40 g".to_string());

        let resp = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["board"]["slots"]["current-weight"], "312.40 g");
        assert_eq!(json["monitor"]["cycles_completed"], 0);
    }

    #[tokio::test]
    async fn refresh_is_queued_then_coalesced() {
        let (state, mut rx) = state();
        let app = router(state);

        let resp = app.clone().oneshot(post_request("/v1/refresh")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(resp).await["status"], "queued");

        let resp = app.clone().oneshot(post_request("/v1/refresh")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(resp).await["status"], "coalesced");

        assert_eq!(rx.recv().await, Some(Trigger::ManualRefresh));
        drop(rx);

        let resp = app.oneshot(post_request("/v1/refresh")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn dismiss_hides_full_alert() {
        let (state, _rx) = state();
        state
            .board
            .lock()
            .unwrap()
            .show_alert(AlertKind::Full, "Only 12.0% weight remaining! Refill soon.".to_string());
        let board = state.board.clone();

        let resp = router(state)
            .oneshot(post_request("/v1/alerts/full/dismiss"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let board = board.lock().unwrap();
        assert_eq!(board.alerts.full, None);
        assert_eq!(board.alerts.inline.as_deref(), Some(REFILL_REMINDER));
    }

    #[tokio::test]
    async fn dismiss_without_full_alert_conflicts() {
        let (state, _rx) = state();
        let board = state.board.clone();

        let resp = router(state)
            .oneshot(post_request("/v1/alerts/full/dismiss"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let board = board.lock().unwrap();
        assert_eq!(board.alerts.inline, None);
        assert_eq!(board.alerts.full, None);
    }
}
