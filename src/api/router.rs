//! HTTP API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Authentication is handled upstream; clinician identity comes from the
//! path and is checked against bindings and alert assignment.

use std::sync::Arc;

use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over shared state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

// Path params use `:param` syntax (matchit 0.7 / axum 0.7).
fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/patients/:patient_id/measurements",
            post(endpoints::measurements::create),
        )
        .route("/clinicians/:clinician_id/alerts", get(endpoints::alerts::list))
        .route(
            "/clinicians/:clinician_id/alerts/stats",
            get(endpoints::alerts::stats),
        )
        .route(
            "/clinicians/:clinician_id/alerts/:alert_id",
            get(endpoints::alerts::detail),
        )
        .route(
            "/clinicians/:clinician_id/alerts/:alert_id/handle",
            post(endpoints::alerts::handle),
        )
        .route(
            "/clinicians/:clinician_id/analysis/run",
            post(endpoints::analysis::run),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        // Health data must not sit in intermediary caches.
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, NaiveDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::AppConfig;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{insert_alert_unless_duplicate, list_alerts_for_clinician};
    use crate::models::*;

    fn test_state() -> (Arc<CoreState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.db_path = dir.path().join("carewatch.db");
        (Arc::new(CoreState::new(config)), dir)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn seed_alert(state: &CoreState, clinician: Uuid, patient: Uuid, priority: AlertPriority) -> Uuid {
        let conn = state.open_db().unwrap();
        let alert = Alert {
            id: Uuid::new_v4(),
            patient_id: patient,
            clinician_id: Some(clinician),
            alert_type: AlertType::ThresholdExceeded,
            rule: AlertRule::BpHigh,
            metric_type: Some(MetricType::BloodPressure),
            priority,
            status: AlertStatus::Pending,
            title: "Blood pressure high".into(),
            message: "Reading of 165.0/95.0 mmHg is above the high range.".into(),
            measurement_id: None,
            created_at: now() - Duration::hours(1),
            handled_by: None,
            handled_at: None,
            handling_notes: None,
            action_taken: None,
        };
        assert!(insert_alert_unless_duplicate(&conn, &alert, &(now() - Duration::days(30))).unwrap());
        alert.id
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _dir) = test_state();
        let response = api_router(state).oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-store");
        let json = json_of(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], true);
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let (state, _dir) = test_state();
        let response = api_router(state).oneshot(get_req("/api/nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn measurement_ingest_triggers_immediate_analysis() {
        let (state, _dir) = test_state();
        let (clinician, patient) = {
            let conn = state.open_db().unwrap();
            care_pair(&conn)
        };

        let response = api_router(state.clone())
            .oneshot(post_json(
                &format!("/api/patients/{patient}/measurements"),
                serde_json::json!({"metric_type": "blood_pressure", "systolic": 192.0, "diastolic": 118.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_of(response).await;
        assert_eq!(json["patient_id"], patient.to_string());

        let mut alerts = Vec::new();
        for _ in 0..100 {
            let conn = state.open_db().unwrap();
            alerts = list_alerts_for_clinician(&conn, &clinician, &AlertFilter::default(), &now()).unwrap();
            if !alerts.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule, AlertRule::BpCritical);
    }

    #[tokio::test]
    async fn measurement_with_foreign_field_rejected() {
        let (state, _dir) = test_state();
        let (_, patient) = {
            let conn = state.open_db().unwrap();
            care_pair(&conn)
        };
        let response = api_router(state)
            .oneshot(post_json(
                &format!("/api/patients/{patient}/measurements"),
                serde_json::json!({"metric_type": "glucose", "glucose": 6.1, "weight": 70.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn measurement_outside_accepted_time_range_rejected() {
        let (state, _dir) = test_state();
        let (clinician, patient) = {
            let conn = state.open_db().unwrap();
            care_pair(&conn)
        };
        let app = api_router(state.clone());
        for at in ["1900-01-01T00:00:00", "2999-01-01T00:00:00"] {
            let response = app
                .clone()
                .oneshot(post_json(
                    &format!("/api/patients/{patient}/measurements"),
                    serde_json::json!({"metric_type": "glucose", "glucose": 18.0, "measured_at": at}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_of(response).await["error"]["code"], "BAD_REQUEST");
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let conn = state.open_db().unwrap();
        assert!(list_alerts_for_clinician(&conn, &clinician, &AlertFilter::default(), &now())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn measurement_for_unknown_patient_404() {
        let (state, _dir) = test_state();
        let response = api_router(state)
            .oneshot(post_json(
                &format!("/api/patients/{}/measurements", Uuid::new_v4()),
                serde_json::json!({"metric_type": "weight", "weight": 70.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_and_stats() {
        let (state, _dir) = test_state();
        let (clinician, patient) = {
            let conn = state.open_db().unwrap();
            care_pair(&conn)
        };
        seed_alert(&state, clinician, patient, AlertPriority::High);

        let app = api_router(state.clone());
        let response = app
            .clone()
            .oneshot(get_req(&format!("/api/clinicians/{clinician}/alerts?priority=high&days=7")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await.as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(get_req(&format!("/api/clinicians/{clinician}/alerts?priority=critical")))
            .await
            .unwrap();
        assert_eq!(json_of(response).await.as_array().unwrap().len(), 0);

        let response = app
            .oneshot(get_req(&format!("/api/clinicians/{clinician}/alerts/stats")))
            .await
            .unwrap();
        let json = json_of(response).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["by_status"]["pending"], 1);
        assert_eq!(json["by_type"]["threshold_exceeded"], 1);
    }

    #[tokio::test]
    async fn list_with_widest_day_window_returns_all() {
        let (state, _dir) = test_state();
        let (clinician, patient) = {
            let conn = state.open_db().unwrap();
            care_pair(&conn)
        };
        let id = seed_alert(&state, clinician, patient, AlertPriority::High);

        let response = api_router(state)
            .oneshot(get_req(&format!("/api/clinicians/{clinician}/alerts?days=4294967295")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        let alerts = json.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["id"], id.to_string());
    }

    #[tokio::test]
    async fn list_for_unknown_clinician_404() {
        let (state, _dir) = test_state();
        let response = api_router(state)
            .oneshot(get_req(&format!("/api/clinicians/{}/alerts", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn detail_hidden_from_other_clinicians() {
        let (state, _dir) = test_state();
        let (clinician, patient, other) = {
            let conn = state.open_db().unwrap();
            let (c, p) = care_pair(&conn);
            (c, p, add_user(&conn, UserRole::Clinician))
        };
        let alert_id = seed_alert(&state, clinician, patient, AlertPriority::High);

        let app = api_router(state);
        let response = app
            .clone()
            .oneshot(get_req(&format!("/api/clinicians/{clinician}/alerts/{alert_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .oneshot(get_req(&format!("/api/clinicians/{other}/alerts/{alert_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handle_lifecycle() {
        let (state, _dir) = test_state();
        let (clinician, patient, other) = {
            let conn = state.open_db().unwrap();
            let (c, p) = care_pair(&conn);
            (c, p, add_user(&conn, UserRole::Clinician))
        };
        let alert_id = seed_alert(&state, clinician, patient, AlertPriority::Critical);
        let app = api_router(state);
        let body = serde_json::json!({"status": "handled", "notes": "Called patient", "action_taken": "Adjusted dose"});

        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/clinicians/{other}/alerts/{alert_id}/handle"), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/clinicians/{clinician}/alerts/{alert_id}/handle"),
                serde_json::json!({"status": "pending"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/clinicians/{clinician}/alerts/{alert_id}/handle"), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["status"], "handled");
        assert_eq!(json["handled_by"], clinician.to_string());
        assert_eq!(json["handling_notes"], "Called patient");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/clinicians/{clinician}/alerts/{alert_id}/handle"),
                serde_json::json!({"status": "dismissed"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(post_json(
                &format!("/api/clinicians/{clinician}/alerts/{}/handle", Uuid::new_v4()),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_analysis_returns_generated_count() {
        let (state, _dir) = test_state();
        let clinician = {
            let conn = state.open_db().unwrap();
            let (clinician, patient) = care_pair(&conn);
            bp(&conn, patient, now() - Duration::hours(30), 150.0, 90.0);
            bp(&conn, patient, now() - Duration::hours(6), 155.0, 92.0);
            clinician
        };

        let app = api_router(state);
        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/clinicians/{clinician}/analysis/run"), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        let generated = json["generated"].as_u64().unwrap();
        assert!(generated >= 1);
        assert_eq!(json["report"]["generated"].as_array().unwrap().len() as u64, generated);

        let response = app
            .oneshot(post_json(&format!("/api/clinicians/{clinician}/analysis/run"), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(json_of(response).await["generated"], 0);
    }

    #[tokio::test]
    async fn run_analysis_for_unknown_clinician_404() {
        let (state, _dir) = test_state();
        let response = api_router(state)
            .oneshot(post_json(
                &format!("/api/clinicians/{}/analysis/run", Uuid::new_v4()),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await["error"]["code"], "NOT_FOUND");
    }
}
