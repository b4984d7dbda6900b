use crate::controller::{analysis_controller, health_check_controller};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Largest accepted request body; uploads include full audio recordings.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Conversation Insights API"
        ),
        paths(
            analysis_controller::submit,
            analysis_controller::submit_text,
            analysis_controller::status,
            analysis_controller::result,
            analysis_controller::recommendations,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                analysis_controller::SubmitResponse,
                analysis_controller::TextParams,
                analysis_controller::UploadForm,
                domain::analysis::AnalysisRecord,
                domain::analysis::DepthDistribution,
                domain::analysis::RadarAssessment,
                domain::analysis::StrengthsAndGrowth,
                domain::analysis::DetailedRecommendation,
                domain::analysis::ExampleReframing,
                domain::analysis::StrengthAssessment,
                domain::analysis::EmotionEntry,
                domain::analysis::PrioritizedRecommendation,
                domain::analysis::Priority,
                domain::facade::StatusView,
                domain::job::JobStatus,
                domain::job::FailureKind,
            )
        ),
        tags(
            (name = "conversation_insights", description = "Conversation analysis jobs")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(analysis_routes(app_state))
        .merge(health_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn analysis_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/analyses", post(analysis_controller::submit))
        .route("/analyses/text", post(analysis_controller::submit_text))
        .route(
            "/analyses/{job_id}/status",
            get(analysis_controller::status),
        )
        .route(
            "/analyses/{job_id}/result",
            get(analysis_controller::result),
        )
        .route(
            "/analyses/{job_id}/recommendations",
            get(analysis_controller::recommendations),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_routes()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[test]
    fn test_openapi_lists_every_analysis_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/analyses",
            "/analyses/text",
            "/analyses/{job_id}/status",
            "/analyses/{job_id}/result",
            "/analyses/{job_id}/recommendations",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
