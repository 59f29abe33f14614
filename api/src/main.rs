// G2C Bulletin API v0.1
use axum::http::{header, Method};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use db::repository::PgStore;
use routes::reports::ReportState;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// G2C Bulletin API: OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "G2C Bulletin API",
        version = "0.1.0",
        description = "Grade aggregation and report cards for the G2C school platform. \
            Records weighted grades, computes per-subject and coefficient-weighted \
            general averages on a 0-20 scale, closes reporting periods with class \
            ranks, and renders downloadable bulletins.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Subjects", description = "Subject reference data"),
        (name = "Grades", description = "Grade recording and retrieval"),
        (name = "Reports", description = "Report cards, period close and bulletin download"),
    ),
    paths(
        routes::health::health_check,
        routes::subjects::list_subjects,
        routes::subjects::get_subject,
        routes::grades::list_student_grades,
        routes::grades::create_grade,
        routes::reports::list_student_reports,
        routes::reports::list_class_reports,
        routes::reports::close_class_period,
        routes::reports::create_report,
        routes::reports::get_report,
        routes::reports::download_report,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::subjects::SubjectResponse,
            routes::grades::CreateGradeRequest,
            routes::grades::GradeResponse,
            routes::reports::ClosePeriodRequest,
            routes::reports::CreateReportRequest,
            routes::reports::SubjectAverageResponse,
            routes::reports::ReportCardResponse,
            routes::reports::ReportResponse,
            routes::reports::PeriodCloseResponse,
            db::models::GradeType,
            db::models::ReportStatus,
            services::report::AverageSource,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "g2c_bulletin_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let report_state = ReportState {
        store: PgStore::new(pool.clone()),
        school_name: config.school_name.clone(),
    };

    // CORS: reads plus grade/report creation; expose the download filename
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]);

    // Build router
    // Reference data and grades use PgPool state directly; reports use ReportState.
    let subject_routes = Router::new()
        .route("/api/v1/subjects", get(routes::subjects::list_subjects))
        .route("/api/v1/subjects/:id", get(routes::subjects::get_subject))
        .with_state(pool.clone());

    let grade_routes = Router::new()
        .route(
            "/api/v1/students/:student_id/grades",
            get(routes::grades::list_student_grades),
        )
        .route("/api/v1/grades", post(routes::grades::create_grade))
        .with_state(pool.clone());

    let report_routes = Router::new()
        .route(
            "/api/v1/students/:student_id/reports",
            get(routes::reports::list_student_reports),
        )
        .route(
            "/api/v1/classes/:class_id/reports",
            get(routes::reports::list_class_reports),
        )
        .route(
            "/api/v1/classes/:class_id/reports/close",
            post(routes::reports::close_class_period),
        )
        .route("/api/v1/reports", post(routes::reports::create_report))
        .route("/api/v1/reports/:report_id", get(routes::reports::get_report))
        .route(
            "/api/v1/reports/:report_id/download",
            get(routes::reports::download_report),
        )
        .with_state(report_state);

    // Health check uses PgPool to verify DB connectivity
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(pool);

    let app = Router::new()
        .merge(health_routes)
        .merge(subject_routes)
        .merge(grade_routes)
        .merge(report_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
