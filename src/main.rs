mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::activities::{routes as activities_routes, ActivityService};
use crate::features::auth::routes as auth_routes;
use crate::features::auth::services::{AuthService, PasswordResetService, TokenService};
use crate::features::auth::{AuthState, JwtValidator};
use crate::features::comments::{routes as comments_routes, CommentService, CommentState};
use crate::features::dashboard::{
    routes as dashboard_routes, DashboardContext, DashboardService, PgDashboardSource,
};
use crate::features::files::services::UploadProgressTracker;
use crate::features::files::{routes as files_routes, FileService};
use crate::features::shares::{routes as shares_routes, ShareService};
use crate::features::users::{routes as users_routes, UserService};
use crate::modules::change_feed::ChangeFeed;
use crate::modules::email::{EmailSender, HttpEmailClient, LoggingEmailSender};
use crate::modules::storage::{MinIOClient, ObjectStore};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Every write publishes here; live streams subscribe
    let change_feed = ChangeFeed::default();

    // Users and auth
    let user_service = Arc::new(UserService::new(pool.clone(), change_feed.clone()));
    let jwt_validator = Arc::new(JwtValidator::new(&config.auth, Arc::clone(&user_service)));
    let token_service = Arc::new(TokenService::new(&config.auth));
    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&user_service),
        Arc::clone(&token_service),
    ));

    let email_sender: Arc<dyn EmailSender> = match config.email.api_url.clone() {
        Some(api_url) => {
            tracing::info!("Email delivery via {}", api_url);
            Arc::new(HttpEmailClient::new(api_url, &config.email))
        }
        None => {
            tracing::warn!("EMAIL_API_URL not set; verification emails are only logged");
            Arc::new(LoggingEmailSender)
        }
    };
    let password_reset_service = Arc::new(PasswordResetService::new(
        pool.clone(),
        Arc::clone(&user_service),
        email_sender,
        &config.auth,
    ));
    let auth_state = AuthState {
        auth: Arc::clone(&auth_service),
        password_reset: password_reset_service,
    };
    tracing::info!("Auth services initialized");

    // Initialize MinIO client for storage (creates the bucket if missing)
    let minio_client = Arc::new(
        MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    let object_store: Arc<dyn ObjectStore> = minio_client;
    tracing::info!("MinIO client initialized for bucket: {}", config.minio.bucket);

    // Feature services
    let activity_service = Arc::new(ActivityService::new(pool.clone()));
    let file_service = Arc::new(FileService::new(
        pool.clone(),
        object_store,
        change_feed.clone(),
        Arc::new(UploadProgressTracker::new()),
        config.dashboard.storage_quota_bytes,
    ));
    let share_service = Arc::new(ShareService::new(pool.clone(), change_feed.clone()));
    let comment_service = Arc::new(CommentService::new(
        pool.clone(),
        Arc::clone(&share_service),
        change_feed.clone(),
    ));
    tracing::info!("File, share, comment and activity services initialized");

    let dashboard_source = Arc::new(PgDashboardSource::new(
        Arc::clone(&user_service),
        Arc::clone(&file_service),
        Arc::clone(&share_service),
        Arc::clone(&comment_service),
        Arc::clone(&activity_service),
    ));
    let dashboard_service = Arc::new(DashboardService::new(
        dashboard_source,
        change_feed.clone(),
        config.dashboard.inbox_capacity,
    ));
    tracing::info!(
        "Dashboard service initialized (inbox capacity {}, keep-alive {:?})",
        config.dashboard.inbox_capacity,
        config.dashboard.keep_alive
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes(auth_state.clone()))
        .merge(users_routes::routes(Arc::clone(&user_service)))
        .merge(files_routes::routes(file_service))
        .merge(shares_routes::routes(share_service))
        .merge(comments_routes::routes(CommentState {
            service: comment_service,
            keep_alive: config.dashboard.keep_alive,
        }))
        .merge(activities_routes::routes(activity_service))
        .merge(dashboard_routes::routes(DashboardContext {
            service: dashboard_service,
            keep_alive: config.dashboard.keep_alive,
        }))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // Public routes (no auth required)
    let public_routes = Router::new().merge(auth_routes::public_routes(auth_state));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
