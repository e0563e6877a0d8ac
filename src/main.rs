use actix_cors::Cors;
use actix_files::Files;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{middleware, web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phytoscan::config::Settings;
use phytoscan::handlers;
use phytoscan::services::InferenceService;

// ==============================================================================
// MAIN APPLICATION
// ==============================================================================

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PHYTOSCAN - Plant Disease Video Detection Gateway");

    // Load configuration
    let settings = Settings::from_env().expect("Failed to load configuration");
    info!("Configuration loaded successfully");

    // Initialize the inference client
    let inference = web::Data::new(
        InferenceService::new(&settings).expect("Failed to initialize inference client"),
    );

    let max_upload_bytes = settings.upload.max_bytes();
    let settings_data = web::Data::new(settings.clone());

    info!(
        "Starting HTTP server on {}:{}",
        settings.server.host, settings.server.port
    );

    let mut server = HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allowed_origin_fn(|origin, _req_head| {
                origin.as_bytes().starts_with(b"http://localhost")
                    || origin.as_bytes().starts_with(b"https://")
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            // Global middleware
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            // Application data
            .app_data(settings_data.clone())
            .app_data(inference.clone())
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(max_upload_bytes)
                    .memory_limit(2 * 1024 * 1024),
            )
            // Routes
            .route("/health", web::get().to(handlers::health_check))
            .route("/detect", web::post().to(handlers::detect))
            // Static files (must be last to catch all other routes)
            .configure(static_files)
    });

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }

    server
        .bind(format!("{}:{}", settings.server.host, settings.server.port))?
        .run()
        .await
}

fn static_files(cfg: &mut web::ServiceConfig) {
    if std::path::Path::new("./static").is_dir() {
        cfg.service(Files::new("/", "./static").index_file("index.html"));
    }
}
