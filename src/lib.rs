use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod api;
pub mod config;
pub mod visa;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::visa::{ArtifactStore, FieldMappingConfig, Translations, VisaFormGenerator};

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::generate_japanese_forms,
        crate::api::handlers::download_generated_form,
    ),
    components(schemas(
        api::models::GenerateFormsRequest,
        api::models::GenerateFormsResponse,
        ErrorResponse,
    )),
    tags(
        (name = "Visa Forms", description = "Japanese visa form generation from passport data.")
    )
)]
pub struct ApiDoc;

/// Build the generator from the startup configuration.
pub fn build_generator(config: &AppConfig) -> anyhow::Result<VisaFormGenerator> {
    let mapping = FieldMappingConfig::load(&config.mapping_config).with_context(|| {
        format!(
            "loading field mapping from {}",
            config.mapping_config.display()
        )
    })?;

    let store = ArtifactStore::new(&config.output_dir);
    store
        .ensure_dir()
        .with_context(|| format!("creating output directory {}", store.dir().display()))?;

    let generator = VisaFormGenerator::new(
        Arc::new(mapping),
        &config.template_dir,
        store,
        Translations::default(),
    );

    if !generator.template_path().is_file() {
        log::warn!(
            "PDF template {} not found; generation will fail until it is in place",
            generator.template_path().display()
        );
    }

    Ok(generator)
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let app_state = web::Data::new(AppState::new(build_generator(&config)?));

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:5000")
            .allowed_origin("http://127.0.0.1:5000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(web::scope("/api").configure(api::config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("binding {}:{}", config.host, config.port))?
    .run()
    .await
    .context("running HTTP server")
}
