use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::api::models::{GenerateFormsRequest, GenerateFormsResponse};
use crate::visa::artifacts::download_file_name;
use crate::visa::{ApplicantBatch, ArtifactKind, Generator, PipelineError, Validator, VisaFormGenerator};
use crate::ErrorResponse;

const LATEST_JOB: &str = "latest";

pub struct AppState {
    pub generator: VisaFormGenerator,
}

impl AppState {
    pub fn new(generator: VisaFormGenerator) -> Self {
        Self { generator }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Visa Forms",
    post,
    path = "/generate-japanese-forms",
    request_body = GenerateFormsRequest,
    responses(
        (status = 200, description = "Forms generated", body = GenerateFormsResponse),
        (status = 400, description = "Invalid or empty member data", body = ErrorResponse),
        (status = 500, description = "Template unreadable or output could not be saved", body = ErrorResponse)
    )
)]
pub async fn generate_japanese_forms(
    state: web::Data<AppState>,
    req: web::Json<GenerateFormsRequest>,
) -> impl Responder {
    let request = req.into_inner();
    if let Err(message) = request.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message));
    }

    let batch = ApplicantBatch::new(request.members);
    let worker = state.clone();
    let result = web::block(move || worker.generator.generate(batch)).await;

    match result {
        Ok(Ok(report)) => HttpResponse::Ok().json(GenerateFormsResponse::from_report(&report)),
        Ok(Err(PipelineError::NoValidApplicants)) => HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("No valid member data provided")),
        Ok(Err(e)) => {
            log::error!("Error generating forms: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&e.to_string()))
        }
        Err(e) => {
            log::error!("Form generation task failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error("Form generation failed"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Visa Forms",
    get,
    path = "/download/{format}/{job_id}",
    params(
        ("format" = String, Path, description = "`pdf` or `word`"),
        ("job_id" = String, Path, description = "Job id returned by generation, or `latest`")
    ),
    responses(
        (status = 200, description = "Generated file"),
        (status = 400, description = "Unknown format or malformed job id", body = ErrorResponse),
        (status = 404, description = "No generated file for this job", body = ErrorResponse)
    )
)]
pub async fn download_generated_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (format, job_id) = path.into_inner();

    let Some(kind) = ArtifactKind::from_format(&format) else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request(&format!("Unknown format '{}'", format)));
    };

    let job = if job_id == LATEST_JOB {
        None
    } else {
        match Uuid::parse_str(&job_id) {
            Ok(id) => Some(id),
            Err(_) => {
                return HttpResponse::BadRequest()
                    .json(ErrorResponse::bad_request(&format!("Invalid job id '{}'", job_id)))
            }
        }
    };

    let store = state.generator.store().clone();
    let lookup = web::block(move || match job {
        Some(id) => store.find(id, kind),
        None => store.latest(kind),
    })
    .await;

    let file_path: PathBuf = match lookup {
        Ok(Ok(Some(path))) => path,
        Ok(Ok(None)) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found("No generated files found"))
        }
        Ok(Err(e)) => {
            log::error!("Failed to look up generated {:?} for {}: {}", kind, job_id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&format!("Download failed: {}", e)));
        }
        Err(e) => {
            log::error!("Download lookup task failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse::internal_error("Download failed"));
        }
    };

    match NamedFile::open_async(&file_path).await {
        Ok(file) => file
            .set_content_type(mime_guess::from_path(&file_path).first_or_octet_stream())
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(download_file_name(kind, Utc::now()))],
            })
            .into_response(&req),
        Err(e) => {
            log::warn!("Generated file {} could not be opened: {}", file_path.display(), e);
            HttpResponse::NotFound().json(ErrorResponse::not_found("Generated file not found"))
        }
    }
}

/// Configure the visa form routes (mounted under `/api`).
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/generate-japanese-forms").route(web::post().to(generate_japanese_forms)),
    )
    .service(
        web::resource("/download/{format}/{job_id}").route(web::get().to(download_generated_form)),
    );
}
