use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::config::Settings;
use crate::errors::AppError;
use crate::services::InferenceService;

// ==============================================================================
// HEALTH CHECK
// ==============================================================================

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "PHYTOSCAN",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ==============================================================================
// DETECTION HANDLER
// ==============================================================================

#[derive(Debug, MultipartForm)]
pub struct DetectUpload {
    pub video: Option<TempFile>,
    pub plant_type: Option<Text<String>>,
}

#[derive(Debug, Validate)]
struct DetectParams {
    #[validate(length(min = 1, message = "Video and plant type are required"))]
    plant_type: String,
}

pub async fn detect(
    MultipartForm(form): MultipartForm<DetectUpload>,
    settings: web::Data<Settings>,
    inference: web::Data<InferenceService>,
) -> Result<HttpResponse, AppError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Received detection request");

    let (video, plant_type) = match (form.video, form.plant_type) {
        (Some(video), Some(plant_type)) => (video, plant_type.into_inner()),
        _ => {
            return Err(AppError::Validation(
                "Video and plant type are required".to_string(),
            ))
        }
    };

    let params = DetectParams {
        plant_type: plant_type.trim().to_string(),
    };
    params.validate()?;
    let plant_type = params.plant_type;

    let filename = video
        .file_name
        .clone()
        .unwrap_or_else(|| "upload.mp4".to_string());
    if !settings.upload.extension_allowed(&filename) {
        return Err(AppError::Validation(format!(
            "Unsupported video format: {}",
            filename
        )));
    }

    let bytes = tokio::fs::read(video.file.path()).await?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded video is empty".to_string()));
    }

    info!(
        %request_id,
        %filename,
        %plant_type,
        size_bytes = bytes.len(),
        "Forwarding upload for analysis"
    );

    let result = inference.analyze_video(&filename, bytes, &plant_type).await?;

    info!(
        %request_id,
        detections = result.detections.len(),
        processed_video = result.processed_video.is_some(),
        "Detection complete"
    );
    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    const BOUNDARY: &str = "------------------------phytoscantest";

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .into_bytes()
    }

    fn file_part(name: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
            BOUNDARY, name, filename
        )
        .into_bytes();
        part.extend_from_slice(data);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn multipart_body(parts: Vec<Vec<u8>>) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(&part);
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
        )
    }

    async fn send_detect(parts: Vec<Vec<u8>>) -> (actix_web::http::StatusCode, serde_json::Value) {
        let settings = Settings::default();
        let inference = web::Data::new(InferenceService::new(&settings).unwrap());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(settings))
                .app_data(inference)
                .route("/health", web::get().to(health_check))
                .route("/detect", web::post().to(detect)),
        )
        .await;

        let (content_type, body) = multipart_body(parts);
        let req = test::TestRequest::post()
            .uri("/detect")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: serde_json::Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn health_reports_service_name() {
        let app = test::init_service(
            App::new().route("/health", web::get().to(health_check)),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["service"], "PHYTOSCAN");
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn missing_video_field_is_rejected() {
        let (status, body) = send_detect(vec![text_part("plant_type", "tomato")]).await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Video and plant type are required" })
        );
    }

    #[actix_web::test]
    async fn missing_plant_type_field_is_rejected() {
        let (status, body) =
            send_detect(vec![file_part("video", "clip.mp4", b"fake video bytes")]).await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Video and plant type are required" })
        );
    }

    #[actix_web::test]
    async fn blank_plant_type_is_rejected() {
        let (status, body) = send_detect(vec![
            file_part("video", "clip.mp4", b"fake video bytes"),
            text_part("plant_type", "   "),
        ])
        .await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Video and plant type are required" })
        );
    }

    #[actix_web::test]
    async fn disallowed_extension_is_rejected() {
        let (status, body) = send_detect(vec![
            file_part("video", "notes.txt", b"not a video"),
            text_part("plant_type", "tomato"),
        ])
        .await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Unsupported video format: notes.txt" })
        );
    }

    #[actix_web::test]
    async fn empty_video_is_rejected() {
        let (status, body) = send_detect(vec![
            file_part("video", "clip.mp4", b""),
            text_part("plant_type", "tomato"),
        ])
        .await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Uploaded video is empty" })
        );
    }
}
