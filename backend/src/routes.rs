use std::io::Write;
use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::error;
use serde::Serialize;
use serde_json::json;

use shared::{DatasetRequest, PredictionResponse};

use crate::classify::heatmap;
use crate::classify::predictor::{PredictError, Predictor};
use crate::dataset::preview::{DEFAULT_PREVIEW_ROWS, table_preview};
use crate::dataset::provider::DatasetError;
use crate::dataset::resolver::DatasetService;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/api/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/api/dataset/preview").route(web::post().to(handle_dataset_preview)))
        .service(web::resource("/api/dataset/predict").route(web::post().to(handle_dataset_predict)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Lung abnormality identification API is running."
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

async fn handle_predict(
    predictor: web::Data<Predictor>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut image_data = Vec::new();
    let mut filename = String::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        if let Some(name) = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
        {
            filename = name.to_string();
        }
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }

    if image_data.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Request contained no image payload".to_string(),
        }));
    }

    let image = match Predictor::decode(&image_data) {
        Ok(image) => image,
        Err(err) => {
            error!("Rejected upload '{}': {}", filename, err);
            return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    respond_with_prediction(predictor.get_ref(), &image, filename)
}

async fn handle_dataset_preview(
    dataset_service: web::Data<DatasetService>,
    request: web::Json<DatasetRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    let rows = request.rows.unwrap_or(DEFAULT_PREVIEW_ROWS);

    // Materialization may block on a download; keep it off the event loop.
    let service = dataset_service.get_ref().clone();
    let resolution =
        web::block(move || service.resolve(&request.dataset_handle, &request.file_path)).await?;

    match resolution {
        Ok(resolution) => {
            let table = resolution.into_table();
            Ok(HttpResponse::Ok().json(table_preview(Some(&table), rows)))
        }
        Err(err) => {
            error!("Dataset resolution failed: {}", err);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            }))
        }
    }
}

async fn handle_dataset_predict(
    dataset_service: web::Data<DatasetService>,
    predictor: web::Data<Predictor>,
    request: web::Json<DatasetRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    let handle = request.dataset_handle.clone();
    let file_path = request.file_path.clone();

    let service = dataset_service.get_ref().clone();
    let resolved = web::block(move || service.dataset_file_path(&handle, &file_path)).await?;

    let path = match resolved {
        Ok(path) => path,
        Err(err @ DatasetError::FileNotFound(_)) => {
            error!("Dataset file lookup failed: {}", err);
            return Ok(HttpResponse::NotFound().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
        Err(err) => {
            error!("Dataset file lookup failed: {}", err);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to read {}: {}", path.display(), err);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    let image = match Predictor::decode(&bytes) {
        Ok(image) => image,
        Err(err) => {
            error!(
                "Dataset file {} is not a decodable image: {}",
                path.display(),
                err
            );
            return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    let basename = Path::new(&request.file_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    respond_with_prediction(predictor.get_ref(), &image, basename)
}

fn respond_with_prediction(
    predictor: &Predictor,
    image: &image::RgbImage,
    filename: String,
) -> Result<HttpResponse, Error> {
    let result = match predictor.predict(image, &filename) {
        Ok(result) => result,
        Err(err) => {
            error!("Prediction failed for '{}': {}", filename, err);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    let original_image_base64 = match heatmap::encode_png_base64(image) {
        Ok(encoded) => encoded,
        Err(err) => {
            let err = PredictError::Encode(err);
            error!("Original image re-encode failed for '{}': {}", filename, err);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
    };

    Ok(HttpResponse::Ok().json(PredictionResponse {
        filename,
        prediction_class: result.label,
        confidence: result.confidence,
        heatmap_base64: result.heatmap_base64,
        original_image_base64,
    }))
}
