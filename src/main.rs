use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{middleware::Logger, web, App, Error, HttpResponse, HttpServer};
use futures_util::TryStreamExt;
use std::env;

mod converter;
mod types;

use types::{ErrorResponse, OutputFormat};

/// Download filename stem for every converted image.
const DOWNLOAD_STEM: &str = "imagem_convertida";

/// One uploaded multipart file, fully buffered.
struct UploadedImage {
    filename: String,
    content: Vec<u8>,
}

async fn status() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "online" }))
}

async fn convert_image(mut payload: Multipart) -> Result<HttpResponse, Error> {
    let mut image: Option<UploadedImage> = None;
    let mut output_format: Option<String> = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        match name.as_str() {
            "image" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .map(str::to_owned)
                    .unwrap_or_default();
                let mut content = Vec::new();
                while let Some(chunk) = field.try_next().await? {
                    content.extend_from_slice(&chunk);
                }
                image = Some(UploadedImage { filename, content });
            }
            "output_format" => {
                let mut raw = Vec::new();
                while let Some(chunk) = field.try_next().await? {
                    raw.extend_from_slice(&chunk);
                }
                output_format = Some(String::from_utf8_lossy(&raw).to_string());
            }
            _ => {
                // Drain unknown fields so the stream stays consumable.
                while field.try_next().await?.is_some() {}
            }
        }
    }

    let Some(upload) = image else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new("No image file provided")));
    };

    let requested_mime = match output_format {
        Some(f) if !f.is_empty() => f,
        _ => {
            return Ok(HttpResponse::BadRequest()
                .json(ErrorResponse::new("Output format not specified")));
        }
    };

    if !types::has_allowed_extension(&upload.filename) {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(
            "Unsupported file format. Only PNG, JPG, TIFF and ICO are allowed",
        )));
    }

    let Some(format) = OutputFormat::from_mime(&requested_mime) else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(format!(
            "Output format \"{}\" not supported by the server",
            requested_mime
        ))));
    };

    log::info!(
        "Converting \"{}\" ({} bytes) to {}",
        upload.filename,
        upload.content.len(),
        format.mime()
    );

    match converter::convert(&upload.content, format) {
        Ok(converted) => {
            log::info!("✅ Conversion succeeded ({} bytes)", converted.len());
            Ok(HttpResponse::Ok()
                // Echo the requested MIME type back as the content type.
                .content_type(requested_mime)
                .append_header((
                    "Content-Disposition",
                    format!(
                        "attachment; filename=\"{}.{}\"",
                        DOWNLOAD_STEM,
                        format.extension()
                    ),
                ))
                .body(converted))
        }
        Err(e) => {
            log::error!("❌ Conversion failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse::new(format!(
                "Internal server error during conversion: {}",
                e
            ))))
        }
    }
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status))
        .route("/convert", web::post().to(convert_image));
}

struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        Self { host, port }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env();

    log::info!("🦀 Starting image converter service");
    log::info!("📍 Listening on {}:{}", config.host, config.port);
    log::info!("📤 Output formats: JPEG, PNG, TIFF, ICO");

    HttpServer::new(|| {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
