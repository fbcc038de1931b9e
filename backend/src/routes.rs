use actix_files::Files;
use actix_session::Session;
use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};
use log::info;
use shared::ResultViewParams;

use crate::config::GatewayConfig;
use crate::flash;
use crate::gateway::multipart::read_upload_request;
use crate::gateway::upload_service::UploadGateway;
use crate::pages;

pub fn configure_routes(cfg: &mut web::ServiceConfig, config: &GatewayConfig) {
    cfg.app_data(web::Data::new(UploadGateway::new(config)))
        .service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/input").route(web::get().to(input_page)))
        .service(web::resource("/upload").route(web::post().to(upload_file)))
        .service(web::resource("/output").route(web::get().to(output_page)))
        .service(web::resource("/classify").route(web::get().to(classify_redirect)))
        .service(
            Files::new("/uploads", config.upload_dir.clone())
                .default_handler(web::to(page_not_found)),
        )
        .default_service(web::to(page_not_found));
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

async fn home() -> HttpResponse {
    pages::html(StatusCode::OK, pages::landing())
}

async fn input_page(session: Session, gateway: web::Data<UploadGateway>) -> HttpResponse {
    let notices = flash::take(&session);
    pages::html(
        StatusCode::OK,
        pages::input_form(&notices, gateway.allowed_extensions(), gateway.max_bytes()),
    )
}

async fn upload_file(
    req: HttpRequest,
    payload: web::Payload,
    session: Session,
    gateway: web::Data<UploadGateway>,
) -> HttpResponse {
    let result = match read_upload_request(req.headers(), payload, &gateway).await {
        Ok(request) => gateway.validate_and_store(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(target) => {
            let location = target.location();
            info!("Redirecting upload to {}", location);
            redirect(&location)
        }
        Err(e) => {
            gateway.log_rejection(&e);
            flash::push(&session, e.notice());
            redirect("/input")
        }
    }
}

async fn output_page(query: web::Query<Vec<(String, String)>>) -> HttpResponse {
    let params = ResultViewParams::from_pairs(query.into_inner());
    pages::html(StatusCode::OK, pages::results(&params))
}

async fn classify_redirect() -> HttpResponse {
    redirect("/input")
}

async fn page_not_found() -> HttpResponse {
    pages::html(StatusCode::NOT_FOUND, pages::landing())
}
