//! Server assembly and configuration.

pub mod config;

pub use config::ServiceSettings;

use std::net::SocketAddr;

use actix_web::{web, App, HttpServer};
use utoipa::OpenApi;

use crate::doc::ApiDoc;
use crate::inbound::http::{self, HttpState};

async fn openapi_json(
    doc: web::Data<utoipa::openapi::OpenApi>,
) -> web::Json<utoipa::openapi::OpenApi> {
    web::Json(doc.get_ref().clone())
}

/// Bind and run the HTTP server until shutdown.
pub async fn run(state: HttpState, bind_addr: SocketAddr) -> std::io::Result<()> {
    let openapi = ApiDoc::openapi();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(openapi.clone()))
            .configure(http::configure)
            .route("/api-doc/openapi.json", web::get().to(openapi_json))
    })
    .bind(bind_addr)?
    .run()
    .await
}
