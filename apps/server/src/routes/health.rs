use actix_web::{HttpResponse, Responder, get, web};
use echowatch_service::ServiceContext;
use serde_json::json;

macros_utils::routes! {
    route health_route,
}

/// Health check route
/// Reports whether the probe engine is running and how many dashboards are attached.
#[get("/")]
pub async fn health_route(context: web::Data<ServiceContext>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "engineRunning": context.engine.is_running().await,
        "inFlight": context.engine.in_flight_count(),
        "subscribers": context.hub.sink_count(),
    }))
}
