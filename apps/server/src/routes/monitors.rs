use actix_web::{HttpResponse, delete, get, post, put, web};
use echowatch_service::{ServiceContext, ServiceError};
use echowatch_service::database::{MonitorDirectory, MonitorDraft, MonitorOrder};
use echowatch_service::telemetry::HubMessage;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

macros_utils::routes! {
    route list_monitors,
    route get_monitor,
    route create_monitor,
    route update_monitor,
    route delete_monitor,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    sort: Option<String>,
    direction: Option<String>,
}

/// All monitors with their health state, `?sort=<field>&direction=asc|desc`
#[get("/api/monitors")]
pub async fn list_monitors(
    context: web::Data<ServiceContext>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let order = MonitorOrder::parse(query.sort.as_deref(), query.direction.as_deref())?;
    let entries = context.database.list_monitors(&order).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/api/monitors/{id}")]
pub async fn get_monitor(
    context: web::Data<ServiceContext>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let entry = context.database.get_monitor(id).await?.ok_or(ServiceError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(entry))
}

#[post("/api/monitors")]
pub async fn create_monitor(
    context: web::Data<ServiceContext>,
    draft: web::Json<MonitorDraft>,
) -> Result<HttpResponse, AppError> {
    let monitor = context.database.add_monitor(&draft).await?;
    context.hub.publish(HubMessage::MonitorsChanged);
    Ok(HttpResponse::Created().json(monitor))
}

#[put("/api/monitors/{id}")]
pub async fn update_monitor(
    context: web::Data<ServiceContext>,
    id: web::Path<Uuid>,
    draft: web::Json<MonitorDraft>,
) -> Result<HttpResponse, AppError> {
    let monitor = context.database.update_monitor(id.into_inner(), &draft).await?;
    context.hub.publish(HubMessage::MonitorsChanged);
    Ok(HttpResponse::Ok().json(monitor))
}

#[delete("/api/monitors/{id}")]
pub async fn delete_monitor(
    context: web::Data<ServiceContext>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    context.database.remove_monitor(id.into_inner()).await?;
    context.hub.publish(HubMessage::MonitorsChanged);
    Ok(HttpResponse::NoContent().finish())
}
