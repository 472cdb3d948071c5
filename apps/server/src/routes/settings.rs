use actix_web::{HttpResponse, get, put, web};
use echowatch_service::ServiceContext;
use echowatch_service::settings::{Settings, SettingsStore};

use crate::error::AppError;

macros_utils::routes! {
    route get_settings,
    route replace_settings,
}

#[get("/api/settings")]
pub async fn get_settings(context: web::Data<ServiceContext>) -> HttpResponse {
    HttpResponse::Ok().json(context.settings.get())
}

/// Replace the whole settings record. Takes effect on the next engine cycle.
#[put("/api/settings")]
pub async fn replace_settings(
    context: web::Data<ServiceContext>,
    settings: web::Json<Settings>,
) -> Result<HttpResponse, AppError> {
    let settings = context.settings.replace(settings.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}
