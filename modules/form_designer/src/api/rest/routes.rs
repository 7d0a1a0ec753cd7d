//! Route registration for the form designer REST API

use super::{dto::*, error::Problem, handlers};
use crate::domain::Service;
use axum::{
    extract::{Path, Query, RawQuery, Request},
    http::HeaderMap,
    response::Response,
    routing::{get, put},
    Extension, Json, Router,
};
use std::sync::Arc;

/// Register all REST routes on `router`
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        // Runtime forms
        .route("/forms/{name}", get(show_form_handler).post(submit_form_handler))
        .route(
            "/forms/by-hash/{hash}",
            get(show_form_by_hash_handler).post(submit_form_by_hash_handler),
        )
        .route("/forms/{name}/logs", get(list_logs_handler))
        // Logs and export
        .route("/form-logs/{id}", get(get_log_handler))
        .route("/form-logs/{id}/values", put(record_values_handler))
        .route("/form-logs/export/{format}", get(export_logs_handler))
        .route("/form-exporters", get(list_exporters_handler))
        // Definition administration
        .route(
            "/form-definitions",
            get(list_definitions_handler).post(create_definition_handler),
        )
        .route(
            "/form-definitions/{id}",
            get(get_definition_handler)
                .put(update_definition_handler)
                .delete(delete_definition_handler),
        )
        // Add service as extension for handlers
        .layer(Extension(service))
}

// ===== Handler wrappers that extract service from Extension =====

async fn show_form_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
    query: RawQuery,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    handlers::show_form(service, path, query, headers).await
}

async fn submit_form_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
    query: RawQuery,
    request: Request,
) -> Result<Response, Problem> {
    handlers::submit_form(service, path, query, request).await
}

async fn show_form_by_hash_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
    query: RawQuery,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    handlers::show_form_by_hash(service, path, query, headers).await
}

async fn submit_form_by_hash_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
    query: RawQuery,
    request: Request,
) -> Result<Response, Problem> {
    handlers::submit_form_by_hash(service, path, query, request).await
}

async fn list_logs_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
) -> Result<Json<FormLogsListResponse>, Problem> {
    handlers::list_logs(service, path).await
}

async fn get_log_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<i32>,
) -> Result<Json<FormLogDto>, Problem> {
    handlers::get_log(service, path).await
}

async fn record_values_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<i32>,
    body: Json<RecordValuesRequest>,
) -> Result<Json<FormLogDto>, Problem> {
    handlers::record_values(service, path, body).await
}

async fn export_logs_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<String>,
    query: Query<ExportQuery>,
) -> Result<Response, Problem> {
    handlers::export_logs(service, path, query).await
}

async fn list_exporters_handler(Extension(service): Extension<Arc<Service>>) -> Json<Vec<ExporterDto>> {
    handlers::list_exporters(service).await
}

async fn list_definitions_handler(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<FormDefinitionsListResponse>, Problem> {
    handlers::list_definitions(service).await
}

async fn get_definition_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<i32>,
) -> Result<Json<FormDefinitionDto>, Problem> {
    handlers::get_definition(service, path).await
}

async fn create_definition_handler(
    Extension(service): Extension<Arc<Service>>,
    body: Json<UpsertFormDefinitionRequest>,
) -> Result<(axum::http::StatusCode, Json<FormDefinitionDto>), Problem> {
    handlers::create_definition(service, body).await
}

async fn update_definition_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<i32>,
    body: Json<UpsertFormDefinitionRequest>,
) -> Result<Json<FormDefinitionDto>, Problem> {
    handlers::update_definition(service, path, body).await
}

async fn delete_definition_handler(
    Extension(service): Extension<Arc<Service>>,
    path: Path<i32>,
) -> Result<axum::http::StatusCode, Problem> {
    handlers::delete_definition(service, path).await
}
