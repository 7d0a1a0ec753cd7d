//! HTTP request handlers - thin layer that delegates to domain service

use super::{
    dto::*,
    error::{map_domain_error, Problem},
    mapper,
};
use crate::contract::{FormDefinition, FormMethod, FormValueEntry, FormsError};
use crate::domain::form::FormData;
use crate::domain::uploads::{self, UploadedFile};
use crate::domain::{ProcessOptions, Service, SubmissionRequest};
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, RawQuery, Request},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Header carrying the authenticated principal, set by the gateway
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

// ===== Definition Handlers =====

/// List all form definitions
pub async fn list_definitions(service: Arc<Service>) -> Result<Json<FormDefinitionsListResponse>, Problem> {
    let definitions = service.list_definitions().await.map_err(map_domain_error)?;
    let items: Vec<FormDefinitionDto> = definitions.into_iter().map(Into::into).collect();
    let total = items.len();

    Ok(Json(FormDefinitionsListResponse { items, total }))
}

/// Get a definition by id
pub async fn get_definition(
    service: Arc<Service>,
    Path(id): Path<i32>,
) -> Result<Json<FormDefinitionDto>, Problem> {
    let definition = service.get_definition(id).await.map_err(map_domain_error)?;
    Ok(Json(definition.into()))
}

/// Create a new definition
pub async fn create_definition(
    service: Arc<Service>,
    Json(req): Json<UpsertFormDefinitionRequest>,
) -> Result<(StatusCode, Json<FormDefinitionDto>), Problem> {
    let definition = FormDefinition::try_from(req).map_err(map_domain_error)?;
    let created = service
        .create_definition(definition)
        .await
        .map_err(map_domain_error)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Replace an existing definition; its hashes are kept
pub async fn update_definition(
    service: Arc<Service>,
    Path(id): Path<i32>,
    Json(req): Json<UpsertFormDefinitionRequest>,
) -> Result<Json<FormDefinitionDto>, Problem> {
    let mut definition = FormDefinition::try_from(req).map_err(map_domain_error)?;
    definition.id = id;
    let updated = service
        .update_definition(definition)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(updated.into()))
}

/// Delete a definition with its fields and logs
pub async fn delete_definition(service: Arc<Service>, Path(id): Path<i32>) -> Result<StatusCode, Problem> {
    service.delete_definition(id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Runtime Form Handlers =====

/// Render a form by name; a GET-method definition is also submitted this way
pub async fn show_form(
    service: Arc<Service>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let definition = service
        .get_definition_by_name(&name)
        .await
        .map_err(|e| map_domain_error(e).with_instance(format!("/forms/{}", name)))?;
    run_get(&service, &definition, query, &headers).await
}

/// Render a form by its public hash
pub async fn show_form_by_hash(
    service: Arc<Service>,
    Path(hash): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let definition = service
        .get_definition_by_hash(&hash)
        .await
        .map_err(map_domain_error)?;
    run_get(&service, &definition, query, &headers).await
}

/// Submit a form by name, urlencoded or multipart
pub async fn submit_form(
    service: Arc<Service>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
    request: Request,
) -> Result<Response, Problem> {
    let definition = service
        .get_definition_by_name(&name)
        .await
        .map_err(|e| map_domain_error(e).with_instance(format!("/forms/{}", name)))?;
    run_post(&service, &definition, query, request).await
}

/// Submit a form by its public hash
pub async fn submit_form_by_hash(
    service: Arc<Service>,
    Path(hash): Path<String>,
    RawQuery(query): RawQuery,
    request: Request,
) -> Result<Response, Problem> {
    let definition = service
        .get_definition_by_hash(&hash)
        .await
        .map_err(map_domain_error)?;
    run_post(&service, &definition, query, request).await
}

async fn run_get(
    service: &Service,
    definition: &FormDefinition,
    query: Option<String>,
    headers: &HeaderMap,
) -> Result<Response, Problem> {
    let query = parse_urlencoded(query.unwrap_or_default().as_bytes());
    let request = SubmissionRequest {
        method: FormMethod::Get,
        data: query.clone(),
        query,
        files: Vec::new(),
        user: authenticated_user(headers),
    };
    respond(service, definition, request).await
}

async fn run_post(
    service: &Service,
    definition: &FormDefinition,
    query: Option<String>,
    request: Request,
) -> Result<Response, Problem> {
    let user = authenticated_user(request.headers());
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (data, files) = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        read_multipart(service, multipart).await?
    } else {
        let body = Bytes::from_request(request, &())
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        (parse_urlencoded(&body), Vec::new())
    };

    let request = SubmissionRequest {
        method: FormMethod::Post,
        data,
        query: parse_urlencoded(query.unwrap_or_default().as_bytes()),
        files,
        user,
    };
    respond(service, definition, request).await
}

async fn respond(
    service: &Service,
    definition: &FormDefinition,
    request: SubmissionRequest,
) -> Result<Response, Problem> {
    let outcome = service
        .process_submission(definition, request, ProcessOptions::default())
        .await
        .map_err(map_domain_error)?;

    if let Some(target) = outcome.redirect.clone() {
        return Ok((StatusCode::SEE_OTHER, [(header::LOCATION, target)]).into_response());
    }
    Ok(Json(mapper::submission_response(definition, outcome)).into_response())
}

/// Split a multipart body into text parameters and spooled uploads
async fn read_multipart(
    service: &Service,
    mut multipart: Multipart,
) -> Result<(FormData, Vec<UploadedFile>), Problem> {
    let mut data = FormData::new();
    let mut files: Vec<UploadedFile> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                uploads::discard(files).await;
                return Err(bad_request(e.body_text()));
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            // An empty file input still sends a part with an empty name
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        uploads::discard(files).await;
                        return Err(bad_request(e.body_text()));
                    }
                };
                match service.spool_upload(&name, &file_name, content_type, &bytes).await {
                    Ok(file) => files.push(file),
                    Err(e) => {
                        uploads::discard(files).await;
                        return Err(map_domain_error(e));
                    }
                }
            }
            Some(_) => {}
            None => match field.text().await {
                Ok(text) => data.push(name, text),
                Err(e) => {
                    uploads::discard(files).await;
                    return Err(bad_request(e.body_text()));
                }
            },
        }
    }

    Ok((data, files))
}

fn parse_urlencoded(bytes: &[u8]) -> FormData {
    url::form_urlencoded::parse(bytes).into_owned().collect()
}

fn authenticated_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHENTICATED_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bad_request(detail: String) -> Problem {
    map_domain_error(FormsError::Validation { message: detail })
}

// ===== Log Handlers =====

/// List logs of a definition, oldest first
pub async fn list_logs(
    service: Arc<Service>,
    Path(name): Path<String>,
) -> Result<Json<FormLogsListResponse>, Problem> {
    let logs = service.list_logs(&name).await.map_err(map_domain_error)?;
    let items: Vec<FormLogDto> = logs.into_iter().map(Into::into).collect();
    let total = items.len();

    Ok(Json(FormLogsListResponse { items, total }))
}

/// Get one log reconciled against its definition
pub async fn get_log(service: Arc<Service>, Path(id): Path<i32>) -> Result<Json<FormLogDto>, Problem> {
    let logged = service.read_log(id).await.map_err(map_domain_error)?;
    Ok(Json(logged.into()))
}

/// Replace every value of a log
pub async fn record_values(
    service: Arc<Service>,
    Path(id): Path<i32>,
    Json(req): Json<RecordValuesRequest>,
) -> Result<Json<FormLogDto>, Problem> {
    let values: Vec<FormValueEntry> = req.values.into_iter().map(Into::into).collect();
    service.record_values(id, &values).await.map_err(map_domain_error)?;
    let logged = service.read_log(id).await.map_err(map_domain_error)?;
    Ok(Json(logged.into()))
}

// ===== Export Handlers =====

/// Formats enabled in this deployment
pub async fn list_exporters(service: Arc<Service>) -> Json<Vec<ExporterDto>> {
    Json(service.available_exporters().into_iter().map(Into::into).collect())
}

/// Download selected logs in the given format
pub async fn export_logs(
    service: Arc<Service>,
    Path(format): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, Problem> {
    let selection = query.selection().map_err(map_domain_error)?;
    let file = service
        .export(&format, selection)
        .await
        .map_err(map_domain_error)?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}
