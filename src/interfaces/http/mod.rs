use crate::application::use_cases::audit_service::MAX_RECENT;
use crate::application::use_cases::gateway::{
    envelope, ApiGateway, Caller, Envelope, GatewayResult, PostRequest, ACTIVITY_LOG_ENTITY,
    PHONE_COUNTRY_ENTITY,
};
use crate::domain::activity::ActivityFilter;
use crate::domain::agent::Role;
use crate::domain::error::{AppError, Result};
use crate::domain::options::form_options;
use crate::domain::sheet::Sheet;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::workbook::export::{activity_to_csv, rows_to_csv};
use actix_cors::Cors;
use actix_web::http::{header, StatusCode};
use actix_web::{
    dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const CASES_ENTITY: &str = "CASOS";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub gateway: Arc<ApiGateway>,
    pub identity_header: String,
    pub exports_dir: PathBuf,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct PhoneQuery {
    #[serde(default)]
    pub phone: String,
}

pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Forbidden(_) | AppError::SecurityError(_) => StatusCode::FORBIDDEN,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Internal(_) | AppError::DatabaseError(_) | AppError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn caller(req: &HttpRequest, state: &HttpState) -> Caller {
    let email = req
        .headers()
        .get(state.identity_header.as_str())
        .and_then(|v| v.to_str().ok());
    let info = req.connection_info();
    Caller::new(email).from_ip(info.realip_remote_addr())
}

fn respond(state: &HttpState, source: &str, result: GatewayResult, success: StatusCode) -> HttpResponse {
    let status = match &result {
        Ok(_) => success,
        Err(failure) => {
            add_log(&state.logs, "ERROR", source, failure.error.user_message());
            status_for(&failure.error)
        }
    };
    HttpResponse::build(status).json(envelope(&result))
}

fn error_response(error: &AppError) -> HttpResponse {
    HttpResponse::build(status_for(error)).json(Envelope::Error {
        message: error.user_message().to_string(),
        issues: None,
    })
}

#[get("/gateway")]
async fn gateway_get(
    data: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let caller = caller(&req, &data);
    let result = data.gateway.handle_get(&caller, &query).await;
    respond(&data, "Gateway", result, StatusCode::OK)
}

/// Accepts any content type; clients often post JSON as `text/plain`.
#[post("/gateway")]
async fn gateway_post(data: web::Data<HttpState>, req: HttpRequest, body: web::Bytes) -> impl Responder {
    let request: PostRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let error = AppError::ParseError(format!("Cuerpo de solicitud inválido: {}", e));
            add_log(&data.logs, "ERROR", "Gateway", error.user_message());
            return error_response(&error);
        }
    };
    let caller = caller(&req, &data);
    let result = data.gateway.handle_post(&caller, request).await;
    respond(&data, "Gateway", result, StatusCode::OK)
}

#[post("/cases/evaluate")]
async fn evaluate_case(
    data: web::Data<HttpState>,
    req: HttpRequest,
    form: web::Json<Value>,
) -> impl Responder {
    let caller = caller(&req, &data);
    let request = PostRequest {
        entity: CASES_ENTITY.to_string(),
        action: "evaluate".to_string(),
        data: form.into_inner(),
        id: None,
    };
    let result = data.gateway.handle_post(&caller, request).await;
    respond(&data, "Cases", result, StatusCode::OK)
}

/// Body is `{form, anonymous?, documentType?, lookupWorker?}`.
#[post("/cases/prefill")]
async fn prefill_case(
    data: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> impl Responder {
    let caller = caller(&req, &data);
    let request = PostRequest {
        entity: CASES_ENTITY.to_string(),
        action: "prefill".to_string(),
        data: body.into_inner(),
        id: None,
    };
    let result = data.gateway.handle_post(&caller, request).await;
    respond(&data, "Cases", result, StatusCode::OK)
}

#[post("/cases")]
async fn create_case(data: web::Data<HttpState>, req: HttpRequest, form: web::Json<Value>) -> impl Responder {
    let caller = caller(&req, &data);
    let request = PostRequest {
        entity: CASES_ENTITY.to_string(),
        action: "create".to_string(),
        data: form.into_inner(),
        id: None,
    };
    let result = data.gateway.handle_post(&caller, request).await;
    if let Ok(row) = &result {
        add_log(
            &data.logs,
            "INFO",
            "Cases",
            &format!("Case {} stored", row[Sheet::Cases.id_column()]),
        );
    }
    respond(&data, "Cases", result, StatusCode::CREATED)
}

#[get("/options")]
async fn options() -> impl Responder {
    HttpResponse::Ok().json(form_options())
}

#[get("/phone-country")]
async fn phone_country(
    data: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<PhoneQuery>,
) -> impl Responder {
    let caller = caller(&req, &data);
    let params: HashMap<String, String> = [
        ("entity", PHONE_COUNTRY_ENTITY),
        ("action", "resolve"),
        ("phone", query.phone.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let result = data.gateway.handle_get(&caller, &params).await;
    respond(&data, "PhoneCountry", result, StatusCode::OK)
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|e| e.into_inner());
    HttpResponse::Ok().json(&*logs)
}

/// CSV of a sheet or of the activity log. A copy is kept in the exports directory.
#[get("/exports/{entity}")]
async fn export_csv(data: web::Data<HttpState>, req: HttpRequest, path: web::Path<String>) -> impl Responder {
    let entity = path.into_inner().trim_end_matches(".csv").to_uppercase();
    let caller = caller(&req, &data);

    match build_export(&data, &caller, &entity).await {
        Ok((name, body)) => {
            add_log(&data.logs, "INFO", "Export", &format!("Exported {}", name));
            HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.csv\"", name),
                ))
                .body(body)
        }
        Err(e) => {
            add_log(&data.logs, "ERROR", "Export", &e.to_string());
            error_response(&e)
        }
    }
}

async fn build_export(state: &HttpState, caller: &Caller, entity: &str) -> Result<(String, String)> {
    let gateway = &state.gateway;
    gateway
        .agent_with_role(caller.email.as_deref(), Role::Supervisor, entity, "export")
        .await?;

    let (name, body) = if entity == ACTIVITY_LOG_ENTITY {
        let records = gateway.audit().recent(MAX_RECENT, &ActivityFilter::default()).await?;
        ("Log_Actividades".to_string(), activity_to_csv(&records)?)
    } else {
        let sheet = Sheet::from_entity(entity)
            .ok_or_else(|| AppError::NotFound(format!("Entidad '{}' no reconocida.", entity)))?;
        let rows = gateway.catalog().list(sheet).await?;
        (sheet.name().to_string(), rows_to_csv(&rows)?)
    };

    let file = state.exports_dir.join(format!("{}.csv", name));
    tokio::fs::write(&file, &body).await?;
    Ok((name, body))
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|e| e.into_inner());
    logs.push(entry.clone());
    if logs.len() > 100 {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn cors_for(config: &AppConfig) -> Cors {
    match config.allowed_origin.as_deref() {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_any_header()
            .max_age(86400),
        None => Cors::permissive(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(gateway_get)
            .service(gateway_post)
            .service(evaluate_case)
            .service(prefill_case)
            .service(create_case)
            .service(options)
            .service(phone_country)
            .service(export_csv)
            .service(get_logs),
    );
}

pub fn start_server(state: HttpState, config: &AppConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let cors_config = config.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors_for(&cors_config))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}
