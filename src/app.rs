use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::application::{ApiGateway, AuditService};
use crate::domain::error::Result;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::db::connection::init_db;
use crate::infrastructure::db::rows::RowRepository;
use crate::infrastructure::db::seed::{ensure_bootstrap_admin, seed_catalogs, SYSTEM_ACTOR};
use crate::infrastructure::storage::{ensure_exports_dir, resolve_data_dir};
use crate::infrastructure::workbook::import_dir;
use crate::interfaces::http::{add_log, start_server, HttpState, LogEntry};

pub async fn run() -> Result<()> {
    let config = ConfigService::load()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .try_init();

    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let data_dir = resolve_data_dir(&config).map_err(|err| {
        error!(error = %err, data_dir = %config.data_dir.display(), "Failed to resolve data dir");
        err
    })?;
    let exports_dir = ensure_exports_dir(&data_dir).map_err(|err| {
        error!(error = %err, "Failed to create exports dir");
        err
    })?;

    let pool = init_db(&config.database_path()).await.map_err(|err| {
        error!(error = %err, db_path = %config.database_path().display(), "Failed to init database");
        err
    })?;
    let rows = Arc::new(RowRepository::new(pool.clone()));

    load_reference_data(&rows, &config, &logs).await?;

    let audit = Arc::new(AuditService::new(pool));
    let gateway = Arc::new(ApiGateway::new(
        rows,
        audit,
        config.duplicate_window_secs,
        config.import_dir.clone(),
    ));

    let state = HttpState {
        gateway,
        identity_header: config.identity_header.clone(),
        exports_dir,
        logs: logs.clone(),
    };

    let server = start_server(state, &config).map_err(|err| {
        error!(error = %err, host = %config.host, port = config.port, "Failed to bind server");
        err
    })?;

    let message = format!("Server listening on http://{}:{}", config.host, config.port);
    info!("{}", message);
    add_log(&logs, "INFO", "System", &message);

    server.await?;
    Ok(())
}

async fn load_reference_data(
    rows: &RowRepository,
    config: &AppConfig,
    logs: &Mutex<Vec<LogEntry>>,
) -> Result<()> {
    if config.seed_catalogs {
        for (sheet, count) in seed_catalogs(rows).await? {
            add_log(
                logs,
                "INFO",
                "Seed",
                &format!("{} seeded with {} rows", sheet.name(), count),
            );
        }
    }

    if let Some(dir) = config.import_dir.as_ref().filter(|dir| dir.is_dir()) {
        for summary in import_dir(rows, dir, SYSTEM_ACTOR).await? {
            add_log(
                logs,
                "INFO",
                "Import",
                &format!("{} <- {} ({} rows)", summary.sheet, summary.file, summary.rows),
            );
        }
    } else if let Some(dir) = config.import_dir.as_ref() {
        warn!(import_dir = %dir.display(), "Import dir does not exist");
    }

    if ensure_bootstrap_admin(rows, config.bootstrap_admin_email.as_deref()).await? {
        add_log(logs, "INFO", "System", "Bootstrap administrator created");
    }
    Ok(())
}
