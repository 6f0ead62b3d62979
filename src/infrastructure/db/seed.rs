use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{Sheet, SheetRow};
use crate::infrastructure::db::rows::RowRepository;

pub const SYSTEM_ACTOR: &str = "system";

const SEEDS: &[(Sheet, &str)] = &[
    (Sheet::Services, include_str!("../../../resources/seed/servicios.json")),
    (Sheet::Companies, include_str!("../../../resources/seed/empresas.json")),
    (Sheet::Locations, include_str!("../../../resources/seed/ubicaciones.json")),
    (Sheet::Users, include_str!("../../../resources/seed/usuarios.json")),
    (
        Sheet::RecreationCenters,
        include_str!("../../../resources/seed/centros_recreacion.json"),
    ),
    (Sheet::Collaborators, include_str!("../../../resources/seed/colaboradores.json")),
    (
        Sheet::ServiceCatalog,
        include_str!("../../../resources/seed/catalogo_servicios.json"),
    ),
    (Sheet::Offices, include_str!("../../../resources/seed/sedes.json")),
    (Sheet::Directorates, include_str!("../../../resources/seed/direcciones.json")),
    (Sheet::Configuration, include_str!("../../../resources/seed/configuracion.json")),
];

pub fn seed_rows(sheet: Sheet) -> Result<Vec<SheetRow>> {
    let Some((_, raw)) = SEEDS.iter().find(|(s, _)| *s == sheet) else {
        return Ok(Vec::new());
    };
    let rows: Vec<SheetRow> = serde_json::from_str(raw).map_err(|e| {
        AppError::ParseError(format!("Invalid seed data for '{}': {}", sheet.name(), e))
    })?;
    Ok(rows)
}

/// Fills empty catalog sheets with the bundled reference data.
/// Sheets that already hold rows are left alone.
pub async fn seed_catalogs(repo: &RowRepository) -> Result<Vec<(Sheet, usize)>> {
    let mut seeded = Vec::new();
    for (sheet, _) in SEEDS {
        if repo.count_rows(*sheet).await? > 0 {
            continue;
        }
        let rows = seed_rows(*sheet)?;
        let count = repo.replace_rows(*sheet, rows, SYSTEM_ACTOR).await?;
        info!(sheet = sheet.name(), rows = count, "Seeded catalog");
        seeded.push((*sheet, count));
    }
    Ok(seeded)
}

/// Creates the first administrator so a fresh install can be managed.
pub async fn ensure_bootstrap_admin(repo: &RowRepository, email: Option<&str>) -> Result<bool> {
    if repo.count_rows(Sheet::Agents).await? > 0 {
        return Ok(false);
    }
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        warn!("No agents registered and no bootstrap admin configured; every request will be rejected");
        return Ok(false);
    };

    let row = json!({
        "Nombre": "Administrador",
        "Apellido": "Sistema",
        "Email_Google": email,
        "Rol": "ADMINISTRADOR",
        "Estado": "Activo",
    });
    let row = match row {
        Value::Object(map) => map,
        _ => SheetRow::new(),
    };
    repo.add_row(Sheet::Agents, row, SYSTEM_ACTOR).await?;
    info!(email = %email, "Bootstrap administrator created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::init_memory_db;

    #[test]
    fn test_every_seed_parses_with_ids() {
        for (sheet, _) in SEEDS {
            let rows = seed_rows(*sheet).unwrap();
            assert!(!rows.is_empty(), "{} has no seed rows", sheet.name());
            for row in &rows {
                assert!(
                    row.contains_key(sheet.id_column()),
                    "{} row without {}",
                    sheet.name(),
                    sheet.id_column()
                );
            }
        }
    }

    #[tokio::test]
    async fn test_seed_catalogs_only_fills_empty_sheets() {
        let repo = RowRepository::new(init_memory_db().await.unwrap());
        let first = seed_catalogs(&repo).await.unwrap();
        assert_eq!(first.len(), SEEDS.len());
        assert_eq!(repo.count_rows(Sheet::Users).await.unwrap(), 3);

        let second = seed_catalogs(&repo).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_when_empty() {
        let repo = RowRepository::new(init_memory_db().await.unwrap());
        assert!(!ensure_bootstrap_admin(&repo, None).await.unwrap());
        assert!(ensure_bootstrap_admin(&repo, Some("admin@trabajo.gob.sv"))
            .await
            .unwrap());
        assert!(!ensure_bootstrap_admin(&repo, Some("otro@trabajo.gob.sv"))
            .await
            .unwrap());
        assert_eq!(repo.count_rows(Sheet::Agents).await.unwrap(), 1);
    }
}
