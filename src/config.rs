// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{
        DishRegistry, InventoryStore, MemoryDishRegistry, MemoryInventoryStore, PgDishRepository,
        PgInventoryRepository,
    },
    services::{
        auth::{AuthService, Authenticator, BcryptAuthenticator},
        barcode::{BarcodeRenderer, PngBarcodeRenderer},
        dish_service::DishService,
        document_service::DocumentService,
        expiry::DEFAULT_THRESHOLD_DAYS,
        inventory_service::InventoryService,
        spreadsheet_service::SpreadsheetService,
    },
};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Without a database URL the service keeps its data in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// `(username, bcrypt hash)` pairs.
    pub users: Vec<(String, String)>,
    pub barcode_dir: PathBuf,
    pub font_dir: PathBuf,
    pub font_family: String,
    pub expiry_alert_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            max_connections: 5,
            jwt_secret: String::new(),
            token_ttl: chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            users: Vec::new(),
            barcode_dir: PathBuf::from("static/barcodes"),
            font_dir: PathBuf::from("./fonts"),
            font_family: "Roboto".to_string(),
            expiry_alert_days: DEFAULT_THRESHOLD_DAYS,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} has an invalid value")),
        None => Ok(default),
    }
}

const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Token lifetime from `TOKEN_TTL_HOURS`; must be between one hour and a year.
pub fn token_ttl(hours: i64) -> anyhow::Result<chrono::Duration> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        anyhow::bail!("TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {hours}");
    }
    chrono::Duration::try_hours(hours).context("TOKEN_TTL_HOURS is out of range")
}

/// Parses `KITCHEN_USERS`: `user:hash` pairs separated by commas.
pub fn parse_users(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user, hash) = entry
                .split_once(':')
                .with_context(|| format!("KITCHEN_USERS entry '{entry}' is not user:hash"))?;
            Ok((user.trim().to_string(), hash.trim().to_string()))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: optional("DATABASE_URL"),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            jwt_secret: optional("JWT_SECRET").context("JWT_SECRET must be set")?,
            token_ttl: token_ttl(parsed("TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?)?,
            users: parse_users(&optional("KITCHEN_USERS").unwrap_or_default())?,
            barcode_dir: optional("BARCODE_DIR").map(PathBuf::from).unwrap_or(defaults.barcode_dir),
            font_dir: optional("FONT_DIR").map(PathBuf::from).unwrap_or(defaults.font_dir),
            font_family: optional("REPORT_FONT_FAMILY").unwrap_or(defaults.font_family),
            expiry_alert_days: parsed("EXPIRY_ALERT_DAYS", defaults.expiry_alert_days)?,
        })
    }
}

// The shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub inventory_service: InventoryService,
    pub dish_service: DishService,
    pub spreadsheet_service: SpreadsheetService,
    pub document_service: DocumentService,
    pub auth_service: AuthService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (inventory, dishes): (Arc<dyn InventoryStore>, Arc<dyn DishRegistry>) =
            match &config.database_url {
                Some(database_url) => {
                    let db_pool = PgPoolOptions::new()
                        .max_connections(config.max_connections)
                        .acquire_timeout(Duration::from_secs(3))
                        .connect(database_url)
                        .await
                        .context("could not connect to the database")?;
                    tracing::info!("✅ Database connection established");

                    sqlx::migrate!()
                        .run(&db_pool)
                        .await
                        .context("database migrations failed")?;
                    tracing::info!("✅ Database migrations applied");

                    (
                        Arc::new(PgInventoryRepository::new(db_pool.clone())),
                        Arc::new(PgDishRepository::new(db_pool)),
                    )
                }
                None => {
                    tracing::warn!("DATABASE_URL not set, inventory is kept in memory");
                    (
                        Arc::new(MemoryInventoryStore::new()),
                        Arc::new(MemoryDishRegistry::new()),
                    )
                }
            };

        let authenticator = BcryptAuthenticator::new(config.users.clone());
        if authenticator.user_count() == 0 {
            tracing::warn!("KITCHEN_USERS is empty, nobody will be able to log in");
        }

        let barcodes = PngBarcodeRenderer::new(config.barcode_dir.clone());
        tracing::info!("Barcode images go to {}", barcodes.dir().display());

        Ok(Self::from_parts(
            config,
            inventory,
            dishes,
            Arc::new(barcodes),
            Arc::new(authenticator),
        ))
    }

    /// Wires the services around already-built collaborators.
    pub fn from_parts(
        config: Config,
        inventory: Arc<dyn InventoryStore>,
        dishes: Arc<dyn DishRegistry>,
        barcodes: Arc<dyn BarcodeRenderer>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let inventory_service =
            InventoryService::new(inventory.clone(), barcodes, config.expiry_alert_days);
        let dish_service = DishService::new(dishes, inventory);
        let spreadsheet_service = SpreadsheetService::new(inventory_service.clone());
        let document_service = DocumentService::new(
            inventory_service.clone(),
            config.font_dir.clone(),
            config.font_family.clone(),
        );
        let auth_service = AuthService::new(
            authenticator,
            config.jwt_secret.clone(),
            config.token_ttl,
        );

        Self {
            config: Arc::new(config),
            inventory_service,
            dish_service,
            spreadsheet_service,
            document_service,
            auth_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_are_user_hash_pairs() {
        let users = parse_users("ahmed:$2b$12$abc, sara:$2b$12$def,").unwrap();
        assert_eq!(
            users,
            vec![
                ("ahmed".to_string(), "$2b$12$abc".to_string()),
                ("sara".to_string(), "$2b$12$def".to_string()),
            ]
        );
        assert!(parse_users("").unwrap().is_empty());
        assert!(parse_users("no-separator").is_err());
    }

    #[test]
    fn token_lifetime_must_be_positive_and_bounded() {
        assert_eq!(token_ttl(12).unwrap(), chrono::Duration::hours(12));
        assert_eq!(token_ttl(MAX_TOKEN_TTL_HOURS).unwrap(), chrono::Duration::days(366));
        assert!(token_ttl(0).is_err());
        assert!(token_ttl(-5).is_err());
        assert!(token_ttl(MAX_TOKEN_TTL_HOURS + 1).is_err());
        assert!(token_ttl(i64::MAX).is_err());
    }
}
