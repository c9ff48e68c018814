use rusqlite::Connection;
use tracing::{error, info};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::storage::Database;

/// Everything an export run needs, built once at startup.
pub struct ExportContext {
    pub config: Config,
    pub db: Database,
    /// Present only when a separate content database is configured.
    pub content_db: Option<Database>,
    pub output_format: OutputFormat,
}

impl ExportContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref()).inspect_err(|err| {
            error!(error = %err, "Unable to load configuration file");
        })?;

        let mut ctx = Self::connect(config)?;
        ctx.output_format = cli.output_format();
        Ok(ctx)
    }

    /// Open the primary database and, if configured, the content database.
    pub fn connect(config: Config) -> Result<Self> {
        info!("Connecting to database");
        let db = Database::open(&config.database.path).inspect_err(|err| {
            error!(
                error = %err,
                "Unable to connect to the database, cannot continue without a database connection"
            );
        })?;

        let content_db = match &config.database.content_path {
            Some(path) => Some(Database::open(path).inspect_err(|err| {
                error!(
                    error = %err,
                    "Cannot continue without a content database connection"
                );
            })?),
            None => None,
        };

        Ok(Self {
            config,
            db,
            content_db,
            output_format: OutputFormat::Human,
        })
    }

    /// Primary (auth/rules) connection.
    pub const fn primary(&self) -> &Connection {
        self.db.conn()
    }

    /// Content connection, falling back to the primary.
    pub fn content(&self) -> &Connection {
        self.content_db.as_ref().unwrap_or(&self.db).conn()
    }
}
