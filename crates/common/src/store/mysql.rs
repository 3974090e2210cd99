//! MySQL document store
//!
//! Reads the table produced by document ingestion:
//! `file_id, property_name, content` and, when enabled, `owner_name`.

use super::DocumentStore;
use crate::config::StoreConfig;
use crate::errors::{AppError, Result};
use crate::models::Document;
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, QueryResult,
    Statement, Value,
};
use std::time::Duration;
use tracing::{debug, info};

/// Document store over a MySQL table
#[derive(Clone)]
pub struct MySqlDocumentStore {
    conn: DatabaseConnection,
    table: String,
    has_owner_column: bool,
}

impl MySqlDocumentStore {
    /// Connect using `store.url`
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| AppError::Configuration {
            message: "store.url is required for the mysql store".to_string(),
        })?;
        validate_identifier(&config.table)?;

        info!(table = %config.table, "Connecting to document database...");

        let mut opts = ConnectOptions::new(url);
        opts.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Document database connection established");

        Ok(Self {
            conn,
            table: config.table.clone(),
            has_owner_column: config.has_owner_column,
        })
    }

    fn columns(&self) -> &'static str {
        if self.has_owner_column {
            "file_id, property_name, content, owner_name"
        } else {
            "file_id, property_name, content"
        }
    }

    fn select(&self, filter: &str) -> String {
        format!("SELECT {} FROM {} {}", self.columns(), self.table, filter)
    }

    async fn query(&self, sql: String, values: Vec<Value>) -> Result<Vec<Document>> {
        debug!(sql = %sql, "Document query");
        let stmt = Statement::from_sql_and_values(DbBackend::MySql, &sql, values);

        let documents = self
            .conn
            .query_all(stmt)
            .await?
            .into_iter()
            .filter_map(|row| row_to_document(&row, self.has_owner_column))
            .collect();

        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for MySqlDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let sql = self.select("WHERE file_id = ? LIMIT 1");
        let mut documents = self.query(sql, vec![id.trim().into()]).await?;
        Ok(documents.pop())
    }

    async fn find_all_for_fuzzy_scan(&self) -> Result<Vec<Document>> {
        self.query(self.select(""), Vec::new()).await
    }

    async fn find_by_owner_name(&self, name: &str) -> Result<Vec<Document>> {
        let name = name.trim().to_lowercase();
        if !self.has_owner_column || name.is_empty() {
            return Ok(Vec::new());
        }
        let sql = self.select("WHERE LOWER(owner_name) LIKE ?");
        self.query(sql, vec![format!("%{}%", escape_like(&name)).into()])
            .await
    }

    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let condition = vec!["content LIKE ?"; keywords.len()].join(" OR ");
        let sql = self.select(&format!("WHERE {} LIMIT ?", condition));

        let mut values: Vec<Value> = keywords
            .iter()
            .map(|k| format!("%{}%", escape_like(k)).into())
            .collect();
        values.push((limit as u64).into());

        self.query(sql, values).await
    }

    async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }
}

fn row_to_document(row: &QueryResult, has_owner_column: bool) -> Option<Document> {
    // file_id may be stored as text or as an integer
    let id = row
        .try_get_by_index::<String>(0)
        .or_else(|_| row.try_get_by_index::<i64>(0).map(|n| n.to_string()))
        .ok()?;

    let owner_name = if has_owner_column {
        row.try_get_by_index::<Option<String>>(3).ok().flatten()
    } else {
        None
    };

    Some(Document {
        id,
        property_name: row.try_get_by_index::<String>(1).ok()?,
        owner_name,
        content: row.try_get_by_index::<String>(2).ok()?,
        images: Vec::new(),
    })
}

/// Table names are interpolated, so only plain identifiers are accepted
fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AppError::Configuration {
            message: format!("store.table is not a valid identifier: {}", name),
        })
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
