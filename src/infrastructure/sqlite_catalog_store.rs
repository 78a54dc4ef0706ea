//! SQLite record store with an FTS5 full-text index
//!
//! Records live in one table keyed by `link`. The full-text index is an
//! external-content FTS5 table named `<table>_fts` over the link and the
//! descriptive canonical columns, rebuilt after each batch. Relevance is
//! `-bm25()`, so higher is better.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::domain::collaborators::RecordSink;
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::record::{CanonicalColumn, CanonicalRecord, SearchHit};
use crate::infrastructure::config::is_sql_identifier;

/// Columns stored besides the canonical attributes, in insert order.
const FIXED_COLUMNS: [&str; 5] = ["link", "price", "code", "name", "description_raw"];

pub struct SqliteCatalogStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteCatalogStore {
    /// Store over `table`, creating the table when missing.
    pub async fn new(pool: SqlitePool, table: &str) -> PipelineResult<Self> {
        if !is_sql_identifier(table) {
            return Err(PipelineError::configuration(
                "table_name",
                format!("'{table}' is not a plain SQL identifier"),
            ));
        }
        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.migrate().await?;
        Ok(store)
    }

    fn fts_table(&self) -> String {
        format!("{}_fts", self.table)
    }

    async fn migrate(&self) -> PipelineResult<()> {
        let attribute_columns: String = CanonicalColumn::ALL
            .iter()
            .map(|column| format!("{} TEXT,\n", column.sql_name()))
            .collect();
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link TEXT NOT NULL UNIQUE,
                price TEXT,
                code TEXT,
                name TEXT,
                description_raw TEXT,
                {attribute_columns}
                raw_attributes TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
            table = self.table,
        );
        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("create_table", e))?;

        let index_sql = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_code ON {table} (code)",
            table = self.table
        );
        sqlx::query(&index_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("create_index", e))?;

        debug!("Table {} ready", self.table);
        Ok(())
    }

    fn upsert_sql(&self) -> String {
        let columns: Vec<&str> = FIXED_COLUMNS
            .iter()
            .copied()
            .chain(CanonicalColumn::ALL.iter().map(|c| c.sql_name()))
            .chain(["raw_attributes", "updated_at"])
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let updates = columns
            .iter()
            .filter(|column| **column != "link")
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({columns}) VALUES ({placeholders}) ON CONFLICT(link) DO UPDATE SET {updates}",
            table = self.table,
            columns = columns.join(", "),
        )
    }

    /// Whether the full-text index has been built at least once.
    pub async fn has_fulltext_index(&self) -> PipelineResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(self.fts_table())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("has_fulltext_index", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| PipelineError::storage("has_fulltext_index", e))?;
        Ok(total > 0)
    }

    /// Number of stored records.
    pub async fn record_count(&self) -> PipelineResult<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", self.table);
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("record_count", e))?;
        row.try_get("total").map_err(|e| PipelineError::storage("record_count", e))
    }

    /// Stored value of one canonical column for a link.
    pub async fn column_value(&self, link: &str, column: CanonicalColumn) -> PipelineResult<Option<String>> {
        let sql = format!("SELECT {} AS value FROM {} WHERE link = ?", column.sql_name(), self.table);
        let row = sqlx::query(&sql)
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("column_value", e))?;
        match row {
            Some(row) => row.try_get("value").map_err(|e| PipelineError::storage("column_value", e)),
            None => Ok(None),
        }
    }
}

/// FTS5 query matching any word of free text.
///
/// Words are quoted so user input can never form FTS syntax; `None` when the
/// text has no word characters.
pub fn fulltext_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{}\"", word.to_lowercase()))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" OR "))
}

#[async_trait]
impl RecordSink for SqliteCatalogStore {
    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> PipelineResult<u64> {
        let sql = self.upsert_sql();
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PipelineError::storage("upsert_batch", e))?;

        let mut affected = 0;
        for record in records {
            let raw_attributes = serde_json::to_string(&record.source_attributes)
                .map_err(|e| PipelineError::storage("upsert_batch", e))?;

            let mut query = sqlx::query(&sql)
                .bind(record.link.as_str())
                .bind(&record.price)
                .bind(&record.code)
                .bind(&record.name)
                .bind(record.description_raw.as_deref());
            for column in CanonicalColumn::ALL {
                query = query.bind(record.get(column));
            }
            let result = query
                .bind(raw_attributes)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| PipelineError::storage("upsert_batch", e))?;
            affected += result.rows_affected();
        }

        tx.commit().await.map_err(|e| PipelineError::storage("upsert_batch", e))?;
        info!("🗄️ Upserted {} records into {}", records.len(), self.table);
        Ok(affected)
    }

    async fn build_fulltext_index(&self, columns: &[CanonicalColumn]) -> PipelineResult<()> {
        let mut indexed = vec!["link"];
        indexed.extend(columns.iter().filter(|c| c.is_fulltext()).map(|c| c.sql_name()));
        let fts = self.fts_table();

        let statements = [
            format!("DROP TABLE IF EXISTS {fts}"),
            format!(
                "CREATE VIRTUAL TABLE {fts} USING fts5({columns}, content='{table}', content_rowid='id')",
                columns = indexed.join(", "),
                table = self.table,
            ),
            format!("INSERT INTO {fts}({fts}) VALUES('rebuild')"),
        ];
        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PipelineError::storage("build_fulltext_index", e))?;
        }

        info!("🔎 Full-text index {} rebuilt over {}", fts, indexed.join(", "));
        Ok(())
    }

    async fn search(&self, query: &str, limit: u32) -> PipelineResult<Vec<SearchHit>> {
        let Some(fts_query) = fulltext_query(query) else {
            return Ok(Vec::new());
        };
        if !self.has_fulltext_index().await? {
            return Err(PipelineError::storage(
                "search",
                format!("full-text index for '{}' has not been built; run a harvest first", self.table),
            ));
        }
        let fts = self.fts_table();
        let sql = format!(
            r#"
            SELECT t.link AS link, t.code AS code, -bm25({fts}) AS relevance
            FROM {fts}
            JOIN {table} t ON t.id = {fts}.rowid
            WHERE {fts} MATCH ?
            ORDER BY relevance DESC
            LIMIT ?
            "#,
            table = self.table,
        );

        let rows = sqlx::query(&sql)
            .bind(&fts_query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::storage("search", e))?;

        let hits = rows
            .iter()
            .map(|row| {
                Ok(SearchHit {
                    link: row.try_get("link")?,
                    code: row.try_get::<Option<String>, _>("code")?.unwrap_or_default(),
                    relevance: row.try_get("relevance")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| PipelineError::storage("search", e))?;

        debug!("Search '{}' ({}) -> {} hits", query, fts_query, hits.len());
        Ok(hits)
    }
}
