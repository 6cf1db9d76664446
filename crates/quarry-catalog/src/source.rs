//! Metadata source seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Unfiltered metadata as reported by the database.
///
/// The catalog applies system-database exclusion and identifier checks,
/// so sources may return everything they see.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMetadata {
    /// All schema names, including empty ones.
    pub databases: Vec<String>,
    pub tables: Vec<RawTable>,
    pub columns: Vec<RawColumn>,
    /// One entry per indexed column, as in `information_schema.STATISTICS`.
    #[serde(default)]
    pub index_columns: Vec<RawIndexColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub database: String,
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawColumn {
    pub database: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub nullable: bool,
    /// `COLUMN_DEFAULT` as text; `None` when the column has no default.
    #[serde(default)]
    pub default: Option<String>,
    /// `PRI`, `UNI`, `MUL` or empty.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub comment: String,
    pub ordinal: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIndexColumn {
    pub database: String,
    pub table: String,
    /// `PRIMARY` for the primary key.
    pub index: String,
    pub column: String,
    pub unique: bool,
    pub index_type: String,
    /// 1-based position of the column within the index.
    pub seq: u32,
}

/// Something that can report database metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<RawMetadata>;
}

/// Fixed, in-memory metadata. Useful for offline tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    metadata: RawMetadata,
}

impl StaticMetadataSource {
    pub fn new(metadata: RawMetadata) -> Self {
        Self { metadata }
    }

    /// Add a database with no tables.
    pub fn with_database(mut self, database: &str) -> Self {
        if !self.metadata.databases.iter().any(|d| d == database) {
            self.metadata.databases.push(database.to_string());
        }
        self
    }

    /// Add a table whose columns are `(name, data_type)` pairs, in order.
    /// A column named `id` is reported as the primary key.
    pub fn with_table(mut self, database: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        self = self.with_database(database);
        self.metadata.tables.push(RawTable {
            database: database.to_string(),
            name: table.to_string(),
            comment: String::new(),
        });
        for (idx, (name, data_type)) in columns.iter().enumerate() {
            self.metadata.columns.push(RawColumn {
                database: database.to_string(),
                table: table.to_string(),
                name: name.to_string(),
                data_type: data_type.to_string(),
                column_type: data_type.to_string(),
                nullable: *name != "id",
                default: None,
                key: if *name == "id" { "PRI".to_string() } else { String::new() },
                extra: String::new(),
                comment: String::new(),
                ordinal: idx as u32 + 1,
            });
        }
        self
    }

    /// Add an index over `columns`, in order. Name it `PRIMARY` for a
    /// primary key.
    pub fn with_index(
        mut self,
        database: &str,
        table: &str,
        index: &str,
        columns: &[&str],
        unique: bool,
    ) -> Self {
        for (idx, column) in columns.iter().enumerate() {
            self.metadata.index_columns.push(RawIndexColumn {
                database: database.to_string(),
                table: table.to_string(),
                index: index.to_string(),
                column: column.to_string(),
                unique,
                index_type: "BTREE".to_string(),
                seq: idx as u32 + 1,
            });
        }
        self
    }

    /// Set the comment of a table added earlier.
    pub fn with_table_comment(mut self, database: &str, table: &str, comment: &str) -> Self {
        if let Some(raw) = self
            .metadata
            .tables
            .iter_mut()
            .find(|t| t.database == database && t.name == table)
        {
            raw.comment = comment.to_string();
        }
        self
    }

    /// Set the default of a column added earlier.
    pub fn with_column_default(
        mut self,
        database: &str,
        table: &str,
        column: &str,
        default: &str,
    ) -> Self {
        if let Some(raw) = self
            .metadata
            .columns
            .iter_mut()
            .find(|c| c.database == database && c.table == table && c.name == column)
        {
            raw.default = Some(default.to_string());
        }
        self
    }

    pub fn metadata(&self) -> &RawMetadata {
        &self.metadata
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn fetch(&self) -> anyhow::Result<RawMetadata> {
        Ok(self.metadata.clone())
    }
}
