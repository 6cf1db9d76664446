//! Immutable schema snapshot.

use chrono::{DateTime, Utc};
use quarry_core::is_valid_identifier;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::source::{RawIndexColumn, RawMetadata};

/// Databases that are never exposed, whatever the credential can see.
pub const SYSTEM_DATABASES: &[&str] = &["mysql", "information_schema", "performance_schema", "sys"];

/// One generation of the database/table/column allow-list.
///
/// Built once from [`RawMetadata`] and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaSnapshot {
    pub generation: u64,
    pub captured_at: DateTime<Utc>,
    pub databases: BTreeMap<String, DatabaseSchema>,
}

/// Schema information for a database.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseSchema {
    pub tables: BTreeMap<String, TableSchema>,
}

/// Schema information for a table.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub comment: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnSchema>,
    /// Indexes by name, `PRIMARY` included.
    pub indexes: Vec<IndexSchema>,
}

/// Schema information for a column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub key: String,
    pub extra: String,
    pub comment: String,
    pub ordinal: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSchema {
    pub name: String,
    /// Columns in index order.
    pub columns: Vec<String>,
    pub unique: bool,
    pub index_type: String,
}

impl TableSchema {
    /// Get a column by exact name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Primary key columns, in `PRIMARY` index order when the index is
    /// known and in ordinal order otherwise.
    pub fn primary_key(&self) -> Vec<String> {
        if let Some(primary) = self.indexes.iter().find(|i| i.name == "PRIMARY") {
            return primary.columns.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.key == "PRI")
            .map(|c| c.name.clone())
            .collect()
    }
}

impl DatabaseSchema {
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

type IndexKey = (String, String, String);

/// Group index rows into per-table indexes. An index is kept only when its
/// name and every column it covers are admitted.
fn attach_indexes(databases: &mut BTreeMap<String, DatabaseSchema>, rows: Vec<RawIndexColumn>) {
    let mut grouped: BTreeMap<IndexKey, (bool, String, Vec<(u32, String)>)> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry((row.database, row.table, row.index))
            .or_insert_with(|| (row.unique, row.index_type.clone(), Vec::new()));
        entry.2.push((row.seq, row.column));
    }

    for ((database, table, name), (unique, index_type, mut columns)) in grouped {
        let Some(table) = databases
            .get_mut(&database)
            .and_then(|db| db.tables.get_mut(&table))
        else {
            continue;
        };
        if !is_valid_identifier(&name)
            || !columns.iter().all(|(_, c)| table.get_column(c).is_some())
        {
            warn!(
                database = %database,
                table = %table.name,
                "Skipping index with unsupported name or columns"
            );
            continue;
        }
        columns.sort_by_key(|(seq, _)| *seq);
        table.indexes.push(IndexSchema {
            name,
            columns: columns.into_iter().map(|(_, c)| c).collect(),
            unique,
            index_type,
        });
    }
}

impl SchemaSnapshot {
    /// Build a snapshot, dropping system databases, `excluded` databases and
    /// any name outside the identifier charset.
    pub fn build(raw: RawMetadata, generation: u64, excluded: &BTreeSet<String>) -> Self {
        let mut databases: BTreeMap<String, DatabaseSchema> = BTreeMap::new();
        let mut dropped: BTreeSet<String> = BTreeSet::new();

        let mut admit_database = |name: &str, databases: &mut BTreeMap<String, DatabaseSchema>| {
            if databases.contains_key(name) {
                return true;
            }
            if dropped.contains(name) {
                return false;
            }
            let hidden = SYSTEM_DATABASES.iter().any(|s| s.eq_ignore_ascii_case(name))
                || excluded.contains(name);
            if hidden {
                dropped.insert(name.to_string());
                return false;
            }
            if !is_valid_identifier(name) {
                warn!(len = name.len(), "Skipping database with unsupported name");
                dropped.insert(name.to_string());
                return false;
            }
            databases.insert(name.to_string(), DatabaseSchema::default());
            true
        };

        for db in &raw.databases {
            admit_database(db, &mut databases);
        }

        for table in &raw.tables {
            if !admit_database(&table.database, &mut databases) {
                continue;
            }
            if !is_valid_identifier(&table.name) {
                warn!(database = %table.database, "Skipping table with unsupported name");
                continue;
            }
            if let Some(db) = databases.get_mut(&table.database) {
                db.tables
                    .entry(table.name.clone())
                    .or_insert_with(|| TableSchema {
                        name: table.name.clone(),
                        comment: table.comment.clone(),
                        columns: Vec::new(),
                        indexes: Vec::new(),
                    });
            }
        }

        for col in raw.columns {
            let Some(db) = databases.get_mut(&col.database) else {
                continue;
            };
            // Columns only attach to tables that were admitted above.
            let Some(table) = db.tables.get_mut(&col.table) else {
                continue;
            };
            if !is_valid_identifier(&col.name) {
                warn!(
                    database = %col.database,
                    table = %col.table,
                    "Skipping column with unsupported name"
                );
                continue;
            }
            table.columns.push(ColumnSchema {
                name: col.name,
                data_type: col.data_type,
                column_type: col.column_type,
                nullable: col.nullable,
                default: col.default,
                key: col.key,
                extra: col.extra,
                comment: col.comment,
                ordinal: col.ordinal,
            });
        }

        for db in databases.values_mut() {
            for table in db.tables.values_mut() {
                table.columns.sort_by_key(|c| c.ordinal);
            }
        }

        attach_indexes(&mut databases, raw.index_columns);

        Self {
            generation,
            captured_at: Utc::now(),
            databases,
        }
    }

    /// Database names in sorted order.
    pub fn database_names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    pub fn get_database(&self, name: &str) -> Option<&DatabaseSchema> {
        self.databases.get(name)
    }

    pub fn get_table(&self, database: &str, table: &str) -> Option<&TableSchema> {
        self.databases.get(database)?.get_table(table)
    }

    pub fn contains_database(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    /// Map from table name to every database holding a table of that name.
    pub fn table_index(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut index: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (db_name, db) in &self.databases {
            for table_name in db.tables.keys() {
                index.entry(table_name.as_str()).or_default().push(db_name.as_str());
            }
        }
        index
    }
}
