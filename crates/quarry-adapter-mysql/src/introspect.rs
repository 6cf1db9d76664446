use async_trait::async_trait;
use quarry_catalog::{
    MetadataSource, RawColumn, RawIndexColumn, RawMetadata, RawTable, SYSTEM_DATABASES,
};
use sqlx::Row;
use tracing::debug;

use crate::MySqlAdapter;

// information_schema text columns come back with binary collations on some
// servers; CAST AS CHAR keeps them decodable as strings.
const SCHEMATA_SQL: &str = r#"
    select cast(SCHEMA_NAME as char) as schema_name
    from information_schema.SCHEMATA
    where SCHEMA_NAME not in (?, ?, ?, ?)
    order by SCHEMA_NAME
"#;

const TABLES_SQL: &str = r#"
    select cast(TABLE_SCHEMA as char) as table_schema,
           cast(TABLE_NAME as char) as table_name,
           cast(TABLE_COMMENT as char) as table_comment
    from information_schema.TABLES
    where TABLE_TYPE in ('BASE TABLE', 'VIEW')
      and TABLE_SCHEMA not in (?, ?, ?, ?)
    order by TABLE_SCHEMA, TABLE_NAME
"#;

const COLUMNS_SQL: &str = r#"
    select cast(TABLE_SCHEMA as char) as table_schema,
           cast(TABLE_NAME as char) as table_name,
           cast(COLUMN_NAME as char) as column_name,
           cast(DATA_TYPE as char) as data_type,
           cast(COLUMN_TYPE as char) as column_type,
           cast(IS_NULLABLE as char) as is_nullable,
           cast(COLUMN_DEFAULT as char) as column_default,
           cast(COLUMN_KEY as char) as column_key,
           cast(EXTRA as char) as extra,
           cast(COLUMN_COMMENT as char) as column_comment,
           cast(ORDINAL_POSITION as unsigned) as ordinal_position
    from information_schema.COLUMNS
    where TABLE_SCHEMA not in (?, ?, ?, ?)
    order by TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION
"#;

const STATISTICS_SQL: &str = r#"
    select cast(TABLE_SCHEMA as char) as table_schema,
           cast(TABLE_NAME as char) as table_name,
           cast(INDEX_NAME as char) as index_name,
           cast(COLUMN_NAME as char) as column_name,
           cast(NON_UNIQUE as unsigned) as non_unique,
           cast(INDEX_TYPE as char) as index_type,
           cast(SEQ_IN_INDEX as unsigned) as seq_in_index
    from information_schema.STATISTICS
    where TABLE_SCHEMA not in (?, ?, ?, ?)
      and COLUMN_NAME is not null
    order by TABLE_SCHEMA, TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX
"#;

fn bind_system<'q>(
    mut query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    for db in SYSTEM_DATABASES {
        query = query.bind(*db);
    }
    query
}

/// Introspect every non-system schema visible to the connected user.
#[async_trait]
impl MetadataSource for MySqlAdapter {
    async fn fetch(&self) -> anyhow::Result<RawMetadata> {
        let pool = self.pool();

        let databases: Vec<String> = bind_system(sqlx::query(SCHEMATA_SQL))
            .fetch_all(pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("schema_name"))
            .collect::<Result<_, _>>()?;

        let mut tables = Vec::new();
        for row in bind_system(sqlx::query(TABLES_SQL)).fetch_all(pool).await? {
            tables.push(RawTable {
                database: row.try_get("table_schema")?,
                name: row.try_get("table_name")?,
                comment: row
                    .try_get::<Option<String>, _>("table_comment")?
                    .unwrap_or_default(),
            });
        }

        let mut columns = Vec::new();
        for row in bind_system(sqlx::query(COLUMNS_SQL)).fetch_all(pool).await? {
            let is_nullable: String = row.try_get("is_nullable")?;
            let ordinal: u64 = row.try_get("ordinal_position")?;
            columns.push(RawColumn {
                database: row.try_get("table_schema")?,
                table: row.try_get("table_name")?,
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                column_type: row.try_get("column_type")?,
                nullable: is_nullable == "YES",
                default: row.try_get("column_default")?,
                key: row.try_get::<Option<String>, _>("column_key")?.unwrap_or_default(),
                extra: row.try_get::<Option<String>, _>("extra")?.unwrap_or_default(),
                comment: row
                    .try_get::<Option<String>, _>("column_comment")?
                    .unwrap_or_default(),
                ordinal: u32::try_from(ordinal)?,
            });
        }

        // Functional indexes have no COLUMN_NAME and are filtered out above.
        let mut index_columns = Vec::new();
        for row in bind_system(sqlx::query(STATISTICS_SQL)).fetch_all(pool).await? {
            let non_unique: u64 = row.try_get("non_unique")?;
            let seq: u64 = row.try_get("seq_in_index")?;
            index_columns.push(RawIndexColumn {
                database: row.try_get("table_schema")?,
                table: row.try_get("table_name")?,
                index: row.try_get("index_name")?,
                column: row.try_get("column_name")?,
                unique: non_unique == 0,
                index_type: row
                    .try_get::<Option<String>, _>("index_type")?
                    .unwrap_or_default(),
                seq: u32::try_from(seq)?,
            });
        }

        debug!(
            databases = databases.len(),
            tables = tables.len(),
            columns = columns.len(),
            index_columns = index_columns.len(),
            "Fetched MySQL metadata"
        );

        Ok(RawMetadata {
            databases,
            tables,
            columns,
            index_columns,
        })
    }
}
