//! Signal extraction from file text.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// Kinds of evidence that a file refers to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    /// `jdbc:mysql://host/db`, `mysql://user@host/db`
    ConnectionString,
    /// `DB_NAME=db`, `MYSQL_DATABASE: db`
    EnvAssignment,
    /// `database: db`, `"database": "db"`, `'NAME': 'db'`
    OrmConfig,
    /// A word matching a table known to the catalog.
    TableLiteral,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 4] = [
        SignalCategory::ConnectionString,
        SignalCategory::EnvAssignment,
        SignalCategory::OrmConfig,
        SignalCategory::TableLiteral,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionString => "connection_string",
            Self::EnvAssignment => "env_assignment",
            Self::OrmConfig => "orm_config",
            Self::TableLiteral => "table_literal",
        }
    }
}

static CONNECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:jdbc:)?(?:mysql|mariadb)(?:\+[a-z0-9]+)?://[^/\s]+/([A-Za-z0-9_\-]+)")
        .expect("connection pattern is valid")
});

static ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:MYSQL_DATABASE|MYSQL_DB|DB_NAME|DB_DATABASE|DATABASE_NAME)\b["']?\s*[=:]\s*["']?([A-Za-z0-9_\-]+)"#,
    )
    .expect("env pattern is valid")
});

static ORM_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // YAML `database: shop`
        Regex::new(r#"(?m)^\s*(?:database|dbname|db_name)\s*:\s*["']?([A-Za-z0-9_\-]+)["']?\s*$"#),
        // JSON `"database": "shop"`
        Regex::new(r#""(?:database|dbname|db)"\s*:\s*"([A-Za-z0-9_\-]+)""#),
        // Django `'NAME': 'shop'`
        Regex::new(r#"['"]NAME['"]\s*:\s*['"]([A-Za-z0-9_\-]+)['"]"#),
        // DSN / ini `dbname=shop`
        Regex::new(r"(?i)\b(?:dbname|database)\s*=\s*([A-Za-z0-9_\-]+)"),
    ]
    .map(|re| re.expect("orm pattern is valid"))
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("word pattern is valid"));

/// Database-naming signals found in one file.
///
/// Each (category, name) pair appears once however often the file repeats it.
#[derive(Debug, Default)]
pub struct FileSignals {
    /// Names from strong signals, paired with their category.
    pub hints: Vec<(SignalCategory, String)>,
    /// Database names credited by table literals, once per distinct table.
    pub table_hits: Vec<String>,
}

/// Extract signals from `text`. `table_index` maps table names to the
/// catalog databases holding them.
pub fn extract<'t>(text: &'t str, table_index: &BTreeMap<&str, Vec<&str>>) -> FileSignals {
    let mut seen: HashSet<(SignalCategory, &'t str)> = HashSet::new();
    let mut signals = FileSignals::default();

    let mut push = |category: SignalCategory, name: &'t str| {
        if seen.insert((category, name)) {
            signals.hints.push((category, name.to_string()));
        }
    };

    for caps in CONNECTION_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push(SignalCategory::ConnectionString, m.as_str());
        }
    }
    for caps in ENV_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push(SignalCategory::EnvAssignment, m.as_str());
        }
    }
    for re in ORM_RES.iter() {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push(SignalCategory::OrmConfig, m.as_str());
            }
        }
    }

    if !table_index.is_empty() {
        let mut tables_seen: HashSet<&str> = HashSet::new();
        for word in WORD_RE.find_iter(text) {
            let word = word.as_str();
            if let Some(dbs) = table_index.get(word) {
                if tables_seen.insert(word) {
                    signals.table_hits.extend(dbs.iter().map(|db| db.to_string()));
                }
            }
        }
    }

    signals
}
