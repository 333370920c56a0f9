//! SQLite backend: one row per `(namespace, group, locale)` holding a JSON document.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{
    Connection,
    params_from_iter,
};
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    DocumentBackend,
    Entry,
};
use crate::address::{
    Address,
    Scope,
};
use crate::dot::{
    self,
    Translations,
};
use crate::error::StoreError;
use crate::pattern::{
    Namespace,
    Pattern,
};

/// Column name overrides for the translations table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnNames {
    pub namespace: String,
    pub group: String,
    pub locale: String,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            namespace: "namespace".to_string(),
            group: "group".to_string(),
            locale: "locale".to_string(),
            value: "value".to_string(),
            created_at: "created_at".to_string(),
            updated_at: "updated_at".to_string(),
        }
    }
}

impl ColumnNames {
    /// `(field path, column name)` pairs, used by validation.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("namespace", self.namespace.as_str()),
            ("group", self.group.as_str()),
            ("locale", self.locale.as_str()),
            ("value", self.value.as_str()),
            ("createdAt", self.created_at.as_str()),
            ("updatedAt", self.updated_at.as_str()),
        ]
    }
}

/// Rows per upsert statement; 4 bound values each stays under SQLite's
/// historical limit of 999 variables.
const ROWS_PER_STATEMENT: usize = 200;

/// Quotes an SQL identifier (`group` is a keyword).
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Translations table backend.
///
/// Rows are keyed by `(namespace, group, locale)`; the default namespace is
/// stored as `*`. Writes are multi-row upserts of at most
/// [`ROWS_PER_STATEMENT`] rows each, without an enclosing transaction.
#[derive(Debug)]
pub struct SqliteBackend {
    /// `rusqlite::Connection` is `!Sync`
    conn: Mutex<Connection>,
    table: String,
    /// Column mapping for `table`
    columns: ColumnNames,
}

impl SqliteBackend {
    /// Opens (or creates) the database file and ensures the table exists.
    ///
    /// # Errors
    /// - Database open or schema creation failure
    pub fn open(path: &Path, table: &str, columns: ColumnNames) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source })?;
        }
        Self::with_connection(Connection::open(path)?, table, columns)
    }

    /// In-memory database, mostly for tests.
    ///
    /// # Errors
    /// - Schema creation failure
    pub fn open_in_memory(table: &str, columns: ColumnNames) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, table, columns)
    }

    /// Wraps an existing connection and ensures the table exists.
    ///
    /// # Errors
    /// - Schema creation failure
    pub fn with_connection(
        conn: Connection,
        table: &str,
        columns: ColumnNames,
    ) -> Result<Self, StoreError> {
        let backend = Self { conn: Mutex::new(conn), table: table.to_string(), columns };
        backend.init_schema()?;
        Ok(backend)
    }

    /// テーブルがなければ作成する
    fn init_schema(&self) -> Result<(), StoreError> {
        let c = &self.columns;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {ns} TEXT NOT NULL,
                {group} TEXT NOT NULL,
                {locale} TEXT NOT NULL,
                {value} TEXT NOT NULL,
                {created} TEXT NOT NULL DEFAULT (datetime('now')),
                {updated} TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY ({ns}, {group}, {locale})
            )",
            table = quote(&self.table),
            ns = quote(&c.namespace),
            group = quote(&c.group),
            locale = quote(&c.locale),
            value = quote(&c.value),
            created = quote(&c.created_at),
            updated = quote(&c.updated_at),
        );
        self.conn.lock().execute(&sql, [])?;
        Ok(())
    }

    /// Builds the `WHERE` clause for a scope; "any" dimensions are omitted.
    fn where_clause(&self, scope: &Scope) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        let mut add_in = |column: &str, values: Vec<String>| {
            let placeholders = vec!["?"; values.len()].join(", ");
            conditions.push(format!("{} IN ({placeholders})", quote(column)));
            params.extend(values);
        };

        if let Some(namespaces) = scope.namespace.values() {
            add_in(&self.columns.namespace, namespaces.into_iter().map(str::to_string).collect());
        }
        if let Some(values) = pattern_values(&scope.group) {
            add_in(&self.columns.group, values);
        }
        if let Some(values) = pattern_values(&scope.locale) {
            add_in(&self.columns.locale, values);
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }

    /// One multi-row upsert statement.
    fn upsert_rows(&self, batch: &[(Entry<()>, Translations)]) -> Result<(), StoreError> {
        let c = &self.columns;
        let mut params: Vec<String> = Vec::with_capacity(batch.len() * 4);
        for (entry, translations) in batch {
            params.push(entry.address.namespace.as_str().to_string());
            params.push(entry.address.group.clone());
            params.push(entry.address.locale.clone());
            params.push(serde_json::to_string(&dot::unflatten(translations))?);
        }

        let rows = vec!["(?, ?, ?, ?, datetime('now'), datetime('now'))"; batch.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({ns}, {group}, {locale}, {value}, {created}, {updated}) VALUES {rows}
             ON CONFLICT ({ns}, {group}, {locale})
             DO UPDATE SET {value} = excluded.{value}, {updated} = excluded.{updated}",
            table = quote(&self.table),
            ns = quote(&c.namespace),
            group = quote(&c.group),
            locale = quote(&c.locale),
            value = quote(&c.value),
            created = quote(&c.created_at),
            updated = quote(&c.updated_at),
        );

        let written = self.conn.lock().execute(&sql, params_from_iter(params.iter()))?;
        tracing::debug!(rows = written, table = %self.table, "Upserted translation rows");
        Ok(())
    }

    /// `(namespace, group, locale)` の一致条件
    fn key_condition(&self) -> String {
        format!(
            "{} = ?1 AND {} = ?2 AND {} = ?3",
            quote(&self.columns.namespace),
            quote(&self.columns.group),
            quote(&self.columns.locale)
        )
    }
}

/// `IN` リストに展開できる値。ワイルドカードなら `None`
fn pattern_values(pattern: &Pattern) -> Option<Vec<String>> {
    match pattern {
        Pattern::Wildcard => None,
        other => Some(other.expand(std::iter::empty::<String>())),
    }
}

impl DocumentBackend for SqliteBackend {
    type Location = ();

    fn list(&self, scope: &Scope) -> Result<Vec<Entry<()>>, StoreError> {
        let (clause, params) = self.where_clause(scope);
        let sql = format!(
            "SELECT {}, {}, {} FROM {}{clause} ORDER BY rowid",
            quote(&self.columns.namespace),
            quote(&self.columns.locale),
            quote(&self.columns.group),
            quote(&self.table),
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            Ok(Address::new(
                Namespace::from_spec(&row.get::<_, String>(0)?),
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for address in rows {
            entries.push(Entry { address: address?, location: () });
        }
        Ok(entries)
    }

    fn locate(&self, _address: &Address) -> Result<(), StoreError> {
        Ok(())
    }

    fn read(&self, entry: &Entry<()>) -> Result<Translations, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            quote(&self.columns.value),
            quote(&self.table),
            self.key_condition()
        );
        let address = &entry.address;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows =
            stmt.query([address.namespace.as_str(), address.group.as_str(), address.locale.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(Translations::new());
        };
        let raw: String = row.get(0)?;

        match serde_json::from_str(&raw) {
            Ok(document) => Ok(dot::flatten(&document)),
            Err(err) => {
                tracing::warn!(%address, %err, "Failed to decode stored translations");
                Ok(Translations::new())
            }
        }
    }

    fn write(&self, batch: &[(Entry<()>, Translations)]) -> Result<(), StoreError> {
        // 各チャンクは独立した文で、前のチャンクは失敗しても残る
        for rows in batch.chunks(ROWS_PER_STATEMENT) {
            self.upsert_rows(rows)?;
        }
        Ok(())
    }

    fn delete(&self, entry: &Entry<()>) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE {}", quote(&self.table), self.key_condition());
        let address = &entry.address;

        let key = [address.namespace.as_str(), address.group.as_str(), address.locale.as_str()];
        self.conn.lock().execute(&sql, key)?;
        tracing::debug!(%address, "Deleted translation row");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::{
        fixture,
        rstest,
    };

    use super::*;
    use crate::test_utils::translations;

    fn entry(namespace: Namespace, locale: &str, group: &str) -> Entry<()> {
        Entry { address: Address::new(namespace, locale, group), location: () }
    }

    #[fixture]
    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory("translations", ColumnNames::default()).unwrap();
        backend
            .write(&[
                (entry(Namespace::Default, "en", "messages"), translations(&[("hi", "Hi")])),
                (entry(Namespace::Default, "fr", "messages"), translations(&[("hi", "Salut")])),
                (
                    entry(Namespace::Named("pkg".to_string()), "en", "messages"),
                    translations(&[("hi", "Pkg")]),
                ),
            ])
            .unwrap();
        backend
    }

    #[rstest]
    fn list_filters_by_scope(backend: SqliteBackend) {
        let all = backend.list(&Scope::everything()).unwrap();
        let default_ns = backend.list(&Scope::parse("messages", Some("*"), "*").unwrap()).unwrap();
        let union = backend.list(&Scope::parse("*", None, "fr|de").unwrap()).unwrap();

        assert_that!(all, len(eq(3)));
        assert_that!(default_ns, len(eq(2)));
        assert_that!(
            union,
            elements_are![eq(&entry(Namespace::Default, "fr", "messages"))]
        );
    }

    #[rstest]
    fn write_upserts_existing_rows(backend: SqliteBackend) {
        let target = entry(Namespace::Default, "en", "messages");

        backend.write(&[(target.clone(), translations(&[("hi", "Hello"), ("a.b", "c")]))]).unwrap();

        assert_that!(backend.list(&Scope::everything()).unwrap(), len(eq(3)));
        assert_that!(
            backend.read(&target).unwrap(),
            eq(&translations(&[("hi", "Hello"), ("a.b", "c")]))
        );
    }

    #[rstest]
    fn read_missing_row_is_empty(backend: SqliteBackend) {
        assert_that!(backend.read(&entry(Namespace::Default, "it", "messages")).unwrap(), is_empty());
    }

    #[rstest]
    fn delete_removes_row(backend: SqliteBackend) {
        backend.delete(&entry(Namespace::Default, "en", "messages")).unwrap();

        assert_that!(backend.list(&Scope::everything()).unwrap(), len(eq(2)));
    }

    #[rstest]
    fn write_splits_large_batches(backend: SqliteBackend) {
        let count = ROWS_PER_STATEMENT * 2 + 1;
        let batch: Vec<_> = (0..count)
            .map(|i| (entry(Namespace::Default, "en", &format!("group{i}")), translations(&[("k", "v")])))
            .collect();

        backend.write(&batch).unwrap();

        assert_that!(backend.list(&Scope::parse("*", Some("*"), "en").unwrap()).unwrap(), len(eq(count)));
        assert_that!(
            backend.read(&entry(Namespace::Default, "en", &format!("group{}", count - 1))).unwrap(),
            eq(&translations(&[("k", "v")]))
        );
    }

    #[rstest]
    fn custom_table_and_columns() {
        let columns = ColumnNames {
            group: "bucket".to_string(),
            value: "payload".to_string(),
            ..ColumnNames::default()
        };
        let backend = SqliteBackend::open_in_memory("i18n lines", columns).unwrap();
        let target = entry(Namespace::Default, "en", "messages");

        backend.write(&[(target.clone(), translations(&[("x", "y")]))]).unwrap();

        assert_that!(backend.read(&target).unwrap(), eq(&translations(&[("x", "y")])));
    }
}
