//! Relational sources backed by SQLite.
//!
//! Equality and membership filters on plain columns, and the row limit, are
//! pushed into the statement. A join against another table on the same
//! connection runs as a single `LEFT JOIN` statement; everything else falls
//! back to the generic in-memory pipeline.
use crate::sources::SourceProvider;
use anyquery_common::config::{AppConfig, SourceConfig};
use anyquery_common::{Record, Value};
use anyquery_core::adapter::{project, resolve_joins, run_pipeline, Adapter, AdapterKind, LoadRequest};
use anyquery_core::{Cardinality, Condition, Join, JoinStrategy, Materialized, ModelSchema, Predicate};
use anyquery_error::{ErrorCode, QueryError, Result};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ROWID_ALIAS: &str = "__anyquery_rowid";

/// A shared SQLite connection. Adapters on the same handle can join natively.
pub struct SqlConnection {
    url: String,
    conn: Mutex<Connection>,
    statements: AtomicUsize,
}

impl SqlConnection {
    /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>` or a plain path.
    pub fn open(url: &str) -> Result<Arc<Self>> {
        let conn = match url {
            "sqlite::memory:" | "sqlite3::memory:" | ":memory:" => Connection::open_in_memory(),
            other => {
                let path = other
                    .strip_prefix("sqlite://")
                    .or_else(|| other.strip_prefix("sqlite3://"))
                    .unwrap_or(other);
                Connection::open(path)
            }
        }
        .map_err(|e| {
            QueryError::new(
                ErrorCode::SourceUnavailable,
                format!("Failed to open SQLite database '{}': {}", url, e),
            )
        })?;

        tracing::debug!("Opened SQLite connection to {}", url);
        Ok(Arc::new(Self {
            url: url.to_string(),
            conn: Mutex::new(conn),
            statements: AtomicUsize::new(0),
        }))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of data statements run so far.
    pub fn statement_count(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    /// Run raw SQL, e.g. to create fixtures.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| conn.execute_batch(sql))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| {
            QueryError::new(
                ErrorCode::InternalPanic,
                format!("SQLite connection to {} was poisoned", self.url),
            )
        })?;
        f(&conn).map_err(sql_error)
    }

    async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let handle = Arc::clone(self);
        handle.statements.fetch_add(1, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || handle.with_conn(f))
            .await
            .map_err(|e| {
                QueryError::new(
                    ErrorCode::InternalPanic,
                    format!("SQLite worker task failed: {}", e),
                )
            })?
    }
}

impl fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnection").field("url", &self.url).finish()
    }
}

fn sql_error(e: rusqlite::Error) -> QueryError {
    QueryError::new(ErrorCode::SourceUnavailable, format!("SQLite error: {}", e))
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Int(i) => Sql::Integer(*i),
        Value::Float(f) => Sql::Real(*f),
        other => Sql::Text(other.to_param()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

/// `WHERE` body and its parameters for key-only predicates.
fn where_clause(filters: &[Predicate]) -> (Option<String>, Vec<rusqlite::types::Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for predicate in filters {
        for (locator, condition) in &predicate.conditions {
            let Some(key) = locator.as_key() else {
                continue;
            };
            let column = quote_ident(key);
            match condition {
                Condition::Eq(Value::Null) => clauses.push(format!("{} IS NULL", column)),
                Condition::Eq(value) => {
                    clauses.push(format!("{} = ?", column));
                    params.push(to_sql(value));
                }
                Condition::In(values) => {
                    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
                    let has_null = non_null.len() < values.len();
                    let mut options = Vec::new();
                    if !non_null.is_empty() {
                        let marks = vec!["?"; non_null.len()].join(", ");
                        options.push(format!("{} IN ({})", column, marks));
                        params.extend(non_null.into_iter().map(to_sql));
                    }
                    if has_null {
                        options.push(format!("{} IS NULL", column));
                    }
                    if options.is_empty() {
                        clauses.push("0 = 1".to_string());
                    } else {
                        clauses.push(format!("({})", options.join(" OR ")));
                    }
                }
            }
        }
    }

    if clauses.is_empty() {
        (None, params)
    } else {
        (Some(clauses.join(" AND ")), params)
    }
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
    Ok(stmt.column_names().into_iter().map(String::from).collect())
}

/// A join that can run inside the source statement.
#[derive(Debug, Clone)]
struct NativeJoin {
    table: String,
    primary_key: String,
    foreign_key: String,
    into: String,
    cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub struct SqlAdapter {
    connection: Arc<SqlConnection>,
    table: String,
}

impl SqlAdapter {
    pub fn new(connection: Arc<SqlConnection>, table: impl Into<String>) -> Self {
        Self {
            connection,
            table: table.into(),
        }
    }

    pub fn connection(&self) -> &Arc<SqlConnection> {
        &self.connection
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn native_join(&self, join: &Join) -> Option<NativeJoin> {
        if !matches!(join.strategy, JoinStrategy::Default) {
            return None;
        }
        let target = join.target_model()?;
        if !self.can_push_down_with(target.adapter().as_ref()) {
            return None;
        }
        let target_adapter = target.adapter().as_any().downcast_ref::<SqlAdapter>()?;
        Some(NativeJoin {
            table: target_adapter.table.clone(),
            primary_key: join.primary_key.as_key()?.to_string(),
            foreign_key: join.foreign_key.as_key()?.to_string(),
            into: join.into.clone(),
            cardinality: join.cardinality,
        })
    }

    async fn select(
        &self,
        filters: &[Predicate],
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        let (clause, mut params) = where_clause(filters);
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        if let Some(clause) = clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(rusqlite::types::Value::Integer(limit as i64));
        }
        tracing::debug!("Executing on {}: {}", self.connection.url(), sql);

        self.connection
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();
                let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
                let mut records = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = Record::new();
                    for (idx, name) in columns.iter().enumerate() {
                        record.insert(name.clone(), from_sql(row.get_ref(idx)?));
                    }
                    records.push(record);
                }
                Ok(records)
            })
            .await
    }

    /// Source rows with every native join attached, in one statement.
    async fn select_joined(
        &self,
        filters: &[Predicate],
        limit: Option<usize>,
        joins: Vec<NativeJoin>,
    ) -> Result<Vec<Record>> {
        let (clause, mut params) = where_clause(filters);
        let mut inner = format!(
            "SELECT rowid AS {}, * FROM {}",
            quote_ident(ROWID_ALIAS),
            quote_ident(&self.table)
        );
        if let Some(clause) = clause {
            inner.push_str(" WHERE ");
            inner.push_str(&clause);
        }
        if let Some(limit) = limit {
            inner.push_str(" LIMIT ?");
            params.push(rusqlite::types::Value::Integer(limit as i64));
        }
        let table = self.table.clone();
        let url = self.connection.url().to_string();

        self.connection
            .run(move |conn| {
                let source_columns = table_columns(conn, &table)?;
                let target_columns = joins
                    .iter()
                    .map(|j| table_columns(conn, &j.table))
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut select = vec![format!("s.{}", quote_ident(ROWID_ALIAS))];
                select.extend(source_columns.iter().map(|c| format!("s.{}", quote_ident(c))));
                let mut from = format!("({}) AS s", inner);
                let mut order = vec![format!("s.{}", quote_ident(ROWID_ALIAS))];
                for (idx, (join, columns)) in joins.iter().zip(&target_columns).enumerate() {
                    let alias = format!("j{}", idx);
                    select.push(format!("{}.rowid", alias));
                    select.extend(columns.iter().map(|c| format!("{}.{}", alias, quote_ident(c))));
                    from.push_str(&format!(
                        " LEFT JOIN {} AS {} ON {}.{} = s.{}",
                        quote_ident(&join.table),
                        alias,
                        alias,
                        quote_ident(&join.primary_key),
                        quote_ident(&join.foreign_key)
                    ));
                    order.push(format!("{}.rowid", alias));
                }
                let sql = format!(
                    "SELECT {} FROM {} ORDER BY {}",
                    select.join(", "),
                    from,
                    order.join(", ")
                );
                tracing::debug!("Executing native join on {}: {}", url, sql);

                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
                let mut merged = JoinedRows::new(joins.len());
                while let Some(row) = rows.next()? {
                    let rowid: i64 = row.get(0)?;
                    let mut idx = 1;
                    let mut source = Record::new();
                    for name in &source_columns {
                        source.insert(name.clone(), from_sql(row.get_ref(idx)?));
                        idx += 1;
                    }
                    let mut targets = Vec::with_capacity(joins.len());
                    for columns in &target_columns {
                        let target_rowid: Option<i64> = row.get(idx)?;
                        idx += 1;
                        let mut target = Record::new();
                        for name in columns {
                            target.insert(name.clone(), from_sql(row.get_ref(idx)?));
                            idx += 1;
                        }
                        targets.push(target_rowid.map(|id| (id, target)));
                    }
                    merged.push(rowid, source, targets);
                }
                Ok(merged.finish(&joins))
            })
            .await
    }
}

/// Folds the LEFT JOIN product back into one record per source row.
struct JoinedRows {
    width: usize,
    order: Vec<i64>,
    rows: HashMap<i64, (Record, Vec<Vec<Record>>, Vec<HashSet<i64>>)>,
}

impl JoinedRows {
    fn new(width: usize) -> Self {
        Self {
            width,
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }

    fn push(&mut self, rowid: i64, source: Record, targets: Vec<Option<(i64, Record)>>) {
        let width = self.width;
        let entry = self.rows.entry(rowid).or_insert_with(|| {
            self.order.push(rowid);
            (source, vec![Vec::new(); width], vec![HashSet::new(); width])
        });
        for (slot, target) in targets.into_iter().enumerate() {
            if let Some((target_rowid, target)) = target {
                if entry.2[slot].insert(target_rowid) {
                    entry.1[slot].push(target);
                }
            }
        }
    }

    fn finish(mut self, joins: &[NativeJoin]) -> Vec<Record> {
        self.order
            .iter()
            .filter_map(|rowid| self.rows.remove(rowid))
            .map(|(mut record, groups, _)| {
                for (join, group) in joins.iter().zip(groups) {
                    let value = match join.cardinality {
                        Cardinality::List => {
                            Value::List(group.into_iter().map(Value::Record).collect())
                        }
                        Cardinality::Single => group
                            .into_iter()
                            .last()
                            .map(Value::Record)
                            .unwrap_or_default(),
                    };
                    record.insert(join.into.clone(), value);
                }
                record
            })
            .collect()
    }
}

#[async_trait]
impl Adapter for SqlAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Sql
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized> {
        if !request.filters.iter().all(Predicate::is_key_only) {
            tracing::debug!(
                "Filters on {} use nested locators; filtering in memory",
                self.table
            );
            let records = self.select(&[], None).await?;
            return run_pipeline(self, schema, records, request).await;
        }

        let has_detail = request.joins.iter().any(Join::is_self_detail);
        let mut native = Vec::new();
        let mut generic = Vec::new();
        for join in &request.joins {
            match self.native_join(join).filter(|_| !has_detail) {
                Some(native_join) => native.push(native_join),
                None => generic.push(join.clone()),
            }
        }

        let records = if native.is_empty() {
            self.select(&request.filters, request.limit).await?
        } else {
            self.select_joined(&request.filters, request.limit, native)
                .await?
        };
        let records =
            resolve_joins(self, schema, records, &generic, request.batch_size).await?;
        project(records, &request.select)
    }

    fn can_push_down_with(&self, other: &dyn Adapter) -> bool {
        other
            .as_any()
            .downcast_ref::<SqlAdapter>()
            .map_or(false, |o| Arc::ptr_eq(&self.connection, &o.connection))
    }
}

/// Builds [`SqlAdapter`]s, sharing one connection per URL.
#[derive(Default)]
pub struct SqlSourceProvider {
    connections: Mutex<HashMap<String, Arc<SqlConnection>>>,
}

impl SqlSourceProvider {
    pub fn connection(&self, url: &str) -> Result<Arc<SqlConnection>> {
        let mut connections = self.connections.lock().map_err(|_| {
            QueryError::new(
                ErrorCode::InternalPanic,
                "SQLite connection registry was poisoned",
            )
        })?;
        if let Some(existing) = connections.get(url) {
            return Ok(existing.clone());
        }
        let connection = SqlConnection::open(url)?;
        connections.insert(url.to_string(), connection.clone());
        Ok(connection)
    }
}

#[async_trait]
impl SourceProvider for SqlSourceProvider {
    fn type_name(&self) -> &'static str {
        "sql"
    }

    async fn build(&self, config: &SourceConfig, _settings: &AppConfig) -> Result<Arc<dyn Adapter>> {
        #[derive(serde::Deserialize)]
        struct SqlConfig {
            url: String,
            table: String,
        }

        let sql_config: SqlConfig = serde_json::from_value(config.config.clone()).map_err(|e| {
            QueryError::new(
                ErrorCode::InvalidConfig,
                format!("Failed to parse SQL source '{}': {}", config.name, e),
            )
            .with_hint("SQL sources need `url` and `table`")
        })?;

        let connection = self.connection(&sql_config.url)?;
        Ok(Arc::new(SqlAdapter::new(connection, sql_config.table)))
    }
}
