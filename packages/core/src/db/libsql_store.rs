//! LibsqlStore - GroupStore Implementation for the libsql Backend
//!
//! `LibsqlStore` runs every call on a fresh autocommit connection from
//! `DatabaseService`. `begin()` opens a dedicated connection, issues
//! `BEGIN IMMEDIATE` and hands it out as a `LibsqlTransaction`; every
//! statement of that transaction runs on the same connection.
//!
//! Filters are translated into a parameterized `WHERE` clause that agrees
//! with `StoreFilter::matches`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stocktree_core::db::{DatabaseConfig, DatabaseService, GroupStore, LibsqlStore, StoreFilter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(DatabaseConfig::from_env()).await?);
//!     let store = LibsqlStore::new(db);
//!     let roots = store.count(&StoreFilter::new().siblings_of(None)).await?;
//!     println!("{} root groups", roots);
//!     Ok(())
//! }
//! ```

use crate::db::database::GROUPS_TABLE;
use crate::db::group_store::{
    DeletedScope, FindOptions, GroupStore, ParentScope, StoreFilter, StoreTransaction,
    TransactionalStore,
};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{InventoryGroup, OrderField};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Connection, Row, Value};
use std::sync::Arc;

const SELECT_COLUMNS: &str = "id, name, handle, \"type\", zone_code, aisle_number, group_number, \
     shelf_number, location_code, mpath, parent_group_id, \"rank\", is_active, metadata, \
     created_at, updated_at, deleted_at";

/// Autocommit libsql store
#[derive(Debug, Clone)]
pub struct LibsqlStore {
    db: Arc<DatabaseService>,
}

impl LibsqlStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    async fn conn(&self) -> Result<Connection> {
        Ok(self.db.connect_with_timeout().await?)
    }
}

#[async_trait]
impl GroupStore for LibsqlStore {
    async fn find(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> Result<Vec<InventoryGroup>> {
        find_with_conn(&self.conn().await?, filter, options).await
    }

    async fn count(&self, filter: &StoreFilter) -> Result<usize> {
        count_with_conn(&self.conn().await?, filter).await
    }

    async fn insert(&self, group: &InventoryGroup) -> Result<()> {
        insert_with_conn(&self.conn().await?, group).await
    }

    async fn save(&self, group: &InventoryGroup) -> Result<()> {
        save_with_conn(&self.conn().await?, group).await
    }

    async fn shift_ranks(&self, filter: &StoreFilter, delta: i64) -> Result<u64> {
        shift_ranks_with_conn(&self.conn().await?, filter, delta).await
    }

    async fn delete(&self, ids: &[String]) -> Result<u64> {
        delete_with_conn(&self.conn().await?, ids).await
    }
}

#[async_trait]
impl TransactionalStore for LibsqlStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let conn = self.conn().await?;
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(Box::new(LibsqlTransaction { conn }))
    }
}

/// Open libsql transaction
///
/// Dropping it without `commit()` closes the connection, which rolls the
/// transaction back.
pub struct LibsqlTransaction {
    conn: Connection,
}

#[async_trait]
impl GroupStore for LibsqlTransaction {
    async fn find(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> Result<Vec<InventoryGroup>> {
        find_with_conn(&self.conn, filter, options).await
    }

    async fn count(&self, filter: &StoreFilter) -> Result<usize> {
        count_with_conn(&self.conn, filter).await
    }

    async fn insert(&self, group: &InventoryGroup) -> Result<()> {
        insert_with_conn(&self.conn, group).await
    }

    async fn save(&self, group: &InventoryGroup) -> Result<()> {
        save_with_conn(&self.conn, group).await
    }

    async fn shift_ranks(&self, filter: &StoreFilter, delta: i64) -> Result<u64> {
        shift_ranks_with_conn(&self.conn, filter, delta).await
    }

    async fn delete(&self, ids: &[String]) -> Result<u64> {
        delete_with_conn(&self.conn, ids).await
    }
}

#[async_trait]
impl StoreTransaction for LibsqlTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        commit_with_conn(&self.conn).await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }
}

//
// SQL helpers shared by the autocommit store and transactions
//

/// Parameterized `WHERE` clause
#[derive(Debug, Default)]
struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    fn push(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    fn push_param(&mut self, condition: impl Into<String>, value: Value) {
        self.conditions.push(condition.into());
        self.params.push(value);
    }

    /// `column IN (?, ?, ...)`, or a never-true condition for an empty list
    fn push_any_of(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            self.push("0 = 1");
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.push(format!("{} IN ({})", column, placeholders));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.clone())));
    }

    fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn build_where(filter: &StoreFilter) -> WhereClause {
    let mut clause = WhereClause::default();

    match filter.deleted {
        DeletedScope::Exclude => clause.push("deleted_at IS NULL"),
        DeletedScope::Include => {}
        DeletedScope::Only => clause.push("deleted_at IS NOT NULL"),
    }

    if let Some(ids) = &filter.ids {
        clause.push_any_of("id", ids);
    }
    if let Some(name) = &filter.name {
        clause.push_param("name = ?", Value::Text(name.clone()));
    }
    if let Some(handles) = &filter.handles {
        clause.push_any_of("handle", handles);
    }
    if let Some(group_type) = &filter.group_type {
        clause.push_param("\"type\" = ?", Value::Text(group_type.clone()));
    }
    if let Some(zone_code) = &filter.zone_code {
        clause.push_param("zone_code = ?", Value::Text(zone_code.clone()));
    }
    match &filter.parent {
        Some(ParentScope::Root) => clause.push("parent_group_id IS NULL"),
        Some(ParentScope::Parent(id)) => {
            clause.push_param("parent_group_id = ?", Value::Text(id.clone()))
        }
        None => {}
    }
    if let Some(is_active) = filter.is_active {
        clause.push_param("is_active = ?", Value::Integer(i64::from(is_active)));
    }
    if let Some(range) = &filter.rank {
        if let Some(gt) = range.gt {
            clause.push_param("\"rank\" > ?", Value::Integer(gt));
        }
        if let Some(gte) = range.gte {
            clause.push_param("\"rank\" >= ?", Value::Integer(gte));
        }
        if let Some(lt) = range.lt {
            clause.push_param("\"rank\" < ?", Value::Integer(lt));
        }
        if let Some(lte) = range.lte {
            clause.push_param("\"rank\" <= ?", Value::Integer(lte));
        }
    }
    if let Some(prefix) = &filter.mpath_prefix {
        // LIKE is case-insensitive in SQLite; the substr check keeps the match exact
        clause.push_param(
            "mpath LIKE ? ESCAPE '\\'",
            Value::Text(format!("{}%", escape_like(prefix))),
        );
        clause.push("substr(mpath, 1, ?) = ?");
        clause
            .params
            .push(Value::Integer(prefix.chars().count() as i64));
        clause.params.push(Value::Text(prefix.clone()));
    }
    if let Some(mpaths) = &filter.mpath_any_of {
        clause.push_any_of("mpath", mpaths);
    }
    if let Some(text) = &filter.text {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        clause.push(
            "(lower(name) LIKE ? ESCAPE '\\' \
             OR lower(handle) LIKE ? ESCAPE '\\' \
             OR lower(COALESCE(location_code, '')) LIKE ? ESCAPE '\\')",
        );
        for _ in 0..3 {
            clause.params.push(Value::Text(pattern.clone()));
        }
    }

    clause
}

fn order_sql(options: &FindOptions) -> String {
    let column = match options.order.field {
        OrderField::Rank => "\"rank\"",
        OrderField::Name => "name",
        OrderField::CreatedAt => "created_at",
    };
    let direction = if options.order.descending {
        "DESC"
    } else {
        "ASC"
    };
    format!(
        " ORDER BY {} {}, created_at ASC, id ASC",
        column, direction
    )
}

fn limit_sql(options: &FindOptions, params: &mut Vec<Value>) -> String {
    match (options.take, options.skip) {
        (None, None) => String::new(),
        (Some(take), None) => {
            params.push(Value::Integer(take as i64));
            " LIMIT ?".to_string()
        }
        (None, Some(skip)) => {
            params.push(Value::Integer(skip as i64));
            " LIMIT -1 OFFSET ?".to_string()
        }
        (Some(take), Some(skip)) => {
            params.push(Value::Integer(take as i64));
            params.push(Value::Integer(skip as i64));
            " LIMIT ? OFFSET ?".to_string()
        }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp; accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP` format
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(anyhow::anyhow!(
        "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
        s
    ))
}

fn text_or_null(value: Option<&String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn int_or_null(value: Option<u32>) -> Value {
    match value {
        Some(n) => Value::Integer(i64::from(n)),
        None => Value::Null,
    }
}

fn opt_u32(row: &Row, idx: i32, column: &str) -> Result<Option<u32>> {
    let raw: Option<i64> = row
        .get(idx)
        .with_context(|| format!("Failed to get {}", column))?;
    raw.map(|n| {
        u32::try_from(n)
            .map_err(|_| DatabaseError::row_decode(format!("{} out of range: {}", column, n)))
    })
    .transpose()
    .map_err(Into::into)
}

/// Convert a `SELECT_COLUMNS` row into an `InventoryGroup`
fn row_to_group(row: &Row) -> Result<InventoryGroup> {
    let id: String = row.get(0).context("Failed to get id")?;
    let name: String = row.get(1).context("Failed to get name")?;
    let handle: String = row.get(2).context("Failed to get handle")?;
    let group_type: Option<String> = row.get(3).context("Failed to get type")?;
    let zone_code: Option<String> = row.get(4).context("Failed to get zone_code")?;
    let aisle_number = opt_u32(row, 5, "aisle_number")?;
    let group_number = opt_u32(row, 6, "group_number")?;
    let shelf_number = opt_u32(row, 7, "shelf_number")?;
    let location_code: Option<String> = row.get(8).context("Failed to get location_code")?;
    let mpath: String = row.get(9).context("Failed to get mpath")?;
    let parent_group_id: Option<String> = row.get(10).context("Failed to get parent_group_id")?;
    let rank: i64 = row.get(11).context("Failed to get rank")?;
    let is_active: i64 = row.get(12).context("Failed to get is_active")?;
    let metadata_json: Option<String> = row.get(13).context("Failed to get metadata")?;
    let created_at_str: String = row.get(14).context("Failed to get created_at")?;
    let updated_at_str: String = row.get(15).context("Failed to get updated_at")?;
    let deleted_at_str: Option<String> = row.get(16).context("Failed to get deleted_at")?;

    let metadata = metadata_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .with_context(|| format!("Failed to parse metadata JSON of {}", id))?;

    let created_at = parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
    let updated_at = parse_timestamp(&updated_at_str).context("Failed to parse updated_at")?;
    let deleted_at = deleted_at_str
        .as_deref()
        .map(parse_timestamp)
        .transpose()
        .context("Failed to parse deleted_at")?;

    Ok(InventoryGroup {
        id,
        name,
        handle,
        group_type,
        zone_code,
        aisle_number,
        group_number,
        shelf_number,
        location_code,
        mpath,
        parent_group_id,
        rank,
        is_active: is_active != 0,
        metadata,
        created_at,
        updated_at,
        deleted_at,
    })
}

/// Column values in `SELECT_COLUMNS` order
fn group_values(group: &InventoryGroup) -> Result<Vec<Value>> {
    let metadata = group
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize metadata")?;

    Ok(vec![
        Value::Text(group.id.clone()),
        Value::Text(group.name.clone()),
        Value::Text(group.handle.clone()),
        text_or_null(group.group_type.as_ref()),
        text_or_null(group.zone_code.as_ref()),
        int_or_null(group.aisle_number),
        int_or_null(group.group_number),
        int_or_null(group.shelf_number),
        text_or_null(group.location_code.as_ref()),
        Value::Text(group.mpath.clone()),
        text_or_null(group.parent_group_id.as_ref()),
        Value::Integer(group.rank),
        Value::Integer(i64::from(group.is_active)),
        text_or_null(metadata.as_ref()),
        Value::Text(format_timestamp(&group.created_at)),
        Value::Text(format_timestamp(&group.updated_at)),
        match &group.deleted_at {
            Some(ts) => Value::Text(format_timestamp(ts)),
            None => Value::Null,
        },
    ])
}

async fn find_with_conn(
    conn: &Connection,
    filter: &StoreFilter,
    options: &FindOptions,
) -> Result<Vec<InventoryGroup>> {
    let clause = build_where(filter);
    let mut params = clause.params.clone();
    let sql = format!(
        "SELECT {} FROM {}{}{}{}",
        SELECT_COLUMNS,
        GROUPS_TABLE,
        clause.to_sql(),
        order_sql(options),
        limit_sql(options, &mut params)
    );

    let mut rows = conn
        .query(&sql, libsql::params_from_iter(params))
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to query groups: {}", e)))?;

    let mut groups = Vec::new();
    while let Some(row) = rows.next().await? {
        groups.push(row_to_group(&row)?);
    }

    Ok(groups)
}

async fn count_with_conn(conn: &Connection, filter: &StoreFilter) -> Result<usize> {
    let clause = build_where(filter);
    let sql = format!("SELECT COUNT(*) FROM {}{}", GROUPS_TABLE, clause.to_sql());

    let mut rows = conn
        .query(&sql, libsql::params_from_iter(clause.params))
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to count groups: {}", e)))?;

    let count: i64 = match rows.next().await? {
        Some(row) => row.get(0).context("Failed to get count")?,
        None => 0,
    };

    Ok(count as usize)
}

async fn insert_with_conn(conn: &Connection, group: &InventoryGroup) -> Result<()> {
    let placeholders = vec!["?"; 17].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        GROUPS_TABLE, SELECT_COLUMNS, placeholders
    );

    conn.execute(&sql, libsql::params_from_iter(group_values(group)?))
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to insert group {}: {}", group.id, e))
        })?;

    Ok(())
}

async fn save_with_conn(conn: &Connection, group: &InventoryGroup) -> Result<()> {
    // id goes last for the WHERE clause
    let mut values = group_values(group)?;
    let id = values.remove(0);
    values.push(id);

    let sql = format!(
        "UPDATE {} SET name = ?, handle = ?, \"type\" = ?, zone_code = ?, aisle_number = ?, \
         group_number = ?, shelf_number = ?, location_code = ?, mpath = ?, parent_group_id = ?, \
         \"rank\" = ?, is_active = ?, metadata = ?, created_at = ?, updated_at = ?, deleted_at = ? \
         WHERE id = ?",
        GROUPS_TABLE
    );

    let affected = conn
        .execute(&sql, libsql::params_from_iter(values))
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to save group {}: {}", group.id, e))
        })?;

    if affected == 0 {
        bail!("Inventory group not found: {}", group.id);
    }

    Ok(())
}

async fn shift_ranks_with_conn(conn: &Connection, filter: &StoreFilter, delta: i64) -> Result<u64> {
    let clause = build_where(filter);
    let mut params = vec![Value::Integer(delta)];
    params.extend(clause.params.iter().cloned());

    let sql = format!(
        "UPDATE {} SET \"rank\" = \"rank\" + ?{}",
        GROUPS_TABLE,
        clause.to_sql()
    );

    let shifted = conn
        .execute(&sql, libsql::params_from_iter(params))
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to shift ranks: {}", e)))?;

    Ok(shifted)
}

/// `COMMIT`, rolling back if the commit itself fails
async fn commit_with_conn(conn: &Connection) -> Result<()> {
    if let Err(e) = conn.execute("COMMIT", ()).await {
        if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback after failed commit also failed: {}", rollback_err);
        }
        return Err(
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e)).into(),
        );
    }
    Ok(())
}

async fn delete_with_conn(conn: &Connection, ids: &[String]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut clause = WhereClause::default();
    clause.push_any_of("id", ids);
    let sql = format!("DELETE FROM {}{}", GROUPS_TABLE, clause.to_sql());

    let deleted = conn
        .execute(&sql, libsql::params_from_iter(clause.params))
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete groups: {}", e)))?;

    Ok(deleted)
}
