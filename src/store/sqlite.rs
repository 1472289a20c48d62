use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const PRODUCT_COLUMNS: &str =
    "id, name, unit, category, brand, stock, status, image, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::configure(conn)
    }

    /// Opens a private in-memory database. Used by tests and one-shot tools.
    pub fn in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that TEXT ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        category: row.get(3)?,
        brand: row.get(4)?,
        stock: row.get(5)?,
        status: row.get(6)?,
        image: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryLog> {
    Ok(InventoryLog {
        id: row.get(0)?,
        product_id: row.get(1)?,
        old_stock: row.get(2)?,
        new_stock: row.get(3)?,
        changed_by: row.get(4)?,
        timestamp: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn load_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        product_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn map_unique_violation(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::AlreadyExists
        }
        _ => Error::Database(err),
    }
}

/// Escapes `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Product operations

    fn create_product(&self, input: &ProductInput) -> Result<Product> {
        let conn = self.conn();
        let now = format_datetime(&Utc::now());

        conn.execute(
            "INSERT INTO products (name, unit, category, brand, stock, status, image, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                input.name,
                input.unit,
                input.category,
                input.brand,
                input.stock,
                input.status,
                input.image,
                now,
            ],
        )
        .map_err(map_unique_violation)?;

        let id = conn.last_insert_rowid();
        load_product(&conn, id)?.ok_or(Error::NotFound)
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>> {
        load_product(&self.conn(), id)
    }

    fn find_product_id_by_name(&self, name: &str, excluding: Option<i64>) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id FROM products
             WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id != ?2)
             LIMIT 1",
            params![name, excluding],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(category) = &query.category {
            args.push(Value::Text(category.clone()));
            clauses.push(format!("category = ?{}", args.len()));
        }
        if let Some(needle) = &query.name_contains {
            args.push(Value::Text(needle.clone()));
            clauses.push(format!("instr(name, ?{}) > 0", args.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        // Column and direction come from closed enums, never from request text.
        let direction = query.order.keyword();
        let order_sql = match query.sort {
            SortField::Id => format!("id {direction}"),
            field => format!("{} {direction}, id {direction}", field.column()),
        };

        args.push(Value::Integer(i64::from(query.limit)));
        let limit_idx = args.len();
        args.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));
        let offset_idx = args.len();

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {where_sql}
             ORDER BY {order_sql} LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), product_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn search_products(&self, name: &str, limit: u32) -> Result<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![like_pattern(name), limit], product_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
        changed_by: &str,
    ) -> Result<Option<Product>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(current) = load_product(&tx, id)? else {
            return Ok(None);
        };

        let now = format_datetime(&Utc::now());

        tx.execute(
            "UPDATE products
             SET name = ?1, unit = ?2, category = ?3, brand = ?4, stock = ?5,
                 status = ?6, image = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                input.name,
                input.unit,
                input.category,
                input.brand,
                input.stock,
                input.status,
                input.image,
                now,
                id,
            ],
        )
        .map_err(map_unique_violation)?;

        if current.stock != input.stock {
            tx.execute(
                "INSERT INTO inventory_logs (product_id, old_stock, new_stock, changed_by, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, current.stock, input.stock, changed_by, now],
            )?;
        }

        let updated = load_product(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn all_products(&self) -> Result<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))?;

        let rows = stmt.query_map([], product_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_products(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    // Inventory log operations

    fn list_history(&self, product_id: i64) -> Result<Vec<InventoryLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, product_id, old_stock, new_stock, changed_by, timestamp
             FROM inventory_logs WHERE product_id = ?1
             ORDER BY timestamp DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![product_id], log_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input(name: &str, stock: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            unit: "pcs".to_string(),
            category: "Tools".to_string(),
            brand: None,
            stock,
            status: status_for_stock(stock).to_string(),
            image: None,
        }
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store.initialize().unwrap();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"products".to_string()));
        assert!(tables.contains(&"inventory_logs".to_string()));
    }

    #[test]
    fn test_create_and_get_product() {
        let store = store();
        let created = store.create_product(&input("Widget", 5)).unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.status, "In Stock");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get_product(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get_product(99).unwrap().is_none());
    }

    #[test]
    fn test_name_unique_ignoring_case() {
        let store = store();
        let widget = store.create_product(&input("Widget", 5)).unwrap();

        let err = store.create_product(&input("WIDGET", 1)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
        assert_eq!(store.count_products().unwrap(), 1);

        assert_eq!(
            store.find_product_id_by_name("wIdGeT", None).unwrap(),
            Some(widget.id)
        );
        assert_eq!(
            store.find_product_id_by_name("widget", Some(widget.id)).unwrap(),
            None
        );
    }

    #[test]
    fn test_update_logs_only_stock_changes() {
        let store = store();
        let widget = store.create_product(&input("Widget", 5)).unwrap();

        let updated = store
            .update_product(widget.id, &input("Widget", 10), "alice")
            .unwrap()
            .unwrap();
        assert_eq!(updated.stock, 10);

        let mut renamed = input("Gadget", 10);
        renamed.unit = "box".to_string();
        store.update_product(widget.id, &renamed, "bob").unwrap();

        let history = store.list_history(widget.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_stock, 5);
        assert_eq!(history[0].new_stock, 10);
        assert_eq!(history[0].changed_by, "alice");

        let product = store.get_product(widget.id).unwrap().unwrap();
        assert_eq!(product.name, "Gadget");
        assert_eq!(product.unit, "box");
    }

    #[test]
    fn test_update_missing_product() {
        let store = store();
        assert!(
            store
                .update_product(42, &input("Ghost", 1), "admin")
                .unwrap()
                .is_none()
        );
        assert!(store.list_history(42).unwrap().is_empty());
    }

    #[test]
    fn test_history_newest_first() {
        let store = store();
        let widget = store.create_product(&input("Widget", 0)).unwrap();
        for stock in [1, 2, 3] {
            store
                .update_product(widget.id, &input("Widget", stock), "admin")
                .unwrap();
        }

        let history = store.list_history(widget.id).unwrap();
        let new_stocks: Vec<i64> = history.iter().map(|h| h.new_stock).collect();
        assert_eq!(new_stocks, vec![3, 2, 1]);
        assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_list_products_filters_and_sorts() {
        let store = store();
        store.create_product(&input("Hammer", 3)).unwrap();
        store.create_product(&input("hammer drill", 9)).unwrap();
        let mut bolt = input("Bolt", 100);
        bolt.category = "Hardware".to_string();
        store.create_product(&bolt).unwrap();

        let all = store.list_products(&ProductQuery::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bolt", "hammer drill", "Hammer"]);

        let tools = store
            .list_products(&ProductQuery {
                category: Some("Tools".to_string()),
                sort: SortField::Stock,
                order: SortOrder::Asc,
                ..ProductQuery::default()
            })
            .unwrap();
        let stocks: Vec<i64> = tools.iter().map(|p| p.stock).collect();
        assert_eq!(stocks, vec![3, 9]);

        let matching = store
            .list_products(&ProductQuery {
                name_contains: Some("Ham".to_string()),
                ..ProductQuery::default()
            })
            .unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Hammer");
    }

    #[test]
    fn test_list_products_paginates() {
        let store = store();
        for i in 0..5 {
            store.create_product(&input(&format!("Item {i}"), i)).unwrap();
        }

        let page = store
            .list_products(&ProductQuery {
                page: 2,
                limit: 2,
                order: SortOrder::Asc,
                ..ProductQuery::default()
            })
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_literal() {
        let store = store();
        store.create_product(&input("Blue Widget", 1)).unwrap();
        store.create_product(&input("widget 50%", 1)).unwrap();
        store.create_product(&input("Gadget", 1)).unwrap();

        assert_eq!(store.search_products("WIDGET", 100).unwrap().len(), 2);
        let literal = store.search_products("50%", 100).unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].name, "widget 50%");
        assert_eq!(store.search_products("", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_history_cascades_with_product() {
        let store = store();
        let widget = store.create_product(&input("Widget", 1)).unwrap();
        store
            .update_product(widget.id, &input("Widget", 2), "admin")
            .unwrap();

        store
            .conn()
            .execute("DELETE FROM products WHERE id = ?1", params![widget.id])
            .unwrap();
        assert!(store.list_history(widget.id).unwrap().is_empty());
    }

    #[test]
    fn test_parse_datetime_accepts_sqlite_default() {
        let dt = parse_datetime("2024-03-01 12:30:00");
        assert_eq!(format_datetime(&dt), "2024-03-01T12:30:00.000000Z");
    }
}
