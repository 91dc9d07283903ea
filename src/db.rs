// ==========================================
// 制造执行系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发出库时的偶发 busy 错误
// - 提供建表入口（lot / inventory_txn / config_kv）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 说明：
/// - 数量列以规范化 TEXT 存储 Decimal，避免浮点误差
/// - 日期列为 YYYY-MM-DD，时间戳为 RFC3339
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS lot (
            lot_id TEXT PRIMARY KEY,
            lot_number TEXT NOT NULL,
            tenant_id TEXT NOT NULL,
            warehouse_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            work_order_id TEXT,
            parent_lot_id TEXT REFERENCES lot(lot_id),
            initial_quantity TEXT NOT NULL,
            current_quantity TEXT NOT NULL,
            unit TEXT NOT NULL,
            manufactured_on TEXT NOT NULL,
            expires_on TEXT,
            quality_status TEXT NOT NULL,
            supplier_name TEXT,
            supplier_lot_number TEXT,
            remarks TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(tenant_id, lot_number)
        );

        CREATE INDEX IF NOT EXISTS idx_lot_scope
            ON lot(tenant_id, warehouse_id, product_id, active);
        CREATE INDEX IF NOT EXISTS idx_lot_expiry
            ON lot(tenant_id, expires_on);

        CREATE TABLE IF NOT EXISTS inventory_txn (
            txn_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            lot_id TEXT NOT NULL REFERENCES lot(lot_id),
            txn_type TEXT NOT NULL,
            quantity_delta TEXT NOT NULL,
            quantity_after TEXT NOT NULL,
            reference TEXT,
            operator TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_txn_lot
            ON inventory_txn(tenant_id, lot_id, created_at);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
