// ==========================================
// 资产盘点 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少扫码写入与导入并发时的 busy 错误
// - 建表幂等，首次打开即可使用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "INVENTORY_RECON_DB_PATH";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS inventory_item (
    inventory_number TEXT PRIMARY KEY NOT NULL CHECK (length(trim(inventory_number)) > 0),
    display_name TEXT NOT NULL,
    department TEXT NOT NULL DEFAULT '',
    scanned INTEGER NOT NULL DEFAULT 0,
    scan_timestamp TEXT,
    raw_tag TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    provisional INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_inventory_item_scanned ON inventory_item(scanned);
CREATE INDEX IF NOT EXISTS idx_inventory_item_name ON inventory_item(display_name);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys / busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接、应用统一配置并确保表结构存在
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
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

/// 默认数据库路径
///
/// 优先级: 环境变量 INVENTORY_RECON_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./inventory_recon.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("inventory-recon");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("inventory_recon.db");
        }
    }

    path.to_string_lossy().to_string()
}
