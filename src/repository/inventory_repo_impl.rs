// ==========================================
// 资产盘点 - 台账仓储实现
// ==========================================
// 职责: 实现 inventory_item 表的数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 单连接 + Mutex 串行化，导入与扫码路径共享
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::inventory::InventoryRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inventory_repo::{BatchUpsertOutcome, InventoryRepository, UpsertFailure};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = r#"
    SELECT inventory_number, display_name, department, scanned,
           scan_timestamp, raw_tag, comment, provisional
    FROM inventory_item
"#;

const UPSERT_SQL: &str = r#"
    INSERT OR REPLACE INTO inventory_item (
        inventory_number, display_name, department, scanned,
        scan_timestamp, raw_tag, comment, provisional
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

/// 时间戳统一为毫秒精度 RFC 3339（字典序即时间序）
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(raw_value = %raw, error = %e, "扫码时间格式错误，按空处理");
            None
        }
    }
}

fn map_record(row: &Row) -> rusqlite::Result<InventoryRecord> {
    Ok(InventoryRecord {
        key: row.get(0)?,
        display_name: row.get(1)?,
        department: row.get(2)?,
        scanned: row.get::<_, i64>(3)? != 0,
        scan_timestamp: row
            .get::<_, Option<String>>(4)?
            .as_deref()
            .and_then(parse_timestamp),
        raw_tag: row.get(5)?,
        comment: row.get(6)?,
        provisional: row.get::<_, i64>(7)? != 0,
    })
}

/// LIKE 通配符转义
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

// ==========================================
// InventoryRepositoryImpl
// ==========================================
pub struct InventoryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    changes: watch::Sender<u64>,
}

impl InventoryRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        let (changes, _) = watch::channel(0);
        Self { conn, changes }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    fn upsert_with(conn: &Connection, record: &InventoryRecord) -> rusqlite::Result<usize> {
        conn.execute(
            UPSERT_SQL,
            params![
                record.key,
                record.display_name,
                record.department,
                record.scanned as i32,
                record.scan_timestamp.as_ref().map(format_timestamp),
                record.raw_tag,
                record.comment,
                record.provisional as i32,
            ],
        )
    }

    fn query_records(
        &self,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<InventoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} {}", SELECT_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params, map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count_where(&self, clause: &str, params: impl rusqlite::Params) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM inventory_item {}", clause);
        let count: i64 = conn.query_row(&sql, params, |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl InventoryRepository for InventoryRepositoryImpl {
    async fn upsert_one(&self, record: &InventoryRecord) -> RepositoryResult<()> {
        {
            let conn = self.get_conn()?;
            Self::upsert_with(&conn, record)?;
        }
        self.notify();
        Ok(())
    }

    async fn upsert_many(&self, records: &[InventoryRecord]) -> RepositoryResult<BatchUpsertOutcome> {
        let mut outcome = BatchUpsertOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        {
            let conn = self.get_conn()?;
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

            // 语句级失败只回滚该语句，事务继续
            for (position, record) in records.iter().enumerate() {
                match Self::upsert_with(&tx, record) {
                    Ok(_) => outcome.merged += 1,
                    Err(e) => {
                        let err = RepositoryError::from(e);
                        warn!(key = %record.key, position, error = %err, "单行写入失败，已跳过");
                        outcome.failures.push(UpsertFailure {
                            position,
                            key: record.key.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }

            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        }

        debug!(
            merged = outcome.merged,
            failed = outcome.failures.len(),
            "批量写入完成"
        );
        self.notify();
        Ok(outcome)
    }

    async fn get_by_key(&self, key: &str) -> RepositoryResult<Option<InventoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE inventory_number = ?1", SELECT_COLUMNS);
        let record = conn.query_row(&sql, params![key], map_record).optional()?;
        Ok(record)
    }

    async fn exists(&self, key: &str) -> RepositoryResult<bool> {
        Ok(self.count_where("WHERE inventory_number = ?1", params![key])? > 0)
    }

    async fn list_all(&self) -> RepositoryResult<Vec<InventoryRecord>> {
        self.query_records("ORDER BY display_name ASC, inventory_number ASC", [])
    }

    async fn list_by_scanned(&self, scanned: bool) -> RepositoryResult<Vec<InventoryRecord>> {
        let clause = if scanned {
            "WHERE scanned = ?1 ORDER BY scan_timestamp DESC, inventory_number ASC"
        } else {
            "WHERE scanned = ?1 ORDER BY display_name ASC, inventory_number ASC"
        };
        self.query_records(clause, params![scanned as i32])
    }

    async fn search(&self, query: &str) -> RepositoryResult<Vec<InventoryRecord>> {
        let pattern = escape_like(query.trim());
        self.query_records(
            r"WHERE display_name LIKE ?1 ESCAPE '\' OR inventory_number LIKE ?1 ESCAPE '\'
              ORDER BY display_name ASC, inventory_number ASC",
            params![pattern],
        )
    }

    async fn count_total(&self) -> RepositoryResult<usize> {
        self.count_where("", [])
    }

    async fn count_by_scanned(&self, scanned: bool) -> RepositoryResult<usize> {
        self.count_where("WHERE scanned = ?1", params![scanned as i32])
    }

    async fn update_scanned(
        &self,
        key: &str,
        scanned: bool,
        scan_timestamp: Option<DateTime<Utc>>,
    ) -> RepositoryResult<bool> {
        let updated = {
            let conn = self.get_conn()?;
            conn.execute(
                "UPDATE inventory_item SET scanned = ?1, scan_timestamp = ?2 WHERE inventory_number = ?3",
                params![
                    scanned as i32,
                    scan_timestamp.as_ref().map(format_timestamp),
                    key
                ],
            )?
        };
        if updated > 0 {
            self.notify();
        }
        Ok(updated > 0)
    }

    async fn update_department(&self, key: &str, department: &str) -> RepositoryResult<bool> {
        let updated = {
            let conn = self.get_conn()?;
            conn.execute(
                "UPDATE inventory_item SET department = ?1 WHERE inventory_number = ?2",
                params![department.trim(), key],
            )?
        };
        if updated > 0 {
            self.notify();
        }
        Ok(updated > 0)
    }

    async fn delete_by_key(&self, key: &str) -> RepositoryResult<bool> {
        let deleted = {
            let conn = self.get_conn()?;
            conn.execute(
                "DELETE FROM inventory_item WHERE inventory_number = ?1",
                params![key],
            )?
        };
        if deleted > 0 {
            self.notify();
        }
        Ok(deleted > 0)
    }

    async fn delete_all(&self) -> RepositoryResult<usize> {
        let deleted = {
            let conn = self.get_conn()?;
            conn.execute("DELETE FROM inventory_item", [])?
        };
        self.notify();
        Ok(deleted)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
