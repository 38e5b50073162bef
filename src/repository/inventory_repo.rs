// ==========================================
// 资产盘点 - 台账仓储 Trait
// ==========================================
// 职责: 定义台账数据访问接口（导入合并与扫码路径共用）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 由实现方串行化对存储的并发访问
// ==========================================

use crate::domain::inventory::InventoryRecord;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// 批量写入结果：单行失败不影响其余行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpsertOutcome {
    pub merged: usize,
    pub failures: Vec<UpsertFailure>,
}

/// 单行写入失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertFailure {
    pub position: usize, // 在入参切片中的下标
    pub key: String,
    pub message: String,
}

// ==========================================
// InventoryRepository Trait
// ==========================================
// 实现者: InventoryRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    // ===== 写入 =====

    /// 写入单条记录（key 已存在时整条替换）
    async fn upsert_one(&self, record: &InventoryRecord) -> RepositoryResult<()>;

    /// 批量写入（单事务，逐行隔离失败）
    ///
    /// # 返回
    /// - Ok(BatchUpsertOutcome): 成功条数 + 失败行
    /// - Err: 事务级错误（整批回滚）
    async fn upsert_many(&self, records: &[InventoryRecord]) -> RepositoryResult<BatchUpsertOutcome>;

    // ===== 查询 =====

    async fn get_by_key(&self, key: &str) -> RepositoryResult<Option<InventoryRecord>>;

    async fn exists(&self, key: &str) -> RepositoryResult<bool>;

    /// 全部记录（按名称排序）
    async fn list_all(&self) -> RepositoryResult<Vec<InventoryRecord>>;

    /// 按扫码状态查询：未扫码按名称排序，已扫码按扫码时间倒序
    async fn list_by_scanned(&self, scanned: bool) -> RepositoryResult<Vec<InventoryRecord>>;

    /// 名称或编号子串匹配
    async fn search(&self, query: &str) -> RepositoryResult<Vec<InventoryRecord>>;

    // ===== 统计 =====

    async fn count_total(&self) -> RepositoryResult<usize>;

    async fn count_by_scanned(&self, scanned: bool) -> RepositoryResult<usize>;

    // ===== 盘点状态更新 =====

    /// # 返回
    /// - Ok(true): 已更新
    /// - Ok(false): key 不存在
    async fn update_scanned(
        &self,
        key: &str,
        scanned: bool,
        scan_timestamp: Option<DateTime<Utc>>,
    ) -> RepositoryResult<bool>;

    async fn update_department(&self, key: &str, department: &str) -> RepositoryResult<bool>;

    // ===== 删除 =====

    async fn delete_by_key(&self, key: &str) -> RepositoryResult<bool>;

    /// # 返回
    /// - 删除的记录数
    async fn delete_all(&self) -> RepositoryResult<usize>;

    // ===== 变更通知 =====

    /// 订阅变更计数器；每次写入提交后递增
    fn subscribe(&self) -> watch::Receiver<u64>;
}
