// ==========================================
// 资产盘点 - 台账 API
// ==========================================
// 职责: 扫码确认、撤销扫码、部门维护、删除/清空、查询、统计、导出
// 约束: 扫码路径只调用 get_by_key 与 update_scanned，key 逐字匹配
// ==========================================

use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{InventoryRecord, InventoryStats, ScanOutcome};
use crate::importer::recount;
use crate::repository::InventoryRepository;

/// 导出文件表头
const EXPORT_HEADER: [&str; 7] = [
    "inventory_number",
    "display_name",
    "department",
    "scanned",
    "scan_timestamp",
    "comment",
    "provisional",
];

/// 导出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub path: String,
    pub exported: usize,
}

// ==========================================
// InventoryApi - 台账 API
// ==========================================

/// 台账API
///
/// 职责：
/// 1. 扫码触发（命中即置为已盘点）
/// 2. 盘点状态与部门的人工维护
/// 3. 查询与统计（统计始终由仓储重算）
pub struct InventoryApi<R: InventoryRepository> {
    repo: Arc<R>,
}

impl<R> InventoryApi<R>
where
    R: InventoryRepository + Send + Sync,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    // ==========================================
    // 扫码路径
    // ==========================================

    /// 处理一次扫码
    ///
    /// # 参数
    /// - code: 标签解码结果（仅去除首尾空白）
    /// - department: 可选部门，非空时同时更新
    ///
    /// # 返回
    /// - Ok(ScanOutcome::Found): 更新后的记录
    /// - Ok(ScanOutcome::NotFound): 台账中无此编号
    pub async fn process_scan(
        &self,
        code: &str,
        department: Option<&str>,
    ) -> ApiResult<ScanOutcome> {
        let key = code.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("扫码结果不能为空".to_string()));
        }

        if self.repo.get_by_key(key).await?.is_none() {
            debug!(key, "扫码未命中台账");
            return Ok(ScanOutcome::NotFound(key.to_string()));
        }

        self.repo.update_scanned(key, true, Some(Utc::now())).await?;

        if let Some(dept) = department.map(str::trim).filter(|d| !d.is_empty()) {
            self.repo.update_department(key, dept).await?;
        }

        // 并发删除时记录可能已不存在
        match self.repo.get_by_key(key).await? {
            Some(record) => {
                info!(key, department = %record.department, "扫码确认");
                Ok(ScanOutcome::Found(record))
            }
            None => {
                warn!(key, "扫码确认后记录已被删除");
                Ok(ScanOutcome::NotFound(key.to_string()))
            }
        }
    }

    /// 撤销扫码：清除 scanned 与扫码时间
    pub async fn mark_unscanned(&self, key: &str) -> ApiResult<InventoryRecord> {
        let key = key.trim();
        if !self.repo.update_scanned(key, false, None).await? {
            return Err(ApiError::NotFound(format!("资产编号{}不存在", key)));
        }
        self.get_item(key).await
    }

    /// 修改所属部门
    pub async fn update_department(&self, key: &str, department: &str) -> ApiResult<InventoryRecord> {
        let key = key.trim();
        if !self.repo.update_department(key, department.trim()).await? {
            return Err(ApiError::NotFound(format!("资产编号{}不存在", key)));
        }
        self.get_item(key).await
    }

    // ==========================================
    // 删除与清空
    // ==========================================

    /// 按编号删除，返回重算后的统计
    pub async fn delete_item(&self, key: &str) -> ApiResult<InventoryStats> {
        let key = key.trim();
        if !self.repo.delete_by_key(key).await? {
            return Err(ApiError::NotFound(format!("资产编号{}不存在", key)));
        }
        info!(key, "台账记录已删除");
        self.stats().await
    }

    /// 清空台账，返回重算后的统计
    pub async fn clear_all(&self) -> ApiResult<InventoryStats> {
        let deleted = self.repo.delete_all().await?;
        info!(deleted, "台账已清空");
        self.stats().await
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub async fn get_item(&self, key: &str) -> ApiResult<InventoryRecord> {
        self.repo
            .get_by_key(key.trim())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("资产编号{}不存在", key.trim())))
    }

    pub async fn list_all(&self) -> ApiResult<Vec<InventoryRecord>> {
        Ok(self.repo.list_all().await?)
    }

    /// 按盘点状态列出（已盘点按扫码时间倒序）
    pub async fn list_by_scanned(&self, scanned: bool) -> ApiResult<Vec<InventoryRecord>> {
        Ok(self.repo.list_by_scanned(scanned).await?)
    }

    /// 名称或编号子串搜索，空查询返回全部
    pub async fn search(&self, query: &str) -> ApiResult<Vec<InventoryRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_all().await;
        }
        Ok(self.repo.search(query).await?)
    }

    pub async fn stats(&self) -> ApiResult<InventoryStats> {
        Ok(recount(self.repo.as_ref()).await?)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出全部记录为 `;` 分隔的 UTF-8 文件（含表头）
    pub async fn export_csv(&self, path: &str) -> ApiResult<ExportResponse> {
        let records = self.repo.list_all().await?;
        write_export(Path::new(path), &records)?;

        info!(path, exported = records.len(), "台账已导出");
        Ok(ExportResponse {
            path: path.to_string(),
            exported: records.len(),
        })
    }
}

fn write_export(path: &Path, records: &[InventoryRecord]) -> ApiResult<()> {
    let export_err = |e: csv::Error| ApiError::ExportError(e.to_string());

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(export_err)?;

    writer.write_record(EXPORT_HEADER).map_err(export_err)?;
    for record in records {
        let scanned_at = record
            .scan_timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        writer
            .write_record([
                record.key.as_str(),
                record.display_name.as_str(),
                record.department.as_str(),
                if record.scanned { "1" } else { "0" },
                scanned_at.as_str(),
                record.comment.as_str(),
                if record.provisional { "1" } else { "0" },
            ])
            .map_err(export_err)?;
    }

    writer
        .flush()
        .map_err(|e| ApiError::ExportError(e.to_string()))
}
