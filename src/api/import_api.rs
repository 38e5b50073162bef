// ==========================================
// 资产盘点 - 台账导入API
// ==========================================
// 职责: 文件路径入口、数据源类型识别、本地化结果消息
// 约束: 每次调用独立构建导入器，调用之间不保留状态
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfigReader;
use crate::domain::{ImportReport, InventoryStats, SourceKind, SourcePreview};
use crate::i18n;
use crate::importer::{ImportError, ImportOptions, InventoryImporter, InventoryImporterImpl};
use crate::repository::InventoryRepository;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 本地化结果消息
    pub message: String,
    /// 成功写入的记录数
    pub merged: usize,
    /// 合并后全量重算的统计
    pub stats: InventoryStats,
    /// 诊断报告（重复、临时编号、短名称、行错误）
    pub report: ImportReport,
    /// 批次ID
    pub batch_id: String,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

// ==========================================
// ImportApi - 导入API
// ==========================================
pub struct ImportApi<R, C>
where
    R: InventoryRepository,
    C: ImportConfigReader,
{
    repo: Arc<R>,
    config: C,
}

impl<R, C> ImportApi<R, C>
where
    R: InventoryRepository + Send + Sync,
    C: ImportConfigReader,
{
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self { repo, config }
    }

    async fn build_importer(&self) -> ApiResult<InventoryImporterImpl<R>> {
        let config = self.config.load_import_config().await?;
        Ok(InventoryImporterImpl::from_config(self.repo.clone(), &config))
    }

    /// 导入台账文件
    ///
    /// # 参数
    /// - file_path: 文件路径（按扩展名识别电子表格，其余按分隔符文本处理）
    /// - options: 取消标志等
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 导入完成（可能为 0 条）
    /// - Err(ApiError::SourceError): 数据源不可读或格式损坏，未写入任何记录
    /// - Err(ApiError::ImportCancelled): 已取消，已提交的分块保留
    pub async fn import_file(
        &self,
        file_path: &str,
        options: ImportOptions,
    ) -> ApiResult<ImportApiResponse> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }

        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ApiError::SourceError(i18n::t_with_args(
                "import.file_not_found",
                &[("path", file_path)],
            )));
        }

        let importer = self.build_importer().await?;
        let outcome = importer
            .import_file(path, options)
            .await
            .map_err(|e| {
                if let ImportError::Cancelled { merged } = e {
                    warn!(file_path, merged, "导入被取消");
                } else {
                    warn!(file_path, error = %e, "导入失败");
                }
                ApiError::from(e)
            })?;

        let message = if outcome.merged == 0 {
            i18n::t("import.empty")
        } else {
            i18n::t_with_args("import.success", &[("count", &outcome.merged.to_string())])
        };

        info!(
            file_path,
            batch_id = %outcome.report.batch_id,
            merged = outcome.merged,
            "导入API完成"
        );

        Ok(ImportApiResponse {
            message,
            merged: outcome.merged,
            stats: outcome.stats,
            batch_id: outcome.report.batch_id.clone(),
            report: outcome.report,
            elapsed_ms: outcome.elapsed_time.as_millis() as i64,
        })
    }

    /// 预览数据源前 15 行 × 8 列（不访问仓储）
    pub async fn inspect_file(&self, file_path: &str) -> ApiResult<SourcePreview> {
        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ApiError::SourceError(i18n::t_with_args(
                "import.file_not_found",
                &[("path", file_path)],
            )));
        }

        let kind = SourceKind::from_path(path);
        let bytes = std::fs::read(path).map_err(ImportError::from)?;
        let importer = self.build_importer().await?;
        Ok(importer.inspect(bytes, kind)?)
    }
}

/// 导入失败时面向用户的单条消息
pub fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::ImportCancelled { merged } => {
            i18n::t_with_args("import.cancelled", &[("count", &merged.to_string())])
        }
        other => i18n::t_with_args("import.failed", &[("reason", &other.to_string())]),
    }
}
