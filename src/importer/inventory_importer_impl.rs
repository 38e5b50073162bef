// ==========================================
// 资产盘点 - 台账导入器实现
// ==========================================
// 职责: 整合导入流程，从字节流到仓储
// 流程: 读取 → 列推断(一次) → 行规范化 → 记录构建 → 批次校验 → 对账合并
// 状态: 不跨调用保留任何状态（每次调用新建 ImportContext）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{
    AnomalyKind, CandidateRecord, ImportContext, ImportOutcome, ImportReport, RawRow,
    RowDisposition, SourceKind, SourcePreview,
};
use crate::importer::data_cleaner::InventoryRowNormalizer;
use crate::importer::dq_validator::InventoryBatchValidator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{preview, UniversalTabularReader};
use crate::importer::import_trait::{
    BatchValidator, ImportOptions, InventoryImporter, RecordBuilder, RowNormalizer,
    TabularReader,
};
use crate::importer::reconciliation::ReconciliationMerger;
use crate::importer::record_builder::InventoryRecordBuilder;
use crate::importer::schema_inference::SchemaInferencer;
use crate::repository::InventoryRepository;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// 列推断需要的前缀行数（第 0 行 + 两个样本行）
const INFERENCE_PREFIX_ROWS: usize = 3;

/// debug 日志中展示的前几条记录
const LOGGED_RECORDS: usize = 10;

pub const PREVIEW_ROWS: usize = 15;
pub const PREVIEW_COLUMNS: usize = 8;

// ==========================================
// InventoryImporterImpl - 台账导入器实现
// ==========================================
pub struct InventoryImporterImpl<R>
where
    R: InventoryRepository,
{
    // 数据访问层（与扫码路径共享）
    repo: Arc<R>,

    // 导入组件
    reader: Box<dyn TabularReader>,
    inferencer: SchemaInferencer,
    normalizer: Box<dyn RowNormalizer>,
    builder: Box<dyn RecordBuilder>,
    validator: Box<dyn BatchValidator>,
    merger: ReconciliationMerger,
}

impl<R> InventoryImporterImpl<R>
where
    R: InventoryRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<R>,
        reader: Box<dyn TabularReader>,
        inferencer: SchemaInferencer,
        normalizer: Box<dyn RowNormalizer>,
        builder: Box<dyn RecordBuilder>,
        validator: Box<dyn BatchValidator>,
        merger: ReconciliationMerger,
    ) -> Self {
        Self {
            repo,
            reader,
            inferencer,
            normalizer,
            builder,
            validator,
            merger,
        }
    }

    /// 按配置装配标准管道
    pub fn from_config(repo: Arc<R>, config: &ImportConfig) -> Self {
        Self::new(
            repo,
            Box::new(UniversalTabularReader::new(config.delimiter_byte())),
            SchemaInferencer::from_config(config),
            Box::new(InventoryRowNormalizer::from_config(config)),
            Box::new(InventoryRecordBuilder::new(config.imported_comment.clone())),
            Box::new(InventoryBatchValidator::new(config.short_name_min_len)),
            ReconciliationMerger::new(config.merge_chunk_size),
        )
    }

    /// 预览数据源（不访问仓储）
    pub fn inspect(&self, bytes: Vec<u8>, kind: SourceKind) -> ImportResult<SourcePreview> {
        let stream = self.reader.open(bytes, kind)?;
        Ok(preview(stream, kind, PREVIEW_ROWS, PREVIEW_COLUMNS))
    }

    /// 合并前的同步阶段：读取、推断、逐行规范化、构建、校验
    ///
    /// 数据源级错误在此返回，保证零记录合并
    fn prepare_batch(
        &self,
        bytes: Vec<u8>,
        kind: SourceKind,
        context: &ImportContext,
    ) -> ImportResult<(Vec<CandidateRecord>, ImportReport)> {
        // === 步骤 1: 打开数据源 ===
        let mut stream = self.reader.open(bytes, kind)?;

        // === 步骤 2: 列推断（仅一次） ===
        let prefix = stream.peek_rows(INFERENCE_PREFIX_ROWS);
        let header = prefix
            .iter()
            .find(|r| r.index == 0)
            .cloned()
            .unwrap_or_else(|| RawRow::blank(0));
        let samples: Vec<RawRow> = prefix.into_iter().filter(|r| r.index > 0).collect();
        let mapping = self.inferencer.infer(&header, &samples);

        let mut report = ImportReport::new(context.batch_id.clone(), kind, mapping);

        // === 步骤 3: 逐行规范化 + 构建 ===
        let mut batch = Vec::new();
        for row in stream {
            report.rows_seen += 1;

            let disposition = row.and_then(|row| self.normalizer.normalize(&row, &mapping, context));
            match disposition {
                Ok(RowDisposition::Accepted(normalized)) => {
                    report.rows_accepted += 1;
                    let candidate = self.builder.build(normalized);
                    if batch.len() < LOGGED_RECORDS {
                        debug!(
                            row = candidate.row_index,
                            key = %candidate.record.key,
                            name = %candidate.record.display_name,
                            provisional = candidate.record.provisional,
                            "记录已构建"
                        );
                    }
                    batch.push(candidate);
                }
                Ok(RowDisposition::Skipped(reason)) => {
                    report.rows_skipped += 1;
                    debug!(rows_seen = report.rows_seen, reason = ?reason, "行已跳过");
                }
                Err(e) => {
                    report.rows_failed += 1;
                    warn!(row = e.row, error = %e, "行解析失败，已跳过");
                    report.push(AnomalyKind::RowError, Some(e.row), None, e.to_string());
                }
            }
        }
        info!(
            rows_seen = report.rows_seen,
            accepted = report.rows_accepted,
            skipped = report.rows_skipped,
            failed = report.rows_failed,
            "行处理完成"
        );

        // === 步骤 4: 批次校验（只报告） ===
        self.validator.validate(&batch, &mut report);

        Ok((batch, report))
    }

    /// 从字节流导入（主流程）
    #[instrument(skip(self, bytes, options), fields(batch_id))]
    pub async fn import_bytes(
        &self,
        bytes: Vec<u8>,
        kind: SourceKind,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let context = ImportContext::new();
        tracing::Span::current().record("batch_id", context.batch_id.as_str());

        info!(
            batch_id = %context.batch_id,
            source_kind = kind.as_str(),
            bytes = bytes.len(),
            "开始导入台账"
        );

        let (batch, mut report) = self.prepare_batch(bytes, kind, &context).map_err(|e| {
            error!(error = %e, "数据源读取失败，导入中止");
            e
        })?;

        // === 步骤 5: 对账合并 ===
        let merge = self
            .merger
            .merge(self.repo.as_ref(), &batch, &mut report, options.cancel.as_deref())
            .await?;

        let elapsed_time = start_time.elapsed();
        info!(
            batch_id = %context.batch_id,
            merged = merge.merged,
            duplicate_keys = report.duplicate_keys,
            provisional_keys = report.provisional_keys,
            total = merge.stats.total,
            elapsed_ms = elapsed_time.as_millis(),
            "台账导入完成"
        );

        Ok(ImportOutcome {
            merged: merge.merged,
            report,
            stats: merge.stats,
            elapsed_time,
        })
    }
}

#[async_trait]
impl<R> InventoryImporter for InventoryImporterImpl<R>
where
    R: InventoryRepository + Send + Sync,
{
    async fn import_file(&self, file_path: &Path, options: ImportOptions) -> ImportResult<ImportOutcome> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let kind = SourceKind::from_path(file_path);
        let bytes = std::fs::read(file_path)?;
        self.import_bytes(bytes, kind, options).await
    }

    async fn import_from_reader<S: Read + Send + 'static>(
        &self,
        mut source: S,
        kind: SourceKind,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        self.import_bytes(bytes, kind, options).await
    }
}
