// ==========================================
// 资产盘点 - 对账合并器
// ==========================================
// 职责: 将校验后的批次按 key 写入仓储，并全量重算统计
// 策略: 后写覆盖（已有记录整条替换，扫码状态随之重置）
// 失败: 单行失败隔离继续；分块事务之间检查取消标志，已提交分块不回滚
// ==========================================

use crate::domain::import::{AnomalyKind, CandidateRecord, ImportReport};
use crate::domain::inventory::{InventoryRecord, InventoryStats};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{InventoryRepository, RepositoryResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// 全量重算统计（不做增量累加）
pub async fn recount<R>(repo: &R) -> RepositoryResult<InventoryStats>
where
    R: InventoryRepository + ?Sized,
{
    let total = repo.count_total().await?;
    let scanned = repo.count_by_scanned(true).await?;
    Ok(InventoryStats::from_counts(total, scanned))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: usize,
    pub stats: InventoryStats,
}

pub struct ReconciliationMerger {
    chunk_size: usize,
}

impl ReconciliationMerger {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// 合并批次
    ///
    /// # 返回
    /// - Ok(MergeOutcome): 成功写入条数 + 重算统计
    /// - Err(Cancelled): 取消时已提交的条数
    /// - Err(Repository): 重算统计失败
    pub async fn merge<R>(
        &self,
        repo: &R,
        batch: &[CandidateRecord],
        report: &mut ImportReport,
        cancel: Option<&AtomicBool>,
    ) -> ImportResult<MergeOutcome>
    where
        R: InventoryRepository + ?Sized,
    {
        let mut merged = 0;

        for (chunk_no, chunk) in batch.chunks(self.chunk_size).enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                warn!(merged, chunk_no, "导入已取消，已提交分块保留");
                return Err(ImportError::Cancelled { merged });
            }

            let records: Vec<InventoryRecord> = chunk.iter().map(|c| c.record.clone()).collect();
            match repo.upsert_many(&records).await {
                Ok(outcome) => {
                    merged += outcome.merged;
                    for failure in outcome.failures {
                        let row_index = chunk.get(failure.position).map(|c| c.row_index);
                        Self::record_failure(report, row_index, failure.key, failure.message);
                    }
                }
                Err(e) => {
                    // 整块事务失败：该块全部计为失败，继续后续分块
                    warn!(chunk_no, size = chunk.len(), error = %e, "分块写入失败");
                    for candidate in chunk {
                        Self::record_failure(
                            report,
                            Some(candidate.row_index),
                            candidate.record.key.clone(),
                            e.to_string(),
                        );
                    }
                }
            }
            debug!(chunk_no, merged, "分块写入完成");
        }

        let stats = recount(repo).await?;
        info!(
            merged,
            merge_failures = report.merge_failures,
            total = stats.total,
            scanned = stats.scanned,
            remaining = stats.remaining,
            "对账合并完成"
        );

        Ok(MergeOutcome { merged, stats })
    }

    fn record_failure(report: &mut ImportReport, row_index: Option<usize>, key: String, message: String) {
        report.merge_failures += 1;
        report.push(
            AnomalyKind::MergeFailure,
            row_index,
            Some(key.clone()),
            format!("写入失败 ({}): {}", key, message),
        );
    }
}
