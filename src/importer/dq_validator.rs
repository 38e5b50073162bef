// ==========================================
// 资产盘点 - 批次校验器实现
// ==========================================
// 职责: 批次级异常检测（空编号/临时编号、批内重复、名称过短）
// 红线: 只报告，不去重、不修改批次、不阻断合并
// ==========================================

use crate::domain::import::{AnomalyKind, CandidateRecord, ImportReport};
use crate::importer::import_trait::BatchValidator;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

const PROVISIONAL_LOG_LIMIT: usize = 5;

pub struct InventoryBatchValidator {
    short_name_min_len: usize,
}

impl InventoryBatchValidator {
    pub fn new(short_name_min_len: usize) -> Self {
        Self { short_name_min_len }
    }

    /// 空编号 / 临时编号
    fn check_keys(&self, batch: &[CandidateRecord], report: &mut ImportReport) {
        for candidate in batch {
            let record = &candidate.record;
            if record.key.trim().is_empty() {
                report.push(
                    AnomalyKind::EmptyKey,
                    Some(candidate.row_index),
                    None,
                    format!("第 {} 行编号为空", candidate.row_index),
                );
            } else if record.provisional {
                report.provisional_keys += 1;
                if report.provisional_keys <= PROVISIONAL_LOG_LIMIT {
                    debug!(row = candidate.row_index, key = %record.key, name = %record.display_name, "临时编号");
                }
                report.push(
                    AnomalyKind::ProvisionalKey,
                    Some(candidate.row_index),
                    Some(record.key.clone()),
                    format!("第 {} 行缺少资产编号，已分配临时编号", candidate.row_index),
                );
            }
        }
    }

    /// 批内重复：每个重复 key 报告一次（含出现次数与行号）
    fn check_duplicates(&self, batch: &[CandidateRecord], report: &mut ImportReport) {
        let mut occurrences: HashMap<&str, Vec<usize>> = HashMap::new();
        for candidate in batch {
            occurrences
                .entry(candidate.record.key.as_str())
                .or_default()
                .push(candidate.row_index);
        }

        let mut reported = HashSet::new();
        for candidate in batch {
            let key = candidate.record.key.as_str();
            let Some(rows) = occurrences.get(key) else {
                continue;
            };
            if rows.len() < 2 || !reported.insert(key) {
                continue;
            }

            warn!(key = %key, count = rows.len(), rows = ?rows, "批内编号重复");
            report.duplicate_keys += 1;
            report.push(
                AnomalyKind::DuplicateKey {
                    count: rows.len(),
                    rows: rows.clone(),
                },
                rows.first().copied(),
                Some(key.to_string()),
                format!("编号 {} 在批次内出现 {} 次", key, rows.len()),
            );
        }
    }

    /// 名称过短
    fn check_names(&self, batch: &[CandidateRecord], report: &mut ImportReport) {
        for candidate in batch {
            let name = &candidate.record.display_name;
            if name.chars().count() < self.short_name_min_len {
                report.short_names += 1;
                report.push(
                    AnomalyKind::ShortName,
                    Some(candidate.row_index),
                    Some(candidate.record.key.clone()),
                    format!("名称过短: '{}'", name),
                );
            }
        }
    }
}

impl Default for InventoryBatchValidator {
    fn default() -> Self {
        Self::new(2)
    }
}

impl BatchValidator for InventoryBatchValidator {
    fn validate(&self, batch: &[CandidateRecord], report: &mut ImportReport) {
        self.check_keys(batch, report);
        self.check_duplicates(batch, report);
        self.check_names(batch, report);

        debug!(
            batch_size = batch.len(),
            duplicate_keys = report.duplicate_keys,
            provisional_keys = report.provisional_keys,
            short_names = report.short_names,
            "批次校验完成"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::InventoryRecord;

    fn candidate(row: usize, key: &str, name: &str) -> CandidateRecord {
        CandidateRecord {
            row_index: row,
            record: InventoryRecord::new(key, name),
        }
    }

    #[test]
    fn test_duplicates_reported_with_count_and_passed_through() {
        let batch = vec![
            candidate(1, "100", "Стол"),
            candidate(2, "200", "Стул"),
            candidate(3, "100", "Стол новый"),
        ];
        let mut report = ImportReport::default();

        InventoryBatchValidator::default().validate(&batch, &mut report);

        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(report.duplicate_count("100"), Some(2));
        assert_eq!(report.duplicate_count("200"), None);
        // 校验器不修改批次
        assert_eq!(batch.len(), 3);

        let anomaly = report
            .anomalies
            .iter()
            .find(|a| matches!(a.kind, AnomalyKind::DuplicateKey { .. }))
            .unwrap();
        assert_eq!(
            anomaly.kind,
            AnomalyKind::DuplicateKey {
                count: 2,
                rows: vec![1, 3]
            }
        );
    }

    #[test]
    fn test_triple_duplicate_reported_once() {
        let batch = vec![
            candidate(1, "7", "Стол"),
            candidate(2, "7", "Стол"),
            candidate(3, "7", "Стол"),
        ];
        let mut report = ImportReport::default();

        InventoryBatchValidator::default().validate(&batch, &mut report);

        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(report.duplicate_count("7"), Some(3));
    }

    #[test]
    fn test_provisional_and_short_names() {
        let batch = vec![
            CandidateRecord {
                row_index: 1,
                record: InventoryRecord::new("TEMP_1_1", "Шкаф").with_provisional(true),
            },
            candidate(2, "300", "Я"),
            candidate(3, "", "Пустой"),
        ];
        let mut report = ImportReport::default();

        InventoryBatchValidator::default().validate(&batch, &mut report);

        assert_eq!(report.provisional_keys, 1);
        assert_eq!(report.short_names, 1);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::EmptyKey && a.row_index == Some(3)));
        assert_eq!(report.row_errors().count(), 0);
    }
}
