// ==========================================
// 资产盘点 - 记录构建器
// ==========================================
// 职责: 规范化行 → 台账记录（默认盘点状态 + 导入备注）
// ==========================================

use crate::domain::import::{CandidateRecord, NormalizedRow};
use crate::domain::inventory::InventoryRecord;
use crate::importer::import_trait::RecordBuilder;

pub struct InventoryRecordBuilder {
    imported_comment: String,
}

impl InventoryRecordBuilder {
    pub fn new(imported_comment: impl Into<String>) -> Self {
        Self {
            imported_comment: imported_comment.into(),
        }
    }
}

impl RecordBuilder for InventoryRecordBuilder {
    fn build(&self, row: NormalizedRow) -> CandidateRecord {
        // key / raw_tag / 名称由 InventoryRecord::new 统一 trim
        let record = InventoryRecord::new(row.key, row.display_name)
            .with_comment(self.imported_comment.as_str())
            .with_provisional(row.provisional);

        CandidateRecord {
            row_index: row.row_index,
            record,
        }
    }
}
