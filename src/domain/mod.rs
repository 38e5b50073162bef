// ==========================================
// 资产盘点 - 领域模型层
// ==========================================
// 职责: 定义领域实体、导入中间结构、诊断报告
// 红线: 不含数据访问逻辑,不含导入规则
// ==========================================

pub mod import;
pub mod inventory;

// 重导出核心类型
pub use import::{
    AnomalyKind, AnomalyLevel, CandidateRecord, CellKind, ColumnMapping, ImportAnomaly,
    ImportContext, ImportOutcome, ImportReport, NormalizedRow, PartialMapping, RawCell, RawRow,
    RowDisposition, SemanticField, SkipReason, SourceKind, SourcePreview,
};
pub use inventory::{InventoryRecord, InventoryStats, ScanOutcome};
