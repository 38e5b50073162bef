// ==========================================
// 资产盘点 - 导入层
// ==========================================
// 职责: 无固定 schema 的台账导入与对账
// 支持: 分隔符文本（1C 导出）, 电子表格
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod file_parser;
pub mod import_trait;
pub mod inventory_importer_impl;
pub mod reconciliation;
pub mod record_builder;
pub mod schema_inference;

// 重导出核心类型
pub use data_cleaner::{clean_inventory_number, InventoryRowNormalizer, PlaceholderDenylist};
pub use dq_validator::InventoryBatchValidator;
pub use error::{ImportError, ImportResult, RowError, RowErrorKind};
pub use file_parser::{
    DelimitedTextReader, RowStream, SpreadsheetReader, UniversalTabularReader,
};
pub use inventory_importer_impl::InventoryImporterImpl;
pub use reconciliation::{recount, MergeOutcome, ReconciliationMerger};
pub use record_builder::InventoryRecordBuilder;
pub use schema_inference::{
    HeaderLabelStrategy, LegacyLayoutStrategy, SampleRowStrategy, SchemaInferencer,
};

// 重导出 Trait 接口
pub use import_trait::{
    BatchValidator, ImportOptions, InferenceStrategy, InventoryImporter, RecordBuilder,
    RowNormalizer, TabularReader,
};
