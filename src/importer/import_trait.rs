// ==========================================
// 资产盘点 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 读取 → 列推断(一次) → 行规范化(逐行) → 记录构建 → 批次校验 → 对账合并
// ==========================================

use crate::domain::import::{
    CandidateRecord, ColumnMapping, ImportContext, ImportOutcome, ImportReport, NormalizedRow,
    PartialMapping, RawRow, RowDisposition, SourceKind,
};
use crate::importer::error::{ImportResult, RowError};
use crate::importer::file_parser::RowStream;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

// ==========================================
// ImportOptions - 单次导入的调用方选项
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// 共享取消标志，合并器在分块事务之间检查
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ImportOptions {
    pub fn with_cancel(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

// ==========================================
// InventoryImporter Trait
// ==========================================
// 用途: 台账导入主接口
// 实现者: InventoryImporterImpl
#[async_trait]
pub trait InventoryImporter: Send + Sync {
    /// 从文件导入（按扩展名判定数据源类型）
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 合并数量 + 诊断报告 + 重算统计
    /// - Err: 数据源错误（零记录合并）、仓储错误、取消
    async fn import_file(&self, file_path: &Path, options: ImportOptions)
        -> ImportResult<ImportOutcome>;

    /// 从任意字节流导入（调用方声明数据源类型）
    async fn import_from_reader<S: Read + Send + 'static>(
        &self,
        source: S,
        kind: SourceKind,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome>;
}

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 将字节流抽象为统一的惰性行序列
// 实现者: DelimitedTextReader, SpreadsheetReader, UniversalTabularReader
pub trait TabularReader: Send + Sync {
    /// 打开数据源
    ///
    /// # 返回
    /// - Ok(RowStream): 惰性、单遍的行序列
    /// - Err: Io / Format / UnsupportedSource（致命）
    fn open(&self, bytes: Vec<u8>, kind: SourceKind) -> ImportResult<RowStream>;
}

// ==========================================
// InferenceStrategy Trait
// ==========================================
// 用途: 列推断策略（责任链中的一环）
// 实现者: HeaderLabelStrategy, SampleRowStrategy, LegacyLayoutStrategy
pub trait InferenceStrategy: Send + Sync {
    /// 策略名称（用于日志）
    fn name(&self) -> &'static str;

    /// 产出部分映射
    ///
    /// # 参数
    /// - header: 第 0 行
    /// - samples: 表头之后的样本行（第 1 行起）
    /// - assigned: 前序策略已确定的映射（本策略不得复用其中的列）
    fn infer(&self, header: &RawRow, samples: &[RawRow], assigned: &PartialMapping)
        -> PartialMapping;
}

// ==========================================
// RowNormalizer Trait
// ==========================================
// 用途: 逐行抽取、清洗、合成字段
// 实现者: InventoryRowNormalizer
pub trait RowNormalizer: Send + Sync {
    /// # 返回
    /// - Ok(Accepted): 产出一条规范化行
    /// - Ok(Skipped): 按规则丢弃（表头/空行/哨兵/残留）
    /// - Err(RowError): 行级解析失败
    fn normalize(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        context: &ImportContext,
    ) -> Result<RowDisposition, RowError>;
}

// ==========================================
// RecordBuilder Trait
// ==========================================
pub trait RecordBuilder: Send + Sync {
    fn build(&self, row: NormalizedRow) -> CandidateRecord;
}

// ==========================================
// BatchValidator Trait
// ==========================================
// 用途: 批次级异常检测；只报告，不去重、不修改批次
pub trait BatchValidator: Send + Sync {
    fn validate(&self, batch: &[CandidateRecord], report: &mut ImportReport);
}
