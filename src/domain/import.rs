// ==========================================
// 资产盘点 - 导入领域模型
// ==========================================
// 职责: 导入管道的中间结构（原始行、列映射、候选记录）与诊断报告
// 生命周期: 仅在单次导入流程内，不落库
// ==========================================

use crate::domain::inventory::{InventoryRecord, InventoryStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

// ==========================================
// SourceKind - 数据源类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    DelimitedText, // 分隔符文本（1C 导出，分号分隔，Windows-1251）
    Spreadsheet,   // 电子表格（仅读取第一个工作表）
}

impl SourceKind {
    /// 按扩展名判定数据源类型（非电子表格扩展名一律按分隔符文本处理）
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => SourceKind::Spreadsheet,
            _ => SourceKind::DelimitedText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DelimitedText => "DELIMITED_TEXT",
            SourceKind::Spreadsheet => "SPREADSHEET",
        }
    }
}

// ==========================================
// RawCell / RawRow - 原始单元格与原始行
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    String,
    Number,
    Boolean,
    Date,
    Blank,
    FormulaResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCell {
    pub kind: CellKind,
    pub text: String, // 已渲染的文本值
}

impl RawCell {
    pub fn new(kind: CellKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn blank() -> Self {
        Self::new(CellKind::Blank, "")
    }

    /// 文本单元格，空白文本记为 Blank
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            Self::blank()
        } else {
            Self::new(CellKind::String, value)
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind == CellKind::Blank || self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: usize, // 源文件中的行序号（0 起）
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(index: usize, cells: Vec<RawCell>) -> Self {
        Self { index, cells }
    }

    /// 缺失的行对象按全空行处理
    pub fn blank(index: usize) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// 读取指定列的文本（越界返回空串）
    pub fn cell_text(&self, column: usize) -> &str {
        self.cells.get(column).map(|c| c.text.as_str()).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(RawCell::is_blank)
    }
}

// ==========================================
// SemanticField / ColumnMapping - 语义字段与列映射
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemanticField {
    Name,
    InventoryNumber,
}

impl SemanticField {
    pub const ALL: [SemanticField; 2] = [SemanticField::Name, SemanticField::InventoryNumber];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Name => "name",
            SemanticField::InventoryNumber => "inventoryNumber",
        }
    }
}

/// 推断策略产出的部分映射（未识别的字段为 None）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMapping {
    pub name: Option<usize>,
    pub inventory_number: Option<usize>,
}

impl PartialMapping {
    pub fn get(&self, field: SemanticField) -> Option<usize> {
        match field {
            SemanticField::Name => self.name,
            SemanticField::InventoryNumber => self.inventory_number,
        }
    }

    pub fn set(&mut self, field: SemanticField, column: usize) {
        match field {
            SemanticField::Name => self.name = Some(column),
            SemanticField::InventoryNumber => self.inventory_number = Some(column),
        }
    }

    pub fn is_assigned(&self, field: SemanticField) -> bool {
        self.get(field).is_some()
    }

    pub fn is_complete(&self) -> bool {
        SemanticField::ALL.iter().all(|f| self.is_assigned(*f))
    }

    /// 该列是否已被任一字段占用
    pub fn uses_column(&self, column: usize) -> bool {
        self.name == Some(column) || self.inventory_number == Some(column)
    }

    /// 仅填充尚未赋值的字段，先到先得
    pub fn fill_from(&mut self, other: &PartialMapping) -> Vec<SemanticField> {
        let mut filled = Vec::new();
        for field in SemanticField::ALL {
            if self.is_assigned(field) {
                continue;
            }
            if let Some(column) = other.get(field) {
                self.set(field, column);
                filled.push(field);
            }
        }
        filled
    }
}

/// 完整列映射：两个字段必定有值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: usize,
    pub inventory_number: usize,
}

impl ColumnMapping {
    /// 用兜底映射补齐部分映射
    pub fn complete(partial: &PartialMapping, fallback: &ColumnMapping) -> Self {
        Self {
            name: partial.name.unwrap_or(fallback.name),
            inventory_number: partial.inventory_number.unwrap_or(fallback.inventory_number),
        }
    }
}

// ==========================================
// ImportContext - 单次导入上下文
// ==========================================
// 每次调用新建，调用结束即丢弃（引擎不跨调用保留状态）
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(started_at: DateTime<Utc>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            started_at,
        }
    }
}

impl Default for ImportContext {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// NormalizedRow / CandidateRecord - 行规范化结果与候选记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub row_index: usize,
    pub display_name: String,
    pub key: String,
    pub provisional: bool,
}

/// 行被丢弃的原因（计入 rows_skipped）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    HeaderRow,            // 第 0 行无条件视为表头
    Blank,                // 名称与编号均为空
    HeaderSentinel,       // 名称等于表头哨兵文本
    MergedHeaderArtifact, // 名称为 "1" 且无编号（合并表头残留）
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDisposition {
    Accepted(NormalizedRow),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub row_index: usize,
    pub record: InventoryRecord,
}

// ==========================================
// ImportAnomaly - 导入异常
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyLevel {
    Warning,  // 仅提示，不阻断合并
    RowError, // 单行失败，已跳过
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    DuplicateKey { count: usize, rows: Vec<usize> },
    ProvisionalKey,
    EmptyKey,
    ShortName,
    RowError,
    MergeFailure,
}

impl AnomalyKind {
    pub fn level(&self) -> AnomalyLevel {
        match self {
            AnomalyKind::RowError | AnomalyKind::MergeFailure => AnomalyLevel::RowError,
            _ => AnomalyLevel::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAnomaly {
    pub kind: AnomalyKind,
    pub row_index: Option<usize>,
    pub key: Option<String>,
    pub message: String,
}

// ==========================================
// ImportReport - 导入诊断报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub source_kind: Option<SourceKind>,
    pub mapping: Option<ColumnMapping>,

    // ===== 行级计数 =====
    pub rows_seen: usize,     // 读到的行数（含表头）
    pub rows_accepted: usize, // 产出候选记录的行数
    pub rows_skipped: usize,  // 表头/空行/哨兵/残留行
    pub rows_failed: usize,   // 行级解析失败

    // ===== 批次级计数 =====
    pub duplicate_keys: usize,   // 批内重复出现的不同 key 数
    pub provisional_keys: usize, // 临时编号记录数
    pub short_names: usize,      // 名称过短记录数
    pub merge_failures: usize,   // 合并阶段单行失败数

    pub anomalies: Vec<ImportAnomaly>,
}

impl ImportReport {
    pub fn new(batch_id: impl Into<String>, source_kind: SourceKind, mapping: ColumnMapping) -> Self {
        Self {
            batch_id: batch_id.into(),
            source_kind: Some(source_kind),
            mapping: Some(mapping),
            ..Default::default()
        }
    }

    pub fn push(&mut self, kind: AnomalyKind, row_index: Option<usize>, key: Option<String>, message: String) {
        self.anomalies.push(ImportAnomaly {
            kind,
            row_index,
            key,
            message,
        });
    }

    /// 批内重复 key 及出现次数
    pub fn duplicates(&self) -> Vec<(&str, usize)> {
        self.anomalies
            .iter()
            .filter_map(|a| match (&a.kind, &a.key) {
                (AnomalyKind::DuplicateKey { count, .. }, Some(key)) => Some((key.as_str(), *count)),
                _ => None,
            })
            .collect()
    }

    pub fn duplicate_count(&self, key: &str) -> Option<usize> {
        self.duplicates()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, count)| count)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ImportAnomaly> {
        self.anomalies
            .iter()
            .filter(|a| a.kind.level() == AnomalyLevel::Warning)
    }

    pub fn row_errors(&self) -> impl Iterator<Item = &ImportAnomaly> {
        self.anomalies
            .iter()
            .filter(|a| a.kind.level() == AnomalyLevel::RowError)
    }
}

// ==========================================
// ImportOutcome - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub merged: usize,         // 成功写入仓储的记录数
    pub report: ImportReport,  // 诊断报告
    pub stats: InventoryStats, // 合并后全量重算的统计
    pub elapsed_time: Duration,
}

// ==========================================
// SourcePreview - 数据源预览（排查未知版式）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePreview {
    pub source_kind: SourceKind,
    pub rows: Vec<RawRow>,
    pub truncated: bool,
}
