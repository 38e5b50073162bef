// ==========================================
// 资产盘点 - 行规范化器实现
// ==========================================
// 职责: 逐行抽取名称/编号，清洗编号，按规则丢弃或合成字段
// 规则: 第 0 行为表头；空行、表头哨兵、合并表头残留均丢弃
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{
    ColumnMapping, ImportContext, NormalizedRow, RawRow, RowDisposition, SkipReason,
};
use crate::importer::error::{RowError, RowErrorKind};
use crate::importer::import_trait::RowNormalizer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// 科学计数法（允许小数逗号），如 "1,11E+12"
static SCIENTIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:[.,]\d+)?[eE][+-]?\d+$").expect("valid regex"));

/// 合并表头在名称列留下的残留值
const MERGED_HEADER_NAME: &str = "1";

// ==========================================
// PlaceholderDenylist - 占位编号黑名单
// ==========================================
// 清洗后恰为黑名单中的值，视为无编号
#[derive(Debug, Clone)]
pub struct PlaceholderDenylist {
    values: HashSet<String>,
}

impl PlaceholderDenylist {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_placeholder(&self, value: &str) -> bool {
        self.values.contains(value)
    }
}

impl Default for PlaceholderDenylist {
    fn default() -> Self {
        Self::new(["0", "1"])
    }
}

// ==========================================
// 编号清洗
// ==========================================

/// 去除空白（含不间断空格）与引号类字符
fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}' && *c != '"' && *c != '\'')
        .collect()
}

/// 清洗资产编号
///
/// # 规则
/// - 科学计数法: 小数逗号换成小数点，按浮点解析后输出不带小数与分组的整数串
/// - 其他: 仅保留数字与开头的负号（千分位、空白、引号一并去除）
/// - 结果命中占位黑名单时返回空串
///
/// # 返回
/// - Err(NumberOutOfRange): 科学计数法数值溢出
pub fn clean_inventory_number(
    raw: &str,
    row: usize,
    denylist: &PlaceholderDenylist,
) -> Result<String, RowError> {
    let compacted = compact(raw);
    if compacted.is_empty() {
        return Ok(String::new());
    }

    let cleaned = if SCIENTIFIC.is_match(&compacted) {
        let value: f64 = compacted.replace(',', ".").parse().map_err(|e| {
            RowError::new(row, RowErrorKind::NumberOutOfRange, format!("{}: {}", raw, e))
        })?;
        if !value.is_finite() {
            return Err(RowError::new(
                row,
                RowErrorKind::NumberOutOfRange,
                format!("编号超出数值范围: {}", raw),
            ));
        }
        format!("{:.0}", value)
    } else {
        let negative = compacted.starts_with('-');
        let digits: String = compacted.chars().filter(char::is_ascii_digit).collect();
        if negative && !digits.is_empty() {
            format!("-{}", digits)
        } else {
            digits
        }
    };

    if denylist.is_placeholder(&cleaned) {
        return Ok(String::new());
    }
    Ok(cleaned)
}

// ==========================================
// InventoryRowNormalizer - 行规范化器
// ==========================================
pub struct InventoryRowNormalizer {
    header_sentinel: String,
    denylist: PlaceholderDenylist,
    provisional_prefix: String,
    synthesized_name_prefix: String,
}

impl InventoryRowNormalizer {
    pub fn new(
        header_sentinel: impl Into<String>,
        denylist: PlaceholderDenylist,
        provisional_prefix: impl Into<String>,
        synthesized_name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            header_sentinel: header_sentinel.into(),
            denylist,
            provisional_prefix: provisional_prefix.into(),
            synthesized_name_prefix: synthesized_name_prefix.into(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            config.header_sentinel.clone(),
            PlaceholderDenylist::new(config.placeholder_numbers.iter().cloned()),
            config.provisional_prefix.clone(),
            config.synthesized_name_prefix.clone(),
        )
    }

    /// 临时编号: 前缀 + 导入开始时间戳(ms) + 行序号，批内唯一
    fn provisional_key(&self, context: &ImportContext, row_index: usize) -> String {
        format!(
            "{}{}_{}",
            self.provisional_prefix,
            context.started_at.timestamp_millis(),
            row_index
        )
    }
}

impl RowNormalizer for InventoryRowNormalizer {
    fn normalize(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        context: &ImportContext,
    ) -> Result<RowDisposition, RowError> {
        if row.index == 0 {
            return Ok(RowDisposition::Skipped(SkipReason::HeaderRow));
        }

        let name = row.cell_text(mapping.name).trim();
        let raw_number = row.cell_text(mapping.inventory_number).trim();

        if name.is_empty() && raw_number.is_empty() {
            return Ok(RowDisposition::Skipped(SkipReason::Blank));
        }
        if name == self.header_sentinel {
            return Ok(RowDisposition::Skipped(SkipReason::HeaderSentinel));
        }
        if name == MERGED_HEADER_NAME && raw_number.is_empty() {
            return Ok(RowDisposition::Skipped(SkipReason::MergedHeaderArtifact));
        }

        let cleaned = clean_inventory_number(raw_number, row.index, &self.denylist)?;
        let name_is_artifact = name == MERGED_HEADER_NAME;

        // 编号清洗后为空且无名称：不足以成行
        if cleaned.is_empty() && name.is_empty() {
            return Ok(RowDisposition::Skipped(SkipReason::Blank));
        }

        let (key, provisional) = if cleaned.is_empty() {
            (self.provisional_key(context, row.index), true)
        } else {
            (cleaned, false)
        };

        let display_name = if name.is_empty() || name_is_artifact {
            format!("{}{}", self.synthesized_name_prefix, key)
        } else {
            name.to_string()
        };

        Ok(RowDisposition::Accepted(NormalizedRow {
            row_index: row.index,
            display_name,
            key,
            provisional,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::RawCell;
    use chrono::{TimeZone, Utc};

    const MAPPING: ColumnMapping = ColumnMapping {
        name: 0,
        inventory_number: 1,
    };

    fn normalizer() -> InventoryRowNormalizer {
        InventoryRowNormalizer::from_config(&ImportConfig::default())
    }

    fn context() -> ImportContext {
        ImportContext::at(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    fn row(index: usize, name: &str, number: &str) -> RawRow {
        RawRow::new(index, vec![RawCell::text(name), RawCell::text(number)])
    }

    fn accepted(index: usize, name: &str, number: &str) -> NormalizedRow {
        match normalizer().normalize(&row(index, name, number), &MAPPING, &context()) {
            Ok(RowDisposition::Accepted(row)) => row,
            other => panic!("expected accepted row, got {:?}", other),
        }
    }

    fn skipped(index: usize, name: &str, number: &str) -> SkipReason {
        match normalizer().normalize(&row(index, name, number), &MAPPING, &context()) {
            Ok(RowDisposition::Skipped(reason)) => reason,
            other => panic!("expected skipped row, got {:?}", other),
        }
    }

    fn clean(raw: &str) -> String {
        clean_inventory_number(raw, 1, &PlaceholderDenylist::default()).unwrap()
    }

    #[test]
    fn test_clean_scientific_notation() {
        assert_eq!(clean("1,11E+12"), "1110000000000");
        assert_eq!(clean("1.5e3"), "1500");
        assert_eq!(clean(" 2,5E+2 "), "250");
    }

    #[test]
    fn test_clean_strips_separators_and_quotes() {
        assert_eq!(clean("1 234 567"), "1234567");
        assert_eq!(clean("1\u{00A0}234"), "1234");
        assert_eq!(clean("\"004510\""), "004510");
        assert_eq!(clean("'4510"), "4510");
        assert_eq!(clean("12,345"), "12345");
        assert_eq!(clean("ИНВ-00077"), "00077");
        assert_eq!(clean("-42"), "-42");
    }

    #[test]
    fn test_clean_placeholder_denylist() {
        assert_eq!(clean("0"), "");
        assert_eq!(clean("1"), "");
        assert_eq!(clean(" 1 "), "");
        assert_eq!(clean("10"), "10");
    }

    #[test]
    fn test_clean_overflow_is_row_error() {
        let err = clean_inventory_number("1E+400", 9, &PlaceholderDenylist::default()).unwrap_err();
        assert_eq!(err.kind, RowErrorKind::NumberOutOfRange);
        assert_eq!(err.row, 9);
    }

    #[test]
    fn test_row_zero_always_skipped() {
        assert_eq!(skipped(0, "Стол", "12345"), SkipReason::HeaderRow);
    }

    #[test]
    fn test_drop_rules() {
        assert_eq!(skipped(3, "", ""), SkipReason::Blank);
        assert_eq!(skipped(3, "  ", " "), SkipReason::Blank);
        assert_eq!(skipped(3, "Основное средство", "Инвентарный номер"), SkipReason::HeaderSentinel);
        assert_eq!(skipped(3, "1", ""), SkipReason::MergedHeaderArtifact);
        assert_eq!(skipped(3, "", "1"), SkipReason::Blank);
    }

    #[test]
    fn test_artifact_name_with_placeholder_number_gets_provisional_key() {
        let row = accepted(3, "1", "0");
        assert_eq!(row.key, "TEMP_1700000000000_3");
        assert_eq!(row.display_name, "Item No. TEMP_1700000000000_3");
        assert!(row.provisional);
    }

    #[test]
    fn test_numeric_number_kept_verbatim() {
        let row = accepted(4, "Стол письменный", "000123");
        assert_eq!(row.key, "000123");
        assert_eq!(row.display_name, "Стол письменный");
        assert!(!row.provisional);
    }

    #[test]
    fn test_provisional_key_when_number_missing() {
        let row = accepted(5, "Шкаф", "");
        assert_eq!(row.key, "TEMP_1700000000000_5");
        assert!(row.provisional);

        let placeholder = accepted(6, "Шкаф", "0");
        assert_eq!(placeholder.key, "TEMP_1700000000000_6");
        assert_ne!(row.key, placeholder.key);
    }

    #[test]
    fn test_synthesized_name() {
        assert_eq!(accepted(7, "", "4510").display_name, "Item No. 4510");
        // 名称为 "1" 视为合并表头残留，按空名称处理
        assert_eq!(accepted(8, "1", "4511").display_name, "Item No. 4511");
    }
}
