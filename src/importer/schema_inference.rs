// ==========================================
// 资产盘点 - 列结构推断
// ==========================================
// 职责: 每次导入运行一次，推断语义字段 → 列位置
// 方式: 有序策略链，每个策略只填充尚未确定的字段，先到先得
// 保证: 返回的映射两个字段均有值
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{ColumnMapping, PartialMapping, RawRow, SemanticField};
use crate::importer::import_trait::InferenceStrategy;
use tracing::{debug, info, warn};

// ==========================================
// HeaderLabelStrategy - 表头标签匹配
// ==========================================
// 扫描第 0 行（忽略大小写）：
// - 先定编号列，再定名称列（"Asset number" 同时包含两类词）
// - 每个字段先找完全相等的单元格，再找包含标签的单元格
pub struct HeaderLabelStrategy {
    name_labels: Vec<String>,
    number_labels: Vec<String>,
}

impl HeaderLabelStrategy {
    pub fn new(name_labels: &[String], number_labels: &[String]) -> Self {
        let lower = |labels: &[String]| {
            labels
                .iter()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect()
        };
        Self {
            name_labels: lower(name_labels),
            number_labels: lower(number_labels),
        }
    }

    fn labels(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::Name => &self.name_labels,
            SemanticField::InventoryNumber => &self.number_labels,
        }
    }

    /// 在未占用的列中查找匹配标签的第一列
    fn find_column(
        header: &[String],
        labels: &[String],
        found: &PartialMapping,
        matcher: fn(&str, &str) -> bool,
    ) -> Option<usize> {
        header.iter().enumerate().find_map(|(column, text)| {
            let hit = !text.is_empty()
                && !found.uses_column(column)
                && labels.iter().any(|label| matcher(text, label));
            hit.then_some(column)
        })
    }
}

const MATCH_ORDER: [SemanticField; 2] = [SemanticField::InventoryNumber, SemanticField::Name];

impl InferenceStrategy for HeaderLabelStrategy {
    fn name(&self) -> &'static str {
        "header_label"
    }

    fn infer(&self, header: &RawRow, _samples: &[RawRow], assigned: &PartialMapping) -> PartialMapping {
        let mut found = *assigned;
        let mut result = PartialMapping::default();
        let texts: Vec<String> = header
            .cells
            .iter()
            .map(|cell| cell.text.trim().to_lowercase())
            .collect();

        for field in MATCH_ORDER {
            if found.is_assigned(field) {
                continue;
            }
            let labels = self.labels(field);
            let column = Self::find_column(&texts, labels, &found, |text, label| text == label)
                .or_else(|| Self::find_column(&texts, labels, &found, |text, label| text.contains(label)));

            if let Some(column) = column {
                found.set(field, column);
                result.set(field, column);
            }
        }

        result
    }
}

// ==========================================
// SampleRowStrategy - 样本行启发式
// ==========================================
// 取第 1 行（为空时取第 2 行）的前 N 列：
// - 长文本（超过阈值）→ 名称
// - 纯数字 → 编号
pub struct SampleRowStrategy {
    scan_columns: usize,
    long_text_threshold: usize,
}

impl SampleRowStrategy {
    pub fn new(scan_columns: usize, long_text_threshold: usize) -> Self {
        Self {
            scan_columns,
            long_text_threshold,
        }
    }

    fn pick_sample<'a>(samples: &'a [RawRow]) -> Option<&'a RawRow> {
        let first = samples.iter().find(|r| r.index == 1);
        match first {
            Some(row) if !row.is_blank() => Some(row),
            _ => samples.iter().find(|r| r.index == 2).filter(|r| !r.is_blank()),
        }
    }
}

fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

impl InferenceStrategy for SampleRowStrategy {
    fn name(&self) -> &'static str {
        "sample_row"
    }

    fn infer(&self, _header: &RawRow, samples: &[RawRow], assigned: &PartialMapping) -> PartialMapping {
        let mut result = PartialMapping::default();
        let Some(sample) = Self::pick_sample(samples) else {
            return result;
        };

        let mut found = *assigned;
        for (column, cell) in sample.cells.iter().enumerate().take(self.scan_columns) {
            if cell.is_blank() || found.uses_column(column) {
                continue;
            }
            let text = cell.text.trim();

            if !found.is_assigned(SemanticField::Name)
                && text.chars().count() > self.long_text_threshold
            {
                found.set(SemanticField::Name, column);
                result.set(SemanticField::Name, column);
            } else if !found.is_assigned(SemanticField::InventoryNumber) && is_all_digits(text) {
                found.set(SemanticField::InventoryNumber, column);
                result.set(SemanticField::InventoryNumber, column);
            }
        }

        result
    }
}

// ==========================================
// LegacyLayoutStrategy - 固定版式兜底
// ==========================================
pub struct LegacyLayoutStrategy {
    layout: ColumnMapping,
}

impl LegacyLayoutStrategy {
    pub fn new(layout: ColumnMapping) -> Self {
        Self { layout }
    }
}

impl InferenceStrategy for LegacyLayoutStrategy {
    fn name(&self) -> &'static str {
        "legacy_layout"
    }

    fn infer(&self, _header: &RawRow, _samples: &[RawRow], _assigned: &PartialMapping) -> PartialMapping {
        PartialMapping {
            name: Some(self.layout.name),
            inventory_number: Some(self.layout.inventory_number),
        }
    }
}

// ==========================================
// SchemaInferencer - 策略链
// ==========================================
pub struct SchemaInferencer {
    strategies: Vec<Box<dyn InferenceStrategy>>,
    fallback: ColumnMapping,
}

impl SchemaInferencer {
    pub fn new(strategies: Vec<Box<dyn InferenceStrategy>>, fallback: ColumnMapping) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    /// 标准策略链: 表头标签 → 样本行 → 固定版式
    pub fn from_config(config: &ImportConfig) -> Self {
        let fallback = config.legacy_layout();
        Self::new(
            vec![
                Box::new(HeaderLabelStrategy::new(&config.name_labels, &config.number_labels)),
                Box::new(SampleRowStrategy::new(
                    config.sample_scan_columns,
                    config.long_text_threshold,
                )),
                Box::new(LegacyLayoutStrategy::new(fallback)),
            ],
            fallback,
        )
    }

    /// 推断列映射
    ///
    /// # 参数
    /// - header: 第 0 行（不存在时传空行）
    /// - samples: 第 1、2 行（可少于两行）
    pub fn infer(&self, header: &RawRow, samples: &[RawRow]) -> ColumnMapping {
        let mut mapping = PartialMapping::default();

        for strategy in &self.strategies {
            if mapping.is_complete() {
                break;
            }
            let partial = strategy.infer(header, samples, &mapping);
            for field in mapping.fill_from(&partial) {
                debug!(
                    strategy = strategy.name(),
                    field = field.as_str(),
                    column = ?mapping.get(field),
                    "列映射已确定"
                );
            }
        }

        let result = ColumnMapping::complete(&mapping, &self.fallback);
        if result.name == result.inventory_number {
            warn!(column = result.name, "名称列与编号列相同");
        }
        info!(
            name_column = result.name,
            number_column = result.inventory_number,
            "列结构推断完成"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::RawCell;

    fn row(index: usize, cells: &[&str]) -> RawRow {
        RawRow::new(index, cells.iter().map(|c| RawCell::text(c)).collect())
    }

    fn inferencer() -> SchemaInferencer {
        SchemaInferencer::from_config(&ImportConfig::default())
    }

    #[test]
    fn test_header_labels_case_insensitive() {
        let header = row(0, &["№", "ОСНОВНОЕ СРЕДСТВО (наименование)", "", "Инвентарный номер"]);
        let mapping = inferencer().infer(&header, &[]);

        assert_eq!(mapping.name, 1);
        assert_eq!(mapping.inventory_number, 3);
    }

    #[test]
    fn test_number_label_wins_over_shared_word() {
        let header = row(0, &["Asset number", "Asset name"]);
        let mapping = inferencer().infer(&header, &[]);

        assert_eq!(mapping.inventory_number, 0);
        assert_eq!(mapping.name, 1);
    }

    #[test]
    fn test_exact_label_preferred_over_substring() {
        // "Name" 完全匹配第 2 列，不被第 0 列的包含匹配抢占
        let header = row(0, &["Name of department", "Inventory number", "Name"]);
        let mapping = inferencer().infer(&header, &[]);

        assert_eq!(mapping.name, 2);
        assert_eq!(mapping.inventory_number, 1);
    }

    #[test]
    fn test_sample_row_fills_missing_field() {
        let header = row(0, &["", "Inventory number"]);
        let sample = row(1, &["", "12345", "Кресло офисное эргономичное черное"]);
        let mapping = inferencer().infer(&header, &[sample]);

        // 编号由表头确定，名称由样本行长文本确定
        assert_eq!(mapping.inventory_number, 1);
        assert_eq!(mapping.name, 2);
    }

    #[test]
    fn test_sample_row_uses_row_two_when_row_one_blank() {
        let header = row(0, &["a", "b", "c"]);
        let samples = vec![
            row(1, &["", "", ""]),
            row(2, &["777", "Стол письменный двухтумбовый", ""]),
        ];
        let mapping = inferencer().infer(&header, &samples);

        assert_eq!(mapping.inventory_number, 0);
        assert_eq!(mapping.name, 1);
    }

    #[test]
    fn test_sample_row_only_scans_first_columns() {
        let header = row(0, &[]);
        let mut cells = vec![""; 9];
        cells[8] = "99999";
        let mapping = inferencer().infer(&header, &[row(1, &cells)]);

        // 第 9 列不参与启发式，回落到固定版式
        assert_eq!(mapping.inventory_number, 7);
        assert_eq!(mapping.name, 0);
    }

    #[test]
    fn test_legacy_layout_when_nothing_found() {
        let mapping = inferencer().infer(&RawRow::blank(0), &[]);
        assert_eq!(mapping, ColumnMapping { name: 0, inventory_number: 7 });
    }

    #[test]
    fn test_strategy_does_not_reuse_assigned_column() {
        let strategy = SampleRowStrategy::new(8, 20);
        let assigned = PartialMapping {
            name: Some(0),
            inventory_number: None,
        };
        let partial = strategy.infer(&RawRow::blank(0), &[row(1, &["123", "456"])], &assigned);

        assert_eq!(partial.inventory_number, Some(1));
        assert_eq!(partial.name, None);
    }
}
