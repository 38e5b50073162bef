// ==========================================
// 资产盘点 - 导入配置
// ==========================================
// 默认值对齐 1C 导出的固定版式（名称在第 1 列，编号在第 8 列）
// ==========================================

use crate::domain::import::ColumnMapping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    // ===== 列推断 =====
    pub name_labels: Vec<String>,
    pub number_labels: Vec<String>,
    pub default_name_column: usize,
    pub default_number_column: usize,
    pub sample_scan_columns: usize,
    pub long_text_threshold: usize,

    // ===== 行规范化 =====
    pub header_sentinel: String,
    pub placeholder_numbers: Vec<String>,
    pub provisional_prefix: String,
    pub synthesized_name_prefix: String,

    // ===== 记录构建与校验 =====
    pub imported_comment: String,
    pub short_name_min_len: usize,

    // ===== 读取与合并 =====
    pub csv_delimiter: char,
    pub merge_chunk_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            name_labels: vec![
                "Основное средство".to_string(),
                "Наименование".to_string(),
                "Name".to_string(),
                "Asset name".to_string(),
            ],
            number_labels: vec![
                "Инвентарный номер".to_string(),
                "Inventory number".to_string(),
                "Inventory No".to_string(),
                "Asset number".to_string(),
            ],
            default_name_column: 0,
            default_number_column: 7,
            sample_scan_columns: 8,
            long_text_threshold: 20,
            header_sentinel: "Основное средство".to_string(),
            placeholder_numbers: vec!["0".to_string(), "1".to_string()],
            provisional_prefix: "TEMP_".to_string(),
            synthesized_name_prefix: "Item No. ".to_string(),
            imported_comment: "Imported".to_string(),
            short_name_min_len: 2,
            csv_delimiter: ';',
            merge_chunk_size: 500,
        }
    }
}

impl ImportConfig {
    /// 固定版式兜底映射
    pub fn legacy_layout(&self) -> ColumnMapping {
        ColumnMapping {
            name: self.default_name_column,
            inventory_number: self.default_number_column,
        }
    }

    /// 分隔符字节（非 ASCII 时回退为分号）
    pub fn delimiter_byte(&self) -> u8 {
        if self.csv_delimiter.is_ascii() {
            self.csv_delimiter as u8
        } else {
            b';'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_layout() {
        let config = ImportConfig::default();
        assert_eq!(
            config.legacy_layout(),
            ColumnMapping {
                name: 0,
                inventory_number: 7
            }
        );
        assert_eq!(config.delimiter_byte(), b';');
        assert!(config.name_labels.contains(&config.header_sentinel));
    }

    #[test]
    fn test_non_ascii_delimiter_falls_back() {
        let config = ImportConfig {
            csv_delimiter: '¦',
            ..Default::default()
        };
        assert_eq!(config.delimiter_byte(), b';');
    }
}
