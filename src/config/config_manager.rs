// ==========================================
// 资产盘点 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 格式: 列表为 JSON 数组，其余为纯文本
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::import_config::ImportConfig;
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ConfigError::ConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)
                .map_err(|e| ConfigError::ConnectionError(e.to_string()))?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ConfigError::ReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入配置值（scope_id='global'，已存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            "#,
            params![key, value],
        )
        .map_err(|e| ConfigError::WriteError {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// 读取标量配置，缺失或格式错误时使用默认值
    fn get_parsed_or<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 读取正整数配置（0 视为格式错误）
    fn get_positive_or(&self, key: &str, default: usize) -> ConfigResult<usize> {
        let value = self.get_parsed_or(key, default)?;
        if value == 0 {
            warn!(config_key = key, "配置值必须为正整数，使用默认值");
            return Ok(default);
        }
        Ok(value)
    }

    fn get_text_or(&self, key: &str, default: String) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or(default))
    }

    /// 读取列表配置（JSON 数组）
    fn get_list_or(&self, key: &str, default: Vec<String>) -> ConfigResult<Vec<String>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                warn!(
                    config_key = key,
                    raw_value = %raw,
                    error = %e,
                    "列表配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    fn get_delimiter_or(&self, key: &str, default: char) -> ConfigResult<char> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(c),
            _ => {
                warn!(config_key = key, raw_value = %raw, "分隔符必须为单个 ASCII 字符，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn load_import_config(&self) -> ConfigResult<ImportConfig> {
        let d = ImportConfig::default();

        Ok(ImportConfig {
            name_labels: self.get_list_or(config_keys::NAME_LABELS, d.name_labels)?,
            number_labels: self.get_list_or(config_keys::NUMBER_LABELS, d.number_labels)?,
            default_name_column: self
                .get_parsed_or(config_keys::DEFAULT_NAME_COLUMN, d.default_name_column)?,
            default_number_column: self
                .get_parsed_or(config_keys::DEFAULT_NUMBER_COLUMN, d.default_number_column)?,
            sample_scan_columns: self
                .get_parsed_or(config_keys::SAMPLE_SCAN_COLUMNS, d.sample_scan_columns)?,
            long_text_threshold: self
                .get_parsed_or(config_keys::LONG_TEXT_THRESHOLD, d.long_text_threshold)?,
            header_sentinel: self.get_text_or(config_keys::HEADER_SENTINEL, d.header_sentinel)?,
            placeholder_numbers: self
                .get_list_or(config_keys::PLACEHOLDER_NUMBERS, d.placeholder_numbers)?,
            provisional_prefix: self
                .get_text_or(config_keys::PROVISIONAL_PREFIX, d.provisional_prefix)?,
            synthesized_name_prefix: self.get_text_or(
                config_keys::SYNTHESIZED_NAME_PREFIX,
                d.synthesized_name_prefix,
            )?,
            imported_comment: self.get_text_or(config_keys::IMPORTED_COMMENT, d.imported_comment)?,
            short_name_min_len: self
                .get_parsed_or(config_keys::SHORT_NAME_MIN_LEN, d.short_name_min_len)?,
            csv_delimiter: self.get_delimiter_or(config_keys::CSV_DELIMITER, d.csv_delimiter)?,
            merge_chunk_size: self
                .get_positive_or(config_keys::MERGE_CHUNK_SIZE, d.merge_chunk_size)?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 列推断
    pub const NAME_LABELS: &str = "import.name_labels";
    pub const NUMBER_LABELS: &str = "import.number_labels";
    pub const DEFAULT_NAME_COLUMN: &str = "import.default_name_column";
    pub const DEFAULT_NUMBER_COLUMN: &str = "import.default_number_column";
    pub const SAMPLE_SCAN_COLUMNS: &str = "import.sample_scan_columns";
    pub const LONG_TEXT_THRESHOLD: &str = "import.long_text_threshold";

    // 行规范化
    pub const HEADER_SENTINEL: &str = "import.header_sentinel";
    pub const PLACEHOLDER_NUMBERS: &str = "import.placeholder_numbers";
    pub const PROVISIONAL_PREFIX: &str = "import.provisional_prefix";
    pub const SYNTHESIZED_NAME_PREFIX: &str = "import.synthesized_name_prefix";

    // 记录构建与校验
    pub const IMPORTED_COMMENT: &str = "import.imported_comment";
    pub const SHORT_NAME_MIN_LEN: &str = "import.short_name_min_len";

    // 读取与合并
    pub const CSV_DELIMITER: &str = "import.csv_delimiter";
    pub const MERGE_CHUNK_SIZE: &str = "import.merge_chunk_size";
}
