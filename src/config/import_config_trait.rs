// ==========================================
// 资产盘点 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use crate::config::import_config::ImportConfig;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）, DefaultImportConfig
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 读取完整导入配置
    ///
    /// # 返回
    /// - 缺失或格式错误的配置项使用默认值
    async fn load_import_config(&self) -> ConfigResult<ImportConfig>;
}

/// 仅返回默认值的配置读取器
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImportConfig;

#[async_trait]
impl ImportConfigReader for DefaultImportConfig {
    async fn load_import_config(&self) -> ConfigResult<ImportConfig> {
        Ok(ImportConfig::default())
    }
}
