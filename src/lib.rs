// ==========================================
// 资产盘点 - 核心库
// ==========================================
// 系统定位: 台账导入与对账引擎
// 技术栈: Rust + SQLite
// 数据源: 1C 导出的分隔符文本、电子表格
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与导入中间结构
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 读取、推断、规范化、校验、对账
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    ImportOutcome, ImportReport, InventoryRecord, InventoryStats, ScanOutcome, SourceKind,
};

// 导入
pub use importer::{ImportError, ImportOptions, InventoryImporter, InventoryImporterImpl};

// 仓储
pub use repository::{InventoryRepository, InventoryRepositoryImpl};

// API
pub use api::{ImportApi, InventoryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "inventory-recon";
