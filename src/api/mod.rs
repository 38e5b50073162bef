// ==========================================
// 资产盘点 - API 层
// ==========================================
// 职责: 封装业务接口,供 CLI 或宿主应用调用
// 红线: API 层只做参数校验与错误转换,规则在导入层
// ==========================================

pub mod error;
pub mod import_api;
pub mod inventory_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{failure_message, ImportApi, ImportApiResponse};
pub use inventory_api::{ExportResponse, InventoryApi};
