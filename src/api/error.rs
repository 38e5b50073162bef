// ==========================================
// 资产盘点 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户友好的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("约束违反: {0}")]
    ConstraintViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入导出错误
    // ==========================================
    /// 数据源无法读取或格式无法识别（零记录合并）
    #[error("{0}")]
    SourceError(String),

    #[error("导入已取消: 已提交 {merged} 条")]
    ImportCancelled { merged: usize },

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("导出失败: {0}")]
    ExportError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ConstraintViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ConstraintViolation(msg) => ApiError::ConstraintViolation(msg),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        if err.is_fatal() {
            return ApiError::SourceError(err.to_string());
        }
        match err {
            ImportError::Cancelled { merged } => ApiError::ImportCancelled { merged },
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::Config(e) => ApiError::ConfigError(e.to_string()),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
