// ==========================================
// 资产盘点 - 导入模块错误类型
// ==========================================
// 致命错误: ImportError（中止导入，零记录合并）
// 行级错误: RowError（跳过该行，计入报告，继续处理）
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 数据源错误（致命） =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("数据源读取失败: {0}")]
    Io(String),

    #[error("数据源格式无法识别或已损坏: {0}")]
    Format(String),

    #[error("数据源类型不支持: {0}")]
    UnsupportedSource(String),

    // ===== 下游错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // ===== 取消 =====
    #[error("导入已取消（已提交 {merged} 条）")]
    Cancelled { merged: usize },
}

impl ImportError {
    /// 数据源级错误：发生在合并之前，保证零记录合并
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::Io(_)
                | ImportError::Format(_)
                | ImportError::UnsupportedSource(_)
        )
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::Io(err.to_string()),
        }
    }
}

// 容器级 CSV 错误（行级错误走 RowError）
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            ImportError::Io(err.to_string())
        } else {
            ImportError::Format(err.to_string())
        }
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        match err {
            calamine::Error::Io(e) => ImportError::Io(e.to_string()),
            other => ImportError::Format(other.to_string()),
        }
    }
}

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowErrorKind {
    Malformed,        // 行结构无法解析
    NumberOutOfRange, // 科学计数法溢出/非有限值
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("第 {row} 行解析失败 ({kind:?}): {message}")]
pub struct RowError {
    pub row: usize,
    pub kind: RowErrorKind,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, kind: RowErrorKind, message: impl Into<String>) -> Self {
        Self {
            row,
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(row: usize, err: &csv::Error) -> Self {
        Self::new(row, RowErrorKind::Malformed, err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err: ImportError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert!(matches!(err, ImportError::FileNotFound(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cancelled_is_not_fatal() {
        let err = ImportError::Cancelled { merged: 10 };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_row_error_display() {
        let err = RowError::new(5, RowErrorKind::NumberOutOfRange, "1E+400");
        let text = err.to_string();
        assert!(text.contains('5'));
        assert!(text.contains("1E+400"));
    }
}
