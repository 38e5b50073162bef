// ==========================================
// 资产盘点 - 配置层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置存储打开失败: {0}")]
    ConnectionError(String),

    #[error("配置锁获取失败: {0}")]
    LockError(String),

    #[error("配置读取失败 (key: {key}): {message}")]
    ReadError { key: String, message: String },

    #[error("配置写入失败 (key: {key}): {message}")]
    WriteError { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
