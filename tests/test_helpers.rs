// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、1C 风格 CSV、电子表格夹具
// ==========================================
#![allow(dead_code)]

use encoding_rs::WINDOWS_1251;
use inventory_recon::config::ConfigManager;
use inventory_recon::db::open_sqlite_connection;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    // 打开连接即初始化 schema
    open_sqlite_connection(&db_path)?;

    Ok((temp_file, db_path))
}

/// 写入 global scope 配置覆写
pub fn insert_test_config(db_path: &str, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let config = ConfigManager::new(db_path)?;
    config.set_config_value(key, value)?;
    Ok(())
}

/// 以 Windows-1251 编码写出分隔符文本（模拟 1C 导出）
pub fn write_cp1251_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let (bytes, _, had_errors) = WINDOWS_1251.encode(content);
    assert!(!had_errors, "fixture must be representable in cp1251");
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();
    file
}

/// 1C 旧版式的一行：名称在第 1 列，编号在第 8 列
pub fn legacy_line(name: &str, number: &str) -> String {
    format!("{};;;;;;;{}\n", name, number)
}

/// 1C 旧版式表头
pub fn legacy_header() -> String {
    legacy_line("Основное средство", "Инвентарный номер")
}

/// 生成 xlsx 夹具（第一个工作表）
pub fn write_xlsx<F>(fill: F) -> NamedTempFile
where
    F: FnOnce(&mut Worksheet) -> Result<(), XlsxError>,
{
    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill(worksheet).unwrap();
    workbook.save(file.path()).unwrap();
    file
}

/// 写出内容损坏的 xlsx 文件
pub fn write_corrupt_xlsx() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"PK\x03\x04 this is not a workbook").unwrap();
    file.flush().unwrap();
    file
}
