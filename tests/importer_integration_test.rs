// ==========================================
// 台账导入集成测试
// ==========================================
// 测试目标: 验证 读取 → 推断 → 规范化 → 校验 → 对账 全流程
// ==========================================

mod test_helpers;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use inventory_recon::api::{ApiError, ImportApi, InventoryApi};
use inventory_recon::config::{config_keys, ConfigManager, ImportConfig};
use inventory_recon::domain::{AnomalyKind, ScanOutcome};
use inventory_recon::importer::{
    ImportError, ImportOptions, InventoryImporter, InventoryImporterImpl,
};
use inventory_recon::logging;
use inventory_recon::repository::{InventoryRepository, InventoryRepositoryImpl};
use test_helpers::{
    create_test_db, insert_test_config, legacy_header, legacy_line, write_corrupt_xlsx,
    write_cp1251_csv, write_xlsx,
};

/// 创建测试用的导入器（默认配置）
fn create_test_importer(
    db_path: &str,
) -> (Arc<InventoryRepositoryImpl>, InventoryImporterImpl<InventoryRepositoryImpl>) {
    let repo = Arc::new(
        InventoryRepositoryImpl::new(db_path).expect("Failed to create InventoryRepository"),
    );
    let importer = InventoryImporterImpl::from_config(repo.clone(), &ImportConfig::default());
    (repo, importer)
}

// ==========================================
// 键规范化
// ==========================================

#[tokio::test]
async fn test_numeric_number_becomes_key_verbatim() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!(
        "{}{}{}",
        legacy_header(),
        legacy_line("Стол письменный", "00045"),
        legacy_line("Стул офисный", "1110000000002"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 2);
    let record = repo.get_by_key("00045").await.unwrap().unwrap();
    assert_eq!(record.display_name, "Стол письменный");
    assert_eq!(record.raw_tag, "00045");
    assert!(!record.provisional);
    assert!(repo.exists("1110000000002").await.unwrap());
}

#[tokio::test]
async fn test_scientific_notation_key() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!(
        "{}{}",
        legacy_header(),
        legacy_line("Шкаф", "1,11E+12"),
    ));

    importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert!(repo.get_by_key("1110000000000").await.unwrap().is_some());
}

#[tokio::test]
async fn test_spreadsheet_numbers_and_synthesized_name() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let xlsx = write_xlsx(|ws| {
        ws.write_string(0, 0, "Наименование")?;
        ws.write_string(0, 1, "Инвентарный номер")?;
        ws.write_string(1, 0, "Ноутбук")?;
        ws.write_number(1, 1, 1_500_000_000_000.0)?;
        ws.write_string(2, 0, "1")?;
        ws.write_number(2, 1, 4510.0)?;
        ws.write_string(3, 0, "Принтер")?;
        ws.write_string(3, 1, "1,11E+12")?;
        Ok(())
    });

    let outcome = importer
        .import_file(xlsx.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 3);
    let mapping = outcome.report.mapping.unwrap();
    assert_eq!((mapping.name, mapping.inventory_number), (0, 1));

    let laptop = repo.get_by_key("1500000000000").await.unwrap().unwrap();
    assert_eq!(laptop.display_name, "Ноутбук");

    let synthesized = repo.get_by_key("4510").await.unwrap().unwrap();
    assert_eq!(synthesized.display_name, "Item No. 4510");

    assert!(repo.exists("1110000000000").await.unwrap());
}

// ==========================================
// 行过滤
// ==========================================

#[tokio::test]
async fn test_row_zero_never_imported() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    // 第 0 行是合法数据行，也必须被排除
    let csv = write_cp1251_csv(&format!(
        "{}{}",
        legacy_line("Шкаф металлический большой", "555"),
        legacy_line("Стол письменный дубовый", "777"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 1);
    assert!(!repo.exists("555").await.unwrap());
    assert!(repo.exists("777").await.unwrap());
}

#[tokio::test]
async fn test_blank_and_sentinel_rows_dropped() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (_repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!(
        "{}{}{}{}{}",
        legacy_header(),
        legacy_line("", ""),
        legacy_line("Основное средство", ""),
        legacy_line("1", ""),
        legacy_line("Стол", "100200"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.report.rows_accepted, 1);
    assert_eq!(outcome.report.rows_skipped, outcome.report.rows_seen - 1);
}

#[tokio::test]
async fn test_missing_number_gets_provisional_key() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!(
        "{}{}",
        legacy_header(),
        legacy_line("Стеллаж без номера", ""),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.report.provisional_keys, 1);

    let records = repo.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].provisional);
    assert!(records[0].key.starts_with("TEMP_"));
    assert!(records[0].key.ends_with("_1"));
}

#[tokio::test]
async fn test_artifact_name_with_placeholder_number_is_provisional() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    // 编号 "0" 清洗后为空，名称 "1" 不足以丢弃该行
    let csv = write_cp1251_csv(&format!(
        "{}{}",
        legacy_header(),
        legacy_line("1", "0"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.report.provisional_keys, 1);

    let records = repo.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].provisional);
    assert!(records[0].key.starts_with("TEMP_"));
    assert_eq!(records[0].display_name, format!("Item No. {}", records[0].key));
}

#[tokio::test]
async fn test_leading_blank_line_keeps_physical_row_numbers() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    // 第 0 行为空行，第 1 行起均为数据
    let csv = write_cp1251_csv(&format!(
        "\n{}{}",
        legacy_line("Стол письменный дубовый", "777"),
        legacy_line("Стул офисный кожаный", "778"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.merged, 2);
    assert!(repo.exists("777").await.unwrap());
    assert!(repo.exists("778").await.unwrap());
}

// ==========================================
// 列结构推断
// ==========================================

#[tokio::test]
async fn test_header_labels_in_non_legacy_positions() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(concat!(
        "Инвентарный номер;Подразделение;Основное средство\n",
        "30001;Склад;Стол\n",
        "30002;Офис;Стул\n",
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    let mapping = outcome.report.mapping.unwrap();
    assert_eq!((mapping.name, mapping.inventory_number), (2, 0));
    assert_eq!(outcome.merged, 2);

    let record = repo.get_by_key("30001").await.unwrap().unwrap();
    assert_eq!(record.display_name, "Стол");
    assert!(!record.provisional);
}

#[tokio::test]
async fn test_asset_number_and_name_headers() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv("Asset number;Asset name\n4510;Desk\n4511;Chair\n");

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    let mapping = outcome.report.mapping.unwrap();
    assert_eq!((mapping.name, mapping.inventory_number), (1, 0));
    assert_eq!(outcome.merged, 2);

    let desk = repo.get_by_key("4510").await.unwrap().unwrap();
    assert_eq!(desk.display_name, "Desk");
    assert!(!desk.provisional);
    let chair = repo.get_by_key("4511").await.unwrap().unwrap();
    assert_eq!(chair.display_name, "Chair");
}

#[tokio::test]
async fn test_sample_row_two_used_when_row_one_blank() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    // 表头无已知标签；第 1 行是物理空行，样本取第 2 行
    let csv = write_cp1251_csv(concat!(
        "Код;Описание\n",
        "\n",
        "40001;Шкаф металлический архивный\n",
        "40002;Тумба\n",
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    let mapping = outcome.report.mapping.unwrap();
    assert_eq!((mapping.name, mapping.inventory_number), (1, 0));
    assert_eq!(outcome.merged, 2);

    let cabinet = repo.get_by_key("40001").await.unwrap().unwrap();
    assert_eq!(cabinet.display_name, "Шкаф металлический архивный");
    assert!(repo.exists("40002").await.unwrap());
}

// ==========================================
// 校验报告
// ==========================================

#[tokio::test]
async fn test_duplicate_key_reported_with_count_two() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!(
        "{}{}{}{}",
        legacy_header(),
        legacy_line("Стол", "12345"),
        legacy_line("Стул", "678"),
        legacy_line("Стол (копия)", "12345"),
    ));

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    // 两行都进入批次并写入，存储中 last-write-wins
    assert_eq!(outcome.report.rows_accepted, 3);
    assert_eq!(outcome.merged, 3);
    assert_eq!(outcome.report.duplicate_keys, 1);
    assert_eq!(outcome.report.duplicate_count("12345"), Some(2));

    let anomaly = outcome
        .report
        .anomalies
        .iter()
        .find(|a| matches!(a.kind, AnomalyKind::DuplicateKey { .. }))
        .unwrap();
    assert_eq!(anomaly.key.as_deref(), Some("12345"));

    let record = repo.get_by_key("12345").await.unwrap().unwrap();
    assert_eq!(record.display_name, "Стол (копия)");
    assert_eq!(outcome.stats.total, 2);
}

// ==========================================
// 对账合并
// ==========================================

#[tokio::test]
async fn test_reimport_overwrites_scan_state() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);
    let inventory = InventoryApi::new(repo.clone());

    let csv = write_cp1251_csv(&format!(
        "{}{}{}",
        legacy_header(),
        legacy_line("Стол", "1001"),
        legacy_line("Стул", "1002"),
    ));

    importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    let outcome = inventory.process_scan("1001", Some("Склад")).await.unwrap();
    assert!(outcome.is_found());
    assert_eq!(inventory.stats().await.unwrap().scanned, 1);

    let outcome = importer
        .import_file(csv.path(), ImportOptions::default())
        .await
        .unwrap();

    let record = repo.get_by_key("1001").await.unwrap().unwrap();
    assert!(!record.scanned);
    assert!(record.scan_timestamp.is_none());
    assert_eq!(record.department, "");
    assert_eq!(outcome.stats.scanned, 0);
    assert_eq!(outcome.stats.remaining, 2);
}

#[tokio::test]
async fn test_stats_invariant_after_import() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);
    let inventory = InventoryApi::new(repo.clone());

    let first = write_cp1251_csv(&format!(
        "{}{}{}{}",
        legacy_header(),
        legacy_line("Стол", "1"),
        legacy_line("Стул", "2001"),
        legacy_line("Шкаф", "2002"),
    ));
    importer
        .import_file(first.path(), ImportOptions::default())
        .await
        .unwrap();
    assert!(matches!(
        inventory.process_scan("2002", None).await.unwrap(),
        ScanOutcome::Found(_)
    ));

    let second = write_cp1251_csv(&format!(
        "{}{}",
        legacy_header(),
        legacy_line("Тумба", "2003"),
    ));
    let outcome = importer
        .import_file(second.path(), ImportOptions::default())
        .await
        .unwrap();

    // 编号 "1" 为占位符，名称保留，使用临时编号
    let stats = outcome.stats;
    assert_eq!(stats.total, 4);
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.total, stats.remaining + stats.scanned);
    assert_eq!(stats, inventory.stats().await.unwrap());
}

#[tokio::test]
async fn test_corrupt_spreadsheet_merges_nothing() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let seed = write_cp1251_csv(&format!("{}{}", legacy_header(), legacy_line("Стол", "1001")));
    importer
        .import_file(seed.path(), ImportOptions::default())
        .await
        .unwrap();

    let corrupt = write_corrupt_xlsx();
    let err = importer
        .import_file(corrupt.path(), ImportOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, ImportError::Format(_) | ImportError::Io(_)));
    assert_eq!(repo.count_total().await.unwrap(), 1);
}

#[tokio::test]
async fn test_cancelled_import_merges_nothing_before_first_chunk() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let csv = write_cp1251_csv(&format!("{}{}", legacy_header(), legacy_line("Стол", "1001")));
    let cancel = Arc::new(AtomicBool::new(true));

    let err = importer
        .import_file(csv.path(), ImportOptions::with_cancel(cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Cancelled { merged: 0 }));
    assert_eq!(repo.count_total().await.unwrap(), 0);
}

#[tokio::test]
async fn test_import_from_reader() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (repo, importer) = create_test_importer(&db_path);

    let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Наименование;Инвентарный номер\nСейф;9001\n");
    let outcome = importer
        .import_from_reader(
            std::io::Cursor::new(bytes.into_owned()),
            inventory_recon::SourceKind::DelimitedText,
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.merged, 1);
    assert_eq!(repo.get_by_key("9001").await.unwrap().unwrap().display_name, "Сейф");
}

// ==========================================
// 配置覆写（经 ImportApi）
// ==========================================

#[tokio::test]
async fn test_config_override_changes_legacy_layout() {
    let (_tmp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::DEFAULT_NUMBER_COLUMN, "2").unwrap();

    let repo = Arc::new(InventoryRepositoryImpl::new(&db_path).unwrap());
    let api = ImportApi::new(repo.clone(), ConfigManager::new(&db_path).unwrap());

    // 无表头标签、样本行无长文本也无纯数字：完全依赖兜底版式
    let csv = write_cp1251_csv("x;y;z\nСтол;ignored;30 03\n");
    let response = api
        .import_file(csv.path().to_str().unwrap(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(response.merged, 1);
    assert_eq!(repo.get_by_key("3003").await.unwrap().unwrap().display_name, "Стол");
}

#[tokio::test]
async fn test_import_api_corrupt_source_is_single_failure() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = Arc::new(InventoryRepositoryImpl::new(&db_path).unwrap());
    let api = ImportApi::new(repo.clone(), ConfigManager::new(&db_path).unwrap());

    let corrupt = write_corrupt_xlsx();
    let result = api
        .import_file(corrupt.path().to_str().unwrap(), ImportOptions::default())
        .await;

    assert!(matches!(result, Err(ApiError::SourceError(_))));
    assert_eq!(repo.count_total().await.unwrap(), 0);
}
