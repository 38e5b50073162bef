// ==========================================
// 资产盘点 - 命令行入口
// ==========================================
// 用法:
//   inventory-recon [--db PATH] [--lang en|ru] <command> [args]
//
// 命令:
//   import <file> [--json]     导入台账（Ctrl-C 取消，已提交分块保留）
//   inspect <file>             预览数据源前 15 行
//   scan <code> [department]   扫码确认
//   unscan <key>               撤销扫码
//   department <key> <name>    修改部门
//   stats                      盘点统计
//   list [all|scanned|unscanned]
//   search <query>
//   export <file>
//   delete <key>
//   reset                      清空台账
//   config <key> <value>       写入导入配置覆写
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context};
use inventory_recon::api::{failure_message, ImportApi, InventoryApi};
use inventory_recon::config::ConfigManager;
use inventory_recon::db::{get_default_db_path, open_sqlite_connection};
use inventory_recon::domain::{InventoryRecord, InventoryStats, ScanOutcome};
use inventory_recon::repository::InventoryRepositoryImpl;
use inventory_recon::{i18n, logging, ImportOptions};

const USAGE: &str = "usage: inventory-recon [--db PATH] [--lang en|ru] \
<import|inspect|scan|unscan|department|stats|list|search|export|delete|reset|config> [args]";

/// 全局参数
struct Cli {
    db_path: String,
    json: bool,
    command: String,
    args: Vec<String>,
}

fn parse_args() -> anyhow::Result<Cli> {
    let mut db_path = None;
    let mut lang = None;
    let mut json = false;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = Some(args.next().context("--db 需要路径参数")?),
            "--lang" => lang = Some(args.next().context("--lang 需要语言参数")?),
            "--json" => json = true,
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(arg),
        }
    }

    if let Some(lang) = lang {
        i18n::set_locale(&lang);
    }

    let mut positional = positional.into_iter();
    let command = positional.next().ok_or_else(|| anyhow!(USAGE))?;

    Ok(Cli {
        db_path: db_path.unwrap_or_else(get_default_db_path),
        json,
        command,
        args: positional.collect(),
    })
}

fn arg(cli: &Cli, index: usize, name: &str) -> anyhow::Result<String> {
    cli.args
        .get(index)
        .cloned()
        .with_context(|| format!("缺少参数 <{}>\n{}", name, USAGE))
}

fn print_record(record: &InventoryRecord) {
    let mark = if record.scanned { "[x]" } else { "[ ]" };
    println!(
        "{} {}\t{}\t{}",
        mark, record.key, record.display_name, record.department
    );
}

fn print_stats(stats: &InventoryStats) {
    println!(
        "{}",
        i18n::t_with_args(
            "inventory.stats",
            &[
                ("total", &stats.total.to_string()),
                ("scanned", &stats.scanned.to_string()),
                ("remaining", &stats.remaining.to_string()),
                ("percent", &stats.completion_percentage().to_string()),
            ],
        )
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_with_default("warn");

    let cli = parse_args()?;
    tracing::info!(version = inventory_recon::VERSION, db_path = %cli.db_path, "启动");

    // 仓储与配置共享同一连接
    let conn = open_sqlite_connection(&cli.db_path)
        .with_context(|| format!("无法打开数据库: {}", cli.db_path))?;
    let conn = Arc::new(Mutex::new(conn));
    let repo = Arc::new(InventoryRepositoryImpl::from_connection(conn.clone()));
    let config = ConfigManager::from_connection(conn)?;

    let inventory = InventoryApi::new(repo.clone());

    match cli.command.as_str() {
        "import" => {
            let path = arg(&cli, 0, "file")?;
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(true, Ordering::SeqCst);
                }
            });

            let api = ImportApi::new(repo, config);
            match api.import_file(&path, ImportOptions::with_cancel(cancel)).await {
                Ok(response) if cli.json => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Ok(response) => {
                    println!("{}", response.message);
                    for (key, count) in response.report.duplicates() {
                        println!("  duplicate {} x{}", key, count);
                    }
                    if response.report.provisional_keys > 0 {
                        println!("  provisional keys: {}", response.report.provisional_keys);
                    }
                    if response.report.rows_failed + response.report.merge_failures > 0 {
                        println!(
                            "  failed rows: {}, merge failures: {}",
                            response.report.rows_failed, response.report.merge_failures
                        );
                    }
                    print_stats(&response.stats);
                }
                Err(e) => bail!(failure_message(&e)),
            }
        }
        "inspect" => {
            let path = arg(&cli, 0, "file")?;
            let preview = ImportApi::new(repo, config).inspect_file(&path).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                println!("source: {}", preview.source_kind.as_str());
                for row in &preview.rows {
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|c| format!("{:?}:{}", c.kind, c.text))
                        .collect();
                    println!("{:>3} | {}", row.index, cells.join(" | "));
                }
                if preview.truncated {
                    println!("...");
                }
            }
        }
        "scan" => {
            let code = arg(&cli, 0, "code")?;
            let department = cli.args.get(1).map(String::as_str);
            match inventory.process_scan(&code, department).await? {
                ScanOutcome::Found(record) => {
                    println!("{}", i18n::t_with_args("scan.found", &[("name", &record.display_name)]));
                    print_record(&record);
                }
                ScanOutcome::NotFound(code) => {
                    println!("{}", i18n::t_with_args("scan.not_found", &[("code", &code)]));
                }
            }
        }
        "unscan" => print_record(&inventory.mark_unscanned(&arg(&cli, 0, "key")?).await?),
        "department" => {
            let record = inventory
                .update_department(&arg(&cli, 0, "key")?, &arg(&cli, 1, "name")?)
                .await?;
            print_record(&record);
        }
        "stats" => print_stats(&inventory.stats().await?),
        "list" => {
            let records = match cli.args.first().map(String::as_str) {
                None | Some("all") => inventory.list_all().await?,
                Some("scanned") => inventory.list_by_scanned(true).await?,
                Some("unscanned") => inventory.list_by_scanned(false).await?,
                Some(other) => bail!("未知过滤条件: {}", other),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                records.iter().for_each(print_record);
            }
        }
        "search" => {
            for record in inventory.search(&arg(&cli, 0, "query")?).await? {
                print_record(&record);
            }
        }
        "export" => {
            let response = inventory.export_csv(&arg(&cli, 0, "file")?).await?;
            println!(
                "{}",
                i18n::t_with_args(
                    "inventory.exported",
                    &[("count", &response.exported.to_string()), ("path", &response.path)],
                )
            );
        }
        "delete" => {
            let key = arg(&cli, 0, "key")?;
            let stats = inventory.delete_item(&key).await?;
            println!("{}", i18n::t_with_args("inventory.deleted", &[("key", &key)]));
            print_stats(&stats);
        }
        "reset" => {
            let stats = inventory.clear_all().await?;
            println!("{}", i18n::t("inventory.cleared"));
            print_stats(&stats);
        }
        "config" => {
            let key = arg(&cli, 0, "key")?;
            config.set_config_value(&key, &arg(&cli, 1, "value")?)?;
            println!("{}", i18n::t("common.success"));
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
