// ==========================================
// 资产盘点 - 台账领域模型
// ==========================================
// 职责: 定义台账记录、盘点统计、扫码结果
// 红线: 不含数据访问逻辑
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryRecord - 台账记录
// ==========================================
// 用途: 导入层写入，扫码路径更新 scanned/scan_timestamp/department
// 对齐: inventory_item 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    // ===== 主键 =====
    pub key: String, // 规范化后的资产编号（唯一标识）

    // ===== 基础信息 =====
    pub display_name: String, // 资产名称
    pub department: String,   // 所属部门（默认空）

    // ===== 盘点状态 =====
    pub scanned: bool,                          // 是否已扫码确认
    pub scan_timestamp: Option<DateTime<Utc>>, // 扫码时间（仅 scanned=true 时有值）

    // ===== 附加信息 =====
    pub raw_tag: String,   // 扫码解码结果应与 key 完全一致
    pub comment: String,   // 备注
    pub provisional: bool, // key 是否为临时合成编号
}

impl InventoryRecord {
    /// 以默认盘点状态创建记录（未扫码、部门为空）
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        Self {
            raw_tag: key.clone(),
            key,
            display_name: display_name.into().trim().to_string(),
            department: String::new(),
            scanned: false,
            scan_timestamp: None,
            comment: String::new(),
            provisional: false,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into().trim().to_string();
        self
    }

    pub fn with_provisional(mut self, provisional: bool) -> Self {
        self.provisional = provisional;
        self
    }
}

// ==========================================
// InventoryStats - 盘点统计
// ==========================================
// 口径: remaining = total - scanned，始终由仓储全量重算得到
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total: usize,
    pub scanned: usize,
    pub remaining: usize,
}

impl InventoryStats {
    pub fn from_counts(total: usize, scanned: usize) -> Self {
        Self {
            total,
            scanned,
            remaining: total.saturating_sub(scanned),
        }
    }

    /// 完成百分比（整数，空库为 0）
    pub fn completion_percentage(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.scanned * 100 / self.total
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.remaining + self.scanned
    }
}

// ==========================================
// ScanOutcome - 扫码结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOutcome {
    /// 命中台账，返回更新后的记录
    Found(InventoryRecord),
    /// 台账中不存在该编号
    NotFound(String),
}

impl ScanOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ScanOutcome::Found(_))
    }
}
