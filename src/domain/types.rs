// ==========================================
// 制造执行系统 - 领域类型定义
// ==========================================
// 职责: 批次质量状态、库存流水类型等封闭枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 质量状态 (Quality Status)
// ==========================================
// 红线: 是否可分配由准入策略决定,不在此硬编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityStatus {
    Pass,    // 检验合格
    Hold,    // 冻结待处理
    Reject,  // 判废/不合格
    Pending, // 待检
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl QualityStatus {
    /// 从字符串解析质量状态（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Some(QualityStatus::Pass),
            "HOLD" => Some(QualityStatus::Hold),
            "REJECT" => Some(QualityStatus::Reject),
            "PENDING" => Some(QualityStatus::Pending),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            QualityStatus::Pass => "PASS",
            QualityStatus::Hold => "HOLD",
            QualityStatus::Reject => "REJECT",
            QualityStatus::Pending => "PENDING",
        }
    }
}

// ==========================================
// 库存流水类型 (Inventory Transaction Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryTxnType {
    Receipt,    // 入库建批
    Issue,      // 按分配结果出库
    SplitOut,   // 拆批 - 母批扣减
    SplitIn,    // 拆批 - 子批生成
    Adjust,     // 直接数量调整
    Deactivate, // 软删除
}

impl fmt::Display for InventoryTxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl InventoryTxnType {
    /// 从字符串解析流水类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RECEIPT" => Some(InventoryTxnType::Receipt),
            "ISSUE" => Some(InventoryTxnType::Issue),
            "SPLIT_OUT" => Some(InventoryTxnType::SplitOut),
            "SPLIT_IN" => Some(InventoryTxnType::SplitIn),
            "ADJUST" => Some(InventoryTxnType::Adjust),
            "DEACTIVATE" => Some(InventoryTxnType::Deactivate),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InventoryTxnType::Receipt => "RECEIPT",
            InventoryTxnType::Issue => "ISSUE",
            InventoryTxnType::SplitOut => "SPLIT_OUT",
            InventoryTxnType::SplitIn => "SPLIT_IN",
            InventoryTxnType::Adjust => "ADJUST",
            InventoryTxnType::Deactivate => "DEACTIVATE",
        }
    }
}
