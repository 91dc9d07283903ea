// ==========================================
// 制造执行系统 - 库存流水
// ==========================================
// 职责: 记录批次数量变化的后果（出库/拆批/调整/入库/停用）
// 红线: 只追加，不修改
// ==========================================

use crate::domain::types::InventoryTxnType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// InventoryTransaction - 库存流水记录
// ==========================================
// 对齐: inventory_txn 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub txn_id: String,
    pub tenant_id: String,
    pub lot_id: String,
    pub txn_type: InventoryTxnType,
    pub quantity_delta: Decimal, // 有符号：出库为负
    pub quantity_after: Decimal, // 变动后结存
    pub reference: Option<String>,
    pub operator: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    /// 创建新的流水记录
    pub fn new(
        tenant_id: &str,
        lot_id: &str,
        txn_type: InventoryTxnType,
        quantity_delta: Decimal,
        quantity_after: Decimal,
        reference: Option<String>,
        operator: Option<String>,
    ) -> Self {
        Self {
            txn_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            lot_id: lot_id.to_string(),
            txn_type,
            quantity_delta,
            quantity_after,
            reference,
            operator,
            created_at: Utc::now(),
        }
    }
}
