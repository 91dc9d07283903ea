// ==========================================
// 制造执行系统 - 批次领域模型
// ==========================================
// 职责: 批次 (Lot) 实体及其数量不变式
// 红线: 0 <= current_quantity <= initial_quantity
// 红线: 批次只做软删除 (active=false)，不物理删除
// ==========================================

use crate::domain::types::QualityStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Lot - 库存批次
// ==========================================
// 用途: 仓储层读写，分配引擎只读快照
// 对齐: lot 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    // ===== 主键 =====
    pub lot_id: String,     // 批次唯一标识（UUID）
    pub lot_number: String, // 批次号（租户内唯一）

    // ===== 归属 =====
    pub tenant_id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub work_order_id: Option<String>, // 来源工单（生产入库）
    pub parent_lot_id: Option<String>, // 拆批来源母批

    // ===== 数量 =====
    pub initial_quantity: Decimal, // 建批数量（不可变）
    pub current_quantity: Decimal, // 当前结存（分配/消耗扣减）
    pub unit: String,              // 计量单位

    // ===== 日期 =====
    pub manufactured_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,

    // ===== 质量与供应商 =====
    pub quality_status: QualityStatus,
    pub supplier_name: Option<String>,
    pub supplier_lot_number: Option<String>,
    pub remarks: Option<String>,

    // ===== 状态 =====
    pub active: bool,
    pub revision: i32, // 乐观锁版本号

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// 由入库登记生成新批次（current = initial）
    pub fn from_receipt(tenant_id: &str, receipt: LotReceipt, now: DateTime<Utc>) -> Self {
        Self {
            lot_id: Uuid::new_v4().to_string(),
            lot_number: receipt.lot_number,
            tenant_id: tenant_id.to_string(),
            warehouse_id: receipt.warehouse_id,
            product_id: receipt.product_id,
            work_order_id: receipt.work_order_id,
            parent_lot_id: None,
            initial_quantity: receipt.quantity,
            current_quantity: receipt.quantity,
            unit: receipt.unit,
            manufactured_on: receipt.manufactured_on,
            expires_on: receipt.expires_on,
            quality_status: receipt.quality_status,
            supplier_name: receipt.supplier_name,
            supplier_lot_number: receipt.supplier_lot_number,
            remarks: receipt.remarks,
            active: true,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 结存为 0 视为耗尽
    pub fn is_exhausted(&self) -> bool {
        self.current_quantity <= Decimal::ZERO
    }

    /// 是否在 [from, to] 闭区间内到期
    pub fn expires_within(&self, from: NaiveDate, to: NaiveDate) -> bool {
        matches!(self.expires_on, Some(d) if d >= from && d <= to)
    }

    /// 校验数量与标识不变式
    ///
    /// # 返回
    /// - Err(String): 第一条违规原因
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("lot_number", &self.lot_number),
            ("tenant_id", &self.tenant_id),
            ("warehouse_id", &self.warehouse_id),
            ("product_id", &self.product_id),
            ("unit", &self.unit),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} 不能为空", field));
            }
        }
        if self.initial_quantity <= Decimal::ZERO {
            return Err(format!(
                "initial_quantity 必须大于 0 (实际 {})",
                self.initial_quantity
            ));
        }
        if self.current_quantity < Decimal::ZERO {
            return Err(format!(
                "current_quantity 不能为负 (实际 {})",
                self.current_quantity
            ));
        }
        if self.current_quantity > self.initial_quantity {
            return Err(format!(
                "current_quantity({}) 超过 initial_quantity({})",
                self.current_quantity, self.initial_quantity
            ));
        }
        if let Some(expires_on) = self.expires_on {
            if expires_on < self.manufactured_on {
                return Err(format!(
                    "expires_on({}) 早于 manufactured_on({})",
                    expires_on, self.manufactured_on
                ));
            }
        }
        Ok(())
    }
}

// ==========================================
// LotReceipt - 入库登记
// ==========================================
// 用途: 导入层 / API 建批入参
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotReceipt {
    pub lot_number: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub quantity: Decimal,
    pub unit: String,
    pub manufactured_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub quality_status: QualityStatus,
    pub supplier_name: Option<String>,
    pub supplier_lot_number: Option<String>,
    pub work_order_id: Option<String>,
    pub remarks: Option<String>,
}
