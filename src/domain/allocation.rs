// ==========================================
// 制造执行系统 - 分配结果领域模型
// ==========================================
// 职责: 分配策略、分配明细、分配批次
// 红线: 分配结果是临时对象，分配引擎自身不落库
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// AllocationStrategy - 选批策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// 先进先出：按生产日期升序
    Fifo,
    /// 先到期先出：按到期日升序，无到期日排最后
    Fefo,
    /// 指定批次：不做部分满足
    Specific { lot_id: String },
}

impl AllocationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::Fifo => "fifo",
            AllocationStrategy::Fefo => "fefo",
            AllocationStrategy::Specific { .. } => "specific",
        }
    }
}

impl Default for AllocationStrategy {
    fn default() -> Self {
        AllocationStrategy::Fifo
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStrategy::Specific { lot_id } => write!(f, "specific({})", lot_id),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl std::str::FromStr for AllocationStrategy {
    type Err = String;

    /// 支持 `fifo` / `fefo` / `lot:<lot_id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(lot_id) = trimmed.strip_prefix("lot:") {
            let lot_id = lot_id.trim();
            if lot_id.is_empty() {
                return Err("指定批次策略缺少 lot_id".to_string());
            }
            return Ok(AllocationStrategy::Specific {
                lot_id: lot_id.to_string(),
            });
        }
        match trimmed.to_lowercase().as_str() {
            "fifo" => Ok(AllocationStrategy::Fifo),
            "fefo" => Ok(AllocationStrategy::Fefo),
            other => Err(format!("未知选批策略: {}", other)),
        }
    }
}

// ==========================================
// Allocation - 分配明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: String,
    pub lot_number: String,
    pub allocated_quantity: Decimal, // 本批次承担的数量
    pub available_quantity: Decimal, // 选批时的结存（扣减前）
    pub expires_on: Option<NaiveDate>,
}

// ==========================================
// AllocationRequest - 分配请求
// ==========================================
// 租户通过参数显式传入，不读取全局上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub tenant_id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub required_quantity: Decimal,
    #[serde(default)]
    pub strategy: AllocationStrategy,
}

// ==========================================
// AllocationBatch - 一次分配调用的结果
// ==========================================
// 红线: 成功的批次 allocated_quantity 之和 == required_quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationBatch {
    pub strategy: AllocationStrategy,
    pub tenant_id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub required_quantity: Decimal,
    pub allocations: Vec<Allocation>,
}

impl AllocationBatch {
    /// 分配总量（溢出时饱和到 Decimal::MAX）
    pub fn total_allocated(&self) -> Decimal {
        self.allocations
            .iter()
            .fold(Decimal::ZERO, |acc, a| acc.saturating_add(a.allocated_quantity))
    }

    /// 是否恰好满足需求
    pub fn is_fulfilled(&self) -> bool {
        self.total_allocated() == self.required_quantity
    }

    pub fn lot_ids(&self) -> Vec<&str> {
        self.allocations.iter().map(|a| a.lot_id.as_str()).collect()
    }
}
