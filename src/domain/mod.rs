// ==========================================
// 制造执行系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod inventory_txn;
pub mod lot;
pub mod types;

// 重导出核心类型
pub use allocation::{Allocation, AllocationBatch, AllocationRequest, AllocationStrategy};
pub use inventory_txn::InventoryTransaction;
pub use lot::{Lot, LotReceipt};
pub use types::{InventoryTxnType, QualityStatus};
