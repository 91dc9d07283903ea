// ==========================================
// 制造执行系统 - 引擎层
// ==========================================
// 职责: 选批规则与出库扣减编排
// 红线: Engine 不拼 SQL；选批只读，扣减经仓储事务
// ==========================================

pub mod allocation_core;
pub mod allocator;
pub mod consumption;
pub mod eligibility;
pub mod error;
pub mod strategy;

// 重导出核心引擎
pub use allocation_core::AllocationCore;
pub use allocator::LotAllocator;
pub use consumption::LotConsumptionService;
pub use eligibility::{LotEligibilityPolicy, PredicatePolicy, QualityStatusPolicy};
pub use error::{AllocationError, AllocationResult};
pub use strategy::{fefo_order, fifo_order, LotOrdering};
