// ==========================================
// 制造执行系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 CLI / 上层服务调用
// ==========================================

pub mod error;
pub mod lot_allocation_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use lot_allocation_api::{
    AllocationLineView, AllocationResponse, ExpiringLotView, LotAllocationApi, LotView,
};
