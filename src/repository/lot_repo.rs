// ==========================================
// 制造执行系统 - 批次数据仓储
// ==========================================
// 红线: Repository 不含分配逻辑，只负责数据访问与事务内复核
// 红线: 结存扣减必须在事务内复核，不允许出现负数
// ==========================================

mod core;
mod mutations;
mod queries;
mod row;

#[cfg(test)]
mod tests;

pub use core::LotRepository;
