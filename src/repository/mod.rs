// ==========================================
// 制造执行系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含选批逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod lot_query;
pub mod lot_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use lot_query::LotQuery;
pub use lot_repo::LotRepository;
