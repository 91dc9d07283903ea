// ==========================================
// 制造执行系统 - 批次分配核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批次追溯与领料选批（FIFO / FEFO / 指定批次）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 选批规则与出库扣减
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与命令行
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{InventoryTxnType, QualityStatus};

// 领域实体
pub use domain::{
    Allocation, AllocationBatch, AllocationRequest, AllocationStrategy, InventoryTransaction, Lot,
    LotReceipt,
};

// 引擎
pub use engine::{
    AllocationError, LotAllocator, LotConsumptionService, LotEligibilityPolicy, QualityStatusPolicy,
};

// 仓储
pub use repository::{LotQuery, LotRepository, RepositoryError};

// API
pub use api::{ApiError, LotAllocationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "制造执行系统-批次分配";
