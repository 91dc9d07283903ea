// ==========================================
// 制造执行系统 - 分配引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误同步返回调用方，引擎内部不重试、不吞错
// ==========================================

use crate::repository::error::RepositoryError;
use rust_decimal::Decimal;
use thiserror::Error;

/// 分配引擎错误类型
#[derive(Error, Debug)]
pub enum AllocationError {
    /// 入参非法（数量 <= 0、标识为空等）
    #[error("入参校验失败: {0}")]
    Validation(String),

    /// 指定批次不存在，或不属于该租户/仓库/物料，或不可分配
    #[error("批次未找到: lot_id={lot_id}")]
    LotNotFound { lot_id: String },

    /// 可分配结存不足（全有或全无）
    #[error("库存不足: product_id={product_id}, 需求={requested}, 可用={available}, 缺口={shortfall}")]
    InsufficientStock {
        product_id: String,
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    /// 出库事务复核失败（仅在消耗阶段出现）
    #[error("并发修改: lot_id={lot_id}, 需扣减={requested}, 当前结存={available}")]
    ConcurrentModification {
        lot_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl AllocationError {
    /// 构造库存不足错误（缺口 = 需求 - 可用）
    pub fn insufficient(product_id: &str, requested: Decimal, available: Decimal) -> Self {
        AllocationError::InsufficientStock {
            product_id: product_id.to_string(),
            requested,
            available,
            shortfall: requested - available,
        }
    }
}

// 并发修改从仓储错误中提升为一等错误
impl From<RepositoryError> for AllocationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConcurrentModification {
                lot_id,
                requested,
                available,
            } => AllocationError::ConcurrentModification {
                lot_id,
                requested,
                available,
            },
            other => AllocationError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type AllocationResult<T> = Result<T, AllocationError>;
