// ==========================================
// 制造执行系统 - API层错误类型
// ==========================================
// 职责: 汇总仓储/引擎/导入错误为面向调用方的错误
// 红线: 错误信息必须包含显式原因，不吞错
// ==========================================

use crate::engine::error::AllocationError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use rust_decimal::Decimal;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 分配错误
    // ==========================================
    #[error("库存不足: product_id={product_id}, 需求={requested}, 可用={available}, 缺口={shortfall}")]
    InsufficientStock {
        product_id: String,
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    /// 出库时结存已被他人扣减，需重新选批
    #[error("并发修改: lot_id={lot_id}, 需扣减={requested}, 当前结存={available}")]
    ConcurrentModification {
        lot_id: String,
        requested: Decimal,
        available: Decimal,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                lot_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "批次{}已被其他用户修改（期望revision={}，实际revision={}）",
                lot_id, expected, actual
            )),
            RepositoryError::ConcurrentModification {
                lot_id,
                requested,
                available,
            } => ApiError::ConcurrentModification {
                lot_id,
                requested,
                available,
            },

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Validation(msg) => ApiError::InvalidInput(msg),
            AllocationError::LotNotFound { lot_id } => {
                ApiError::NotFound(format!("Lot(id={})不存在或不可分配", lot_id))
            }
            AllocationError::InsufficientStock {
                product_id,
                requested,
                available,
                shortfall,
            } => ApiError::InsufficientStock {
                product_id,
                requested,
                available,
                shortfall,
            },
            AllocationError::ConcurrentModification {
                lot_id,
                requested,
                available,
            } => ApiError::ConcurrentModification {
                lot_id,
                requested,
                available,
            },
            AllocationError::Repository(err) => ApiError::from(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件{}不存在", path)),
            ImportError::Repository(err) => ApiError::from(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "Lot".to_string(),
            id: "L001".to_string(),
        }
        .into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Lot"));
                assert!(msg.contains("L001"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::OptimisticLockFailure {
            lot_id: "L001".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        match api_err {
            ApiError::OptimisticLockFailure(msg) => {
                assert!(msg.contains("L001"));
                assert!(msg.contains("已被其他用户修改"));
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }

        let api_err: ApiError =
            RepositoryError::DatabaseTransactionError("database is locked".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseTransactionError(_)));

        let api_err: ApiError =
            RepositoryError::DatabaseConnectionError("unable to open".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
    }

    #[test]
    fn test_allocation_error_conversion() {
        let api_err: ApiError =
            AllocationError::insufficient("P", Decimal::from(100), Decimal::from(80)).into();
        match api_err {
            ApiError::InsufficientStock { shortfall, .. } => {
                assert_eq!(shortfall, Decimal::from(20))
            }
            other => panic!("Expected InsufficientStock, got {:?}", other),
        }

        let api_err: ApiError = AllocationError::from(RepositoryError::ConcurrentModification {
            lot_id: "L1".to_string(),
            requested: Decimal::from(5),
            available: Decimal::from(2),
        })
        .into();
        assert!(matches!(api_err, ApiError::ConcurrentModification { .. }));

        let api_err: ApiError = AllocationError::Validation("bad".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::MissingColumn("quantity".to_string()).into();
        match api_err {
            ApiError::ImportError(msg) => assert!(msg.contains("quantity")),
            other => panic!("Expected ImportError, got {:?}", other),
        }
    }
}
