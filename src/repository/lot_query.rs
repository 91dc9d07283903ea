// ==========================================
// 制造执行系统 - 批次查询接口
// ==========================================
// 职责: 分配引擎唯一依赖的只读数据接口（不包含实现）
// 红线: 只读；不含排序与分配逻辑
// 实现者: LotRepository（SQLite）
// ==========================================

use crate::domain::lot::Lot;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use std::sync::Arc;

// ==========================================
// LotQuery Trait
// ==========================================
pub trait LotQuery: Send + Sync {
    /// 查询候选批次（租户 + 仓库 + 物料，启用且结存 > 0）
    ///
    /// # 说明
    /// - 质量状态准入由分配引擎的准入策略判定，实现方无需过滤
    fn find_eligible_lots(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<Lot>>;

    /// 按批次ID查询（必须同时匹配租户 + 仓库 + 物料）
    ///
    /// # 返回
    /// - Ok(None): 不存在或归属不匹配
    fn find_lot_by_id(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        lot_id: &str,
    ) -> RepositoryResult<Option<Lot>>;

    /// 查询到期日落在 [from, to] 闭区间内的启用批次（租户范围）
    fn find_lots_expiring_between(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Lot>>;
}

impl<T: LotQuery + ?Sized> LotQuery for Arc<T> {
    fn find_eligible_lots(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<Lot>> {
        (**self).find_eligible_lots(tenant_id, warehouse_id, product_id)
    }

    fn find_lot_by_id(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        lot_id: &str,
    ) -> RepositoryResult<Option<Lot>> {
        (**self).find_lot_by_id(tenant_id, warehouse_id, product_id, lot_id)
    }

    fn find_lots_expiring_between(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Lot>> {
        (**self).find_lots_expiring_between(tenant_id, from, to)
    }
}
