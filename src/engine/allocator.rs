// ==========================================
// 制造执行系统 - 批次分配引擎
// ==========================================
// 职责: FIFO / FEFO / 指定批次选批，到期批次查询
// 输入: LotQuery 快照 + 准入策略
// 输出: AllocationBatch（只读，不修改结存）
// 红线: 引擎不拼 SQL，不做扣减；扣减由 LotConsumptionService 负责
// ==========================================

use crate::domain::allocation::{AllocationBatch, AllocationRequest, AllocationStrategy};
use crate::domain::lot::Lot;
use crate::engine::allocation_core::AllocationCore;
use crate::engine::eligibility::{LotEligibilityPolicy, QualityStatusPolicy};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::strategy::LotOrdering;
use crate::repository::lot_query::LotQuery;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// LotAllocator - 批次分配引擎
// ==========================================
pub struct LotAllocator<Q>
where
    Q: LotQuery,
{
    query: Arc<Q>,
    policy: Arc<dyn LotEligibilityPolicy>,
}

impl<Q> LotAllocator<Q>
where
    Q: LotQuery,
{
    /// 创建分配引擎
    ///
    /// # 参数
    /// - query: 批次只读查询接口
    /// - policy: 批次准入策略
    pub fn new(query: Arc<Q>, policy: Arc<dyn LotEligibilityPolicy>) -> Self {
        Self { query, policy }
    }

    /// 使用默认准入策略（仅 PASS）
    pub fn with_default_policy(query: Arc<Q>) -> Self {
        Self::new(query, Arc::new(QualityStatusPolicy::default()))
    }

    pub fn policy(&self) -> &dyn LotEligibilityPolicy {
        self.policy.as_ref()
    }

    // ==========================================
    // 策略选批
    // ==========================================

    /// 先进先出：按生产日期升序
    #[instrument(skip(self), fields(strategy = "fifo"))]
    pub fn select_by_fifo(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        required_quantity: Decimal,
    ) -> AllocationResult<AllocationBatch> {
        self.select_ordered(
            LotOrdering::Fifo,
            tenant_id,
            warehouse_id,
            product_id,
            required_quantity,
        )
    }

    /// 先到期先出：按到期日升序，无到期日排最后
    #[instrument(skip(self), fields(strategy = "fefo"))]
    pub fn select_by_fefo(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        required_quantity: Decimal,
    ) -> AllocationResult<AllocationBatch> {
        self.select_ordered(
            LotOrdering::Fefo,
            tenant_id,
            warehouse_id,
            product_id,
            required_quantity,
        )
    }

    /// 指定批次
    ///
    /// # 返回
    /// - Err(LotNotFound): 不存在、归属不匹配、停用或质量状态不准入
    /// - Err(InsufficientStock): 结存 < 需求（含已耗尽）
    #[instrument(skip(self))]
    pub fn select_specific_lot(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        lot_id: &str,
        required_quantity: Decimal,
    ) -> AllocationResult<AllocationBatch> {
        AllocationCore::validate_scope(tenant_id, warehouse_id, product_id)?;
        AllocationCore::validate_identifier("lot_id", lot_id)?;
        AllocationCore::validate_required_quantity(required_quantity)?;

        let lot = self
            .query
            .find_lot_by_id(tenant_id, warehouse_id, product_id, lot_id)?
            .ok_or_else(|| AllocationError::LotNotFound {
                lot_id: lot_id.to_string(),
            })?;

        if !lot.active || !self.policy.admits_quality(lot.quality_status) {
            debug!(
                lot_id = %lot.lot_id,
                active = lot.active,
                quality_status = %lot.quality_status,
                "指定批次不可分配"
            );
            return Err(AllocationError::LotNotFound {
                lot_id: lot_id.to_string(),
            });
        }

        let available = lot.current_quantity.max(Decimal::ZERO);
        if available < required_quantity {
            return Err(AllocationError::insufficient(
                product_id,
                required_quantity,
                available,
            ));
        }

        let allocation = AllocationCore::allocation_from(&lot, required_quantity);
        info!(lot_id = %lot.lot_id, quantity = %required_quantity, "指定批次分配完成");

        Ok(AllocationBatch {
            strategy: AllocationStrategy::Specific {
                lot_id: lot.lot_id.clone(),
            },
            tenant_id: tenant_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            product_id: product_id.to_string(),
            required_quantity,
            allocations: vec![allocation],
        })
    }

    /// 按请求中的策略分派
    pub fn select(&self, request: &AllocationRequest) -> AllocationResult<AllocationBatch> {
        match &request.strategy {
            AllocationStrategy::Fifo => self.select_by_fifo(
                &request.tenant_id,
                &request.warehouse_id,
                &request.product_id,
                request.required_quantity,
            ),
            AllocationStrategy::Fefo => self.select_by_fefo(
                &request.tenant_id,
                &request.warehouse_id,
                &request.product_id,
                request.required_quantity,
            ),
            AllocationStrategy::Specific { lot_id } => self.select_specific_lot(
                &request.tenant_id,
                &request.warehouse_id,
                &request.product_id,
                lot_id,
                request.required_quantity,
            ),
        }
    }

    // ==========================================
    // 到期查询
    // ==========================================

    /// 查询 [today, today + days] 内到期的可分配批次
    ///
    /// # 返回
    /// 按到期日升序、lot_id 升序
    #[instrument(skip(self))]
    pub fn find_expiring_lots(
        &self,
        tenant_id: &str,
        days_until_expiry: i64,
        today: NaiveDate,
    ) -> AllocationResult<Vec<Lot>> {
        AllocationCore::validate_identifier("tenant_id", tenant_id)?;
        if days_until_expiry < 0 {
            return Err(AllocationError::Validation(format!(
                "days_until_expiry 不能为负数 (实际 {})",
                days_until_expiry
            )));
        }

        let horizon = AllocationCore::horizon(today, days_until_expiry);

        let candidates = self
            .query
            .find_lots_expiring_between(tenant_id, today, horizon)?;
        let mut lots: Vec<Lot> = AllocationCore::filter_eligible(candidates, self.policy.as_ref())
            .into_iter()
            .filter(|lot| lot.expires_within(today, horizon))
            .collect();
        LotOrdering::Fefo.sort(&mut lots);

        debug!(count = lots.len(), horizon = %horizon, "到期批次查询完成");
        Ok(lots)
    }

    // ==========================================
    // 内部: 排序 + 贪心
    // ==========================================

    fn select_ordered(
        &self,
        ordering: LotOrdering,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        required_quantity: Decimal,
    ) -> AllocationResult<AllocationBatch> {
        AllocationCore::validate_scope(tenant_id, warehouse_id, product_id)?;
        AllocationCore::validate_required_quantity(required_quantity)?;

        let candidates = self
            .query
            .find_eligible_lots(tenant_id, warehouse_id, product_id)?;
        let candidate_count = candidates.len();
        let eligible = AllocationCore::filter_eligible(candidates, self.policy.as_ref());

        debug!(
            candidates = candidate_count,
            eligible = eligible.len(),
            "候选批次已过滤"
        );

        let allocations =
            AllocationCore::allocate_greedy(eligible, ordering, product_id, required_quantity)?;

        info!(
            lots = allocations.len(),
            quantity = %required_quantity,
            "{} 分配完成",
            ordering.as_str()
        );

        let strategy = match ordering {
            LotOrdering::Fifo => AllocationStrategy::Fifo,
            LotOrdering::Fefo => AllocationStrategy::Fefo,
        };

        Ok(AllocationBatch {
            strategy,
            tenant_id: tenant_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            product_id: product_id.to_string(),
            required_quantity,
            allocations,
        })
    }
}
