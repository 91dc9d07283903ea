// ==========================================
// 制造执行系统 - 出库扣减服务
// ==========================================
// 职责: 将分配结果落库（扣减结存 + 写 ISSUE 流水）
// 红线: 事务内复核结存，基于过期快照的分配整批回滚
// 红线: 不自动重试；ConcurrentModification 交由调用方重新选批
// ==========================================

use crate::domain::allocation::AllocationBatch;
use crate::domain::inventory_txn::InventoryTransaction;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::lot_repo::LotRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct LotConsumptionService {
    lot_repo: Arc<LotRepository>,
}

impl LotConsumptionService {
    pub fn new(lot_repo: Arc<LotRepository>) -> Self {
        Self { lot_repo }
    }

    /// 按分配结果扣减
    ///
    /// # 参数
    /// - tenant_id: 请求租户（必须与 batch.tenant_id 一致）
    /// - batch: 分配引擎返回的分配批次
    /// - reference: 业务单据号（工单/领料单）
    /// - operator: 操作人
    ///
    /// # 返回
    /// - Ok(Vec<InventoryTransaction>): 每条分配对应一条 ISSUE 流水
    /// - Err(ConcurrentModification): 结存已被他人扣减
    #[instrument(skip(self, batch), fields(strategy = %batch.strategy, lines = batch.allocations.len()))]
    pub fn consume(
        &self,
        tenant_id: &str,
        batch: &AllocationBatch,
        reference: Option<&str>,
        operator: Option<&str>,
    ) -> AllocationResult<Vec<InventoryTransaction>> {
        if batch.allocations.is_empty() {
            return Err(AllocationError::Validation(
                "分配批次为空，无可扣减明细".to_string(),
            ));
        }

        match self
            .lot_repo
            .consume_allocations(tenant_id, batch, reference, operator)
        {
            Ok(txns) => {
                info!(
                    txns = txns.len(),
                    quantity = %batch.total_allocated(),
                    "出库扣减完成"
                );
                Ok(txns)
            }
            Err(e) => {
                let err = AllocationError::from(e);
                warn!(error = %err, "出库扣减失败，整批回滚");
                Err(err)
            }
        }
    }
}
