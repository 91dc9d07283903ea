// ==========================================
// 制造执行系统 - 批次分配 API
// ==========================================
// 职责: 选批预览、领料出库、到期查询、批次维护
// 红线: 选批只读；出库在仓储事务内复核，不自动重试
// 红线: 错误显式返回调用方（ApiError），不吞错
// ==========================================

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{AllocationConfigReader, ConfigManager};
use crate::domain::allocation::{Allocation, AllocationBatch, AllocationRequest};
use crate::domain::inventory_txn::InventoryTransaction;
use crate::domain::lot::{Lot, LotReceipt};
use crate::domain::types::QualityStatus;
use crate::engine::allocation_core::AllocationCore;
use crate::engine::allocator::LotAllocator;
use crate::engine::consumption::LotConsumptionService;
use crate::engine::eligibility::QualityStatusPolicy;
use crate::importer::{LotCsvImporter, LotImportSummary};
use crate::repository::lot_repo::LotRepository;

// ==========================================
// 视图对象
// ==========================================

/// 分配明细（附临期标记）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLineView {
    pub lot_id: String,
    pub lot_number: String,
    pub allocated_quantity: Decimal,
    pub available_quantity: Decimal,
    pub expires_on: Option<NaiveDate>,
    pub near_expiry: bool,
}

impl AllocationLineView {
    fn from_allocation(allocation: &Allocation, near_expiry_horizon: NaiveDate) -> Self {
        Self {
            lot_id: allocation.lot_id.clone(),
            lot_number: allocation.lot_number.clone(),
            allocated_quantity: allocation.allocated_quantity,
            available_quantity: allocation.available_quantity,
            expires_on: allocation.expires_on,
            near_expiry: matches!(allocation.expires_on, Some(d) if d <= near_expiry_horizon),
        }
    }
}

/// 预览/出库响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub strategy: String,
    pub tenant_id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub required_quantity: Decimal,
    pub total_allocated: Decimal,
    pub lines: Vec<AllocationLineView>,
    pub issued: bool,
    pub transactions: Vec<InventoryTransaction>,
}

impl AllocationResponse {
    fn from_batch(
        batch: &AllocationBatch,
        near_expiry_horizon: NaiveDate,
        transactions: Vec<InventoryTransaction>,
    ) -> Self {
        Self {
            strategy: batch.strategy.to_string(),
            tenant_id: batch.tenant_id.clone(),
            warehouse_id: batch.warehouse_id.clone(),
            product_id: batch.product_id.clone(),
            required_quantity: batch.required_quantity,
            total_allocated: batch.total_allocated(),
            lines: batch
                .allocations
                .iter()
                .map(|a| AllocationLineView::from_allocation(a, near_expiry_horizon))
                .collect(),
            issued: !transactions.is_empty(),
            transactions,
        }
    }
}

/// 批次视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotView {
    pub lot_id: String,
    pub lot_number: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub parent_lot_id: Option<String>,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub unit: String,
    pub manufactured_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub quality_status: QualityStatus,
    pub active: bool,
    pub revision: i32,
}

impl From<Lot> for LotView {
    fn from(lot: Lot) -> Self {
        Self {
            lot_id: lot.lot_id,
            lot_number: lot.lot_number,
            warehouse_id: lot.warehouse_id,
            product_id: lot.product_id,
            parent_lot_id: lot.parent_lot_id,
            initial_quantity: lot.initial_quantity,
            current_quantity: lot.current_quantity,
            unit: lot.unit,
            manufactured_on: lot.manufactured_on,
            expires_on: lot.expires_on,
            quality_status: lot.quality_status,
            active: lot.active,
            revision: lot.revision,
        }
    }
}

/// 到期批次视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiringLotView {
    #[serde(flatten)]
    pub lot: LotView,
    pub days_until_expiry: i64,
}

// ==========================================
// LotAllocationApi
// ==========================================

/// 批次分配API
///
/// 职责：
/// 1. 选批预览（不扣减）
/// 2. 领料出库（选批 + 事务扣减）
/// 3. 到期批次查询
/// 4. 批次维护（建批/拆批/调整/停用/导入）
pub struct LotAllocationApi {
    lot_repo: Arc<LotRepository>,
    consumption: Arc<LotConsumptionService>,
    importer: Arc<LotCsvImporter>,
    config: Arc<ConfigManager>,
}

impl LotAllocationApi {
    pub fn new(
        lot_repo: Arc<LotRepository>,
        consumption: Arc<LotConsumptionService>,
        importer: Arc<LotCsvImporter>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            lot_repo,
            consumption,
            importer,
            config,
        }
    }

    // ==========================================
    // 配置解析
    // ==========================================

    /// 按当前配置的质量准入白名单构造分配引擎
    async fn allocator(&self) -> ApiResult<LotAllocator<LotRepository>> {
        let policy = QualityStatusPolicy::from_config(self.config.as_ref())
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(LotAllocator::new(self.lot_repo.clone(), Arc::new(policy)))
    }

    async fn near_expiry_horizon(&self, today: NaiveDate) -> ApiResult<NaiveDate> {
        let days = self
            .config
            .get_near_expiry_warning_days()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(AllocationCore::horizon(today, days))
    }

    // ==========================================
    // 选批与出库
    // ==========================================

    /// 选批预览（不扣减结存）
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id, product_id = %request.product_id, strategy = %request.strategy))]
    pub async fn preview_allocation(
        &self,
        request: &AllocationRequest,
        today: NaiveDate,
    ) -> ApiResult<AllocationResponse> {
        let batch = self.allocator().await?.select(request)?;
        let horizon = self.near_expiry_horizon(today).await?;
        Ok(AllocationResponse::from_batch(&batch, horizon, Vec::new()))
    }

    /// 领料出库：选批后在事务内扣减
    ///
    /// # 返回
    /// - Err(ConcurrentModification): 选批后结存被他人扣减，调用方可重新发起
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id, product_id = %request.product_id, strategy = %request.strategy))]
    pub async fn issue_material(
        &self,
        request: &AllocationRequest,
        reference: Option<&str>,
        operator: Option<&str>,
        today: NaiveDate,
    ) -> ApiResult<AllocationResponse> {
        let batch = self.allocator().await?.select(request)?;
        let txns = self
            .consumption
            .consume(&request.tenant_id, &batch, reference, operator)?;
        let horizon = self.near_expiry_horizon(today).await?;

        info!(
            lots = batch.allocations.len(),
            quantity = %batch.required_quantity,
            reference = reference.unwrap_or(""),
            "领料出库完成"
        );
        Ok(AllocationResponse::from_batch(&batch, horizon, txns))
    }

    // ==========================================
    // 到期查询
    // ==========================================

    /// 查询临近到期批次
    ///
    /// # 参数
    /// - days: 窗口天数；None 时使用配置的默认窗口
    pub async fn list_expiring_lots(
        &self,
        tenant_id: &str,
        days: Option<i64>,
        today: NaiveDate,
    ) -> ApiResult<Vec<ExpiringLotView>> {
        let days = match days {
            Some(d) => d,
            None => self
                .config
                .get_default_expiring_window_days()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };

        let lots = self
            .allocator()
            .await?
            .find_expiring_lots(tenant_id, days, today)?;

        Ok(lots
            .into_iter()
            .map(|lot| {
                let days_until_expiry = lot
                    .expires_on
                    .map(|d| (d - today).num_days())
                    .unwrap_or_default();
                ExpiringLotView {
                    lot: LotView::from(lot),
                    days_until_expiry,
                }
            })
            .collect())
    }

    // ==========================================
    // 批次维护
    // ==========================================

    /// 查询单个批次
    pub fn get_lot(&self, tenant_id: &str, lot_id: &str) -> ApiResult<LotView> {
        self.lot_repo
            .find_by_id(tenant_id, lot_id)?
            .map(LotView::from)
            .ok_or_else(|| ApiError::NotFound(format!("Lot(id={})不存在", lot_id)))
    }

    /// 查询批次库存流水
    pub fn list_lot_transactions(
        &self,
        tenant_id: &str,
        lot_id: &str,
    ) -> ApiResult<Vec<InventoryTransaction>> {
        self.get_lot(tenant_id, lot_id)?;
        Ok(self.lot_repo.list_transactions(tenant_id, lot_id)?)
    }

    /// 入库建批
    pub fn receive_lot(
        &self,
        tenant_id: &str,
        receipt: LotReceipt,
        operator: Option<&str>,
    ) -> ApiResult<LotView> {
        if tenant_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("租户不能为空".to_string()));
        }
        let lot = Lot::from_receipt(tenant_id, receipt, chrono::Utc::now());
        self.lot_repo.create_lot(&lot, operator)?;
        info!(lot_id = %lot.lot_id, lot_number = %lot.lot_number, "入库建批完成");
        Ok(LotView::from(lot))
    }

    /// 从 CSV 导入批次
    pub fn import_lots(&self, tenant_id: &str, file_path: &Path) -> ApiResult<LotImportSummary> {
        let summary = self.importer.import_file(file_path, tenant_id)?;
        if summary.failed > 0 {
            warn!(failed = summary.failed, "部分行导入失败");
        }
        Ok(summary)
    }

    /// 拆批
    pub fn split_lot(
        &self,
        tenant_id: &str,
        lot_id: &str,
        quantity: Decimal,
        new_lot_number: &str,
        operator: Option<&str>,
    ) -> ApiResult<LotView> {
        let child = self
            .lot_repo
            .split_lot(tenant_id, lot_id, quantity, new_lot_number, operator)?;
        info!(parent = lot_id, child = %child.lot_id, quantity = %quantity, "拆批完成");
        Ok(LotView::from(child))
    }

    /// 盘点调整（乐观锁）
    pub fn adjust_lot_quantity(
        &self,
        tenant_id: &str,
        lot_id: &str,
        new_quantity: Decimal,
        expected_revision: i32,
        reason: Option<&str>,
        operator: Option<&str>,
    ) -> ApiResult<LotView> {
        let lot = self.lot_repo.adjust_quantity(
            tenant_id,
            lot_id,
            new_quantity,
            expected_revision,
            reason,
            operator,
        )?;
        Ok(LotView::from(lot))
    }

    /// 停用批次
    pub fn deactivate_lot(
        &self,
        tenant_id: &str,
        lot_id: &str,
        reason: Option<&str>,
        operator: Option<&str>,
    ) -> ApiResult<()> {
        self.lot_repo
            .deactivate_lot(tenant_id, lot_id, reason, operator)?;
        Ok(())
    }
}
