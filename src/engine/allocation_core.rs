// ==========================================
// 制造执行系统 - 分配核心纯函数库
// ==========================================
// 职责: 入参校验、准入过滤、贪心分配
// 红线: 无状态、无副作用、无 I/O 操作
// 红线: 全有或全无，结存不足时不返回部分分配
// ==========================================

use crate::domain::allocation::Allocation;
use crate::domain::lot::Lot;
use crate::engine::eligibility::LotEligibilityPolicy;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::strategy::LotOrdering;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

// ==========================================
// AllocationCore - 纯函数工具类
// ==========================================
pub struct AllocationCore;

impl AllocationCore {
    /// 校验需求数量 > 0
    pub fn validate_required_quantity(required_quantity: Decimal) -> AllocationResult<()> {
        if required_quantity <= Decimal::ZERO {
            return Err(AllocationError::Validation(format!(
                "required_quantity 必须大于 0 (实际 {})",
                required_quantity
            )));
        }
        Ok(())
    }

    /// 校验标识非空
    pub fn validate_identifier(field: &str, value: &str) -> AllocationResult<()> {
        if value.trim().is_empty() {
            return Err(AllocationError::Validation(format!("{} 不能为空", field)));
        }
        Ok(())
    }

    /// 校验租户/仓库/物料三元组
    pub fn validate_scope(
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> AllocationResult<()> {
        Self::validate_identifier("tenant_id", tenant_id)?;
        Self::validate_identifier("warehouse_id", warehouse_id)?;
        Self::validate_identifier("product_id", product_id)
    }

    /// 准入过滤（启用 + 结存 > 0 + 质量准入）
    pub fn filter_eligible(lots: Vec<Lot>, policy: &dyn LotEligibilityPolicy) -> Vec<Lot> {
        lots.into_iter().filter(|lot| policy.is_eligible(lot)).collect()
    }

    /// 可分配总量（溢出时饱和到 Decimal::MAX）
    pub fn total_available(lots: &[Lot]) -> Decimal {
        lots.iter()
            .fold(Decimal::ZERO, |acc, lot| acc.saturating_add(lot.current_quantity))
    }

    /// today + days，超出日期范围时取 NaiveDate::MAX
    pub fn horizon(today: NaiveDate, days: i64) -> NaiveDate {
        Duration::try_days(days)
            .and_then(|d| today.checked_add_signed(d))
            .unwrap_or(NaiveDate::MAX)
    }

    /// 单条分配明细
    pub fn allocation_from(lot: &Lot, allocated_quantity: Decimal) -> Allocation {
        Allocation {
            lot_id: lot.lot_id.clone(),
            lot_number: lot.lot_number.clone(),
            allocated_quantity,
            available_quantity: lot.current_quantity,
            expires_on: lot.expires_on,
        }
    }

    /// 贪心分配
    ///
    /// # 规则
    /// 1. 按 ordering 排序
    /// 2. 可用总量 < 需求 → InsufficientStock（缺口 = 需求 - 可用）
    /// 3. 依序取 min(current_quantity, remaining)，直到 remaining == 0
    ///
    /// # 参数
    /// - eligible: 已过滤的可分配批次
    /// - ordering: 排序规则
    /// - product_id: 仅用于错误信息
    /// - required_quantity: 需求数量（调用方已校验 > 0）
    pub fn allocate_greedy(
        mut eligible: Vec<Lot>,
        ordering: LotOrdering,
        product_id: &str,
        required_quantity: Decimal,
    ) -> AllocationResult<Vec<Allocation>> {
        let available = Self::total_available(&eligible);
        if available < required_quantity {
            return Err(AllocationError::insufficient(
                product_id,
                required_quantity,
                available,
            ));
        }

        ordering.sort(&mut eligible);

        let mut remaining = required_quantity;
        let mut allocations = Vec::new();
        for lot in &eligible {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = lot.current_quantity.min(remaining);
            if take <= Decimal::ZERO {
                continue;
            }
            allocations.push(Self::allocation_from(lot, take));
            remaining -= take;
        }

        Ok(allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::QualityStatus;
    use crate::engine::eligibility::QualityStatusPolicy;
    use chrono::{NaiveDate, Utc};

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn lot(lot_id: &str, qty: i64, mfg: (i32, u32, u32), expiry: Option<(i32, u32, u32)>) -> Lot {
        Lot {
            lot_id: lot_id.to_string(),
            lot_number: format!("N-{}", lot_id),
            tenant_id: "T1".to_string(),
            warehouse_id: "WH1".to_string(),
            product_id: "P".to_string(),
            work_order_id: None,
            parent_lot_id: None,
            initial_quantity: dec(qty.max(1)),
            current_quantity: dec(qty),
            unit: "kg".to_string(),
            manufactured_on: NaiveDate::from_ymd_opt(mfg.0, mfg.1, mfg.2).unwrap(),
            expires_on: expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            quality_status: QualityStatus::Pass,
            supplier_name: None,
            supplier_lot_number: None,
            remarks: None,
            active: true,
            revision: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ==========================================
    // 测试 1: 入参校验
    // ==========================================

    #[test]
    fn test_validate_required_quantity() {
        assert!(AllocationCore::validate_required_quantity(dec(1)).is_ok());
        assert!(matches!(
            AllocationCore::validate_required_quantity(Decimal::ZERO),
            Err(AllocationError::Validation(_))
        ));
        assert!(matches!(
            AllocationCore::validate_required_quantity(dec(-3)),
            Err(AllocationError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_scope_rejects_blank() {
        assert!(AllocationCore::validate_scope("T1", "WH1", "P").is_ok());
        assert!(AllocationCore::validate_scope("  ", "WH1", "P").is_err());
        assert!(AllocationCore::validate_scope("T1", "", "P").is_err());
        assert!(AllocationCore::validate_scope("T1", "WH1", "").is_err());
    }

    // ==========================================
    // 测试 2: 贪心分配
    // ==========================================

    #[test]
    fn test_greedy_takes_partial_from_last_lot() {
        let lots = vec![
            lot("L2", 30, (2025, 1, 5), None),
            lot("L1", 50, (2025, 1, 1), None),
        ];
        let allocations =
            AllocationCore::allocate_greedy(lots, LotOrdering::Fifo, "P", dec(60)).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].lot_id, "L1");
        assert_eq!(allocations[0].allocated_quantity, dec(50));
        assert_eq!(allocations[1].lot_id, "L2");
        assert_eq!(allocations[1].allocated_quantity, dec(10));
        assert_eq!(allocations[1].available_quantity, dec(30));
    }

    #[test]
    fn test_greedy_stops_once_fulfilled() {
        let lots = vec![
            lot("L1", 50, (2025, 1, 1), None),
            lot("L2", 30, (2025, 1, 5), None),
        ];
        let allocations =
            AllocationCore::allocate_greedy(lots, LotOrdering::Fifo, "P", dec(50)).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].allocated_quantity, dec(50));
    }

    #[test]
    fn test_greedy_insufficient_reports_shortfall() {
        let lots = vec![
            lot("L1", 50, (2025, 1, 1), None),
            lot("L2", 30, (2025, 1, 5), None),
        ];
        let err = AllocationCore::allocate_greedy(lots, LotOrdering::Fifo, "P", dec(100))
            .unwrap_err();
        match err {
            AllocationError::InsufficientStock {
                requested,
                available,
                shortfall,
                ..
            } => {
                assert_eq!(requested, dec(100));
                assert_eq!(available, dec(80));
                assert_eq!(shortfall, dec(20));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_greedy_handles_fractional_quantities() {
        let mut a = lot("L1", 1, (2025, 1, 1), None);
        a.current_quantity = "0.75".parse().unwrap();
        let mut b = lot("L2", 1, (2025, 1, 2), None);
        b.current_quantity = "0.5".parse().unwrap();

        let required: Decimal = "1.1".parse().unwrap();
        let allocations =
            AllocationCore::allocate_greedy(vec![a, b], LotOrdering::Fifo, "P", required).unwrap();
        let total: Decimal = allocations.iter().map(|x| x.allocated_quantity).sum();
        assert_eq!(total, required);
        assert_eq!(allocations[1].allocated_quantity, "0.35".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_fefo_orders_no_expiry_last() {
        let lots = vec![
            lot("L3", 10, (2025, 1, 1), None),
            lot("L1", 10, (2025, 1, 1), Some((2025, 3, 1))),
            lot("L2", 10, (2025, 1, 1), Some((2025, 2, 1))),
        ];
        let allocations =
            AllocationCore::allocate_greedy(lots, LotOrdering::Fefo, "P", dec(25)).unwrap();
        let ids: Vec<&str> = allocations.iter().map(|a| a.lot_id.as_str()).collect();
        assert_eq!(ids, vec!["L2", "L1", "L3"]);
        assert_eq!(allocations[2].allocated_quantity, dec(5));
    }

    #[test]
    fn test_tie_break_by_lot_id() {
        let lots = vec![
            lot("B", 10, (2025, 1, 1), None),
            lot("A", 10, (2025, 1, 1), None),
        ];
        let allocations =
            AllocationCore::allocate_greedy(lots, LotOrdering::Fifo, "P", dec(15)).unwrap();
        assert_eq!(allocations[0].lot_id, "A");
        assert_eq!(allocations[1].lot_id, "B");
    }

    // ==========================================
    // 测试 3: 准入过滤
    // ==========================================

    #[test]
    fn test_filter_eligible_drops_hold_inactive_and_empty() {
        let mut hold = lot("L1", 10, (2025, 1, 1), None);
        hold.quality_status = QualityStatus::Hold;
        let mut inactive = lot("L2", 10, (2025, 1, 1), None);
        inactive.active = false;
        let empty = lot("L3", 0, (2025, 1, 1), None);
        let ok = lot("L4", 10, (2025, 1, 1), None);

        let eligible = AllocationCore::filter_eligible(
            vec![hold, inactive, empty, ok],
            &QualityStatusPolicy::default(),
        );
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].lot_id, "L4");
    }

    // ==========================================
    // 测试 4: 边界溢出
    // ==========================================

    #[test]
    fn test_horizon_clamps_out_of_range_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            AllocationCore::horizon(today, 10),
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
        );
        assert_eq!(AllocationCore::horizon(today, 0), today);
        assert_eq!(AllocationCore::horizon(today, 200_000_000_000_000), NaiveDate::MAX);
        assert_eq!(AllocationCore::horizon(today, i64::MAX), NaiveDate::MAX);
        assert_eq!(AllocationCore::horizon(today, 100_000_000), NaiveDate::MAX);
    }

    #[test]
    fn test_total_available_saturates() {
        let mut a = lot("L1", 1, (2025, 1, 1), None);
        a.current_quantity = Decimal::MAX;
        let b = lot("L2", 10, (2025, 1, 2), None);
        assert_eq!(AllocationCore::total_available(&[a, b]), Decimal::MAX);
    }
}
