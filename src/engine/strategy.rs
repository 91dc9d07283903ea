// ==========================================
// 制造执行系统 - 选批排序规则
// ==========================================
// 用途：
// - FIFO / FEFO 共用同一贪心分配流程，只替换排序比较器
// - 所有比较器以 lot_id 升序做最终 tie-break，保证结果可复现

use crate::domain::allocation::AllocationStrategy;
use crate::domain::lot::Lot;
use std::cmp::Ordering;

/// 批次排序规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LotOrdering {
    /// 生产日期升序
    Fifo,
    /// 到期日升序，无到期日排最后
    Fefo,
}

impl LotOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotOrdering::Fifo => "fifo",
            LotOrdering::Fefo => "fefo",
        }
    }

    /// 对应的比较器
    pub fn comparator(self) -> fn(&Lot, &Lot) -> Ordering {
        match self {
            LotOrdering::Fifo => fifo_order,
            LotOrdering::Fefo => fefo_order,
        }
    }

    /// 原地排序
    pub fn sort(self, lots: &mut [Lot]) {
        lots.sort_by(self.comparator());
    }

    /// 由分配策略映射；指定批次不需要排序
    pub fn for_strategy(strategy: &AllocationStrategy) -> Option<Self> {
        match strategy {
            AllocationStrategy::Fifo => Some(LotOrdering::Fifo),
            AllocationStrategy::Fefo => Some(LotOrdering::Fefo),
            AllocationStrategy::Specific { .. } => None,
        }
    }
}

/// FIFO 比较器：manufactured_on ASC, lot_id ASC
pub fn fifo_order(a: &Lot, b: &Lot) -> Ordering {
    a.manufactured_on
        .cmp(&b.manufactured_on)
        .then_with(|| a.lot_id.cmp(&b.lot_id))
}

/// FEFO 比较器：expires_on ASC (None 最后), lot_id ASC
pub fn fefo_order(a: &Lot, b: &Lot) -> Ordering {
    let by_expiry = match (a.expires_on, b.expires_on) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry.then_with(|| a.lot_id.cmp(&b.lot_id))
}
