// ==========================================
// 制造执行系统 - 批次准入策略
// ==========================================
// 职责: 判定批次是否可参与分配
// 规则: 启用 && 结存 > 0 && 质量状态被准入
// 红线: 质量状态准入为可插拔谓词，不硬编码状态值
// ==========================================

use crate::config::AllocationConfigReader;
use crate::domain::lot::Lot;
use crate::domain::types::QualityStatus;
use std::collections::HashSet;
use std::error::Error;

// ==========================================
// LotEligibilityPolicy Trait
// ==========================================
pub trait LotEligibilityPolicy: Send + Sync {
    /// 质量状态是否准入
    fn admits_quality(&self, status: QualityStatus) -> bool;

    /// 批次是否可分配
    fn is_eligible(&self, lot: &Lot) -> bool {
        lot.active && !lot.is_exhausted() && self.admits_quality(lot.quality_status)
    }
}

// ==========================================
// QualityStatusPolicy - 按质量状态白名单准入
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityStatusPolicy {
    admitted: HashSet<QualityStatus>,
}

impl QualityStatusPolicy {
    pub fn new<I>(admitted: I) -> Self
    where
        I: IntoIterator<Item = QualityStatus>,
    {
        Self {
            admitted: admitted.into_iter().collect(),
        }
    }

    /// 仅准入检验合格批次
    pub fn pass_only() -> Self {
        Self::new([QualityStatus::Pass])
    }

    /// 从配置读取准入白名单
    pub async fn from_config<C>(config: &C) -> Result<Self, Box<dyn Error>>
    where
        C: AllocationConfigReader + ?Sized,
    {
        let admitted = config.get_admitted_quality_statuses().await?;
        Ok(Self::new(admitted))
    }

    pub fn admitted(&self) -> Vec<QualityStatus> {
        let mut statuses: Vec<QualityStatus> = self.admitted.iter().copied().collect();
        statuses.sort_by_key(|s| s.to_db_str());
        statuses
    }
}

impl Default for QualityStatusPolicy {
    fn default() -> Self {
        Self::pass_only()
    }
}

impl LotEligibilityPolicy for QualityStatusPolicy {
    fn admits_quality(&self, status: QualityStatus) -> bool {
        self.admitted.contains(&status)
    }
}

// ==========================================
// PredicatePolicy - 任意闭包准入
// ==========================================
pub struct PredicatePolicy<F>
where
    F: Fn(QualityStatus) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> PredicatePolicy<F>
where
    F: Fn(QualityStatus) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> LotEligibilityPolicy for PredicatePolicy<F>
where
    F: Fn(QualityStatus) -> bool + Send + Sync,
{
    fn admits_quality(&self, status: QualityStatus) -> bool {
        (self.predicate)(status)
    }
}
