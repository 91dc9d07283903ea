// ==========================================
// 制造执行系统 - 分配配置读取 Trait
// ==========================================
// 职责: 定义分配/出库所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::QualityStatus;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// AllocationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    /// 获取可参与分配的质量状态白名单
    ///
    /// # 返回
    /// - Vec<QualityStatus>: 准入状态列表（去重，非空）
    ///
    /// # 默认值
    /// - [PASS]
    async fn get_admitted_quality_statuses(&self) -> Result<Vec<QualityStatus>, Box<dyn Error>>;

    /// 获取临期预警天数（到期日 <= today + N 的分配明细标记为临期）
    ///
    /// # 默认值
    /// - 30
    async fn get_near_expiry_warning_days(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取到期查询的默认窗口天数
    ///
    /// # 默认值
    /// - 14
    async fn get_default_expiring_window_days(&self) -> Result<i64, Box<dyn Error>>;
}
