use super::core::LotRepository;
use super::row::{format_date, map_lot_row, LOT_COLUMNS};
use crate::domain::lot::Lot;
use crate::repository::error::RepositoryResult;
use crate::repository::lot_query::LotQuery;
use chrono::NaiveDate;
use rusqlite::params;

fn max_sql_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

impl LotRepository {
    // ==========================================
    // 列表查询
    // ==========================================

    /// 查询某物料在某仓库的全部批次（含停用/耗尽，用于台账展示）
    pub fn list_by_product(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<Lot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM lot
               WHERE tenant_id = ?1 AND warehouse_id = ?2 AND product_id = ?3
               ORDER BY lot_id ASC"#,
            LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lots = stmt
            .query_map(params![tenant_id, warehouse_id, product_id], map_lot_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lots)
    }

    /// 启用批次（租户 + 仓库 + 物料）
    ///
    /// # 说明
    /// - 数量列为 TEXT，结存 > 0 的过滤在映射后完成
    fn query_active_lots(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<Lot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM lot
               WHERE tenant_id = ?1 AND warehouse_id = ?2 AND product_id = ?3 AND active = 1
               ORDER BY lot_id ASC"#,
            LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lots = stmt
            .query_map(params![tenant_id, warehouse_id, product_id], map_lot_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lots.into_iter().filter(|lot| !lot.is_exhausted()).collect())
    }

    /// 到期窗口内的启用批次（ISO 日期字符串可直接做区间比较）
    fn query_expiring_lots(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Lot>> {
        // 日期列按字符串比较，超过四位年份的边界收敛到 9999-12-31
        let to = to.min(max_sql_date());
        let from = from.min(max_sql_date());

        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM lot
               WHERE tenant_id = ?1 AND active = 1
                 AND expires_on IS NOT NULL
                 AND expires_on >= ?2 AND expires_on <= ?3
               ORDER BY expires_on ASC, lot_id ASC"#,
            LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lots = stmt
            .query_map(
                params![tenant_id, format_date(from), format_date(to)],
                map_lot_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lots.into_iter().filter(|lot| !lot.is_exhausted()).collect())
    }
}

// ==========================================
// LotQuery 实现
// ==========================================
impl LotQuery for LotRepository {
    fn find_eligible_lots(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
    ) -> RepositoryResult<Vec<Lot>> {
        self.query_active_lots(tenant_id, warehouse_id, product_id)
    }

    fn find_lot_by_id(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        product_id: &str,
        lot_id: &str,
    ) -> RepositoryResult<Option<Lot>> {
        Ok(self
            .find_by_id(tenant_id, lot_id)?
            .filter(|lot| lot.warehouse_id == warehouse_id && lot.product_id == product_id))
    }

    fn find_lots_expiring_between(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Lot>> {
        self.query_expiring_lots(tenant_id, from, to)
    }
}
