use super::row::{insert_lot, insert_txn, map_lot_row, parse_decimal, parse_timestamp, LOT_COLUMNS};
use crate::db::open_sqlite_connection;
use crate::domain::inventory_txn::InventoryTransaction;
use crate::domain::lot::Lot;
use crate::domain::types::InventoryTxnType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// LotRepository - 批次仓储
// ==========================================
/// 批次仓储
/// 职责: 管理 lot / inventory_txn 表
/// 红线: 不含选批逻辑，只负责数据访问
pub struct LotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LotRepository {
    /// 创建新的 LotRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 建批
    // ==========================================

    /// 新建批次（入库），同时写 RECEIPT 流水
    ///
    /// # 返回
    /// - Err(ValidationError): 数量/标识不变式违反
    /// - Err(UniqueConstraintViolation): 租户内批次号重复
    pub fn create_lot(&self, lot: &Lot, operator: Option<&str>) -> RepositoryResult<()> {
        lot.validate().map_err(RepositoryError::ValidationError)?;

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        insert_lot(&tx, lot)?;
        insert_txn(
            &tx,
            &InventoryTransaction::new(
                &lot.tenant_id,
                &lot.lot_id,
                InventoryTxnType::Receipt,
                lot.current_quantity,
                lot.current_quantity,
                lot.work_order_id.clone(),
                operator.map(str::to_string),
            ),
        )?;

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 单条查询
    // ==========================================

    /// 按 lot_id 查询（租户范围，不区分启用状态）
    pub fn find_by_id(&self, tenant_id: &str, lot_id: &str) -> RepositoryResult<Option<Lot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM lot WHERE tenant_id = ?1 AND lot_id = ?2",
            LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![tenant_id, lot_id], map_lot_row) {
            Ok(lot) => Ok(Some(lot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按批次号查询（租户内唯一）
    pub fn find_by_lot_number(
        &self,
        tenant_id: &str,
        lot_number: &str,
    ) -> RepositoryResult<Option<Lot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM lot WHERE tenant_id = ?1 AND lot_number = ?2",
            LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![tenant_id, lot_number], map_lot_row) {
            Ok(lot) => Ok(Some(lot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询批次的库存流水（按时间升序）
    pub fn list_transactions(
        &self,
        tenant_id: &str,
        lot_id: &str,
    ) -> RepositoryResult<Vec<InventoryTransaction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT txn_id, tenant_id, lot_id, txn_type, quantity_delta,
                   quantity_after, reference, operator, created_at
            FROM inventory_txn
            WHERE tenant_id = ?1 AND lot_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;

        let txns = stmt
            .query_map(params![tenant_id, lot_id], |row| {
                let txn_type_raw: String = row.get(3)?;
                let txn_type = InventoryTxnType::from_str(&txn_type_raw).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        format!("未知流水类型: {}", txn_type_raw).into(),
                    )
                })?;
                Ok(InventoryTransaction {
                    txn_id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    lot_id: row.get(2)?,
                    txn_type,
                    quantity_delta: parse_decimal(4, &row.get::<_, String>(4)?)?,
                    quantity_after: parse_decimal(5, &row.get::<_, String>(5)?)?,
                    reference: row.get(6)?,
                    operator: row.get(7)?,
                    created_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(txns)
    }
}
