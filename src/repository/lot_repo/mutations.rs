use super::core::LotRepository;
use super::row::{insert_lot, insert_txn, map_lot_row, LOT_COLUMNS};
use crate::domain::allocation::AllocationBatch;
use crate::domain::inventory_txn::InventoryTransaction;
use crate::domain::lot::Lot;
use crate::domain::types::InventoryTxnType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use uuid::Uuid;

// ==========================================
// 事务边界
// ==========================================

/// 开启 IMMEDIATE 事务（立即持有写锁）
fn begin_immediate(conn: &mut Connection) -> RepositoryResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| RepositoryError::DatabaseTransactionError(format!("开启事务失败: {}", e)))
}

fn commit(tx: Transaction<'_>) -> RepositoryResult<()> {
    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e)))
}

// ==========================================
// 事务内读取
// ==========================================
fn read_lot_in_tx(conn: &Connection, tenant_id: &str, lot_id: &str) -> RepositoryResult<Lot> {
    let sql = format!(
        "SELECT {} FROM lot WHERE tenant_id = ?1 AND lot_id = ?2",
        LOT_COLUMNS
    );
    match conn.query_row(&sql, params![tenant_id, lot_id], map_lot_row) {
        Ok(lot) => Ok(lot),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
            entity: "Lot".to_string(),
            id: lot_id.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// 带 revision 守卫的结存更新
///
/// # 返回
/// - Ok(false): revision 已变化（他人先写）
fn update_quantity_guarded(
    conn: &Connection,
    lot: &Lot,
    new_quantity: Decimal,
) -> RepositoryResult<bool> {
    let rows = conn.execute(
        r#"UPDATE lot
           SET current_quantity = ?1, revision = revision + 1, updated_at = ?2
           WHERE lot_id = ?3 AND revision = ?4"#,
        params![
            new_quantity.to_string(),
            Utc::now().to_rfc3339(),
            lot.lot_id,
            lot.revision,
        ],
    )?;
    Ok(rows == 1)
}

impl LotRepository {
    // ==========================================
    // 出库（按分配结果扣减）
    // ==========================================

    /// 按分配结果扣减结存
    ///
    /// # 并发控制
    /// - IMMEDIATE 事务：读-校验-写期间持有写锁
    /// - 每条分配在写入前复核 current_quantity >= allocated_quantity
    /// - 任一条复核失败则整批回滚
    ///
    /// # 错误
    /// - `RepositoryError::ConcurrentModification`: 分配基于过期快照
    /// - `RepositoryError::NotFound`: 批次不存在或不属于该租户
    pub fn consume_allocations(
        &self,
        tenant_id: &str,
        batch: &AllocationBatch,
        reference: Option<&str>,
        operator: Option<&str>,
    ) -> RepositoryResult<Vec<InventoryTransaction>> {
        if batch.tenant_id != tenant_id {
            return Err(RepositoryError::ValidationError(format!(
                "分配批次租户({})与请求租户({})不一致",
                batch.tenant_id, tenant_id
            )));
        }

        let mut conn = self.get_conn()?;
        let tx = begin_immediate(&mut conn)?;

        let mut txns = Vec::with_capacity(batch.allocations.len());
        for allocation in &batch.allocations {
            if allocation.allocated_quantity <= Decimal::ZERO {
                return Err(RepositoryError::FieldValueError {
                    field: "allocated_quantity".to_string(),
                    message: format!(
                        "lot_id={} 分配数量必须大于 0 (实际 {})",
                        allocation.lot_id, allocation.allocated_quantity
                    ),
                });
            }

            let lot = read_lot_in_tx(&tx, tenant_id, &allocation.lot_id)?;
            if lot.warehouse_id != batch.warehouse_id || lot.product_id != batch.product_id {
                return Err(RepositoryError::NotFound {
                    entity: "Lot".to_string(),
                    id: allocation.lot_id.clone(),
                });
            }

            let available = if lot.active {
                lot.current_quantity
            } else {
                Decimal::ZERO
            };
            if available < allocation.allocated_quantity {
                return Err(RepositoryError::ConcurrentModification {
                    lot_id: lot.lot_id,
                    requested: allocation.allocated_quantity,
                    available,
                });
            }

            let remaining = lot.current_quantity - allocation.allocated_quantity;
            if !update_quantity_guarded(&tx, &lot, remaining)? {
                return Err(RepositoryError::ConcurrentModification {
                    lot_id: lot.lot_id,
                    requested: allocation.allocated_quantity,
                    available,
                });
            }

            let txn = InventoryTransaction::new(
                tenant_id,
                &lot.lot_id,
                InventoryTxnType::Issue,
                -allocation.allocated_quantity,
                remaining,
                reference.map(str::to_string),
                operator.map(str::to_string),
            );
            insert_txn(&tx, &txn)?;
            txns.push(txn);
        }

        commit(tx)?;
        Ok(txns)
    }

    // ==========================================
    // 拆批
    // ==========================================

    /// 从母批拆出子批
    ///
    /// # 规则
    /// - 子批继承物料/仓库/日期/质量状态，initial = current = quantity
    /// - 母批扣减 quantity，且扣减后不得为负
    ///
    /// # 返回
    /// - Ok(Lot): 新生成的子批
    pub fn split_lot(
        &self,
        tenant_id: &str,
        lot_id: &str,
        quantity: Decimal,
        new_lot_number: &str,
        operator: Option<&str>,
    ) -> RepositoryResult<Lot> {
        if quantity <= Decimal::ZERO {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("拆批数量必须大于 0 (实际 {})", quantity),
            });
        }
        if new_lot_number.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "new_lot_number".to_string(),
                message: "子批批次号不能为空".to_string(),
            });
        }

        let mut conn = self.get_conn()?;
        let tx = begin_immediate(&mut conn)?;

        let parent = read_lot_in_tx(&tx, tenant_id, lot_id)?;
        if !parent.active {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "批次 {} 已停用，不能拆批",
                parent.lot_number
            )));
        }
        if parent.current_quantity < quantity {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "批次 {} 结存 {} 不足以拆出 {}",
                parent.lot_number, parent.current_quantity, quantity
            )));
        }

        let now = Utc::now();
        let child = Lot {
            lot_id: Uuid::new_v4().to_string(),
            lot_number: new_lot_number.trim().to_string(),
            parent_lot_id: Some(parent.lot_id.clone()),
            initial_quantity: quantity,
            current_quantity: quantity,
            active: true,
            revision: 0,
            created_at: now,
            updated_at: now,
            ..parent.clone()
        };

        let parent_remaining = parent.current_quantity - quantity;
        if !update_quantity_guarded(&tx, &parent, parent_remaining)? {
            let actual = read_lot_in_tx(&tx, tenant_id, lot_id)?.revision;
            return Err(RepositoryError::OptimisticLockFailure {
                lot_id: parent.lot_id,
                expected: parent.revision,
                actual,
            });
        }
        insert_lot(&tx, &child)?;

        insert_txn(
            &tx,
            &InventoryTransaction::new(
                tenant_id,
                &parent.lot_id,
                InventoryTxnType::SplitOut,
                -quantity,
                parent_remaining,
                Some(child.lot_number.clone()),
                operator.map(str::to_string),
            ),
        )?;
        insert_txn(
            &tx,
            &InventoryTransaction::new(
                tenant_id,
                &child.lot_id,
                InventoryTxnType::SplitIn,
                quantity,
                quantity,
                Some(parent.lot_number.clone()),
                operator.map(str::to_string),
            ),
        )?;

        commit(tx)?;
        Ok(child)
    }

    // ==========================================
    // 直接数量调整（盘点）
    // ==========================================

    /// 直接调整结存
    ///
    /// # 并发控制
    /// 使用乐观锁 (revision) 防止覆盖他人修改
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::FieldValueError`: new_quantity 超出 [0, initial]
    pub fn adjust_quantity(
        &self,
        tenant_id: &str,
        lot_id: &str,
        new_quantity: Decimal,
        expected_revision: i32,
        reason: Option<&str>,
        operator: Option<&str>,
    ) -> RepositoryResult<Lot> {
        let mut conn = self.get_conn()?;
        let tx = begin_immediate(&mut conn)?;

        let lot = read_lot_in_tx(&tx, tenant_id, lot_id)?;
        if lot.revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                lot_id: lot.lot_id,
                expected: expected_revision,
                actual: lot.revision,
            });
        }
        if new_quantity < Decimal::ZERO || new_quantity > lot.initial_quantity {
            return Err(RepositoryError::FieldValueError {
                field: "new_quantity".to_string(),
                message: format!(
                    "调整后结存 {} 超出 [0, {}]",
                    new_quantity, lot.initial_quantity
                ),
            });
        }

        if !update_quantity_guarded(&tx, &lot, new_quantity)? {
            let actual = read_lot_in_tx(&tx, tenant_id, lot_id)?.revision;
            return Err(RepositoryError::OptimisticLockFailure {
                lot_id: lot.lot_id,
                expected: expected_revision,
                actual,
            });
        }

        insert_txn(
            &tx,
            &InventoryTransaction::new(
                tenant_id,
                &lot.lot_id,
                InventoryTxnType::Adjust,
                new_quantity - lot.current_quantity,
                new_quantity,
                reason.map(str::to_string),
                operator.map(str::to_string),
            ),
        )?;

        let updated = read_lot_in_tx(&tx, tenant_id, lot_id)?;
        commit(tx)?;
        Ok(updated)
    }

    // ==========================================
    // 停用（软删除）
    // ==========================================

    /// 停用批次（幂等：已停用则直接返回）
    pub fn deactivate_lot(
        &self,
        tenant_id: &str,
        lot_id: &str,
        reason: Option<&str>,
        operator: Option<&str>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = begin_immediate(&mut conn)?;

        let lot = read_lot_in_tx(&tx, tenant_id, lot_id)?;
        if !lot.active {
            return Ok(());
        }

        tx.execute(
            r#"UPDATE lot
               SET active = 0, revision = revision + 1, updated_at = ?1
               WHERE lot_id = ?2"#,
            params![Utc::now().to_rfc3339(), lot.lot_id],
        )?;
        insert_txn(
            &tx,
            &InventoryTransaction::new(
                tenant_id,
                &lot.lot_id,
                InventoryTxnType::Deactivate,
                Decimal::ZERO,
                lot.current_quantity,
                reason.map(str::to_string),
                operator.map(str::to_string),
            ),
        )?;

        commit(tx)?;
        Ok(())
    }
}
