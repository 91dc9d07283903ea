use crate::domain::inventory_txn::InventoryTransaction;
use crate::domain::lot::Lot;
use crate::domain::types::QualityStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;

// ==========================================
// lot 表行映射
// ==========================================

/// SELECT 列清单（顺序与 map_lot_row 对齐）
pub(super) const LOT_COLUMNS: &str = r#"
    lot_id, lot_number, tenant_id, warehouse_id, product_id,
    work_order_id, parent_lot_id, initial_quantity, current_quantity, unit,
    manufactured_on, expires_on, quality_status, supplier_name, supplier_lot_number,
    remarks, active, revision, created_at, updated_at
"#;

pub(super) fn map_lot_row(row: &Row) -> rusqlite::Result<Lot> {
    let quality_raw: String = row.get(12)?;
    let quality_status = QualityStatus::from_str(&quality_raw).ok_or_else(|| {
        conversion_error(12, format!("未知质量状态: {}", quality_raw))
    })?;

    Ok(Lot {
        lot_id: row.get(0)?,
        lot_number: row.get(1)?,
        tenant_id: row.get(2)?,
        warehouse_id: row.get(3)?,
        product_id: row.get(4)?,
        work_order_id: row.get(5)?,
        parent_lot_id: row.get(6)?,
        initial_quantity: parse_decimal(7, &row.get::<_, String>(7)?)?,
        current_quantity: parse_decimal(8, &row.get::<_, String>(8)?)?,
        unit: row.get(9)?,
        manufactured_on: parse_date(10, &row.get::<_, String>(10)?)?,
        expires_on: row
            .get::<_, Option<String>>(11)?
            .map(|s| parse_date(11, &s))
            .transpose()?,
        quality_status,
        supplier_name: row.get(13)?,
        supplier_lot_number: row.get(14)?,
        remarks: row.get(15)?,
        active: row.get::<_, i32>(16)? != 0,
        revision: row.get(17)?,
        created_at: parse_timestamp(18, &row.get::<_, String>(18)?)?,
        updated_at: parse_timestamp(19, &row.get::<_, String>(19)?)?,
    })
}

// ==========================================
// 字段转换
// ==========================================

pub(super) fn parse_decimal(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| conversion_error(idx, format!("数量格式错误 '{}': {}", raw, e)))
}

pub(super) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("日期格式错误 '{}': {}", raw, e)))
}

pub(super) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("时间戳格式错误 '{}': {}", raw, e)))
}

pub(super) fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

// ==========================================
// 写入辅助（供事务内复用）
// ==========================================

pub(super) fn insert_lot(conn: &Connection, lot: &Lot) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO lot (
            lot_id, lot_number, tenant_id, warehouse_id, product_id,
            work_order_id, parent_lot_id, initial_quantity, current_quantity, unit,
            manufactured_on, expires_on, quality_status, supplier_name, supplier_lot_number,
            remarks, active, revision, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20
        )
        "#,
        params![
            lot.lot_id,
            lot.lot_number,
            lot.tenant_id,
            lot.warehouse_id,
            lot.product_id,
            lot.work_order_id,
            lot.parent_lot_id,
            lot.initial_quantity.to_string(),
            lot.current_quantity.to_string(),
            lot.unit,
            format_date(lot.manufactured_on),
            lot.expires_on.map(format_date),
            lot.quality_status.to_db_str(),
            lot.supplier_name,
            lot.supplier_lot_number,
            lot.remarks,
            lot.active as i32,
            lot.revision,
            lot.created_at.to_rfc3339(),
            lot.updated_at.to_rfc3339(),
        ],
    )
}

pub(super) fn insert_txn(conn: &Connection, txn: &InventoryTransaction) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO inventory_txn (
            txn_id, tenant_id, lot_id, txn_type, quantity_delta,
            quantity_after, reference, operator, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            txn.txn_id,
            txn.tenant_id,
            txn.lot_id,
            txn.txn_type.to_db_str(),
            txn.quantity_delta.to_string(),
            txn.quantity_after.to_string(),
            txn.reference,
            txn.operator,
            txn.created_at.to_rfc3339(),
        ],
    )
}
