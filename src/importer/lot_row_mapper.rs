// ==========================================
// 制造执行系统 - 批次行映射
// ==========================================
// 职责: 原始 CSV 行 → LotReceipt（类型转换 + 行级校验）
// 规则: 日期 YYYY-MM-DD；空的可选单元格 → None
// 规则: quality_status 为空时按待检 (PENDING) 入库
// ==========================================

use crate::domain::lot::LotReceipt;
use crate::domain::types::QualityStatus;
use crate::importer::csv_parser::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// 导入文件列定义
pub mod columns {
    pub const LOT_NUMBER: &str = "lot_number";
    pub const WAREHOUSE_ID: &str = "warehouse_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT: &str = "unit";
    pub const MANUFACTURED_ON: &str = "manufactured_on";
    pub const EXPIRES_ON: &str = "expires_on";
    pub const QUALITY_STATUS: &str = "quality_status";
    pub const SUPPLIER_NAME: &str = "supplier_name";
    pub const SUPPLIER_LOT_NUMBER: &str = "supplier_lot_number";
    pub const WORK_ORDER_ID: &str = "work_order_id";
    pub const REMARKS: &str = "remarks";

    /// 必需列（缺失则整个文件拒绝）
    pub const REQUIRED: [&str; 6] = [
        LOT_NUMBER,
        WAREHOUSE_ID,
        PRODUCT_ID,
        QUANTITY,
        UNIT,
        MANUFACTURED_ON,
    ];
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct LotRowMapper;

impl LotRowMapper {
    /// 映射单行
    ///
    /// # 返回
    /// - Err(FieldValueError / DateFormatError): 第一条违规
    pub fn map_row(row: &RawRow) -> ImportResult<LotReceipt> {
        let quantity = Self::decimal(row, columns::QUANTITY)?;
        if quantity <= Decimal::ZERO {
            return Err(ImportError::FieldValueError {
                row: row.row_number,
                field: columns::QUANTITY.to_string(),
                message: format!("数量必须大于 0 (实际 {})", quantity),
            });
        }

        let manufactured_on = Self::date(row, columns::MANUFACTURED_ON)?;
        let expires_on = Self::optional_date(row, columns::EXPIRES_ON)?;
        if let Some(expiry) = expires_on {
            if expiry < manufactured_on {
                return Err(ImportError::FieldValueError {
                    row: row.row_number,
                    field: columns::EXPIRES_ON.to_string(),
                    message: format!("到期日 {} 早于生产日期 {}", expiry, manufactured_on),
                });
            }
        }

        let quality_status = match row.get(columns::QUALITY_STATUS) {
            None => QualityStatus::Pending,
            Some(raw) => QualityStatus::from_str(raw).ok_or_else(|| ImportError::FieldValueError {
                row: row.row_number,
                field: columns::QUALITY_STATUS.to_string(),
                message: format!("未知质量状态: {}", raw),
            })?,
        };

        Ok(LotReceipt {
            lot_number: Self::required(row, columns::LOT_NUMBER)?,
            warehouse_id: Self::required(row, columns::WAREHOUSE_ID)?,
            product_id: Self::required(row, columns::PRODUCT_ID)?,
            quantity,
            unit: Self::required(row, columns::UNIT)?,
            manufactured_on,
            expires_on,
            quality_status,
            supplier_name: Self::optional(row, columns::SUPPLIER_NAME),
            supplier_lot_number: Self::optional(row, columns::SUPPLIER_LOT_NUMBER),
            work_order_id: Self::optional(row, columns::WORK_ORDER_ID),
            remarks: Self::optional(row, columns::REMARKS),
        })
    }

    fn required(row: &RawRow, column: &str) -> ImportResult<String> {
        row.get(column)
            .map(str::to_string)
            .ok_or_else(|| ImportError::FieldValueError {
                row: row.row_number,
                field: column.to_string(),
                message: "必填字段为空".to_string(),
            })
    }

    fn optional(row: &RawRow, column: &str) -> Option<String> {
        row.get(column).map(str::to_string)
    }

    fn decimal(row: &RawRow, column: &str) -> ImportResult<Decimal> {
        let raw = Self::required(row, column)?;
        raw.parse::<Decimal>()
            .map_err(|e| ImportError::FieldValueError {
                row: row.row_number,
                field: column.to_string(),
                message: format!("无法解析数量 '{}': {}", raw, e),
            })
    }

    fn date(row: &RawRow, column: &str) -> ImportResult<NaiveDate> {
        let raw = Self::required(row, column)?;
        Self::parse_date(row, column, &raw)
    }

    fn optional_date(row: &RawRow, column: &str) -> ImportResult<Option<NaiveDate>> {
        match row.get(column) {
            Some(raw) => Self::parse_date(row, column, raw).map(Some),
            None => Ok(None),
        }
    }

    fn parse_date(row: &RawRow, column: &str, raw: &str) -> ImportResult<NaiveDate> {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ImportError::DateFormatError {
            row: row.row_number,
            field: column.to_string(),
            value: raw.to_string(),
        })
    }
}
