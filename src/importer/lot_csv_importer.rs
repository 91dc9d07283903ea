// ==========================================
// 制造执行系统 - 批次 CSV 导入器
// ==========================================
// 流程: 解析文件 → 行映射 → 建批（RECEIPT 流水）
// 红线: 行级错误收集后跳过，不中断其余行
// 红线: 文件级错误（不存在/缺列/格式）整体失败
// ==========================================

use crate::domain::lot::Lot;
use crate::importer::csv_parser::CsvParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::lot_row_mapper::{columns, LotRowMapper};
use crate::repository::lot_repo::LotRepository;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

// ==========================================
// 导入结果
// ==========================================

/// 行级错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize, // 文件行号（表头为第 1 行）
    pub message: String,
}

/// 导入汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
    pub lot_ids: Vec<String>, // 成功建批的 lot_id（按行序）
}

impl LotImportSummary {
    fn record_error(&mut self, row: usize, message: String) {
        self.failed += 1;
        self.errors.push(ImportRowError { row, message });
    }
}

// ==========================================
// LotCsvImporter
// ==========================================
pub struct LotCsvImporter {
    lot_repo: Arc<LotRepository>,
}

impl LotCsvImporter {
    pub fn new(lot_repo: Arc<LotRepository>) -> Self {
        Self { lot_repo }
    }

    /// 从 CSV 文件导入批次
    ///
    /// # 参数
    /// - file_path: .csv 文件路径
    /// - tenant_id: 导入目标租户
    ///
    /// # 返回
    /// - Ok(LotImportSummary): 含行级错误明细
    /// - Err(ImportError): 文件级错误
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        tenant_id: &str,
    ) -> ImportResult<LotImportSummary> {
        self.import_file_as(file_path, tenant_id, None)
    }

    /// 同 import_file，附带操作人（写入 RECEIPT 流水）
    pub fn import_file_as<P: AsRef<Path>>(
        &self,
        file_path: P,
        tenant_id: &str,
        operator: Option<&str>,
    ) -> ImportResult<LotImportSummary> {
        if tenant_id.trim().is_empty() {
            return Err(ImportError::FieldValueError {
                row: 0,
                field: "tenant_id".to_string(),
                message: "租户不能为空".to_string(),
            });
        }

        let start = Instant::now();
        let rows = CsvParser::parse(file_path.as_ref(), &columns::REQUIRED)?;
        info!(total_rows = rows.len(), "文件解析完成");

        let mut summary = LotImportSummary {
            total: rows.len(),
            ..Default::default()
        };

        for row in &rows {
            let receipt = match LotRowMapper::map_row(row) {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(row_number = row.row_number, error = %e, "行映射失败");
                    summary.record_error(row.row_number, e.to_string());
                    continue;
                }
            };

            let lot = Lot::from_receipt(tenant_id, receipt, Utc::now());
            match self.lot_repo.create_lot(&lot, operator) {
                Ok(()) => {
                    summary.imported += 1;
                    summary.lot_ids.push(lot.lot_id);
                }
                Err(e) => {
                    warn!(row_number = row.row_number, lot_number = %lot.lot_number, error = %e, "建批失败");
                    summary.record_error(row.row_number, e.to_string());
                }
            }
        }

        info!(
            total = summary.total,
            imported = summary.imported,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "批次导入完成"
        );

        Ok(summary)
    }
}
