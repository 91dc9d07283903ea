// ==========================================
// 制造执行系统 - CSV 文件解析
// ==========================================
// 职责: 读取 CSV 为 "表头 → 单元格" 原始行
// 红线: 只做读取与去空白，不做类型转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始行（row_number 为文件行号，表头为第 1 行）
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    /// 取单元格（空字符串视为缺失）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

pub struct CsvParser;

impl CsvParser {
    /// 解析 CSV 文件
    ///
    /// # 参数
    /// - file_path: .csv 文件路径
    /// - required_columns: 必需表头（缺失则整个文件拒绝）
    pub fn parse(file_path: &Path, required_columns: &[&str]) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        match file_path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
            Some(ext) => {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ))
            }
            None => return Err(ImportError::UnsupportedFormat(String::new())),
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();

        for column in required_columns {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);

            let fields: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.trim().to_string()))
                .collect();

            // 跳过完全空白的行
            if fields.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(RawRow { row_number, fields });
        }

        Ok(rows)
    }
}
