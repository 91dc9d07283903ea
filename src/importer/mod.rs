// ==========================================
// 制造执行系统 - 导入层
// ==========================================
// 职责: 外部批次数据导入（CSV）
// ==========================================

pub mod csv_parser;
pub mod error;
pub mod lot_csv_importer;
pub mod lot_row_mapper;

// 重导出核心类型
pub use csv_parser::{CsvParser, RawRow};
pub use error::{ImportError, ImportResult};
pub use lot_csv_importer::{ImportRowError, LotCsvImporter, LotImportSummary};
pub use lot_row_mapper::LotRowMapper;
