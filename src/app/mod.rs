// ==========================================
// 制造执行系统 - 应用层
// ==========================================
// 职责: 装配仓储/引擎/API，提供命令行入口
// ==========================================

pub mod cli_commands;
pub mod state;

// 重导出
pub use cli_commands::{run_command, Cli, Command};
pub use state::{get_default_db_path, AppState};
