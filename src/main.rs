// ==========================================
// 制造执行系统 - 批次分配命令行入口
// ==========================================
// 输出: 成功时 stdout 打印 JSON；失败时 stderr 打印错误并以非零码退出
// ==========================================

use clap::Parser;
use mes_lot_allocator::app::{get_default_db_path, run_command, AppState, Cli};
use mes_lot_allocator::logging;

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();

    tracing::info!("{} v{}", mes_lot_allocator::APP_NAME, mes_lot_allocator::VERSION);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState 初始化失败: {}", e);
            std::process::exit(2);
        }
    };

    match run_command(&state, cli).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                tracing::error!("结果序列化失败: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("命令执行失败: {}", e);
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            std::process::exit(1);
        }
    }
}
