// ==========================================
// 制造执行系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::LotAllocationApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::consumption::LotConsumptionService;
use crate::importer::LotCsvImporter;
use crate::repository::lot_repo::LotRepository;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "MES_LOT_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 批次分配API
    pub lot_api: Arc<LotAllocationApi>,

    /// 批次仓储
    pub lot_repo: Arc<LotRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并确保表结构存在
    /// 2. 初始化Repository与Engine
    /// 3. 创建API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let lot_repo = Arc::new(LotRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let consumption = Arc::new(LotConsumptionService::new(lot_repo.clone()));
        let importer = Arc::new(LotCsvImporter::new(lot_repo.clone()));

        // ==========================================
        // 创建API实例
        // ==========================================
        let lot_api = Arc::new(LotAllocationApi::new(
            lot_repo.clone(),
            consumption,
            importer,
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            lot_api,
            lot_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 MES_LOT_DB_PATH
/// 2. 用户数据目录下 mes-lot-allocator/mes_lot.db
/// 3. 当前目录 ./mes_lot.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./mes_lot.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("mes-lot-allocator");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("mes_lot.db");
        }
    }

    path.to_string_lossy().to_string()
}
