// ==========================================
// 制造执行系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config_trait::AllocationConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::QualityStatus;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取非负整数配置，格式错误时回退默认值
    fn get_days_or_default(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<i64>() {
            Ok(days) if days >= 0 => Ok(days),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "天数配置非法，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有 global 配置的快照（JSON格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }
}

// ==========================================
// AllocationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AllocationConfigReader for ConfigManager {
    async fn get_admitted_quality_statuses(&self) -> Result<Vec<QualityStatus>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::ADMITTED_QUALITY_STATUSES, "PASS")?;

        let mut statuses: Vec<QualityStatus> = Vec::new();
        for token in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match QualityStatus::from_str(token) {
                Some(status) if !statuses.contains(&status) => statuses.push(status),
                Some(_) => {}
                None => tracing::warn!(
                    config_key = config_keys::ADMITTED_QUALITY_STATUSES,
                    token = token,
                    "未知质量状态，已忽略"
                ),
            }
        }

        if statuses.is_empty() {
            Ok(vec![QualityStatus::Pass]) // 默认值
        } else {
            Ok(statuses)
        }
    }

    async fn get_near_expiry_warning_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_days_or_default(config_keys::NEAR_EXPIRY_WARNING_DAYS, 30)
    }

    async fn get_default_expiring_window_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_days_or_default(config_keys::DEFAULT_EXPIRING_WINDOW_DAYS, 14)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 质量准入（逗号分隔，如 "PASS,PENDING"）
    pub const ADMITTED_QUALITY_STATUSES: &str = "allocation.admitted_quality_statuses";

    // 临期预警
    pub const NEAR_EXPIRY_WARNING_DAYS: &str = "allocation.near_expiry_warning_days";

    // 到期查询默认窗口
    pub const DEFAULT_EXPIRING_WINDOW_DAYS: &str = "allocation.default_expiring_window_days";
}
