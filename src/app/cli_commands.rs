// ==========================================
// 制造执行系统 - 命令行命令
// ==========================================
// 职责: 解析命令行参数并调用 LotAllocationApi
// 输出: 命令结果统一序列化为 JSON（stdout），日志写 stderr
// ==========================================

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiError, ApiResult};
use crate::app::state::{AppState, DB_PATH_ENV};
use crate::domain::allocation::{AllocationRequest, AllocationStrategy};

#[derive(Debug, Parser)]
#[command(name = "mes-lot-allocator")]
#[command(author, version, about = "制造执行系统 - 批次分配 (FIFO/FEFO/指定批次)")]
pub struct Cli {
    /// 数据库文件路径
    #[arg(long, env = DB_PATH_ENV, global = true)]
    pub db: Option<String>,

    /// 业务日期 (YYYY-MM-DD)，默认当天
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 从 CSV 导入批次
    Import {
        tenant: String,
        csv: PathBuf,
    },
    /// 选批预览（不扣减）
    Preview {
        tenant: String,
        warehouse: String,
        product: String,
        quantity: Decimal,
        /// fifo | fefo | lot:<lot_id>
        #[arg(default_value = "fifo")]
        strategy: AllocationStrategy,
    },
    /// 领料出库（选批 + 扣减）
    Issue {
        tenant: String,
        warehouse: String,
        product: String,
        quantity: Decimal,
        /// fifo | fefo | lot:<lot_id>
        #[arg(default_value = "fifo")]
        strategy: AllocationStrategy,
        /// 业务单据号
        #[arg(long = "ref")]
        reference: Option<String>,
        #[arg(long)]
        operator: Option<String>,
    },
    /// 查询临近到期批次
    Expiring {
        tenant: String,
        /// 窗口天数，缺省取配置
        days: Option<i64>,
    },
    /// 查询单个批次
    Show {
        tenant: String,
        lot_id: String,
    },
    /// 拆批
    Split {
        tenant: String,
        lot_id: String,
        quantity: Decimal,
        new_lot_number: String,
        #[arg(long)]
        operator: Option<String>,
    },
    /// 盘点调整
    Adjust {
        tenant: String,
        lot_id: String,
        quantity: Decimal,
        /// 期望 revision（乐观锁）
        revision: i32,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        operator: Option<String>,
    },
    /// 停用批次
    Deactivate {
        tenant: String,
        lot_id: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        operator: Option<String>,
    },
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(format!("JSON 序列化失败: {}", e)))
}

/// 执行命令
///
/// # 返回
/// - Ok(Value): 命令结果（JSON）
/// - Err(ApiError): 业务错误，由调用方输出并设置退出码
pub async fn run_command(state: &AppState, cli: Cli) -> ApiResult<Value> {
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let api = &state.lot_api;

    match cli.command {
        Command::Import { tenant, csv } => to_json(&api.import_lots(&tenant, &csv)?),
        Command::Preview {
            tenant,
            warehouse,
            product,
            quantity,
            strategy,
        } => {
            let request = AllocationRequest {
                tenant_id: tenant,
                warehouse_id: warehouse,
                product_id: product,
                required_quantity: quantity,
                strategy,
            };
            to_json(&api.preview_allocation(&request, today).await?)
        }
        Command::Issue {
            tenant,
            warehouse,
            product,
            quantity,
            strategy,
            reference,
            operator,
        } => {
            let request = AllocationRequest {
                tenant_id: tenant,
                warehouse_id: warehouse,
                product_id: product,
                required_quantity: quantity,
                strategy,
            };
            let response = api
                .issue_material(&request, reference.as_deref(), operator.as_deref(), today)
                .await?;
            to_json(&response)
        }
        Command::Expiring { tenant, days } => {
            to_json(&api.list_expiring_lots(&tenant, days, today).await?)
        }
        Command::Show { tenant, lot_id } => to_json(&api.get_lot(&tenant, &lot_id)?),
        Command::Split {
            tenant,
            lot_id,
            quantity,
            new_lot_number,
            operator,
        } => to_json(&api.split_lot(
            &tenant,
            &lot_id,
            quantity,
            &new_lot_number,
            operator.as_deref(),
        )?),
        Command::Adjust {
            tenant,
            lot_id,
            quantity,
            revision,
            reason,
            operator,
        } => to_json(&api.adjust_lot_quantity(
            &tenant,
            &lot_id,
            quantity,
            revision,
            reason.as_deref(),
            operator.as_deref(),
        )?),
        Command::Deactivate {
            tenant,
            lot_id,
            reason,
            operator,
        } => {
            api.deactivate_lot(&tenant, &lot_id, reason.as_deref(), operator.as_deref())?;
            Ok(serde_json::json!({ "lot_id": lot_id, "active": false }))
        }
    }
}
