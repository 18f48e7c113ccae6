// ==========================================
// 配送时段运营核心 - 命令行入口
// ==========================================
// 用法:
//   delivery-slot-ops init-db [db_path]
//   delivery-slot-ops reconcile [db_path] [YYYY-MM-DD] [--dry-run]
//   delivery-slot-ops phase <HH:mm cutoff> <delay_minutes> <YYYY-MM-DD> <YYYY-MM-DDTHH:MM>
//
// 对账报告以 JSON 输出到 stdout；日志输出到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};

use delivery_slot_ops::app::{get_default_db_path, AppState};
use delivery_slot_ops::domain::DeliverySlotConfig;
use delivery_slot_ops::engine::SlotPhaseClassifier;
use delivery_slot_ops::logging;

const USAGE: &str = "用法:
  delivery-slot-ops init-db [db_path]
  delivery-slot-ops reconcile [db_path] [YYYY-MM-DD] [--dry-run]
  delivery-slot-ops phase <HH:mm cutoff> <delay_minutes> <YYYY-MM-DD> <YYYY-MM-DDTHH:MM>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("缺少子命令\n{}", USAGE);
    };

    match command.as_str() {
        "init-db" => init_db(rest),
        "reconcile" => reconcile(rest).await,
        "phase" => phase(rest),
        other => bail!("未知子命令: {}\n{}", other, USAGE),
    }
}

/// 位置参数中的数据库路径（缺省时使用默认路径）
fn db_path_arg(arg: Option<&String>) -> String {
    arg.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path)
}

fn open_state(db_path: String) -> anyhow::Result<AppState> {
    AppState::new(db_path).map_err(|e| anyhow!(e))
}

fn init_db(args: &[String]) -> anyhow::Result<()> {
    let db_path = db_path_arg(args.first());
    open_state(db_path.clone())?;
    println!("db_path={}", db_path);
    Ok(())
}

async fn reconcile(args: &[String]) -> anyhow::Result<()> {
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let db_path = db_path_arg(positional.first().copied());
    let reference_date = match positional.get(1) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("参考日期格式错误: {}", raw))?,
        None => Local::now().date_naive(),
    };

    tracing::info!(db_path = %db_path, reference_date = %reference_date, dry_run, "执行对账");

    let state = open_state(db_path)?;
    let report = state
        .delivery_ops_api
        .reconcile_assignments(reference_date, dry_run)
        .await?;

    // 单个分配失败记录在报告中，不影响退出码
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn phase(args: &[String]) -> anyhow::Result<()> {
    let [cutoff, delay, date, now] = args else {
        bail!("phase 需要 4 个参数\n{}", USAGE);
    };

    let delay: i64 = delay
        .parse()
        .with_context(|| format!("取货延迟分钟数格式错误: {}", delay))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("配送日期格式错误: {}", date))?;
    let now = NaiveDateTime::parse_from_str(now, "%Y-%m-%dT%H:%M")
        .with_context(|| format!("参考时刻格式错误: {}", now))?;

    // 命令行仅关心截单之后的阶段，开始时间取 00:00
    let config = DeliverySlotConfig::from_hhmm("00:00", cutoff, delay, date)?;
    config.validate()?;

    let phase = SlotPhaseClassifier::classify(&config, now);
    let output = serde_json::json!({
        "phase": phase,
        "accepts_orders": phase.accepts_orders(),
        "windows": SlotPhaseClassifier::windows(&config),
        "next_transition": SlotPhaseClassifier::next_transition(&config, now)
            .map(|(p, at)| serde_json::json!({ "phase": p, "at": at })),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
