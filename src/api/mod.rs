// ==========================================
// 配送时段运营核心 - API 层
// ==========================================
// 职责: 输入校验 + 错误转换，供定时任务与命令行调用
// ==========================================

pub mod delivery_ops_api;
pub mod error;

pub use delivery_ops_api::{DeliveryOpsApi, SlotPhaseInfo};
pub use error::{ApiError, ApiResult};
