// ==========================================
// 配送时段运营核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod assignment_repo;
pub mod delivery_store;
pub mod error;
pub mod legacy_assignment_repo;
pub mod order_repo;
pub mod reconcile_run_repo;
pub mod slot_repo;

// 重导出核心仓储
pub use assignment_repo::AssignmentRepository;
pub use delivery_store::SqliteDeliveryStore;
pub use error::{RepositoryError, RepositoryResult};
pub use legacy_assignment_repo::LegacyAssignmentRepository;
pub use order_repo::OrderRepository;
pub use reconcile_run_repo::ReconcileRunRepository;
pub use slot_repo::DeliverySlotRepository;
