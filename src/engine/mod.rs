// ==========================================
// 配送时段运营核心 - 引擎层
// ==========================================
// 职责: 时段阶段判定、配送分配对账
// 红线: Engine 不拼 SQL, 通过 store trait 访问外部存储
// ==========================================

pub mod reconcile_error;
pub mod reconciler;
pub mod report;
pub mod slot_phase;
pub mod store;

// 重导出核心引擎
pub use reconcile_error::{ReconcileError, ReconcileStage};
pub use reconciler::{AssignmentReconciler, ReconcileOptions, ReconcilerSettings};
pub use report::{AssignmentOutcome, AssignmentReconcileEntry, ReconcileSummary, ReconciliationReport};
pub use slot_phase::{SlotPhaseClassifier, SlotPhaseWindows};
pub use store::{AssignmentStore, CompletionWrite, LegacyAssignmentMirror, LegacyMirrorOutcome};
