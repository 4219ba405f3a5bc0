pub mod cascade;
pub mod lease;
pub mod manager;
pub mod models;
pub mod planner;
pub mod restore;
pub mod rewriter;
pub mod sweep;
pub mod team;



pub use cascade::{CascadeExecutor, ExecutionSummary};
pub use lease::{LeaseGuard, LeaseTable};
pub use manager::TrashManager;
pub use models::{
    ClearOutcome, ClearingRequestReport, InvalidTrashRecord, RestoreOutcome, TrashRecord, TrashStage,
    TrashTarget, TrashType, Trashable,
};
pub use planner::{CascadePlan, CascadePlanner, CascadeStep, Phase};
pub use restore::RestoreResolver;
pub use rewriter::{ReferenceRewriter, ReplaceOutcome};
pub use sweep::{SweepReport, Sweeper};
pub use team::TeamCascade;
