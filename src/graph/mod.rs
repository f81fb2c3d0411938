//! Social graph store and follow workflow
//!
//! Split into a pure planning layer ([`plan`]) that decides what a
//! workflow operation does to the relationship sets, a store ([`store`])
//! that applies those decisions as atomic array updates, and the async
//! orchestration ([`workflow`]) that wires plans to persistence and
//! notification fan-out.

pub mod plan;
pub mod store;
pub mod workflow;

pub use plan::{Effect, FollowPlan, FollowStatus, GraphUpdate, SetField, SetOp};
pub use store::GraphStore;
pub use workflow::FollowWorkflow;
