//! The Compound Builder/Executor pair: the planner's core (§4.3, §4.4).
//!
//! The builder turns a batch of [`crate::batch::IntendedOp`]s into one or
//! more [`plan::CompoundPlan`]s, each small enough to fit one COMPOUND. The
//! executor drives a plan to completion against a `Transport`/`XdrCodec`
//! pair, applying the retry policy and updating the caches as results land.

pub mod builder;
pub mod executor;
pub mod plan;

pub use builder::CompoundBuilder;
pub use executor::CompoundExecutor;
pub use plan::{CompoundPlan, PlannedOp, Role};
