// Composite scoring engine for ranking quarterbacks.
//
// Pure computation: callers pass the roster snapshot and weight tree on every
// call, and the engine keeps no state between calls.

pub mod category;
pub mod composer;
pub mod eligibility;
pub mod error;
pub mod metrics;
pub mod population;
pub mod profile;
pub mod stats;
pub mod weights;
