//! Task allocation and execution: the auction, the registries, the
//! scheduler, and the orchestrator façade.

pub mod aggregate;
pub mod auction;
pub mod decompose;
pub mod executor;
pub mod orchestrator;
pub mod scheduler;

pub use aggregate::{AggregateFn, AggregationRegistry};
pub use auction::{run_auction, Allocation, Bid, RoleAssignment};
pub use decompose::{DecomposeFn, DecompositionRegistry};
pub use executor::{WorkContext, WorkExecutor};
pub use orchestrator::{Orchestrator, SystemIntelligence};
pub use scheduler::{Scheduler, SchedulerEvent};
