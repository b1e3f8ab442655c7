//! Research agents: planning, per-section refinement, and report conclusion.

pub mod conclusion;
pub mod planner;
pub mod researcher;

pub use conclusion::ConclusionAgent;
pub use planner::PlanningAgent;
pub use researcher::{ResearcherSettings, SectionResearcher};
