//! Record types flowing through the population pipeline

pub mod bom;
pub mod override_rule;
pub mod placement;
pub mod resolved;

pub use bom::BomRecord;
pub use override_rule::{OverrideRecord, SideOverride};
pub use placement::{PlacementRecord, Side};
pub use resolved::{PlacementInstruction, ResolvedComponent, Visibility};
