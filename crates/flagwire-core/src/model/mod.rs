// ── Domain model ──
//
// Canonical types shared by the resolver, the cache and the event loop.

pub mod event;
pub mod resolution;
pub mod value;

pub use event::{ProviderEvent, ProviderEventKind};
pub use resolution::{FlagKind, FlagType, FlagValue, Reason, ResolutionDetails};
pub use value::{EvaluationContext, Value};
