//! Hot module replacement: boundaries, invalidation and client fan-out.

mod boundary;
mod broadcast;
mod engine;
mod payload;

pub use boundary::{BoundaryKind, BoundaryPolicy, DefaultBoundaryPolicy};
pub use broadcast::{Broadcaster, ClientId, DeliveryFailure, PublishReport};
pub use engine::{FileEvent, FileEventKind, InvalidationEngine, UpdateDecision};
pub use payload::UpdatePayload;
