pub mod broadcast;
pub mod envelope;
pub mod frames;

pub use broadcast::Broadcast;
pub use envelope::{Envelope, NotificationKind};
pub use frames::{ConnectedFrame, ServerFrame};
