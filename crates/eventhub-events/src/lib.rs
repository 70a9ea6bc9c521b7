pub mod db;
pub mod error;
pub mod gate;
pub mod store;

pub use error::GateError;
pub use gate::{
    CreateEventRequest, DeleteResponse, RsvpOutcome, RsvpRequest, UpdateEventRequest, Workflow,
};
pub use store::EventStore;
