pub mod app;
pub mod http;
pub mod ws;

pub use app::{build_router, AppState};
pub use ws::registry::ClientRegistry;
