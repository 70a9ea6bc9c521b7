pub mod db;
pub mod error;
pub mod password;
pub mod store;
pub mod token;

pub use error::UserError;
pub use store::{AuthResponse, UserStore};
pub use token::TokenService;
