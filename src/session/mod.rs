//! Session management: one lazily constructed engine handle per manager

mod builder;
mod manager;
pub mod prompt;
pub mod response;

pub use builder::SessionBuilder;
pub use manager::SessionManager;
pub use prompt::compose_prompt;
pub use response::{extract_json_object, parse_json_response};
