pub mod handlers;
pub mod models;

pub use handlers::{config, AppState};
pub use models::{GenerateFormsRequest, GenerateFormsResponse};
