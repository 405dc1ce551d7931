pub mod error;
pub mod field;
pub mod parser;
pub mod resource;

pub use error::ServiceError;
pub use resource::{ProfileResource, ResourceSettings};
