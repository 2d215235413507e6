// Operator authentication
// Verifies JWTs issued by the staff directory and exposes the operator to handlers

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AdminOperator, AuthenticatedOperator};
pub use models::{Operator, Role};
pub use token::{Claims, TokenService};
