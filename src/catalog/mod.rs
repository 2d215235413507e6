// Admin-curated data: recharge bonus rules and the service catalog

pub mod handlers;
pub mod models;
pub mod service;

pub use handlers::*;
pub use models::*;
pub use service::CatalogService;
