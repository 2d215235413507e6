// Dashboard statistics over the shop's business day and month

pub mod handlers;
pub mod service;

pub use handlers::*;
pub use service::{Dashboard, PeriodStats, StatsService};
