// Barber shop member ledger
//
// Members hold a prepaid balance that grows through recharges (with bonus
// tiers) and shrinks through checkouts. Every workflow commits its ledger
// record and the member's new aggregates as one unit.

pub mod app;
pub mod auth;
pub mod calendar;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod members;
pub mod models;
pub mod orders;
pub mod query;
pub mod recharge;
pub mod stats;
pub mod store;
pub mod validation;

pub use app::{create_router, ApiDoc, AppState};
pub use error::{LedgerError, LedgerResult};
