// Recharge workflow
// Bonus tier selection and the balance top-up that records it

pub mod bonus;
pub mod handlers;
pub mod models;
pub mod service;

pub use bonus::{select_bonus, BonusTable};
pub use handlers::*;
pub use models::*;
pub use service::{credit_recharge, RechargeReceipt, RechargeService};
