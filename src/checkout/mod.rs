// Checkout workflow
// Cart aggregation, payment split and the consumption record with its lines

pub mod cart;
pub mod handlers;
pub mod models;
pub mod payment;
pub mod service;

pub use cart::{Cart, CartLine, CartLineKey};
pub use handlers::*;
pub use models::*;
pub use payment::{split_payment, PaymentSplit};
pub use service::{debit_checkout, CheckoutReceipt, CheckoutService, Payment};
