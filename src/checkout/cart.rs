use rust_decimal::Decimal;
use uuid::Uuid;

use crate::checkout::models::CheckoutLineRequest;
use crate::error::{LedgerError, LedgerResult};
use crate::models::ServiceItem;
use crate::store::ConsumptionLine;
use crate::validation::{ensure_positive_amount, ensure_storable, MAX_QUANTITY};

/// Identity of a cart line
///
/// Catalog lines are keyed by service so adding the same service twice bumps
/// its quantity; custom lines get a fresh key each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartLineKey {
    Service(Uuid),
    Custom(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub key: CartLineKey,
    pub service_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    /// `None` on overflow
    pub fn subtotal(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Ordered list of lines for one checkout
///
/// Name and price are copied when a line is added, so later catalog edits do
/// not change a cart in progress. Quantities are always at least 1.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    next_custom: u32,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from request lines, resolving catalog references against
    /// an explicit snapshot of the active catalog
    pub fn from_request(lines: &[CheckoutLineRequest], catalog: &[ServiceItem]) -> LedgerResult<Self> {
        let mut cart = Cart::new();
        for line in lines {
            match line {
                CheckoutLineRequest::Service { service_id, quantity } => {
                    let item = catalog
                        .iter()
                        .find(|item| item.id == *service_id && item.is_active)
                        .ok_or_else(|| LedgerError::not_found("Service", service_id))?;
                    cart.add_service_units(item, *quantity)?;
                }
                CheckoutLineRequest::Custom {
                    name,
                    unit_price,
                    quantity,
                } => {
                    cart.add_custom(name, *unit_price, *quantity)?;
                }
            }
        }
        Ok(cart)
    }

    /// Add one unit of a catalog service
    pub fn add_service(&mut self, item: &ServiceItem) -> CartLineKey {
        let key = CartLineKey::Service(item.id);
        match self.lines.iter_mut().find(|line| line.key == key) {
            Some(line) => line.quantity += 1,
            None => self.lines.push(CartLine {
                key,
                service_name: item.name.clone(),
                unit_price: item.price,
                quantity: 1,
            }),
        }
        key
    }

    fn add_service_units(&mut self, item: &ServiceItem, quantity: i32) -> LedgerResult<CartLineKey> {
        ensure_quantity(quantity)?;
        let existing = self
            .lines
            .iter()
            .find(|line| line.key == CartLineKey::Service(item.id))
            .map_or(0, |line| line.quantity);
        ensure_quantity(existing.saturating_add(quantity))?;

        let key = self.add_service(item);
        self.adjust(key, quantity - 1);
        Ok(key)
    }

    /// Add a free-form line that is not in the catalog
    pub fn add_custom(&mut self, name: &str, unit_price: Decimal, quantity: i32) -> LedgerResult<CartLineKey> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "Custom item name must not be empty".to_string(),
            ));
        }
        ensure_positive_amount(unit_price, "unit_price")?;
        ensure_quantity(quantity)?;

        self.next_custom += 1;
        let key = CartLineKey::Custom(self.next_custom);
        self.lines.push(CartLine {
            key,
            service_name: name.to_string(),
            unit_price,
            quantity,
        });
        Ok(key)
    }

    /// Change a line's quantity by `delta`; the line is removed once it drops below 1
    pub fn adjust(&mut self, key: CartLineKey, delta: i32) {
        if let Some(pos) = self.lines.iter().position(|line| line.key == key) {
            let quantity = self.lines[pos].quantity.saturating_add(delta);
            if quantity <= 0 {
                self.lines.remove(pos);
            } else {
                self.lines[pos].quantity = quantity;
            }
        }
    }

    /// Sum of all subtotals, rejected when it cannot be stored as money
    pub fn total(&self) -> LedgerResult<Decimal> {
        let total = self
            .lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.subtotal()?));
        ensure_storable(total, "Cart total")
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Snapshot lines to store under the consumption record
    pub fn to_consumption_lines(&self) -> Vec<ConsumptionLine> {
        self.lines
            .iter()
            .map(|line| ConsumptionLine {
                service_name: line.service_name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
            })
            .collect()
    }
}

fn ensure_quantity(quantity: i32) -> LedgerResult<()> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(LedgerError::Validation(format!(
            "Quantity must be between 1 and {}, got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(crate) fn service(name: &str, price: Decimal) -> ServiceItem {
        ServiceItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            sort_order: 1,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_service_increments_quantity() {
        let haircut = service("Haircut", dec!(38));
        let mut cart = Cart::new();

        cart.add_service(&haircut);
        cart.add_service(&haircut);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.total().unwrap(), dec!(76));
    }

    #[test]
    fn test_custom_lines_are_separate() {
        let mut cart = Cart::new();
        let a = cart.add_custom("Beard oil", dec!(25.5), 1).unwrap();
        let b = cart.add_custom("Beard oil", dec!(25.5), 2).unwrap();

        assert_ne!(a, b);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total().unwrap(), dec!(76.5));
    }

    #[test]
    fn test_total_mixes_catalog_and_custom() {
        let mut cart = Cart::new();
        cart.add_service(&service("Wash", dec!(20)));
        cart.add_custom("Hair wax", dec!(45.00), 1).unwrap();
        assert_eq!(cart.total().unwrap(), dec!(65));
    }

    #[test]
    fn test_adjust_to_zero_removes_line() {
        let haircut = service("Haircut", dec!(38));
        let mut cart = Cart::new();
        let key = cart.add_service(&haircut);

        cart.adjust(key, -1);
        assert!(cart.is_empty());

        // Re-adding starts from a fresh quantity of one
        cart.add_service(&haircut);
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_adjust_never_goes_negative() {
        let mut cart = Cart::new();
        let key = cart.add_custom("Color", dec!(120), 2).unwrap();

        cart.adjust(key, -5);
        assert!(cart.is_empty());
        assert_eq!(cart.total().unwrap(), dec!(0));
    }

    #[test]
    fn test_adjust_up() {
        let mut cart = Cart::new();
        let key = cart.add_custom("Color", dec!(120), 1).unwrap();
        cart.adjust(key, 2);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_custom_line_validation() {
        let mut cart = Cart::new();
        assert!(cart.add_custom("  ", dec!(10), 1).is_err());
        assert!(cart.add_custom("Tip", dec!(0), 1).is_err());
        assert!(cart.add_custom("Tip", dec!(10), 0).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = Cart::new();
        assert!(cart.add_custom("Towel", dec!(5), MAX_QUANTITY).is_ok());
        assert!(cart.add_custom("Towel", dec!(5), MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_repeated_service_lines_share_the_quantity_cap() {
        let haircut = service("Haircut", dec!(38));
        let lines = vec![
            CheckoutLineRequest::Service {
                service_id: haircut.id,
                quantity: 600,
            },
            CheckoutLineRequest::Service {
                service_id: haircut.id,
                quantity: 600,
            },
        ];
        assert!(matches!(
            Cart::from_request(&lines, &[haircut]),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_prices_are_rejected() {
        let mut cart = Cart::new();
        assert!(cart.add_custom("Cut", Decimal::MAX, 2).is_err());
        assert!(cart.add_custom("Cut", dec!(10000000000), 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_beyond_storable_amount_is_an_error() {
        let mut cart = Cart::new();
        cart.add_custom("Gold scissors", dec!(9999999999.99), 2).unwrap();

        let err = cart.total().unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_from_request_resolves_catalog() {
        let haircut = service("Haircut", dec!(38));
        let lines = vec![
            CheckoutLineRequest::Service {
                service_id: haircut.id,
                quantity: 2,
            },
            CheckoutLineRequest::Custom {
                name: "Hair wax".to_string(),
                unit_price: dec!(45),
                quantity: 1,
            },
        ];

        let cart = Cart::from_request(&lines, &[haircut]).unwrap();
        assert_eq!(cart.total().unwrap(), dec!(121));

        let stored = cart.to_consumption_lines();
        assert_eq!(stored[0].service_name, "Haircut");
        assert_eq!(stored[0].quantity, 2);
        assert_eq!(stored[1].price, dec!(45));
    }

    #[test]
    fn test_from_request_rejects_unknown_or_inactive_service() {
        let mut haircut = service("Haircut", dec!(38));
        let unknown = vec![CheckoutLineRequest::Service {
            service_id: Uuid::new_v4(),
            quantity: 1,
        }];
        assert!(matches!(
            Cart::from_request(&unknown, &[haircut.clone()]),
            Err(LedgerError::NotFound { .. })
        ));

        haircut.is_active = false;
        let inactive = vec![CheckoutLineRequest::Service {
            service_id: haircut.id,
            quantity: 1,
        }];
        assert!(Cart::from_request(&inactive, &[haircut]).is_err());
    }
}
