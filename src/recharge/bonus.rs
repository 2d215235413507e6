use rust_decimal::Decimal;

use crate::models::RechargeRule;

/// Bonus tiers evaluated for a recharge
///
/// Built from an explicit rule snapshot so a recharge never reads ambient
/// state. Only active rules are kept, ordered by threshold descending; the
/// sort is stable, so rules sharing a threshold keep their input order.
#[derive(Debug, Clone, Default)]
pub struct BonusTable {
    tiers: Vec<(Decimal, Decimal)>,
}

impl BonusTable {
    pub fn new(rules: &[RechargeRule]) -> Self {
        let mut tiers: Vec<(Decimal, Decimal)> = rules
            .iter()
            .filter(|rule| rule.is_active)
            .map(|rule| (rule.recharge_amount, rule.bonus_amount))
            .collect();
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers }
    }

    /// Bonus of the highest threshold that `amount` reaches, or zero
    pub fn bonus_for(&self, amount: Decimal) -> Decimal {
        self.tiers
            .iter()
            .find(|(threshold, _)| *threshold <= amount)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Select the bonus for a recharge amount from a rule set
pub fn select_bonus(amount: Decimal, rules: &[RechargeRule]) -> Decimal {
    BonusTable::new(rules).bonus_for(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    pub(crate) fn rule(threshold: Decimal, bonus: Decimal) -> RechargeRule {
        RechargeRule {
            id: Uuid::new_v4(),
            recharge_amount: threshold,
            bonus_amount: bonus,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn standard_rules() -> Vec<RechargeRule> {
        vec![
            rule(dec!(100), dec!(10)),
            rule(dec!(300), dec!(50)),
            rule(dec!(500), dec!(100)),
        ]
    }

    #[test]
    fn test_exact_threshold() {
        assert_eq!(select_bonus(dec!(300), &standard_rules()), dec!(50));
    }

    #[test]
    fn test_just_below_threshold() {
        assert_eq!(select_bonus(dec!(299), &standard_rules()), dec!(10));
    }

    #[test]
    fn test_below_every_threshold() {
        assert_eq!(select_bonus(dec!(50), &standard_rules()), dec!(0));
    }

    #[test]
    fn test_above_highest_threshold() {
        assert_eq!(select_bonus(dec!(2000), &standard_rules()), dec!(100));
    }

    #[test]
    fn test_rule_order_does_not_matter() {
        let mut rules = standard_rules();
        rules.reverse();
        assert_eq!(select_bonus(dec!(450), &rules), dec!(50));
    }

    #[test]
    fn test_inactive_rules_are_ignored() {
        let mut rules = standard_rules();
        rules[1].is_active = false;
        assert_eq!(select_bonus(dec!(300), &rules), dec!(10));
    }

    #[test]
    fn test_no_rules() {
        assert!(BonusTable::new(&[]).is_empty());
        assert_eq!(select_bonus(dec!(1000), &[]), dec!(0));
    }

    #[test]
    fn test_duplicate_thresholds_first_wins() {
        let rules = vec![rule(dec!(100), dec!(10)), rule(dec!(100), dec!(15))];
        assert_eq!(select_bonus(dec!(100), &rules), dec!(10));
    }
}
