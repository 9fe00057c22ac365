//! Quantity proposal (§4.3.4): how much of an item to offer before van
//! capacity is applied.

use crate::types::Tier;

pub fn propose_quantity(
    tier: Tier,
    avg_quantity_per_visit: i32,
    must_stock_median_for_item: Option<f64>,
    trial_quantity_ceiling: i32,
) -> i32 {
    match tier {
        Tier::NewCustomer => {
            let trial = must_stock_median_for_item.unwrap_or(0.0).floor() as i32;
            trial.max(1).min(trial_quantity_ceiling)
        }
        _ => avg_quantity_per_visit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_new_customer_tiers_use_average_quantity() {
        assert_eq!(propose_quantity(Tier::MustStock, 7, None, 3), 7);
    }

    #[test]
    fn new_customer_uses_must_stock_median_capped_at_ceiling() {
        assert_eq!(propose_quantity(Tier::NewCustomer, 0, Some(9.0), 3), 3);
    }

    #[test]
    fn new_customer_trial_never_below_one() {
        assert_eq!(propose_quantity(Tier::NewCustomer, 0, Some(0.0), 3), 1);
        assert_eq!(propose_quantity(Tier::NewCustomer, 0, None, 3), 1);
    }
}
