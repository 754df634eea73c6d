//! Board ordering is a pure display concern: a multi-key comparator with a
//! configurable primary key, optional secondary tiebreak, and direction.

use std::cmp::Ordering;

use quaddash_types::models::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Amount,
    DiningHall,
    Dorm,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub primary: SortKey,
    pub secondary: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(primary: SortKey) -> Self {
        Self {
            primary,
            secondary: None,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(primary: SortKey) -> Self {
        Self {
            primary,
            secondary: None,
            direction: SortDirection::Descending,
        }
    }

    pub fn then(mut self, secondary: SortKey) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

fn compare_key(key: SortKey, a: &Order, b: &Order) -> Ordering {
    match key {
        SortKey::Amount => a.amount.total_cmp(&b.amount),
        // Location names compare case-insensitively
        SortKey::DiningHall => a
            .dining_hall
            .as_str()
            .to_lowercase()
            .cmp(&b.dining_hall.as_str().to_lowercase()),
        SortKey::Dorm => a
            .dorm
            .as_str()
            .to_lowercase()
            .cmp(&b.dorm.as_str().to_lowercase()),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Stable: orders equal on every configured key keep their input order.
pub fn sort_orders(orders: &mut [Order], spec: &SortSpec) {
    orders.sort_by(|a, b| {
        let mut ordering = compare_key(spec.primary, a, b);
        if ordering == Ordering::Equal {
            if let Some(secondary) = spec.secondary {
                ordering = compare_key(secondary, a, b);
            }
        }
        match spec.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quaddash_types::locations::{DeliveryWindow, DiningHall, Dorm};
    use quaddash_types::models::OrderStatus;
    use uuid::Uuid;

    fn order(tag: &str, amount: f64, hall: DiningHall, minutes_ago: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            requester_email: format!("{}@upenn.edu", tag),
            amount,
            dining_hall: hall,
            dorm: Dorm::HillCollegeHouse,
            details: None,
            delivery_window: DeliveryWindow::Asap,
            status: OrderStatus::Open,
            deliverer_email: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn tags(orders: &[Order]) -> Vec<&str> {
        orders
            .iter()
            .map(|o| o.requester_email.split('@').next().unwrap())
            .collect()
    }

    #[test]
    fn amount_ascending_is_stable_for_ties() {
        let mut orders = vec![
            order("a", 5.0, DiningHall::HoustonMarket, 0),
            order("b", 3.0, DiningHall::HoustonMarket, 0),
            order("c", 3.0, DiningHall::HoustonMarket, 0),
            order("d", 8.0, DiningHall::HoustonMarket, 0),
        ];
        sort_orders(&mut orders, &SortSpec::ascending(SortKey::Amount));
        // The two 3.0 entries keep their input order
        assert_eq!(tags(&orders), ["b", "c", "a", "d"]);
    }

    #[test]
    fn descending_reverses_but_keeps_tie_order() {
        let mut orders = vec![
            order("a", 5.0, DiningHall::HoustonMarket, 0),
            order("b", 3.0, DiningHall::HoustonMarket, 0),
            order("c", 3.0, DiningHall::HoustonMarket, 0),
        ];
        sort_orders(&mut orders, &SortSpec::descending(SortKey::Amount));
        assert_eq!(tags(&orders), ["a", "b", "c"]);
    }

    #[test]
    fn equal_primary_falls_through_to_secondary() {
        let mut orders = vec![
            order("a", 4.0, DiningHall::PretAManger, 0),
            order("b", 4.0, DiningHall::AccentureCafe, 0),
            order("c", 2.0, DiningHall::HoustonMarket, 0),
        ];
        sort_orders(
            &mut orders,
            &SortSpec::ascending(SortKey::Amount).then(SortKey::DiningHall),
        );
        assert_eq!(tags(&orders), ["c", "b", "a"]);
    }

    #[test]
    fn created_at_orders_by_recency() {
        let mut orders = vec![
            order("old", 1.0, DiningHall::HoustonMarket, 30),
            order("new", 1.0, DiningHall::HoustonMarket, 1),
        ];
        sort_orders(&mut orders, &SortSpec::descending(SortKey::CreatedAt));
        assert_eq!(tags(&orders), ["new", "old"]);
    }
}
