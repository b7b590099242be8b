// SPDX-License-Identifier: PMPL-1.0-or-later
//! Explicit bidirectional relationship wiring.
//!
//! Each relationship type supplies its own [`Association`] implementation, so
//! both sides are kept consistent without any runtime introspection.

/// Keeps both ends of a parent/child relationship in sync.
pub trait Association<P, C> {
    /// Make `child` belong to `parent` on both sides.
    fn link(&self, parent: &mut P, child: &mut C);

    /// Remove the relationship from both sides.
    fn unlink(&self, parent: &mut P, child: &mut C);
}

/// Link every child to `parent`, in order.
pub fn link_all<P, C, A>(association: &A, parent: &mut P, children: &mut [C])
where
    A: Association<P, C> + ?Sized,
{
    for child in children.iter_mut() {
        association.link(parent, child);
    }
}

/// Unlink every child from `parent`, in order.
pub fn unlink_all<P, C, A>(association: &A, parent: &mut P, children: &mut [C])
where
    A: Association<P, C> + ?Sized,
{
    for child in children.iter_mut() {
        association.unlink(parent, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Customer {
        id: u64,
        order_ids: Vec<u64>,
    }

    #[derive(Debug)]
    struct Order {
        id: u64,
        customer_id: Option<u64>,
    }

    struct CustomerOrders;

    impl Association<Customer, Order> for CustomerOrders {
        fn link(&self, parent: &mut Customer, child: &mut Order) {
            if !parent.order_ids.contains(&child.id) {
                parent.order_ids.push(child.id);
            }
            child.customer_id = Some(parent.id);
        }

        fn unlink(&self, parent: &mut Customer, child: &mut Order) {
            parent.order_ids.retain(|id| *id != child.id);
            if child.customer_id == Some(parent.id) {
                child.customer_id = None;
            }
        }
    }

    fn orders() -> Vec<Order> {
        (1..=3)
            .map(|id| Order {
                id,
                customer_id: None,
            })
            .collect()
    }

    #[test]
    fn test_link_sets_both_sides() {
        let mut customer = Customer {
            id: 7,
            ..Customer::default()
        };
        let mut order = Order {
            id: 1,
            customer_id: None,
        };
        CustomerOrders.link(&mut customer, &mut order);
        CustomerOrders.link(&mut customer, &mut order);

        assert_eq!(customer.order_ids, vec![1]);
        assert_eq!(order.customer_id, Some(7));
    }

    #[test]
    fn test_link_all_and_unlink_all() {
        let mut customer = Customer {
            id: 7,
            ..Customer::default()
        };
        let mut orders = orders();

        link_all(&CustomerOrders, &mut customer, &mut orders);
        assert_eq!(customer.order_ids, vec![1, 2, 3]);
        assert!(orders.iter().all(|o| o.customer_id == Some(7)));

        unlink_all(&CustomerOrders, &mut customer, &mut orders[..2]);
        assert_eq!(customer.order_ids, vec![3]);
        assert_eq!(orders[0].customer_id, None);
        assert_eq!(orders[2].customer_id, Some(7));
    }

    #[test]
    fn test_trait_object() {
        let association: &dyn Association<Customer, Order> = &CustomerOrders;
        let mut customer = Customer::default();
        let mut orders = orders();
        link_all(association, &mut customer, &mut orders);
        assert_eq!(customer.order_ids.len(), 3);
    }
}
