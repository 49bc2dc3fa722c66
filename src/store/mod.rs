use std::collections::HashSet;

use crate::api::{OrderPage, Pagination};
use crate::domain::order::{Order, OrderId, OrderPatch};

// ============================================================================
// Order Store - client-held cache of the visible order page
// ============================================================================
//
// Written only from success branches: a confirmed mutation patches one
// record, a current-generation listing replaces the page. The generation
// counter tags every list query at issue time; a listing carrying an older
// generation is a superseded answer and is dropped. Within a current
// listing, a row older than the cached record keeps the cached record.
//
// ============================================================================

#[derive(Debug, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
    pagination: Pagination,
    selected: HashSet<OrderId>,
    generation: u64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a page, as if a first listing had been applied
    pub fn with_page(page: OrderPage) -> Self {
        Self {
            orders: page.orders,
            pagination: page.pagination,
            ..Self::default()
        }
    }

    // ========================================================================
    // Query generations
    // ========================================================================

    /// Tag a new list query. Every earlier generation becomes stale.
    pub fn begin_query(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Replace the page if `generation` is still current. Selection is
    /// pruned to the orders that remain visible.
    pub fn apply_listing(&mut self, generation: u64, page: OrderPage) -> bool {
        if !self.is_current(generation) {
            tracing::debug!(
                generation = generation,
                current = self.generation,
                "Discarding superseded listing"
            );
            return false;
        }

        // A row older than the cached record predates a confirmed mutation
        let mut kept = 0usize;
        let mut previous: Vec<Order> = std::mem::take(&mut self.orders);
        self.orders = page
            .orders
            .into_iter()
            .map(|row| match previous.iter().position(|o| o.id == row.id) {
                Some(i) if previous[i].supersedes(&row) => {
                    kept += 1;
                    previous.swap_remove(i)
                }
                _ => row,
            })
            .collect();
        self.pagination = page.pagination;

        if kept > 0 {
            tracing::debug!(
                generation = generation,
                kept = kept,
                "Kept cached records that supersede their listing rows"
            );
        }

        let visible: HashSet<&OrderId> = self.orders.iter().map(|o| &o.id).collect();
        self.selected.retain(|id| visible.contains(id));

        tracing::debug!(
            generation = generation,
            orders = self.orders.len(),
            total = self.pagination.total,
            "Listing applied"
        );
        true
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == order_id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Patch one record with fields the server confirmed. Returns false
    /// when the order is not on the page or the patch was stale.
    pub fn apply_patch(&mut self, order_id: &OrderId, patch: &OrderPatch) -> bool {
        match self.orders.iter_mut().find(|o| &o.id == order_id) {
            Some(order) => order.apply(patch),
            None => {
                tracing::debug!(order_id = %order_id, "Patch for an order not on the page");
                false
            }
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Flip selection of a visible order. Returns the new state.
    pub fn toggle_selection(&mut self, order_id: &OrderId) -> bool {
        if self.get(order_id).is_none() {
            return false;
        }
        if self.selected.remove(order_id) {
            false
        } else {
            self.selected.insert(order_id.clone());
            true
        }
    }

    pub fn is_selected(&self, order_id: &OrderId) -> bool {
        self.selected.contains(order_id)
    }

    /// Select every visible order that can still be invoiced
    pub fn select_all_visible(&mut self) {
        self.selected = self
            .orders
            .iter()
            .filter(|o| o.can_invoice())
            .map(|o| o.id.clone())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn deselect(&mut self, order_id: &OrderId) {
        self.selected.remove(order_id);
    }

    /// Selected ids in page order
    pub fn selected_ids(&self) -> Vec<OrderId> {
        self.orders
            .iter()
            .filter(|o| self.selected.contains(&o.id))
            .map(|o| o.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::sample_order;
    use crate::domain::order::OrderStatus;
    use chrono::Duration;

    fn page(orders: Vec<Order>) -> OrderPage {
        let total = orders.len() as u64;
        OrderPage {
            orders,
            pagination: Pagination { page: 1, limit: 20, total, total_pages: 1 },
        }
    }

    fn store() -> OrderStore {
        OrderStore::with_page(page(vec![
            sample_order("a", OrderStatus::OrderConfirmed),
            sample_order("b", OrderStatus::Delivered),
            sample_order("c", OrderStatus::OrderPlaced),
        ]))
    }

    #[test]
    fn test_superseded_listing_is_discarded() {
        let mut store = store();
        let first = store.begin_query();
        let second = store.begin_query();

        assert!(!store.apply_listing(first, page(vec![])));
        assert_eq!(store.orders().len(), 3);

        assert!(store.apply_listing(second, page(vec![sample_order("z", OrderStatus::Delivered)])));
        assert_eq!(store.orders().len(), 1);
        assert_eq!(store.pagination().total, 1);
    }

    #[test]
    fn test_listing_older_than_confirmed_mutation_keeps_record() {
        let mut store = store();
        let id = OrderId::new("c");
        let generation = store.begin_query();

        // Snapshot taken by the backend before the mutation below
        let snapshot = page(vec![
            sample_order("a", OrderStatus::OrderConfirmed),
            sample_order("c", OrderStatus::OrderPlaced),
        ]);

        let confirmed_at = store.get(&id).unwrap().last_updated + Duration::minutes(5);
        assert!(store.apply_patch(
            &id,
            &OrderPatch::StatusUpdated {
                status: OrderStatus::OrderConfirmed,
                delivery: None,
                last_updated: confirmed_at,
            },
        ));

        assert!(store.apply_listing(generation, snapshot));
        assert_eq!(store.orders().len(), 2);
        assert_eq!(store.get(&id).unwrap().status, OrderStatus::OrderConfirmed);
        assert_eq!(store.get(&id).unwrap().last_updated, confirmed_at);
        assert!(store.get(&OrderId::new("b")).is_none());
    }

    #[test]
    fn test_listing_does_not_undo_invoice() {
        let mut store = store();
        let id = OrderId::new("b");
        let generation = store.begin_query();

        store.apply_patch(&id, &OrderPatch::Invoiced { invoice_number: "INV-7".to_string() });
        store.apply_listing(generation, page(vec![sample_order("b", OrderStatus::Delivered)]));

        let order = store.get(&id).unwrap();
        assert!(order.is_invoiced);
        assert_eq!(order.invoice_number.as_deref(), Some("INV-7"));
    }

    #[test]
    fn test_newer_listing_row_replaces_record() {
        let mut store = store();
        let generation = store.begin_query();

        let mut row = sample_order("a", OrderStatus::InTransit);
        row.last_updated = row.last_updated + Duration::minutes(2);
        store.apply_listing(generation, page(vec![row]));

        assert_eq!(store.get(&OrderId::new("a")).unwrap().status, OrderStatus::InTransit);
    }

    #[test]
    fn test_listing_prunes_selection() {
        let mut store = store();
        store.toggle_selection(&OrderId::new("a"));
        store.toggle_selection(&OrderId::new("b"));

        let generation = store.begin_query();
        store.apply_listing(generation, page(vec![sample_order("b", OrderStatus::Delivered)]));

        assert_eq!(store.selected_ids(), vec![OrderId::new("b")]);
    }

    #[test]
    fn test_patch_updates_single_record() {
        let mut store = store();
        let id = OrderId::new("a");
        let ts = store.get(&id).unwrap().last_updated + Duration::minutes(1);

        let applied = store.apply_patch(
            &id,
            &OrderPatch::StatusUpdated { status: OrderStatus::InTransit, delivery: None, last_updated: ts },
        );

        assert!(applied);
        assert_eq!(store.get(&id).unwrap().status, OrderStatus::InTransit);
        assert_eq!(store.get(&OrderId::new("b")).unwrap().status, OrderStatus::Delivered);
    }

    #[test]
    fn test_patch_for_unknown_order() {
        let mut store = store();
        let applied = store.apply_patch(
            &OrderId::new("missing"),
            &OrderPatch::Invoiced { invoice_number: "INV-1".to_string() },
        );
        assert!(!applied);
    }

    #[test]
    fn test_selection_toggle_and_order() {
        let mut store = store();
        assert!(store.toggle_selection(&OrderId::new("c")));
        assert!(store.toggle_selection(&OrderId::new("a")));
        assert!(!store.toggle_selection(&OrderId::new("missing")));

        assert_eq!(store.selected_ids(), vec![OrderId::new("a"), OrderId::new("c")]);

        assert!(!store.toggle_selection(&OrderId::new("c")));
        assert!(!store.is_selected(&OrderId::new("c")));
    }

    #[test]
    fn test_select_all_visible_skips_non_invoiceable() {
        let mut store = store();
        store.select_all_visible();
        assert_eq!(store.selected_ids(), vec![OrderId::new("a"), OrderId::new("b")]);

        store.clear_selection();
        assert!(store.selected_ids().is_empty());
    }
}
