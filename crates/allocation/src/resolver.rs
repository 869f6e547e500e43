//! Vendor selection.

use ledger::Candidate;

/// Picks the vendor that fulfils `quantity` units on its own.
///
/// The winner is the cheapest candidate with `stock >= quantity`; equal
/// prices go to the smaller vendor id. Candidates with no stock are never
/// eligible. Returns `None` when no single candidate can cover the
/// quantity, even if the candidates could together.
///
/// The ledger hands candidates over already ordered by (price, vendor), in
/// which case this is the first qualifying entry. The result does not
/// depend on input order.
pub fn resolve(candidates: &[Candidate], quantity: u32) -> Option<Candidate> {
    candidates
        .iter()
        .filter(|c| c.stock > 0 && c.stock >= quantity)
        .min_by_key(|c| (c.price, c.vendor_id))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{Money, VendorId};

    fn candidate(vendor: i64, dollars: i64, stock: u32) -> Candidate {
        Candidate::new(VendorId::new(vendor), Money::from_dollars(dollars), stock)
    }

    fn widget_candidates() -> Vec<Candidate> {
        vec![candidate(3, 40, 0), candidate(2, 45, 50), candidate(1, 50, 100)]
    }

    #[test]
    fn picks_cheapest_vendor_with_enough_stock() {
        let winner = resolve(&widget_candidates(), 10).unwrap();
        assert_eq!(winner.vendor_id, VendorId::new(2));
    }

    #[test]
    fn skips_cheaper_vendor_that_cannot_cover_quantity() {
        let winner = resolve(&widget_candidates(), 60).unwrap();
        assert_eq!(winner.vendor_id, VendorId::new(1));
    }

    #[test]
    fn does_not_split_across_vendors() {
        // 150 units exist in total but no single vendor has 200.
        assert_eq!(resolve(&widget_candidates(), 200), None);
    }

    #[test]
    fn empty_candidate_set_fails() {
        assert_eq!(resolve(&[], 1), None);
    }

    #[test]
    fn equal_prices_go_to_lower_vendor_id() {
        let candidates = vec![candidate(2, 45, 50), candidate(1, 45, 50)];
        let winner = resolve(&candidates, 5).unwrap();
        assert_eq!(winner.vendor_id, VendorId::new(1));
    }

    #[test]
    fn exact_stock_match_qualifies() {
        let winner = resolve(&[candidate(7, 10, 5)], 5).unwrap();
        assert_eq!(winner.vendor_id, VendorId::new(7));
    }

    #[test]
    fn empty_rows_are_never_selected() {
        assert_eq!(resolve(&[candidate(1, 1, 0)], 0), None);
    }

    #[test]
    fn result_is_independent_of_candidate_order() {
        let base = vec![
            candidate(4, 45, 20),
            candidate(2, 45, 20),
            candidate(9, 30, 5),
            candidate(1, 60, 100),
        ];

        // Every rotation of both orderings resolves to the same winner.
        for reversed in [false, true] {
            let mut candidates = base.clone();
            if reversed {
                candidates.reverse();
            }
            for shift in 0..candidates.len() {
                candidates.rotate_left(1);
                let winner = resolve(&candidates, 10).unwrap();
                assert_eq!(winner.vendor_id, VendorId::new(2), "shift {shift}");
            }
        }
    }

    #[test]
    fn repeated_resolution_is_stable() {
        let candidates = widget_candidates();
        let first = resolve(&candidates, 10);
        for _ in 0..100 {
            assert_eq!(resolve(&candidates, 10), first);
        }
    }
}
