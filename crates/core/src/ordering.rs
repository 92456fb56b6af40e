//! Ordering math for the bundles assigned to a row.
//!
//! Reordering is purely local until saved: moving an item swaps it with
//! its neighbour and renumbers the whole list to `1..=N`. Newly assigned
//! bundles continue after the current maximum order, which tolerates
//! gaps left by removals.

use crate::error::CoreError;
use crate::row::{BundleAssignment, BundleOrder};
use crate::types::{DbId, Guid};

/// Something carrying a 1-based display order.
pub trait Ordered {
    fn order(&self) -> i32;
    fn set_order(&mut self, order: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(CoreError::Validation(format!(
                "Invalid direction '{s}'. Must be 'up' or 'down'"
            ))),
        }
    }
}

/// Swap the item at `index` with its neighbour in `direction`.
///
/// Returns `false` and leaves the list untouched when the move would leave
/// the bounds (first item up, last item down, or `index` out of range).
pub fn move_item<T>(items: &mut [T], index: usize, direction: Direction) -> bool {
    let target = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => index.checked_add(1).filter(|i| *i < items.len()),
    };
    match target {
        Some(target) if index < items.len() => {
            items.swap(index, target);
            true
        }
        _ => false,
    }
}

/// Assign `index + 1` to every item in list order.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(index as i32 + 1);
    }
}

/// Orders for newly selected bundles: `max + 1, max + 2, ...` in
/// selection order, starting at 1 for an empty row.
pub fn next_assignments<T: Ordered>(existing: &[T], selected: &[Guid]) -> Vec<BundleAssignment> {
    let max = existing.iter().map(Ordered::order).max().unwrap_or(0);
    selected
        .iter()
        .zip(1..)
        .map(|(bundle_id, offset)| BundleAssignment {
            bundle_id: *bundle_id,
            bundle_order: max + offset,
        })
        .collect()
}

/// Items that can be addressed in a reorder request.
pub trait Reorderable: Ordered {
    fn assignment_id(&self) -> Result<DbId, CoreError>;
}

/// The full order list sent by a save.
pub fn reorder_payload<T: Reorderable>(items: &[T]) -> Result<Vec<BundleOrder>, CoreError> {
    items
        .iter()
        .map(|item| {
            Ok(BundleOrder {
                id: item.assignment_id()?,
                bundle_order: item.order(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: DbId,
        order: i32,
    }

    impl Ordered for Item {
        fn order(&self) -> i32 {
            self.order
        }
        fn set_order(&mut self, order: i32) {
            self.order = order;
        }
    }

    impl Reorderable for Item {
        fn assignment_id(&self) -> Result<DbId, CoreError> {
            Ok(self.id)
        }
    }

    fn items(orders: &[(DbId, i32)]) -> Vec<Item> {
        orders
            .iter()
            .map(|(id, order)| Item {
                id: *id,
                order: *order,
            })
            .collect()
    }

    fn ids(items: &[Item]) -> Vec<DbId> {
        items.iter().map(|i| i.id).collect()
    }

    fn orders(items: &[Item]) -> Vec<i32> {
        items.iter().map(|i| i.order).collect()
    }

    // -- move / renumber -----------------------------------------------------

    #[test]
    fn test_move_up_swaps_and_renumbers() {
        let mut list = items(&[(10, 3), (20, 7), (30, 8)]);
        assert!(move_item(&mut list, 2, Direction::Up));
        renumber(&mut list);
        assert_eq!(ids(&list), vec![10, 30, 20]);
        assert_eq!(orders(&list), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_down_swaps() {
        let mut list = items(&[(10, 1), (20, 2)]);
        assert!(move_item(&mut list, 0, Direction::Down));
        assert_eq!(ids(&list), vec![20, 10]);
    }

    #[test]
    fn test_bounds_are_noops() {
        let original = items(&[(10, 1), (20, 2), (30, 3)]);

        let mut list = original.clone();
        assert!(!move_item(&mut list, 0, Direction::Up));
        assert_eq!(list, original);

        assert!(!move_item(&mut list, 2, Direction::Down));
        assert_eq!(list, original);

        assert!(!move_item(&mut list, 9, Direction::Up));
        assert_eq!(list, original);
    }

    #[test]
    fn test_renumber_is_dense_for_every_start_permutation() {
        let perms: [[i32; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        for perm in perms {
            for index in 1..3 {
                let mut list: Vec<Item> = perm
                    .iter()
                    .map(|o| Item {
                        id: DbId::from(*o),
                        order: *o * 5,
                    })
                    .collect();
                let before = ids(&list);
                assert!(move_item(&mut list, index, Direction::Up));
                renumber(&mut list);
                assert_eq!(orders(&list), vec![1, 2, 3]);
                assert_eq!(list[index - 1].id, before[index]);
                assert_eq!(list[index].id, before[index - 1]);
            }
        }
    }

    // -- assignment ----------------------------------------------------------

    #[test]
    fn test_next_assignments_continue_after_max() {
        let existing = items(&[(1, 2), (2, 5), (3, 3)]);
        let a = Guid::new_v4();
        let b = Guid::new_v4();
        let next = next_assignments(&existing, &[a, b]);
        assert_eq!(next.len(), 2);
        assert_eq!((next[0].bundle_id, next[0].bundle_order), (a, 6));
        assert_eq!((next[1].bundle_id, next[1].bundle_order), (b, 7));
    }

    #[test]
    fn test_next_assignments_start_at_one() {
        let next = next_assignments::<Item>(&[], &[Guid::new_v4()]);
        assert_eq!(next[0].bundle_order, 1);
    }

    #[test]
    fn test_reorder_payload_lists_every_item() {
        let list = items(&[(10, 1), (20, 2)]);
        let payload = reorder_payload(&list).unwrap();
        assert_eq!(
            payload,
            vec![
                BundleOrder {
                    id: 10,
                    bundle_order: 1
                },
                BundleOrder {
                    id: 20,
                    bundle_order: 2
                },
            ]
        );
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("up").unwrap(), Direction::Up);
        assert!(Direction::parse("left").is_err());
    }
}
