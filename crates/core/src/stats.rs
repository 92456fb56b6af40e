//! Summary counts folded over a loaded collection.

use crate::bundle::{format_price, Bundle};
use crate::row::Row;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl ActivationStats {
    pub fn fold<'a>(flags: impl IntoIterator<Item = &'a bool>) -> Self {
        flags.into_iter().fold(Self::default(), |mut acc, active| {
            acc.total += 1;
            if *active {
                acc.active += 1;
            } else {
                acc.inactive += 1;
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BundleStats {
    pub activation: ActivationStats,
    /// Sum of discounted prices.
    pub total_value: f64,
}

impl BundleStats {
    pub fn total_value_display(&self) -> String {
        format_price(self.total_value)
    }
}

pub fn bundle_stats(bundles: &[Bundle]) -> BundleStats {
    BundleStats {
        activation: ActivationStats::fold(bundles.iter().map(|b| &b.is_active)),
        total_value: bundles.iter().map(Bundle::final_price).sum(),
    }
}

pub fn row_stats(rows: &[Row]) -> ActivationStats {
    ActivationStats::fold(rows.iter().map(|r| &r.is_active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(price: f64, discount: i32, active: bool) -> Bundle {
        serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "name": "b",
            "price": price,
            "discount": discount,
            "is_active": active
        }))
        .unwrap()
    }

    #[test]
    fn test_bundle_stats_fold() {
        let stats = bundle_stats(&[
            bundle(100.0, 10, true),
            bundle(50.0, 0, false),
            bundle(20.0, 50, false),
        ]);
        assert_eq!(
            stats.activation,
            ActivationStats {
                total: 3,
                active: 1,
                inactive: 2
            }
        );
        assert_eq!(stats.total_value_display(), "150.00");
    }

    #[test]
    fn test_empty_collection() {
        let stats = bundle_stats(&[]);
        assert_eq!(stats.activation.total, 0);
        assert_eq!(stats.total_value_display(), "0.00");
        assert_eq!(row_stats(&[]), ActivationStats::default());
    }
}
