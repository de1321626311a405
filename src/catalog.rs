//! Fixed product catalog: product name to unit price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A catalog entry as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Product {
    pub name: String,
    #[schema(value_type = String, example = "120")]
    pub price: Decimal,
}

/// In-memory menu. Names are case-sensitive keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    prices: BTreeMap<String, Decimal>,
}

impl Catalog {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self {
            prices: entries
                .into_iter()
                .map(|(name, price)| (name.into(), price))
                .collect(),
        }
    }

    pub fn price(&self, name: &str) -> Option<Decimal> {
        self.prices.get(name).copied()
    }

    /// All products, sorted by name.
    pub fn products(&self) -> Vec<Product> {
        self.prices
            .iter()
            .map(|(name, price)| Product {
                name: name.clone(),
                price: *price,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries([
            ("Veg Biryani", dec!(120)),
            ("Paneer Biryani", dec!(150)),
            ("Veg Meals", dec!(100)),
            ("Idly (2pcs)", dec!(40)),
            ("Dosa", dec!(60)),
            ("Masala Dosa", dec!(80)),
            ("Poori", dec!(70)),
            ("Chapathi", dec!(50)),
            ("Chicken Biryani", dec!(180)),
            ("Mutton Biryani", dec!(250)),
            ("Egg Biryani", dec!(140)),
            ("Chicken Fry", dec!(160)),
            ("Chicken Curry", dec!(150)),
            ("Fish Fry", dec!(200)),
            ("Prawns Curry", dec!(220)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Veg Biryani", dec!(120))]
    #[case("Idly (2pcs)", dec!(40))]
    #[case("Mutton Biryani", dec!(250))]
    #[case("Prawns Curry", dec!(220))]
    fn default_menu_prices(#[case] name: &str, #[case] expected: Decimal) {
        assert_eq!(Catalog::default().price(name), Some(expected));
    }

    #[rstest]
    #[case("Pizza")]
    #[case("veg biryani")]
    #[case("")]
    fn unknown_products_have_no_price(#[case] name: &str) {
        assert_eq!(Catalog::default().price(name), None);
    }

    #[test]
    fn default_menu_has_fifteen_dishes_sorted_by_name() {
        let products = Catalog::default().products();
        assert_eq!(products.len(), 15);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn custom_catalog_replaces_menu() {
        let catalog = Catalog::from_entries([("Tea", dec!(10))]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.price("Tea"), Some(dec!(10)));
        assert_eq!(catalog.price("Dosa"), None);
    }
}
