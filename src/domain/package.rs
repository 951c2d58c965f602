//! Credit package catalog offered by the `/buy` flow.

use serde::Serialize;
use utoipa::ToSchema;

/// A purchasable bundle of generation credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CreditPackage {
    /// Catalog key used in purchase requests.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Credits granted on settlement.
    pub credits: i64,
    /// Price in minor currency units (kopecks).
    pub price_minor: i64,
    /// ISO-4217 currency code.
    pub currency: &'static str,
}

/// The packages currently on sale.
pub const CATALOG: [CreditPackage; 3] = [
    CreditPackage {
        id: "10",
        name: "Starter",
        credits: 10,
        price_minor: 9_900,
        currency: "RUB",
    },
    CreditPackage {
        id: "50",
        name: "Popular",
        credits: 50,
        price_minor: 29_900,
        currency: "RUB",
    },
    CreditPackage {
        id: "200",
        name: "Pro",
        credits: 200,
        price_minor: 99_900,
        currency: "RUB",
    },
];

/// Looks up a package by catalog key. Accepts the front-end's `buy_` prefix.
#[must_use]
pub fn find_package(id: &str) -> Option<&'static CreditPackage> {
    let key = id.strip_prefix("buy_").unwrap_or(id);
    CATALOG.iter().find(|p| p.id == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_packages() {
        assert_eq!(find_package("10").map(|p| p.credits), Some(10));
        assert_eq!(find_package("buy_200").map(|p| p.price_minor), Some(99_900));
    }

    #[test]
    fn unknown_package_is_none() {
        assert!(find_package("7").is_none());
        assert!(find_package("").is_none());
    }

    #[test]
    fn catalog_keys_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            assert!(CATALOG.iter().skip(i + 1).all(|b| b.id != a.id));
        }
    }
}
