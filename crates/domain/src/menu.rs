//! Menu items held by the inventory ledger.

use chrono::{DateTime, Utc};
use common::MenuItemId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Maximum length of a menu item name.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a menu item description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Image shown for items that were created without one.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200?text=Food+Item";

/// Errors raised by menu item validation and stock checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    #[error("Menu item name is required")]
    NameRequired,

    #[error("Name cannot exceed {MAX_NAME_LEN} characters (got {len})")]
    NameTooLong { len: usize },

    #[error("Description is required")]
    DescriptionRequired,

    #[error("Description cannot exceed {MAX_DESCRIPTION_LEN} characters (got {len})")]
    DescriptionTooLong { len: usize },

    #[error("Price cannot be negative: {price}")]
    NegativePrice { price: Money },

    #[error("Invalid category: {0}")]
    UnknownCategory(String),

    /// The item is switched off in the catalog.
    #[error("Menu item {name} is not available")]
    Unavailable { name: String },

    /// Current stock does not cover the requested quantity.
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },
}

/// Menu category. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Category {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
    Snacks,
    Beverages,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Breakfast,
        Category::Lunch,
        Category::Dinner,
        Category::Snacks,
        Category::Beverages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Snacks => "Snacks",
            Category::Beverages => "Beverages",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| MenuError::UnknownCategory(s.to_string()))
    }
}

/// A menu item together with its live stock count.
///
/// Stock is only changed through the inventory ledger; the type keeps it
/// unsigned so a negative count is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: Category,
    pub image: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Creates a validated, available menu item with a fresh id.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: u32,
        category: Category,
    ) -> Result<Self, MenuError> {
        let name = name.into().trim().to_string();
        let description = description.into().trim().to_string();

        if name.is_empty() {
            return Err(MenuError::NameRequired);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(MenuError::NameTooLong {
                len: name.chars().count(),
            });
        }
        if description.is_empty() {
            return Err(MenuError::DescriptionRequired);
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(MenuError::DescriptionTooLong {
                len: description.chars().count(),
            });
        }
        if price.is_negative() {
            return Err(MenuError::NegativePrice { price });
        }

        let now = Utc::now();
        Ok(Self {
            id: MenuItemId::new(),
            name,
            description,
            price,
            stock,
            category,
            image: PLACEHOLDER_IMAGE.to_string(),
            is_available: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the generated id, e.g. when loading a seed file with fixed ids.
    pub fn with_id(mut self, id: MenuItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    /// Checks whether `quantity` units can be taken right now.
    ///
    /// Callers must hold whatever lock guards this item between the check
    /// and the decrement.
    pub fn check_reservable(&self, quantity: u32) -> Result<(), MenuError> {
        if !self.is_available {
            return Err(MenuError::Unavailable {
                name: self.name.clone(),
            });
        }
        if self.stock < quantity {
            return Err(MenuError::InsufficientStock {
                name: self.name.clone(),
                available: self.stock,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Catalog fields joined into order responses.
    pub fn summary(&self) -> MenuItemSummary {
        MenuItemSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            description: self.description.clone(),
            image: self.image.clone(),
        }
    }
}

/// Display-only view of a menu item, joined onto order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemSummary {
    pub id: MenuItemId,
    pub name: String,
    pub price: Money,
    pub description: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandwich(stock: u32) -> MenuItem {
        MenuItem::new(
            "Club Sandwich",
            "Triple-decker",
            Money::from_cents(650),
            stock,
            Category::Lunch,
        )
        .unwrap()
    }

    #[test]
    fn test_new_trims_and_defaults() {
        let item = MenuItem::new("  Tea ", " Hot ", Money::from_cents(100), 5, Category::Beverages)
            .unwrap();
        assert_eq!(item.name, "Tea");
        assert_eq!(item.description, "Hot");
        assert!(item.is_available);
        assert_eq!(item.image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_new_rejects_invalid_fields() {
        assert_eq!(
            MenuItem::new(" ", "x", Money::zero(), 0, Category::Lunch).unwrap_err(),
            MenuError::NameRequired
        );
        assert!(matches!(
            MenuItem::new("a".repeat(101), "x", Money::zero(), 0, Category::Lunch),
            Err(MenuError::NameTooLong { len: 101 })
        ));
        assert_eq!(
            MenuItem::new("Tea", "", Money::zero(), 0, Category::Lunch).unwrap_err(),
            MenuError::DescriptionRequired
        );
        assert!(matches!(
            MenuItem::new("Tea", "x", Money::from_cents(-1), 0, Category::Lunch),
            Err(MenuError::NegativePrice { .. })
        ));
    }

    #[test]
    fn test_check_reservable() {
        let item = sandwich(3);
        assert!(item.check_reservable(3).is_ok());

        let err = item.check_reservable(4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Club Sandwich. Available: 3, Requested: 4"
        );

        let disabled = sandwich(3).with_availability(false);
        assert!(matches!(
            disabled.check_reservable(1),
            Err(MenuError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Snacks".parse::<Category>().unwrap(), Category::Snacks);
        assert!("Brunch".parse::<Category>().is_err());
        assert_eq!(Category::default(), Category::Lunch);
    }
}
