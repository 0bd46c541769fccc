//! Domain entities shared by every service crate.
//!
//! These are semantic types, not storage rows: a `Repository` implementation
//! is free to map them onto whatever schema it likes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque entity id. Repositories are free to back this with a database
/// sequence, a UUID, or anything else that round-trips through `u64`.
pub type Id = u64;

/// A user's role. Unknown role strings fail to decode rather than being
/// silently accepted (see SPEC_FULL.md §10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access: product CRUD, user management, analytics.
    Admin,
    /// Regular shopper: own cart, own sales, own invoices.
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique id.
    pub id: Id,
    /// Unique email, compared case-insensitively by the repository.
    pub email: String,
    /// Salted password digest. Never logged, never serialized to a client.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Role.
    pub role: Role,
    /// Whether the account is active. Deactivated accounts are soft-retired,
    /// never hard-deleted, to preserve sale/invoice history.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A shipping destination owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    /// Unique id.
    pub id: Id,
    /// Owning user.
    pub user_id: Id,
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A catalog item. Created and mutated only by administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique id.
    pub id: Id,
    /// Globally unique name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Non-negative unit price.
    pub price: Decimal,
    /// Non-negative stock count.
    pub stock: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a [`Cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// The cart a user is actively building. At most one per user.
    Active,
    /// Abandoned by the user or a maintenance sweep.
    Abandoned,
    /// Converted into a sale by checkout. Terminal; never mutated again.
    Converted,
    /// Expired by policy (e.g. too old to honor stale prices).
    Expired,
}

impl CartStatus {
    /// Whether a transition from `self` to `target` is permitted.
    ///
    /// Valid moves: any non-convergent move among `{Active, Abandoned,
    /// Expired}`, and `Active -> Converted`. `Converted` is terminal.
    #[must_use]
    pub fn can_transition_to(self, target: CartStatus) -> bool {
        use CartStatus::*;
        if self == Converted {
            return false;
        }
        match (self, target) {
            (a, b) if a == b => false,
            (_, Converted) => self == Active,
            (Active, Abandoned) | (Active, Expired) => true,
            (Abandoned, Active) | (Abandoned, Expired) => true,
            (Expired, Active) | (Expired, Abandoned) => true,
            _ => false,
        }
    }
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique id.
    pub id: Id,
    /// Owning user.
    pub user_id: Id,
    /// Status.
    pub status: CartStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A line item within a cart. Removed when `quantity` transitions to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Owning cart.
    pub cart_id: Id,
    /// Referenced product.
    pub product_id: Id,
    /// Quantity in `[1, 999]`.
    pub quantity: u32,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Maximum quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// A completed purchase. Immutable after creation except for an
/// administrative total adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique id.
    pub id: Id,
    /// Buyer.
    pub user_id: Id,
    /// Total, to 2 decimal places.
    pub total: Decimal,
    /// When the sale occurred.
    pub sale_date: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A line item within a sale. `price` is captured at sale time and never
/// changes even if the product's current price later changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Owning sale.
    pub sale_id: Id,
    /// Referenced product.
    pub product_id: Id,
    /// Quantity purchased.
    pub quantity: u32,
    /// Unit price captured at the moment of sale.
    pub price: Decimal,
}

/// A document referencing one sale and one delivery address. Multiple
/// invoices may reference the same sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique id.
    pub id: Id,
    /// Referenced sale.
    pub sale_id: Id,
    /// Referenced delivery address; must belong to the sale's owner.
    pub delivery_address_id: Id,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    /// Zero-padded display number derived from the canonical storage id.
    /// The id itself, not this string, is what other entities reference.
    #[must_use]
    pub fn display_number(&self) -> String {
        format!("INV-{:08}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_transitions() {
        assert!(CartStatus::Active.can_transition_to(CartStatus::Converted));
        assert!(CartStatus::Active.can_transition_to(CartStatus::Abandoned));
        assert!(!CartStatus::Abandoned.can_transition_to(CartStatus::Converted));
        assert!(!CartStatus::Converted.can_transition_to(CartStatus::Active));
        assert!(!CartStatus::Active.can_transition_to(CartStatus::Active));
    }

    #[test]
    fn invoice_display_number_is_zero_padded() {
        let invoice = Invoice {
            id: 42,
            sale_id: 1,
            delivery_address_id: 1,
            issued_at: Utc::now(),
        };
        assert_eq!(invoice.display_number(), "INV-00000042");
    }
}
