//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Order fulfilment status.
///
/// Stored as the capitalised variant name (`"Pending"`, `"Shipped"`,
/// `"Delivered"`). Transitions are unconstrained: an admin may set any status
/// from any other, including moving backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// Every status, in the order they are offered to admins.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Shipped, Self::Delivered];

    /// The stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
