use serde::{Deserialize, Serialize};

/// Defines a database-assigned entity identifier.
///
/// Each identifier wraps the `BIGSERIAL` key of its table so that an
/// `OrderId` can never be passed where a `ProductId` is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw key.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a merchant (the shop an order belongs to).
    MerchantId
);
entity_id!(
    /// Identifier of a cashier operating a till for a merchant.
    CashierId
);
entity_id!(
    /// Identifier of a product in the catalogue.
    ProductId
);
entity_id!(
    /// Identifier of an order.
    OrderId
);
entity_id!(
    /// Identifier of a single line item within an order.
    OrderItemId
);
entity_id!(
    /// Identifier of a payment transaction.
    TransactionId
);
