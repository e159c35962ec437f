use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

integer_id!(
    /// Identifier of an authenticated shopper.
    UserId
);

integer_id!(
    /// Identifier of a stock-keeping unit, the sellable variant of a product.
    SkuId
);

integer_id!(
    /// Identifier of a shipping address in the user's address book.
    AddressId
);

integer_id!(
    /// Identifier of the product group a SKU belongs to.
    ProductId
);

/// Coarse classification shared by every error in the storefront core.
///
/// Calling layers use it to decide how to render or relay a failure without
/// inspecting crate-specific error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed input; storage was never touched.
    Validation,
    /// A referenced entity does not exist (or is not visible to the caller).
    NotFound,
    /// Not enough inventory to satisfy the request.
    StockConflict,
    /// A transactional write could not complete after validation passed.
    CommitFailed,
    /// The payment gateway was unreachable or answered with a failure.
    ExternalGateway,
    /// Infrastructure failure outside the categories above.
    Internal,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StockConflict => "stock_conflict",
            ErrorKind::CommitFailed => "commit_failed",
            ErrorKind::ExternalGateway => "external_gateway",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
