//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money amount stored as integer cents so totals never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a Money amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Price of `quantity` units at this unit price, saturating at the bounds.
    pub fn times(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Price of `quantity` units, or `None` if it does not fit.
    pub fn checked_times(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Sum of two amounts, or `None` if it does not fit.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

/// Renders as a plain decimal (`12.34`), the format the payment gateway expects.
impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Order identifier.
///
/// Layout: `YYYYMMDDHHMMSS` (UTC) + user id + `-` + 8 random hex digits.
/// The timestamp prefix keeps a user's orders sortable; the suffix keeps two
/// checkouts by the same user within one second from colliding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an existing order identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh identifier for `user_id` at `now`.
    pub fn generate(user_id: UserId, now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}-{}",
            now.format("%Y%m%d%H%M%S"),
            user_id,
            &suffix[..8]
        ))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How the buyer intends to pay. Codes are persisted and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayMethod {
    /// Paid in cash to the courier.
    CashOnDelivery,
    /// Offline bank transfer.
    BankTransfer,
    /// Third-party payment gateway with asynchronous confirmation.
    Gateway,
}

impl PayMethod {
    /// Every supported payment method.
    pub const ALL: [PayMethod; 3] = [
        PayMethod::CashOnDelivery,
        PayMethod::BankTransfer,
        PayMethod::Gateway,
    ];

    /// Resolves a persisted/submitted code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PayMethod::CashOnDelivery),
            2 => Some(PayMethod::BankTransfer),
            3 => Some(PayMethod::Gateway),
            _ => None,
        }
    }

    /// Returns the stable code.
    pub fn code(&self) -> i16 {
        match self {
            PayMethod::CashOnDelivery => 1,
            PayMethod::BankTransfer => 2,
            PayMethod::Gateway => 3,
        }
    }

    /// Returns the display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayMethod::CashOnDelivery => "Cash on delivery",
            PayMethod::BankTransfer => "Bank transfer",
            PayMethod::Gateway => "Online payment",
        }
    }

    /// Returns true if settlement is confirmed by the external gateway.
    pub fn uses_gateway(&self) -> bool {
        matches!(self, PayMethod::Gateway)
    }
}

impl std::fmt::Display for PayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
