use domain::Money;

/// Settlement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Flat transit fee added to every order.
    pub transit_fee: Money,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            transit_fee: Money::from_units(10),
        }
    }
}
