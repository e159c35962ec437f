//! Read-side views carrying derived values next to stored entities.

use serde::Serialize;

use super::{Money, OrderHeader, OrderLine};

/// An order line plus its computed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub line: OrderLine,
    pub amount: Money,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        let amount = line.amount();
        Self { line, amount }
    }
}

/// An order with its status name and priced lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub header: OrderHeader,
    pub status_name: &'static str,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    /// Builds the view from a header and its lines.
    pub fn new(header: OrderHeader, lines: Vec<OrderLine>) -> Self {
        Self {
            status_name: header.status.as_str(),
            header,
            lines: lines.into_iter().map(OrderLineView::from).collect(),
        }
    }

    /// Sum of line amounts (goods only).
    pub fn goods_amount(&self) -> Money {
        self.lines.iter().map(|l| l.amount).sum()
    }
}
