use serde::{Deserialize, Serialize};

/// The fixed logical channels of the event fabric.
///
/// Each namespace carries a closed set of event shapes (see
/// [`crate::events`]); there is no generic untyped payload. Ordering is
/// guaranteed per (organization, namespace) partition only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    User,
    Employee,
    Order,
    Inventory,
    Sales,
    Alert,
    BookingDeposit,
    GiftCard,
    CustomerSpend,
    Accounting,
}

impl Namespace {
    /// All namespaces, in declaration order.
    pub const ALL: [Namespace; 10] = [
        Namespace::User,
        Namespace::Employee,
        Namespace::Order,
        Namespace::Inventory,
        Namespace::Sales,
        Namespace::Alert,
        Namespace::BookingDeposit,
        Namespace::GiftCard,
        Namespace::CustomerSpend,
        Namespace::Accounting,
    ];

    /// Returns the wire name of the namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::User => "user",
            Namespace::Employee => "employee",
            Namespace::Order => "order",
            Namespace::Inventory => "inventory",
            Namespace::Sales => "sales",
            Namespace::Alert => "alert",
            Namespace::BookingDeposit => "booking_deposit",
            Namespace::GiftCard => "gift_card",
            Namespace::CustomerSpend => "customer_spend",
            Namespace::Accounting => "accounting",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
