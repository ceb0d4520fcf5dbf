use domain::{Category, MenuItem, Order, OrderStatus};

/// Builder for order listing filters.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by status.
    pub status: Option<OrderStatus>,

    /// Filter by the phone number the customer ordered with.
    pub customer_phone: Option<String>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one customer's orders.
    pub fn for_customer_phone(phone: impl Into<String>) -> Self {
        Self {
            customer_phone: Some(phone.into()),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by customer phone.
    pub fn customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    /// Returns true if `order` passes every filter that is set.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        if let Some(ref phone) = self.customer_phone
            && order.customer_phone() != phone
        {
            return false;
        }
        true
    }
}

/// Builder for menu listing filters.
#[derive(Debug, Clone, Default)]
pub struct MenuQuery {
    /// Filter by category.
    pub category: Option<Category>,

    /// Only return items that are switched on.
    pub available_only: bool,
}

impl MenuQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn available_only(mut self) -> Self {
        self.available_only = true;
        self
    }

    /// Returns true if `item` passes every filter that is set.
    pub fn matches(&self, item: &MenuItem) -> bool {
        if let Some(category) = self.category
            && item.category != category
        {
            return false;
        }
        !self.available_only || item.is_available
    }
}
