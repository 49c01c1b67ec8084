use super::CollectionPath;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
  Asc,
  Desc
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
  pub order: Order,
  pub field: String
}

impl OrderBy {
  pub fn new(order: Order, field: &str) -> Self {
    OrderBy {
      order,
      field: field.to_string()
    }
  }
}

// Builder pattern again. Only ordering and limiting are
// supported since that's all the comment feed needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
  pub collection: CollectionPath,
  pub order: Option<OrderBy>,
  pub limit: Option<usize>
}

impl CollectionQuery {

  pub fn new(collection: CollectionPath) -> Self {
    CollectionQuery {
      collection,
      order: None,
      limit: None
    }
  }

  pub fn order(mut self, order: OrderBy) -> Self {
    self.order = Some(order);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

}
