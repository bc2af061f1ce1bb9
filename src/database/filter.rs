use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Equality lookup over record fields, the store's only query shape.
///
/// A field that is absent from a stored body compares equal to `null`.
#[derive(Debug, Clone, Default)]
pub struct FilterData {
    pub where_clause: Map<String, Value>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    /// Only records strictly past this insertion position, in `order`.
    pub after: Option<i64>,
}

impl FilterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.where_clause.insert(field.to_string(), value.into());
        self
    }

    pub fn eq_id(self, field: &str, id: Uuid) -> Self {
        self.eq(field, id.to_string())
    }

    pub fn eq_opt_id(self, field: &str, id: Option<Uuid>) -> Self {
        match id {
            Some(id) => self.eq_id(field, id),
            None => self.eq(field, Value::Null),
        }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn desc(self) -> Self {
        self.order(SortOrder::Desc)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, seq: Option<i64>) -> Self {
        self.after = seq;
        self
    }

    /// Whether a stored body satisfies every equality in the where clause.
    pub fn matches(&self, body: &Map<String, Value>) -> bool {
        self.where_clause
            .iter()
            .all(|(field, expected)| body.get(field).unwrap_or(&Value::Null) == expected)
    }

    /// Whether a record at insertion position `seq` lies past the `after` bound.
    pub fn follows(&self, seq: i64) -> bool {
        match (self.after, self.order) {
            (None, _) => true,
            (Some(after), SortOrder::Asc) => seq > after,
            (Some(after), SortOrder::Desc) => seq < after,
        }
    }

    /// The where clause as a JSON object, for containment queries.
    pub fn where_value(&self) -> Value {
        Value::Object(self.where_clause.clone())
    }
}
