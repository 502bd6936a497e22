//! Listing options
//!
//! Ordering, offset and limit for `list_by_attributes` / `list_by_query`.

use crate::query_builder::ordering::SortOrder;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order_by.push((column.to_string(), order));
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}
