use serde::Deserialize;

/// One `ORDER BY` key; listings sort descending on every key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOrderInfo {
    pub column: &'static str,
}

/// Tag/ingredient list filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrFilter {
    /// Only entities referenced by at least one of the owner's recipes
    pub assigned_only: bool,
}

/// Recipe list filter. Each supplied list is an OR over its ids; supplied
/// lists are ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// Raw `?assigned_only=` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttrQuery {
    pub assigned_only: Option<String>,
}

/// Raw `?tags=1,2&ingredients=3` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    IntList(Vec<i64>),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
