use std::collections::HashSet;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, FilterWhereInfo};
use super::types::{AttrFilter, AttrQuery, FilterOrderInfo, RecipeFilter, RecipeQuery, SqlResult};
use crate::database::models::{AttrKind, Recipe};

const ALIAS: &str = "t";

pub const ATTR_COLUMNS: &[&str] = &["id", "user_id", "name"];
pub const RECIPE_COLUMNS: &[&str] = &[
    "id", "user_id", "title", "description", "time_minutes", "price", "link", "image",
];

/// Owner-scoped SELECT over one table. There is no way to build one without an owner.
pub struct Filter {
    table_name: &'static str,
    select_columns: &'static [&'static str],
    owner: i64,
    conditions: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
}

impl Filter {
    pub fn new(table_name: &'static str, owner: i64) -> Self {
        Self {
            table_name,
            select_columns: &[],
            owner,
            conditions: vec![],
            order_data: vec![],
        }
    }

    pub fn select(mut self, columns: &'static [&'static str]) -> Self {
        self.select_columns = columns;
        self
    }

    pub fn where_info(mut self, info: FilterWhereInfo) -> Self {
        self.conditions.push(info);
        self
    }

    pub fn order(mut self, order: Vec<FilterOrderInfo>) -> Self {
        self.order_data = order;
        self
    }

    /// Tag/ingredient listing: name descending, optionally assigned-only
    pub fn attrs(kind: AttrKind, owner: i64, filter: &AttrFilter) -> Self {
        let mut query = Self::new(kind.table(), owner)
            .select(ATTR_COLUMNS)
            .order(FilterOrder::by_name_desc());
        if filter.assigned_only {
            query = query.where_info(FilterWhereInfo::Assigned {
                link_table: kind.link_table(),
                link_column: kind.link_column(),
            });
        }
        query
    }

    /// Recipe listing: id descending, optional tag and ingredient id lists
    pub fn recipes(owner: i64, filter: &RecipeFilter) -> Self {
        let mut query = Self::new("recipes", owner)
            .select(RECIPE_COLUMNS)
            .order(FilterOrder::by_id_desc());
        for kind in [AttrKind::Tag, AttrKind::Ingredient] {
            if let Some(ids) = filter.ids(kind) {
                query = query.where_info(FilterWhereInfo::LinkedToAny {
                    link_table: kind.link_table(),
                    link_column: kind.link_column(),
                    ids: ids.to_vec(),
                });
            }
        }
        query
    }

    pub fn to_sql(&self) -> SqlResult {
        let select_clause = self.build_select_clause();
        let (where_clause, params) = FilterWhere::generate(ALIAS, self.owner, &self.conditions);
        let order_clause = FilterOrder::generate(ALIAS, &self.order_data);

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\" {}", self.table_name, ALIAS),
            format!("WHERE {}", where_clause),
            order_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        SqlResult { query, params }
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() {
            format!("{}.*", ALIAS)
        } else {
            self.select_columns.iter().map(|c| format!("{}.\"{}\"", ALIAS, c)).collect::<Vec<_>>().join(", ")
        }
    }
}

impl RecipeFilter {
    pub fn ids(&self, kind: AttrKind) -> Option<&[i64]> {
        match kind {
            AttrKind::Tag => self.tags.as_deref(),
            AttrKind::Ingredient => self.ingredients.as_deref(),
        }
    }

    /// In-process evaluation of the same predicate `Filter::recipes` renders as SQL
    pub fn matches(&self, recipe: &Recipe) -> bool {
        [AttrKind::Tag, AttrKind::Ingredient].into_iter().all(|kind| match self.ids(kind) {
            None => true,
            Some(ids) => recipe.attrs(kind).iter().any(|a| ids.contains(&a.id)),
        })
    }
}

impl AttrQuery {
    pub fn into_filter(self) -> Result<AttrFilter, FilterError> {
        Ok(AttrFilter {
            assigned_only: parse_flag("assigned_only", self.assigned_only.as_deref())?,
        })
    }
}

impl RecipeQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, FilterError> {
        Ok(RecipeFilter {
            tags: parse_id_list("tags", self.tags.as_deref())?,
            ingredients: parse_id_list("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// `"1,2,3"` -> ids. Missing or blank means the filter is not applied.
pub fn parse_id_list(field: &'static str, raw: Option<&str>) -> Result<Option<Vec<i64>>, FilterError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() { continue; }
        let id = part.parse::<i64>().map_err(|_| FilterError::InvalidId { field, value: part.to_string() })?;
        ids.push(id);
    }
    Ok(if ids.is_empty() { None } else { Some(ids) })
}

pub fn parse_flag(field: &'static str, raw: Option<&str>) -> Result<bool, FilterError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(FilterError::InvalidFlag { field, value: other.to_string() }),
    }
}

/// Keep the first occurrence of each id, preserving order
pub fn dedupe_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(id(item))).collect()
}
