use super::types::SqlParam;

/// One owner-scoped predicate on the filtered table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterWhereInfo {
    /// Recipe row linked through `link_table` to at least one of `ids`
    LinkedToAny {
        link_table: &'static str,
        link_column: &'static str,
        ids: Vec<i64>,
    },
    /// Tag/ingredient row referenced by at least one of the owner's recipes
    Assigned {
        link_table: &'static str,
        link_column: &'static str,
    },
}

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    conditions: Vec<String>,
}

impl FilterWhere {
    /// `$1` is always the owner; every generated clause starts with the owner predicate
    pub fn generate(alias: &str, owner: i64, infos: &[FilterWhereInfo]) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self {
            param_values: vec![SqlParam::Int(owner)],
            conditions: vec![format!("{}.\"user_id\" = $1", alias)],
        };
        for info in infos {
            let sql = filter_where.build_sql_condition(alias, info);
            filter_where.conditions.push(sql);
        }
        (filter_where.conditions.join(" AND "), filter_where.param_values)
    }

    fn push_param(&mut self, param: SqlParam) -> usize {
        self.param_values.push(param);
        self.param_values.len()
    }

    fn build_sql_condition(&mut self, alias: &str, info: &FilterWhereInfo) -> String {
        match info {
            FilterWhereInfo::LinkedToAny { ids, .. } if ids.is_empty() => "FALSE".to_string(),
            FilterWhereInfo::LinkedToAny { link_table, link_column, ids } => {
                let n = self.push_param(SqlParam::IntList(ids.clone()));
                format!(
                    "EXISTS (SELECT 1 FROM \"{}\" l WHERE l.\"recipe_id\" = {}.\"id\" AND l.\"{}\" = ANY(${}))",
                    link_table, alias, link_column, n
                )
            }
            FilterWhereInfo::Assigned { link_table, link_column } => format!(
                "EXISTS (SELECT 1 FROM \"{}\" l JOIN \"recipes\" r ON r.\"id\" = l.\"recipe_id\" WHERE l.\"{}\" = {}.\"id\" AND r.\"user_id\" = $1)",
                link_table, link_column, alias
            ),
        }
    }
}
