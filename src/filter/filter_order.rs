use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    /// Name descending; id breaks ties between equal names
    pub fn by_name_desc() -> Vec<FilterOrderInfo> {
        vec![
            FilterOrderInfo { column: "name" },
            FilterOrderInfo { column: "id" },
        ]
    }

    pub fn by_id_desc() -> Vec<FilterOrderInfo> {
        vec![FilterOrderInfo { column: "id" }]
    }

    pub fn generate(alias: &str, infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.\"{}\" DESC", alias, i.column))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
