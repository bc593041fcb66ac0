use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Subcategory {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub subcategory_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub price_per_day: f64,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_available() -> bool {
    true
}

impl Equipment {
    /// Daily price formatted for listings, e.g. "$45.00/day"
    pub fn price_display(&self) -> String {
        format!("${:.2}/day", self.price_per_day)
    }
}

/// Body for creating or updating a category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body for creating or updating a subcategory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SubcategoryInput {
    pub name: String,
    pub category_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body for creating or updating an equipment listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct EquipmentInput {
    pub name: String,
    pub subcategory_id: i64,
    pub price_per_day: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equipment_defaults() {
        let json = r#"{"id": 3, "name": "Mini Excavator", "subcategory_id": 9, "price_per_day": 245.5}"#;
        let item: Equipment = serde_json::from_str(json).expect("Failed to parse equipment test JSON");
        assert!(item.available);
        assert_eq!(item.description, None);
        assert_eq!(item.price_display(), "$245.50/day");
    }

    #[test]
    fn test_input_skips_unset_fields() {
        let input = CategoryInput {
            name: "Lifting".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&input).expect("Failed to encode category input");
        assert_eq!(json, serde_json::json!({"name": "Lifting"}));
    }
}
