//! Conversions between the admin UI's JSON rows and the literal structures
//! stored in the backend files.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Number, Value, json};
use tracing::{info, warn};

use crate::{catalog::RoleCatalog, error::AdminError};

pub const TIERS_DATA: &str = "APP_TIERS_DATA";
pub const TIERS_ROLES: &str = "APP_TIERS_ROLES";
pub const TIER_THRESHOLDS: &str = "TIER_THRESHOLDS";
pub const AVAILABLE_ROLES: &str = "AVAILABLE_ROLES";
pub const EFFORT_TEMPLATE: &str = "EFFORT_ESTIMATION_TEMPLATE";

/// A tier as the UI edits it: one integer percentage per catalog field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TierRow {
    #[serde(default)]
    pub activity: String,
    #[serde(default = "zero")]
    pub total_hours: Value,
    #[serde(flatten)]
    pub allocations: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Map<String, Value>>,
}

fn zero() -> Value {
    Value::from(0)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub id: usize,
    #[serde(rename = "roleName")]
    pub role_name: String,
    pub location: String,
}

/// Roles arrive either as UI descriptors or as bare names.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RoleInput {
    Descriptor {
        #[serde(rename = "roleName")]
        role_name: String,
    },
    Name(String),
}

impl RoleInput {
    pub fn name(&self) -> &str {
        match self {
            RoleInput::Descriptor { role_name } => role_name,
            RoleInput::Name(name) => name,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TierThreshold {
    pub tier: String,
    #[serde(rename = "minWeightage", deserialize_with = "weightage_bound")]
    pub min_weightage: Number,
    #[serde(rename = "maxWeightage", deserialize_with = "weightage_bound")]
    pub max_weightage: Number,
}

/// Bounds arrive as numbers or numeric strings; whole values stay integers.
fn weightage_bound<'de, D>(deserializer: D) -> Result<Number, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::Number(number) = value {
        return Ok(number);
    }
    if let Some(whole) = value.as_str().and_then(|text| text.trim().parse::<i64>().ok()) {
        return Ok(Number::from(whole));
    }
    numeric_value(&value)
        .and_then(Number::from_f64)
        .ok_or_else(|| de::Error::custom(format!("expected a numeric weightage, found {value}")))
}

impl TierThreshold {
    fn new(tier: &str, min: u64, max: u64) -> Self {
        Self {
            tier: tier.to_string(),
            min_weightage: Number::from(min),
            max_weightage: Number::from(max),
        }
    }
}

pub fn default_thresholds() -> Vec<TierThreshold> {
    vec![
        TierThreshold::new("Tier 1 - Jumpstart", 0, 60),
        TierThreshold::new("Tier 2 - Foundation Plus", 61, 100),
        TierThreshold::new("Tier 3 - Enhanced Scope", 101, 150),
        TierThreshold::new("Tier 4 - Advanced Enablement", 151, 200),
        TierThreshold::new("Tier 5 - Full Spectrum", 201, 999),
    ]
}

pub fn fraction_to_percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

pub fn percent_to_fraction(percent: f64) -> f64 {
    percent / 100.0
}

pub fn role_location(role_name: &str) -> &'static str {
    if role_name.contains("USA") { "USA" } else { "India" }
}

/// Numbers pass through; numeric strings are parsed. Anything else is `None`.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn number_value(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(zero)
}

pub fn tier_rows_from_backend(
    value: &Value,
    catalog: &RoleCatalog,
) -> Result<Vec<TierRow>, AdminError> {
    let Some(entries) = value.as_array() else {
        return Err(AdminError::shape(TIERS_DATA, "expected a list of tiers"));
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let Some(category) = entry.get("category").and_then(Value::as_str) else {
                return Err(AdminError::shape(
                    TIERS_DATA,
                    format!("entry {index} has no category"),
                ));
            };
            let roles = entry.get("roles").and_then(Value::as_object);
            let mut allocations = Map::new();
            for mapping in catalog.entries() {
                let fraction = roles
                    .and_then(|roles| roles.get(&mapping.role))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                allocations.insert(
                    mapping.field.clone(),
                    Value::from(fraction_to_percent(fraction)),
                );
            }
            Ok(TierRow {
                activity: category.to_string(),
                total_hours: zero(),
                allocations,
                subtasks: None,
            })
        })
        .collect()
}

pub fn tier_rows_to_backend(rows: &[TierRow], catalog: &RoleCatalog) -> Value {
    let entries = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut roles = Map::new();
            for mapping in catalog.entries() {
                let percent = row
                    .allocations
                    .get(&mapping.field)
                    .and_then(numeric_value)
                    .unwrap_or(0.0);
                roles.insert(
                    mapping.role.clone(),
                    number_value(percent_to_fraction(percent)),
                );
            }
            json!({
                "row_index": index,
                "category": row.activity,
                "roles": roles,
            })
        })
        .collect();
    Value::Array(entries)
}

pub fn roles_from_backend(value: &Value) -> Result<Vec<RoleDescriptor>, AdminError> {
    let Some(names) = value.as_array() else {
        return Err(AdminError::shape(TIERS_ROLES, "expected a list of role names"));
    };
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let Some(name) = name.as_str() else {
                return Err(AdminError::shape(
                    TIERS_ROLES,
                    format!("entry {index} is not a string"),
                ));
            };
            Ok(RoleDescriptor {
                id: index + 1,
                role_name: name.to_string(),
                location: role_location(name).to_string(),
            })
        })
        .collect()
}

pub fn role_names(roles: &[RoleInput]) -> Vec<String> {
    roles.iter().map(|role| role.name().to_string()).collect()
}

pub fn role_names_to_backend(names: &[String]) -> Value {
    Value::Array(names.iter().cloned().map(Value::String).collect())
}

pub fn thresholds_from_backend(value: &Value) -> Result<Vec<TierThreshold>, AdminError> {
    serde_json::from_value(value.clone())
        .map_err(|err| AdminError::shape(TIER_THRESHOLDS, err.to_string()))
}

pub fn thresholds_to_backend(thresholds: &[TierThreshold]) -> Value {
    Value::Array(
        thresholds
            .iter()
            .map(|threshold| {
                json!({
                    "tier": threshold.tier,
                    "minWeightage": threshold.min_weightage,
                    "maxWeightage": threshold.max_weightage,
                })
            })
            .collect(),
    )
}

/// Copies `total`/`tasks` from the effort mapping onto rows whose activity
/// names a category exactly. Returns how many rows matched.
pub fn merge_effort(rows: &mut [TierRow], effort: &Value) -> Result<usize, AdminError> {
    let Some(categories) = effort.as_object() else {
        return Err(AdminError::shape(
            EFFORT_TEMPLATE,
            "expected a mapping of categories",
        ));
    };

    let mut matched = 0;
    for row in rows.iter_mut() {
        let Some(info) = categories.get(&row.activity).and_then(Value::as_object) else {
            warn!(
                category = %row.activity,
                available = %categories.keys().cloned().collect::<Vec<_>>().join(", "),
                "no effort template found for category"
            );
            continue;
        };
        row.total_hours = info
            .get("total")
            .filter(|total| total.is_number())
            .cloned()
            .unwrap_or_else(zero);
        let subtasks = info
            .get("tasks")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        info!(
            category = %row.activity,
            total_hours = %row.total_hours,
            subtasks = subtasks.len(),
            "merged effort data"
        );
        row.subtasks = Some(subtasks);
        matched += 1;
    }
    Ok(matched)
}

/// Normalizes UI effort data into `{category: {"total": n, "tasks": {...}}}`.
pub fn effort_to_backend(effort: &Map<String, Value>) -> Value {
    let mut categories = Map::new();
    for (category, data) in effort {
        let total = data
            .get("total")
            .and_then(numeric_value)
            .unwrap_or(0.0);
        let mut tasks = Map::new();
        if let Some(entries) = data.get("tasks").and_then(Value::as_object) {
            for (task, hours) in entries {
                tasks.insert(
                    task.clone(),
                    number_value(numeric_value(hours).unwrap_or(0.0)),
                );
            }
        }
        categories.insert(
            category.clone(),
            json!({
                "total": number_value(total),
                "tasks": tasks,
            }),
        );
    }
    Value::Object(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(activity: &str, allocations: Value) -> TierRow {
        TierRow {
            activity: activity.to_string(),
            total_hours: zero(),
            allocations: allocations.as_object().cloned().unwrap_or_default(),
            subtasks: None,
        }
    }

    #[test]
    fn clean_percentages_round_trip_exactly() {
        for percent in [0, 25, 50, 100] {
            let fraction = percent_to_fraction(percent as f64);
            assert_eq!(fraction_to_percent(fraction), percent);
        }
        assert_eq!(fraction_to_percent(0.15), 15);
    }

    #[test]
    fn backend_tiers_become_percentage_rows() {
        let catalog = RoleCatalog::default();
        let value = json!([
            {"row_index": 0, "category": "Discovery", "roles": {"PM USA": 0.15, "Retired Role": 0.4}}
        ]);
        let rows = tier_rows_from_backend(&value, &catalog).expect("rows should convert");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].activity, "Discovery");
        assert_eq!(rows[0].allocations["pm1"], json!(15));
        assert_eq!(rows[0].allocations["pm2"], json!(0));
        assert_eq!(rows[0].allocations.len(), catalog.len());
        assert!(!rows[0].allocations.contains_key("Retired Role"));
    }

    #[test]
    fn rows_serialize_flat_in_catalog_order() {
        let catalog = RoleCatalog::default();
        let value = json!([{"category": "Build", "roles": {}}]);
        let rows = tier_rows_from_backend(&value, &catalog).expect("rows should convert");
        let encoded = serde_json::to_value(&rows[0]).expect("row should encode");
        let keys = encoded
            .as_object()
            .expect("row is an object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(&keys[..3], ["activity", "total_hours", "pm1"]);
        assert!(!keys.contains(&"subtasks".to_string()));
    }

    #[test]
    fn ui_rows_become_fraction_records() {
        let catalog = RoleCatalog::default();
        let rows = vec![row(
            "Discovery",
            json!({"pm1": 15, "architect": "50", "unknownField": 99}),
        )];
        let value = tier_rows_to_backend(&rows, &catalog);
        let roles = &value[0]["roles"];
        assert_eq!(value[0]["row_index"], json!(0));
        assert_eq!(value[0]["category"], json!("Discovery"));
        assert_eq!(roles["PM USA"].as_f64(), Some(0.15));
        assert_eq!(roles["Architect USA"].as_f64(), Some(0.5));
        assert_eq!(roles["PM India"].as_f64(), Some(0.0));
        assert_eq!(roles.as_object().map(Map::len), Some(13));
    }

    #[test]
    fn role_descriptors_infer_location() {
        let roles = roles_from_backend(&json!(["PM USA", "PM India"])).expect("roles convert");
        assert_eq!(roles[0].id, 1);
        assert_eq!(roles[0].location, "USA");
        assert_eq!(roles[1].id, 2);
        assert_eq!(roles[1].location, "India");
        assert!(roles_from_backend(&json!([1])).is_err());
    }

    #[test]
    fn role_inputs_accept_objects_and_names() {
        let inputs: Vec<RoleInput> =
            serde_json::from_value(json!([{"id": 1, "roleName": "PM USA", "location": "USA"}, "QA India"]))
                .expect("inputs should decode");
        assert_eq!(role_names(&inputs), vec!["PM USA", "QA India"]);
    }

    #[test]
    fn effort_merge_matches_exact_category_names() {
        let mut rows = vec![row("Discovery", json!({})), row("discovery ", json!({}))];
        let effort = json!({"Discovery": {"total": 40, "tasks": {"Kickoff": 8}}});
        let matched = merge_effort(&mut rows, &effort).expect("merge should succeed");
        assert_eq!(matched, 1);
        assert_eq!(rows[0].total_hours, json!(40));
        assert_eq!(rows[0].subtasks.as_ref().map(Map::len), Some(1));
        assert_eq!(rows[1].total_hours, json!(0));
        assert!(rows[1].subtasks.is_none());
    }

    #[test]
    fn effort_data_is_coerced_to_numbers() {
        let effort = json!({
            "Discovery": {"total": "12.5", "tasks": {"Kickoff": "4", "Review": "n/a"}},
            "Build": {"tasks": null}
        });
        let value = effort_to_backend(effort.as_object().expect("effort is a mapping"));
        assert_eq!(value["Discovery"]["total"].as_f64(), Some(12.5));
        assert_eq!(value["Discovery"]["tasks"]["Kickoff"].as_f64(), Some(4.0));
        assert_eq!(value["Discovery"]["tasks"]["Review"].as_f64(), Some(0.0));
        assert_eq!(value["Build"]["total"].as_f64(), Some(0.0));
        assert_eq!(value["Build"]["tasks"], json!({}));
    }

    #[test]
    fn threshold_bounds_accept_numeric_strings() {
        let parsed: Vec<TierThreshold> = serde_json::from_value(json!([
            {"tier": "Tier 1", "minWeightage": "0", "maxWeightage": " 60 "},
            {"tier": "Tier 2", "minWeightage": 61, "maxWeightage": "150.5"}
        ]))
        .expect("string bounds should decode");
        assert_eq!(parsed[0].min_weightage, Number::from(0));
        assert_eq!(parsed[0].max_weightage, Number::from(60));
        assert_eq!(parsed[1].max_weightage.as_f64(), Some(150.5));
        assert_eq!(
            thresholds_to_backend(&parsed)[0],
            json!({"tier": "Tier 1", "minWeightage": 0, "maxWeightage": 60})
        );

        let rejected = serde_json::from_value::<TierThreshold>(
            json!({"tier": "Tier 1", "minWeightage": "low", "maxWeightage": 60}),
        );
        assert!(rejected.is_err());
    }

    #[test]
    fn thresholds_pass_through() {
        let value = thresholds_to_backend(&default_thresholds());
        let parsed = thresholds_from_backend(&value).expect("thresholds should decode");
        assert_eq!(parsed, default_thresholds());
        assert_eq!(value[4]["maxWeightage"], json!(999));
    }
}
