//! Analysis result types.
//!
//! `PartialAnalysis` is what the model (or the cache) hands back: every field
//! may be missing. `AnalysisResult` is the completed shape the rest of the
//! service works with; see [`crate::analyzer::completion`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Kinds of analysis a cache entry can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Summary,
    Analysis,
    StructuredAnalysis,
    Strategy,
    References,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::Analysis => "analysis",
            AnalysisKind::StructuredAnalysis => "structured_analysis",
            AnalysisKind::Strategy => "strategy",
            AnalysisKind::References => "references",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementCategory {
    #[serde(default, deserialize_with = "lossy_text")]
    pub category: String,
    #[serde(default, deserialize_with = "lossy_list")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequirement {
    #[serde(deserialize_with = "lossy_text")]
    pub role: String,
    #[serde(deserialize_with = "lossy_count")]
    pub count: u32,
    #[serde(deserialize_with = "lossy_list")]
    pub required_skills: Vec<String>,
    #[serde(deserialize_with = "lossy_text")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSummary {
    #[serde(deserialize_with = "lenient_text")]
    pub project_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub overview: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub purpose: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub key_keywords: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_list")]
    pub client_priorities: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_text")]
    pub period: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub budget: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub expected_effects: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_requirements_count: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialStrategy {
    #[serde(deserialize_with = "lenient_list")]
    pub anchor_points: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_list")]
    pub differentiation: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_list")]
    pub risk_mitigation: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_list")]
    pub win_strategy: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_list")]
    pub references: Option<Vec<String>>,
}

/// Model output before completion.
///
/// Deserialization never fails on a well-formed JSON object: values of the
/// wrong type are coerced where the intent is clear (`"12"` as a count, a
/// comma-separated string as a list) and dropped to `None` otherwise, so
/// completion can fill them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialAnalysis {
    #[serde(deserialize_with = "lenient")]
    pub summary: Option<PartialSummary>,
    #[serde(deserialize_with = "deserialize_requirements")]
    pub requirements: Option<Vec<RequirementCategory>>,
    #[serde(deserialize_with = "lenient")]
    pub strategy: Option<PartialStrategy>,
    #[serde(deserialize_with = "lenient")]
    pub resource_requirements: Option<Vec<ResourceRequirement>>,
    #[serde(deserialize_with = "lenient_list")]
    pub todo_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "lossy_list")]
    pub synthetic_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub project_name: String,
    pub overview: String,
    pub purpose: String,
    pub key_keywords: Vec<String>,
    pub client_priorities: Vec<String>,
    pub period: String,
    pub budget: String,
    pub expected_effects: Vec<String>,
    pub total_requirements_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub anchor_points: Vec<String>,
    pub differentiation: Vec<String>,
    pub risk_mitigation: Vec<String>,
    pub win_strategy: Vec<String>,
    pub references: Vec<String>,
}

/// A completed analysis. Every required list is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    pub requirements: Vec<RequirementCategory>,
    pub strategy: Strategy,
    pub resource_requirements: Vec<ResourceRequirement>,
    pub todo_list: Vec<String>,
    /// Dotted paths of fields filled with fallback content rather than model output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synthetic_fields: Vec<String>,
}

impl AnalysisResult {
    pub fn to_value(&self) -> Value {
        // A struct of strings, numbers and vectors always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_synthetic(&self, path: &str) -> bool {
        self.synthetic_fields.iter().any(|f| f == path)
    }
}

impl From<AnalysisResult> for PartialAnalysis {
    fn from(result: AnalysisResult) -> Self {
        let AnalysisResult {
            summary,
            requirements,
            strategy,
            resource_requirements,
            todo_list,
            synthetic_fields,
        } = result;

        PartialAnalysis {
            summary: Some(PartialSummary {
                project_name: Some(summary.project_name),
                overview: Some(summary.overview),
                purpose: Some(summary.purpose),
                key_keywords: Some(summary.key_keywords),
                client_priorities: Some(summary.client_priorities),
                period: Some(summary.period),
                budget: Some(summary.budget),
                expected_effects: Some(summary.expected_effects),
                total_requirements_count: Some(summary.total_requirements_count),
            }),
            requirements: Some(requirements),
            strategy: Some(PartialStrategy {
                anchor_points: Some(strategy.anchor_points),
                differentiation: Some(strategy.differentiation),
                risk_mitigation: Some(strategy.risk_mitigation),
                win_strategy: Some(strategy.win_strategy),
                references: Some(strategy.references),
            }),
            resource_requirements: Some(resource_requirements),
            todo_list: Some(todo_list),
            synthetic_fields,
        }
    }
}

/// Accepts both `[{category, items}]` and the older `{category: [items]}` form.
fn deserialize_requirements<'de, D>(deserializer: D) -> Result<Option<Vec<RequirementCategory>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(list) => Some(
            list.into_iter()
                .filter_map(|item| serde_json::from_value::<RequirementCategory>(item).ok())
                .collect(),
        ),
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(category, items)| RequirementCategory {
                    category,
                    items: list_of(items).unwrap_or_default(),
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(Value::deserialize(deserializer)?))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(list_of(Value::deserialize(deserializer)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    Ok(count_of(&Value::deserialize(deserializer)?).and_then(|n| usize::try_from(n).ok()))
}

fn lossy_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lossy_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(lenient_list(deserializer)?.unwrap_or_default())
}

fn lossy_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let count = count_of(&Value::deserialize(deserializer)?);
    Ok(count.and_then(|n| u32::try_from(n).ok()).unwrap_or_default())
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Arrays keep their scalar items; a string is split on commas, semicolons and newlines.
fn list_of(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.into_iter().filter_map(text_of).collect()),
        Value::String(s) => Some(
            s.split([',', ';', '\n'])
                .map(|item| item.trim().trim_start_matches(['-', '•', '*']).trim())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Non-negative numbers, or the leading digits of a string such as `"12"` or `"1명"`.
fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',')
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// JSON schema declared to the model as `responseSchema`.
pub fn response_schema() -> Value {
    let string_list = serde_json::json!({ "type": "ARRAY", "items": { "type": "STRING" } });

    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "OBJECT",
                "properties": {
                    "project_name": { "type": "STRING" },
                    "overview": { "type": "STRING" },
                    "purpose": { "type": "STRING" },
                    "key_keywords": string_list,
                    "client_priorities": string_list,
                    "period": { "type": "STRING" },
                    "budget": { "type": "STRING" },
                    "expected_effects": string_list,
                    "total_requirements_count": { "type": "INTEGER" }
                },
                "required": [
                    "project_name", "overview", "purpose", "key_keywords",
                    "client_priorities", "period", "budget", "expected_effects",
                    "total_requirements_count"
                ]
            },
            "requirements": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": { "type": "STRING" },
                        "items": string_list
                    },
                    "required": ["category", "items"]
                }
            },
            "strategy": {
                "type": "OBJECT",
                "properties": {
                    "anchor_points": string_list,
                    "differentiation": string_list,
                    "risk_mitigation": string_list,
                    "win_strategy": string_list,
                    "references": string_list
                },
                "required": ["anchor_points", "differentiation", "risk_mitigation", "win_strategy", "references"]
            },
            "resource_requirements": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "role": { "type": "STRING" },
                        "count": { "type": "INTEGER" },
                        "required_skills": string_list,
                        "reason": { "type": "STRING" }
                    },
                    "required": ["role", "count", "required_skills", "reason"]
                }
            },
            "todo_list": string_list
        },
        "required": ["summary", "requirements", "strategy", "resource_requirements", "todo_list"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_list_form_keeps_categories_verbatim() {
        let raw = r#"{"requirements": [
            {"category": "시스템 장비 구성 요구사항", "items": ["서버 2식"]},
            {"category": "보안 요구사항", "items": ["망분리"]}
        ]}"#;
        let partial: PartialAnalysis = serde_json::from_str(raw).unwrap();
        let reqs = partial.requirements.unwrap();
        assert_eq!(reqs[0].category, "시스템 장비 구성 요구사항");
        assert_eq!(reqs[1].items, vec!["망분리".to_string()]);
    }

    #[test]
    fn test_requirements_map_form_preserves_order() {
        let raw = r#"{"requirements": {"기능 요구사항": ["a", "b"], "성능 요구사항": ["c"]}}"#;
        let partial: PartialAnalysis = serde_json::from_str(raw).unwrap();
        let reqs = partial.requirements.unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].category, "기능 요구사항");
        assert_eq!(reqs[0].items.len(), 2);
        assert_eq!(reqs[1].category, "성능 요구사항");
    }

    #[test]
    fn test_missing_sections_deserialize_to_none() {
        let partial: PartialAnalysis = serde_json::from_str(r#"{"todo_list": ["x"]}"#).unwrap();
        assert!(partial.summary.is_none());
        assert!(partial.strategy.is_none());
        assert!(partial.requirements.is_none());
        assert_eq!(partial.todo_list, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_numeric_string_count_is_coerced() {
        let partial: PartialAnalysis =
            serde_json::from_str(r#"{"summary": {"total_requirements_count": "12"}}"#).unwrap();
        assert_eq!(partial.summary.unwrap().total_requirements_count, Some(12));
    }

    #[test]
    fn test_resource_count_with_unit_suffix() {
        let raw = r#"{"resource_requirements": [{"role": "PM", "count": "1명", "required_skills": "PMP, 공공 경험"}]}"#;
        let partial: PartialAnalysis = serde_json::from_str(raw).unwrap();
        let resources = partial.resource_requirements.unwrap();
        assert_eq!(resources[0].count, 1);
        assert_eq!(resources[0].required_skills, vec!["PMP".to_string(), "공공 경험".to_string()]);
        assert_eq!(resources[0].reason, "");
    }

    #[test]
    fn test_comma_string_becomes_list() {
        let partial: PartialAnalysis =
            serde_json::from_str(r#"{"summary": {"key_keywords": "AI, 클라우드"}}"#).unwrap();
        assert_eq!(
            partial.summary.unwrap().key_keywords,
            Some(vec!["AI".to_string(), "클라우드".to_string()])
        );
    }

    #[test]
    fn test_unusable_values_become_none() {
        let raw = r#"{
            "summary": {"overview": {"text": "nested"}, "total_requirements_count": "많음", "key_keywords": 3},
            "strategy": "차별화 전략 없음",
            "requirements": [{"category": "기능", "items": ["a"]}, "보안"],
            "todo_list": null
        }"#;
        let partial: PartialAnalysis = serde_json::from_str(raw).unwrap();
        let summary = partial.summary.unwrap();
        assert_eq!(summary.overview, None);
        assert_eq!(summary.total_requirements_count, None);
        assert_eq!(summary.key_keywords, None);
        assert!(partial.strategy.is_none());
        assert_eq!(partial.requirements.unwrap().len(), 1);
        assert!(partial.todo_list.is_none());
    }

    #[test]
    fn test_synthetic_fields_omitted_when_empty() {
        let value = AnalysisResult::default().to_value();
        assert!(value.get("synthetic_fields").is_none());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&AnalysisKind::StructuredAnalysis).unwrap();
        assert_eq!(json, "\"structured_analysis\"");
        assert_eq!(AnalysisKind::StructuredAnalysis.to_string(), "structured_analysis");
    }
}
