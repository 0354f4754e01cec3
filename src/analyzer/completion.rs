//! Backfills required fields the model left out.
//!
//! `complete` is a pure function of its input apart from logging: the same
//! partial result always completes to the same `AnalysisResult`, and
//! completing an already complete result changes nothing.

use tracing::warn;

use super::schema::{AnalysisResult, PartialAnalysis, PartialStrategy, PartialSummary, Strategy, Summary};

const BOILERPLATE_WORDS: [&str; 3] = ["사업", "구축", "용역"];
const MAX_DERIVED_KEYWORDS: usize = 3;

const FALLBACK_PURPOSE: &str =
    "발주기관의 업무 효율성을 높이고 대국민 서비스 품질을 향상시키기 위한 사업입니다.";

const FALLBACK_KEYWORDS: [&str; 3] = ["디지털 전환", "업무 효율화", "서비스 고도화"];

const FALLBACK_CLIENT_PRIORITIES: [&str; 3] = [
    "안정적인 시스템 구축 및 운영",
    "요구사항의 충실한 이행",
    "사업 일정 및 품질 관리",
];

const FALLBACK_ANCHOR_POINTS: [&str; 3] = [
    "발주기관의 핵심 요구사항에 대한 명확한 이해 제시",
    "유사 사업 수행 경험을 통한 신뢰성 확보",
    "체계적인 사업 관리 방안 제시",
];

const FALLBACK_DIFFERENTIATION: [&str; 3] = [
    "검증된 기술과 방법론 적용",
    "전문 인력 투입을 통한 품질 보장",
    "사업 종료 후 안정적인 유지보수 체계",
];

const FALLBACK_RISK_MITIGATION: [&str; 3] = [
    "단계별 산출물 검토를 통한 품질 관리",
    "일정 지연 대비 버퍼 확보 및 주간 진척 관리",
    "주요 이슈에 대한 사전 식별 및 대응 계획 수립",
];

/// Required fields that completion may fill.
pub const SUMMARY_OVERVIEW: &str = "summary.overview";
pub const SUMMARY_PURPOSE: &str = "summary.purpose";
pub const SUMMARY_KEY_KEYWORDS: &str = "summary.key_keywords";
pub const SUMMARY_CLIENT_PRIORITIES: &str = "summary.client_priorities";
pub const STRATEGY_ANCHOR_POINTS: &str = "strategy.anchor_points";
pub const STRATEGY_DIFFERENTIATION: &str = "strategy.differentiation";
pub const STRATEGY_RISK_MITIGATION: &str = "strategy.risk_mitigation";

#[derive(Debug, Clone)]
pub struct Completion {
    pub result: AnalysisResult,
    /// Fields filled during this pass, in fill order.
    pub substitutions: Vec<&'static str>,
}

pub fn complete(partial: PartialAnalysis) -> Completion {
    let PartialAnalysis {
        summary,
        requirements,
        strategy,
        resource_requirements,
        todo_list,
        mut synthetic_fields,
    } = partial;

    let mut substitutions = Vec::new();
    let requirements = requirements.unwrap_or_default();

    let PartialSummary {
        project_name,
        overview,
        purpose,
        key_keywords,
        client_priorities,
        period,
        budget,
        expected_effects,
        total_requirements_count,
    } = summary.unwrap_or_default();

    let project_name = project_name.unwrap_or_default();

    let overview = fill_text(overview, SUMMARY_OVERVIEW, &mut substitutions, || overview_for(&project_name));
    let purpose = fill_text(purpose, SUMMARY_PURPOSE, &mut substitutions, || FALLBACK_PURPOSE.to_string());
    let key_keywords = fill_list(key_keywords, SUMMARY_KEY_KEYWORDS, &mut substitutions, || {
        let derived = keywords_from_project_name(&project_name);
        if derived.is_empty() { owned(&FALLBACK_KEYWORDS) } else { derived }
    });
    let client_priorities = fill_list(client_priorities, SUMMARY_CLIENT_PRIORITIES, &mut substitutions, || {
        owned(&FALLBACK_CLIENT_PRIORITIES)
    });

    let total_requirements_count = match total_requirements_count {
        Some(count) if count > 0 => count,
        _ => requirements.iter().map(|c| c.items.len()).sum(),
    };

    let PartialStrategy {
        anchor_points,
        differentiation,
        risk_mitigation,
        win_strategy,
        references,
    } = strategy.unwrap_or_default();

    let anchor_points = fill_list(anchor_points, STRATEGY_ANCHOR_POINTS, &mut substitutions, || {
        owned(&FALLBACK_ANCHOR_POINTS)
    });
    let differentiation = fill_list(differentiation, STRATEGY_DIFFERENTIATION, &mut substitutions, || {
        owned(&FALLBACK_DIFFERENTIATION)
    });
    let risk_mitigation = fill_list(risk_mitigation, STRATEGY_RISK_MITIGATION, &mut substitutions, || {
        owned(&FALLBACK_RISK_MITIGATION)
    });

    for field in &substitutions {
        warn!("Model omitted {}, filled with fallback content", field);
        if !synthetic_fields.iter().any(|f| f == field) {
            synthetic_fields.push((*field).to_string());
        }
    }

    let result = AnalysisResult {
        summary: Summary {
            project_name,
            overview,
            purpose,
            key_keywords,
            client_priorities,
            period: period.unwrap_or_default(),
            budget: budget.unwrap_or_default(),
            expected_effects: expected_effects.unwrap_or_default(),
            total_requirements_count,
        },
        requirements,
        strategy: Strategy {
            anchor_points,
            differentiation,
            risk_mitigation,
            win_strategy: win_strategy.unwrap_or_default(),
            references: references.unwrap_or_default(),
        },
        resource_requirements: resource_requirements.unwrap_or_default(),
        todo_list: todo_list.unwrap_or_default(),
        synthetic_fields,
    };

    Completion { result, substitutions }
}

/// Splits a project name into keywords once boilerplate words are removed.
pub fn keywords_from_project_name(project_name: &str) -> Vec<String> {
    let mut stripped = project_name.to_string();
    for word in BOILERPLATE_WORDS {
        stripped = stripped.replace(word, " ");
    }

    stripped
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .take(MAX_DERIVED_KEYWORDS)
        .map(str::to_string)
        .collect()
}

fn overview_for(project_name: &str) -> String {
    let subject = if project_name.trim().is_empty() {
        "본 사업".to_string()
    } else {
        format!("'{}' 사업", project_name.trim())
    };
    format!(
        "{}은 발주기관의 요구사항을 반영하여 시스템을 구축하고 업무 효율성을 높이기 위해 추진되는 사업입니다.",
        subject
    )
}

fn fill_text(
    value: Option<String>,
    field: &'static str,
    substitutions: &mut Vec<&'static str>,
    fallback: impl FnOnce() -> String,
) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            substitutions.push(field);
            fallback()
        }
    }
}

fn fill_list(
    value: Option<Vec<String>>,
    field: &'static str,
    substitutions: &mut Vec<&'static str>,
    fallback: impl FnOnce() -> Vec<String>,
) -> Vec<String> {
    match value {
        Some(items) if items.iter().any(|item| !item.trim().is_empty()) => items,
        _ => {
            substitutions.push(field);
            fallback()
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
