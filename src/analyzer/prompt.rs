const STRUCTURED_ANALYSIS_INSTRUCTIONS: &str = "\
당신은 대한민국 최고의 공공 제안서 분석 전문가이자 수주 컨설턴트입니다.
다음 제안요청서(RFP)를 정밀 분석하여, 수주를 위한 핵심 정보를 추출하고 전략을 수립해주세요.

[분석 목표]
1. **종합 요약(overview)**: 이 사업의 배경, 핵심 내용, 중요성을 3~5문장으로 종합 요약하세요. 단순 나열이 아닌, 스토리텔링 형식으로 작성하세요.
2. **사업 목적(purpose)**: 이 사업이 왜 발주되었는지, 최종적으로 무엇을 달성하고자 하는지 명확히 기술하세요.
3. 사업명, 예산, 기간, 기대효과 등 핵심 메타데이터를 추출하세요.
4. **핵심 키워드(key_keywords)** 3~5개와 **발주처 우선순위(client_priorities)** 3~5개를 제시하세요.
5. **요구사항을 빠짐없이 추출하여 목차별로 분류**하세요.
6. 경쟁 우위를 점할 수 있는 수주 전략을 제시하세요. 앵커 포인트(anchor_points), 차별화 요소(differentiation), 리스크 대응(risk_mitigation)을 각각 3~5개 작성하세요.
7. 사업 수행에 필요한 투입 인력(resource_requirements)을 역할, 인원, 필요 역량, 근거와 함께 제시하세요.
8. 실무자가 수행해야 할 구체적인 To-Do 리스트를 작성하세요.

[중요: 동적 요구사항 추출]
- 제안요청서에 있는 **'요구사항' 관련 목차나 테이블**을 찾으세요. (예: '기능 요구사항', '시스템 장비 구성 요구사항', '보안 요구사항' 등)
- 각 분류를 카테고리(category)와 항목(items)을 가진 리스트 형태로 추출하십시오.
- **제안서에 명시된 카테고리 명칭 그대로** 사용하십시오.
- 임의로 카테고리를 통합하거나 누락하지 마십시오. 제안서에 있는 그대로의 구조를 유지하는 것이 핵심입니다.
- 각 카테고리별 상세 요구사항 내용을 구체적으로 리스트업 하십시오.

[제안요청서 내용]
";

/// Embeds the document text in the structured-analysis instructions.
pub fn build_structured_analysis_prompt(document_text: &str) -> String {
    let mut result = String::with_capacity(STRUCTURED_ANALYSIS_INSTRUCTIONS.len() + document_text.len() + 1);
    result.push_str(STRUCTURED_ANALYSIS_INSTRUCTIONS);
    result.push_str(document_text);
    result.push('\n');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text_is_embedded_after_instructions() {
        let prompt = build_structured_analysis_prompt("사업명: 테스트 사업");
        assert!(prompt.starts_with("당신은"));
        assert!(prompt.contains("[제안요청서 내용]\n사업명: 테스트 사업"));
        assert!(prompt.contains("카테고리 명칭 그대로"));
    }
}
