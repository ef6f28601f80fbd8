//! Response shaping.
//!
//! Converts decoded Exa payloads into the records returned to callers.
//! Fallbacks are limited to the two the UI relies on: a missing title becomes
//! `"Untitled"` and a missing id becomes a fresh UUID. A hit without a URL is
//! a schema failure, since nothing downstream can render it.

use uuid::Uuid;

use crate::error::ScoutError;
use crate::models::{
    AnswerResponse, Citation, ContentsResponse, ContentsResult, ExaAnswerResponse, ExaCitation,
    ExaContentsResponse, ExaResearchStatus, ExaResult, ExaSearchResponse, ResearchReport,
    SearchResponse, SearchResult,
};

pub const UNTITLED: &str = "Untitled";

fn id_or_generated(id: Option<String>) -> String {
    id.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn title_or_untitled(title: Option<String>) -> String {
    title
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn required_url(url: Option<String>, what: &str) -> Result<String, ScoutError> {
    url.filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ScoutError::Schema(format!("{} without url", what)))
}

pub fn shape_citation(raw: ExaCitation) -> Result<Citation, ScoutError> {
    Ok(Citation {
        url: required_url(raw.url, "citation")?,
        id: id_or_generated(raw.id),
        title: title_or_untitled(raw.title),
    })
}

fn shape_citations(raw: Vec<ExaCitation>) -> Result<Vec<Citation>, ScoutError> {
    raw.into_iter().map(shape_citation).collect()
}

pub fn shape_search_result(raw: ExaResult) -> Result<SearchResult, ScoutError> {
    Ok(SearchResult {
        url: required_url(raw.url, "search result")?,
        id: id_or_generated(raw.id),
        title: title_or_untitled(raw.title),
        text: raw.text,
        summary: raw.summary,
        highlights: raw.highlights,
        highlight_scores: raw.highlight_scores,
        published_date: raw.published_date,
        author: raw.author,
        score: raw.score,
        image: raw.image,
    })
}

pub fn shape_search(raw: ExaSearchResponse) -> Result<SearchResponse, ScoutError> {
    let results = raw
        .results
        .into_iter()
        .map(shape_search_result)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchResponse {
        results,
        autoprompt_string: raw.autoprompt_string,
        request_id: raw.request_id,
    })
}

/// Shapes an answer payload; empty or whitespace-only text is [`ScoutError::NoAnswer`].
pub fn shape_answer(raw: ExaAnswerResponse) -> Result<AnswerResponse, ScoutError> {
    let answer = raw
        .answer
        .filter(|a| !a.trim().is_empty())
        .ok_or(ScoutError::NoAnswer)?;

    Ok(AnswerResponse {
        answer,
        citations: shape_citations(raw.citations)?,
    })
}

pub fn shape_contents(raw: ExaContentsResponse) -> Result<ContentsResponse, ScoutError> {
    let results = raw
        .results
        .into_iter()
        .map(|r| {
            Ok(ContentsResult {
                url: required_url(r.url, "contents result")?,
                id: id_or_generated(r.id),
                title: title_or_untitled(r.title),
                text: r.text,
                highlights: r.highlights,
                highlight_scores: r.highlight_scores,
                summary: r.summary,
                published_date: r.published_date,
                author: r.author,
            })
        })
        .collect::<Result<Vec<_>, ScoutError>>()?;

    Ok(ContentsResponse { results })
}

/// Shapes the final status payload of a completed research task.
pub fn shape_research(raw: ExaResearchStatus) -> Result<ResearchReport, ScoutError> {
    Ok(ResearchReport {
        status: "completed".to_string(),
        output: raw.output,
        citations: shape_citations(raw.citations)?,
        cost_dollars: raw.cost_dollars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_citation_without_id_gets_uuid() {
        let raw: ExaCitation = serde_json::from_value(json!({
            "url": "https://example.com/a",
            "title": "A"
        }))
        .unwrap();
        let citation = shape_citation(raw).unwrap();
        assert!(!citation.id.is_empty());
        assert!(Uuid::parse_str(&citation.id).is_ok());
        assert_eq!(citation.title, "A");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = id_or_generated(None);
        let b = id_or_generated(None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_result_without_title_is_untitled() {
        let raw: ExaResult =
            serde_json::from_value(json!({ "id": "r1", "url": "https://example.com" })).unwrap();
        let result = shape_search_result(raw).unwrap();
        assert_eq!(result.title, UNTITLED);
        assert_eq!(result.id, "r1");
    }

    #[test]
    fn test_blank_title_is_untitled() {
        let raw: ExaResult = serde_json::from_value(json!({
            "url": "https://example.com",
            "title": "   "
        }))
        .unwrap();
        assert_eq!(shape_search_result(raw).unwrap().title, UNTITLED);
    }

    #[test]
    fn test_missing_url_is_schema_error() {
        let raw: ExaCitation = serde_json::from_value(json!({ "title": "no link" })).unwrap();
        assert!(matches!(shape_citation(raw), Err(ScoutError::Schema(_))));
    }

    #[test]
    fn test_whitespace_answer_is_no_answer() {
        let raw: ExaAnswerResponse =
            serde_json::from_value(json!({ "answer": " \n ", "citations": [] })).unwrap();
        assert_eq!(shape_answer(raw), Err(ScoutError::NoAnswer));

        let raw: ExaAnswerResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(shape_answer(raw), Err(ScoutError::NoAnswer));
    }

    #[test]
    fn test_answer_keeps_citations_in_order() {
        let raw: ExaAnswerResponse = serde_json::from_value(json!({
            "answer": "Paris.",
            "citations": [
                { "id": "c1", "url": "https://a.example", "title": "A" },
                { "url": "https://b.example" }
            ]
        }))
        .unwrap();
        let shaped = shape_answer(raw).unwrap();
        assert_eq!(shaped.answer, "Paris.");
        assert_eq!(shaped.citations[0].id, "c1");
        assert_eq!(shaped.citations[1].url, "https://b.example");
        assert_eq!(shaped.citations[1].title, UNTITLED);
    }

    #[test]
    fn test_search_passes_autoprompt() {
        let raw: ExaSearchResponse = serde_json::from_value(json!({
            "results": [{ "url": "https://example.com", "score": 0.91 }],
            "autopromptString": "rust async runtimes",
            "requestId": "req-1"
        }))
        .unwrap();
        let shaped = shape_search(raw).unwrap();
        assert_eq!(shaped.results.len(), 1);
        assert_eq!(shaped.results[0].score, Some(0.91));
        assert_eq!(shaped.autoprompt_string.as_deref(), Some("rust async runtimes"));
        assert_eq!(shaped.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_research_report() {
        let raw: ExaResearchStatus = serde_json::from_value(json!({
            "status": "completed",
            "output": { "content": "# Report" },
            "citations": [{ "title": "Source", "url": "https://s.example" }],
            "costDollars": { "total": 0.42, "numPages": 12, "numSearches": 3 }
        }))
        .unwrap();
        let report = shape_research(raw).unwrap();
        assert_eq!(report.status, "completed");
        assert_eq!(report.output.unwrap().content, "# Report");
        assert!(!report.citations[0].id.is_empty());
        assert_eq!(report.cost_dollars.unwrap().total, 0.42);
    }
}
