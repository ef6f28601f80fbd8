//! Terminal presentation.
//!
//! Plain-text renderers for search results, answers, contents, and research
//! reports, plus the small display helpers they share (relevance buckets,
//! highlight ordering, relative dates). Answer text is printed as-is; no
//! markdown rendering is attempted.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{AnswerResponse, Citation, ContentsResponse, ResearchReport, SearchResponse};
use crate::session::{Message, MessageState, Payload};

/// Default highlight length before truncation.
pub const HIGHLIGHT_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::High => "high",
            Relevance::Medium => "medium",
            Relevance::Low => "low",
        }
    }
}

/// Buckets a 0–1 score: `high` ≥ 0.8, `medium` ≥ 0.5, else `low`.
pub fn relevance_level(score: f64) -> Relevance {
    if score >= 0.8 {
        Relevance::High
    } else if score >= 0.5 {
        Relevance::Medium
    } else {
        Relevance::Low
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHighlight {
    pub text: String,
    pub score: f64,
}

/// Pairs highlights with their scores, best first.
///
/// When the two slices differ in length the highlights keep their original
/// order and missing scores count as zero.
pub fn sort_highlights_by_score(highlights: &[String], scores: &[f64]) -> Vec<ScoredHighlight> {
    let mut combined: Vec<ScoredHighlight> = highlights
        .iter()
        .enumerate()
        .map(|(i, text)| ScoredHighlight {
            text: text.clone(),
            score: scores.get(i).copied().unwrap_or(0.0),
        })
        .collect();

    if highlights.len() == scores.len() {
        combined.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
    combined
}

/// Cuts `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_highlight(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Mean highlight score as a rounded percentage.
pub fn average_highlight_score(scores: &[f64]) -> Option<u32> {
    if scores.is_empty() {
        return None;
    }
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    Some((avg * 100.0).round().max(0.0) as u32)
}

/// Host of `url` without a leading `www.`; `url` itself if it does not parse.
pub fn domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

/// Human-friendly age of a published date relative to `now`.
///
/// Dates within 30 days read as "3 days ago", "yesterday", "2 hours ago",
/// and so on; older or future dates use `Mon D, YYYY`. Input that is not a
/// recognizable date comes back unchanged.
pub fn format_relative_time(date: &str, now: DateTime<Utc>) -> String {
    let Some(parsed) = parse_date(date) else {
        return date.to_string();
    };

    let diff = now - parsed;
    let days = diff.num_days();

    if diff.num_milliseconds() < 0 {
        return format_date(parsed);
    }

    if days == 0 {
        let hours = diff.num_hours();
        if hours == 0 {
            let minutes = diff.num_minutes();
            if minutes <= 1 {
                return "just now".to_string();
            }
            return format!("{} minutes ago", minutes);
        }
        if hours == 1 {
            return "1 hour ago".to_string();
        }
        return format!("{} hours ago", hours);
    }

    if days == 1 {
        return "yesterday".to_string();
    }
    if days <= 30 {
        return format!("{} days ago", days);
    }

    format_date(parsed)
}

fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

// ============ Renderers ============

pub fn render_search(response: &SearchResponse, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    if let Some(ref autoprompt) = response.autoprompt_string {
        let _ = writeln!(out, "Searched for: {}", autoprompt);
    }
    if response.results.is_empty() {
        let _ = writeln!(out, "No results found.");
        return out;
    }
    let _ = writeln!(out, "Found {} results", response.results.len());
    let _ = writeln!(out);

    for (i, result) in response.results.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, result.title);
        let _ = write!(out, "   {}", domain(&result.url));
        if let Some(ref author) = result.author {
            let _ = write!(out, " · {}", author);
        }
        if let Some(ref published) = result.published_date {
            let _ = write!(out, " · {}", format_relative_time(published, now));
        }
        if let Some(score) = result.score {
            let _ = write!(out, " · {} relevance", relevance_level(score).as_str());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "   {}", result.url);

        if let Some(ref summary) = result.summary {
            let _ = writeln!(out, "   {}", truncate_highlight(summary, HIGHLIGHT_MAX_CHARS));
        }
        if let Some(ref highlights) = result.highlights {
            let scores = result.highlight_scores.as_deref().unwrap_or(&[]);
            if let Some(top) = sort_highlights_by_score(highlights, scores).first() {
                let _ = writeln!(
                    out,
                    "   > {}",
                    truncate_highlight(&top.text, HIGHLIGHT_MAX_CHARS)
                );
            }
        }
        let _ = writeln!(out);
    }
    out
}

fn render_citations(out: &mut String, citations: &[Citation]) {
    if citations.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Sources:");
    for (i, citation) in citations.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {} ({})",
            i + 1,
            citation.title,
            domain(&citation.url)
        );
        let _ = writeln!(out, "      {}", citation.url);
    }
}

pub fn render_answer(response: &AnswerResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", response.answer.trim_end());
    render_citations(&mut out, &response.citations);
    out
}

pub fn render_research(report: &ResearchReport) -> String {
    let mut out = String::new();
    match report.output {
        Some(ref output) => {
            let _ = writeln!(out, "{}", output.content.trim_end());
        }
        None => {
            let _ = writeln!(out, "(research completed without output)");
        }
    }
    render_citations(&mut out, &report.citations);
    if let Some(ref cost) = report.cost_dollars {
        let _ = writeln!(out);
        let _ = write!(out, "Cost: ${:.4}", cost.total);
        if let Some(pages) = cost.num_pages {
            let _ = write!(out, " · {} pages", pages);
        }
        if let Some(searches) = cost.num_searches {
            let _ = write!(out, " · {} searches", searches);
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_contents(response: &ContentsResponse) -> String {
    let mut out = String::new();
    for result in &response.results {
        let _ = writeln!(out, "--- {} ---", result.title);
        let _ = writeln!(out, "url: {}", result.url);
        if let Some(ref author) = result.author {
            let _ = writeln!(out, "author: {}", author);
        }
        if let Some(ref published) = result.published_date {
            let _ = writeln!(out, "published: {}", published);
        }
        if let Some(ref summary) = result.summary {
            let _ = writeln!(out, "summary: {}", summary);
        }
        if let Some(ref highlights) = result.highlights {
            let scores = result.highlight_scores.as_deref().unwrap_or(&[]);
            if let Some(pct) = average_highlight_score(scores) {
                let _ = writeln!(out, "highlight score: {}%", pct);
            }
            for h in sort_highlights_by_score(highlights, scores) {
                let _ = writeln!(out, "  > {}", truncate_highlight(&h.text, HIGHLIGHT_MAX_CHARS));
            }
        }
        if let Some(ref text) = result.text {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", text.trim_end());
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_payload(payload: &Payload, now: DateTime<Utc>) -> String {
    match payload {
        Payload::Results(results) => render_search(results, now),
        Payload::Answer(answer) => render_answer(answer),
        Payload::Research(report) => render_research(report),
    }
}

/// One session message with its mode tag and current state.
pub fn render_message(message: &Message, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", message.mode, message.query);
    match message.state {
        MessageState::Pending => {
            let _ = writeln!(out, "  ... waiting");
        }
        MessageState::Resolved(ref payload) => {
            out.push_str(&render_payload(payload, now));
        }
        MessageState::Errored(ref error) => {
            let _ = writeln!(out, "Error: {}", error);
            let _ = writeln!(out, "(type /retry to try again)");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relevance_boundaries() {
        assert_eq!(relevance_level(0.8), Relevance::High);
        assert_eq!(relevance_level(0.79), Relevance::Medium);
        assert_eq!(relevance_level(0.5), Relevance::Medium);
        assert_eq!(relevance_level(0.49), Relevance::Low);
    }

    #[test]
    fn test_sort_highlights() {
        let highlights = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let sorted = sort_highlights_by_score(&highlights, &[0.1, 0.9, 0.5]);
        let order: Vec<&str> = sorted.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_highlights_mismatched_lengths() {
        let highlights = vec!["a".to_string(), "b".to_string()];
        let sorted = sort_highlights_by_score(&highlights, &[0.2]);
        assert_eq!(sorted[0].text, "a");
        assert_eq!(sorted[1].score, 0.0);
    }

    #[test]
    fn test_truncate_highlight() {
        assert_eq!(truncate_highlight("short", 10), "short");
        assert_eq!(truncate_highlight("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_highlight("ééééé", 2), "éé...");
    }

    #[test]
    fn test_average_highlight_score() {
        assert_eq!(average_highlight_score(&[]), None);
        assert_eq!(average_highlight_score(&[0.5, 0.75]), Some(63));
    }

    #[test]
    fn test_domain() {
        assert_eq!(domain("https://www.rust-lang.org/learn"), "rust-lang.org");
        assert_eq!(domain("https://docs.rs/tokio"), "docs.rs");
        assert_eq!(domain("not a url"), "not a url");
    }

    #[test]
    fn test_relative_time() {
        assert_eq!(format_relative_time("2024-06-15T11:59:30Z", now()), "just now");
        assert_eq!(format_relative_time("2024-06-15T11:30:00Z", now()), "30 minutes ago");
        assert_eq!(format_relative_time("2024-06-15T11:00:00Z", now()), "1 hour ago");
        assert_eq!(format_relative_time("2024-06-15T07:00:00Z", now()), "5 hours ago");
        assert_eq!(format_relative_time("2024-06-14T10:00:00Z", now()), "yesterday");
        assert_eq!(format_relative_time("2024-06-05", now()), "10 days ago");
        assert_eq!(format_relative_time("2024-01-02", now()), "Jan 2, 2024");
        assert_eq!(format_relative_time("2024-07-01", now()), "Jul 1, 2024");
        assert_eq!(format_relative_time("sometime", now()), "sometime");
    }

    #[test]
    fn test_render_search() {
        let response = SearchResponse {
            results: vec![SearchResult {
                id: "1".into(),
                url: "https://www.example.com/post".into(),
                title: "Example Post".into(),
                text: None,
                summary: Some("A summary.".into()),
                highlights: Some(vec!["low".into(), "best".into()]),
                highlight_scores: Some(vec![0.1, 0.9]),
                published_date: Some("2024-06-13T12:00:00Z".into()),
                author: Some("Ada".into()),
                score: Some(0.85),
                image: None,
            }],
            autoprompt_string: Some("example posts".into()),
            request_id: None,
        };
        let out = render_search(&response, now());
        assert!(out.contains("Searched for: example posts"));
        assert!(out.contains("1. Example Post"));
        assert!(out.contains("example.com · Ada · 2 days ago · high relevance"));
        assert!(out.contains("> best"));
    }

    #[test]
    fn test_render_answer_numbers_citations() {
        let response = AnswerResponse {
            answer: "Use tokio.".into(),
            citations: vec![Citation {
                id: "c".into(),
                url: "https://tokio.rs".into(),
                title: "Tokio".into(),
            }],
        };
        let out = render_answer(&response);
        assert!(out.starts_with("Use tokio.\n"));
        assert!(out.contains("[1] Tokio (tokio.rs)"));
    }
}
