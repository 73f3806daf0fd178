//! Rubric scoring of session transcripts through the LLM provider.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm::{LlmError, LlmProvider};
use crate::metrics::LLM_RETRIES_TOTAL;
use crate::retry::{RetryPolicy, retry_with_backoff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskFlag {
    Safe,
    Risk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub content_coverage: Score,
    pub facilitation_quality: Score,
    pub protocol_safety: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDetection {
    pub status: RiskFlag,
    #[serde(default)]
    pub quote: Option<String>,
}

/// Scores returned by the model for one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub summary: String,
    pub metrics: Metrics,
    pub risk_detection: RiskDetection,
}

impl SessionAnalysis {
    pub fn justification(&self) -> String {
        format!(
            "Content: {}/3, Facilitation: {}/3, Protocol: {}/3",
            self.metrics.content_coverage.score,
            self.metrics.facilitation_quality.score,
            self.metrics.protocol_safety.score
        )
    }
}

pub fn build_prompt(transcript: &str) -> String {
    format!(
        r#"You are an expert supervisor analyzing a group therapy session transcript led by a Fellow.
Score the session against this rubric.

1. Content Coverage (1-3): 1 missed or misdefined the "Growth Mindset" concept; 2 mentioned it without checking understanding; 3 explained it clearly, gave an example and invited thoughts.
2. Facilitation Quality (1-3): 1 monologue, interruptions or confusing jargon; 2 polite but transactional; 3 warm, drew in quiet members, validated feelings.
3. Protocol Safety (1-3): 1 gave unauthorized advice or strayed off topic; 2 drifted but came back; 3 stayed on curriculum and handled distractions.

Risk detection: if the transcript shows any sign of self-harm, severe crisis or harm to others set status to "RISK" and copy the exact quote, otherwise set status to "SAFE" and quote to null.

Transcript:
"""
{transcript}
"""

Reply with a JSON object only:
{{
  "summary": "3-sentence summary",
  "metrics": {{
    "contentCoverage": {{ "score": number }},
    "facilitationQuality": {{ "score": number }},
    "protocolSafety": {{ "score": number }}
  }},
  "riskDetection": {{ "status": "SAFE" | "RISK", "quote": string | null }}
}}"#
    )
}

pub fn parse_analysis(content: &str) -> Result<SessionAnalysis, LlmError> {
    let analysis: SessionAnalysis =
        serde_json::from_str(content).map_err(|e| LlmError::InvalidAnalysis(e.to_string()))?;

    let scores = [
        ("contentCoverage", analysis.metrics.content_coverage.score),
        ("facilitationQuality", analysis.metrics.facilitation_quality.score),
        ("protocolSafety", analysis.metrics.protocol_safety.score),
    ];
    for (name, score) in scores {
        if !(1..=3).contains(&score) {
            return Err(LlmError::InvalidAnalysis(format!("{name} score {score} outside 1-3")));
        }
    }

    Ok(analysis)
}

/// Score a transcript, retrying the completion call while the provider throttles.
pub async fn analyze_transcript(
    provider: &dyn LlmProvider,
    policy: &RetryPolicy,
    transcript: &str,
) -> Result<SessionAnalysis, LlmError> {
    let prompt = build_prompt(transcript);
    let prompt = prompt.as_str();

    let content = retry_with_backoff(
        policy,
        move || provider.complete(prompt),
        |attempt, err: &LlmError| {
            LLM_RETRIES_TOTAL.inc();
            warn!(attempt = attempt + 1, error = %err, "LLM call throttled, retrying");
        },
    )
    .await?;

    parse_analysis(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, analysis_json};

    #[test]
    fn parses_model_output() {
        let a = parse_analysis(&analysis_json("RISK", 3)).unwrap();
        assert_eq!(a.risk_detection.status, RiskFlag::Risk);
        assert_eq!(a.metrics.protocol_safety.score, 3);
        assert_eq!(a.justification(), "Content: 3/3, Facilitation: 3/3, Protocol: 3/3");
    }

    #[test]
    fn rejects_out_of_range_scores() {
        let err = parse_analysis(&analysis_json("SAFE", 5)).unwrap_err();
        assert!(matches!(err, LlmError::InvalidAnalysis(_)));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_analysis("Sure! Here is the analysis"),
            Err(LlmError::InvalidAnalysis(_))
        ));
    }

    #[test]
    fn prompt_embeds_transcript() {
        let prompt = build_prompt("Fellow: hello group");
        assert!(prompt.contains("Fellow: hello group"));
        assert!(prompt.contains("\"riskDetection\""));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_throttled_completion() {
        let provider = ScriptedProvider::new(vec![
            Err(LlmError::RateLimited("slow down".into())),
            Ok(analysis_json("SAFE", 2)),
        ]);

        let a = analyze_transcript(&provider, &RetryPolicy::plain(), "t")
            .await
            .unwrap();
        assert_eq!(a.metrics.content_coverage.score, 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_non_throttling_failure_immediately() {
        let provider = ScriptedProvider::new(vec![Err(LlmError::Status {
            status: 401,
            body: "invalid key".into(),
        })]);

        let err = analyze_transcript(&provider, &RetryPolicy::jittered(), "t")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 401, .. }));
        assert_eq!(provider.calls(), 1);
    }
}
