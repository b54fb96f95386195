//! Job fit: a pluggable, trait-based matcher that scores a candidate against a job.
//!
//! Default: `HeuristicJobMatcher` (skill overlap plus placeholder sub-scores,
//! deterministic for the skill portion, no I/O).
//! Optional: `RemoteJobMatcher` (OpenAI-compatible chat endpoint, falls back to
//! the heuristic when the service is unreachable).
//!
//! `AppState` holds a `Matchers` set; callers pick a backend per request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::ai_client::{parse_json, AiClient, CallOptions};
use crate::errors::AppError;
use crate::matching::placeholder::PlaceholderSource;
use crate::matching::prompts::{JOB_MATCH_PROMPT_TEMPLATE, JOB_MATCH_SYSTEM};
use crate::matching::skills::{matched_skills, skill_match_score, MatchStrategy};
use crate::models::job::{Budget, Job};
use crate::models::user::User;

const SKILL_WEIGHT: f64 = 0.6;
const EXPERIENCE_WEIGHT: f64 = 0.4;

/// Generic advice attached to every heuristic report.
pub const GENERIC_RECOMMENDATIONS: [&str; 3] = [
    "Highlight relevant project experience",
    "Emphasize transferable skills",
    "Show enthusiasm for the role",
];

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// The parts of a job the matchers look at. Missing lists deserialize as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobProfile {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub budget: Option<Budget>,
}

impl From<&Job> for JobProfile {
    fn from(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            company: job.company.clone(),
            skills: job.skills.clone(),
            budget: Some(job.budget.clone()),
        }
    }
}

/// The parts of a candidate the matchers look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl From<&User> for CandidateProfile {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            bio: user.bio.clone(),
            skills: user.skills.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub overall_match_score: u32,       // 0-100
    pub skill_match_score: f64,         // 0-100
    pub experience_match_score: u32,    // placeholder
    pub culture_fit_score: u32,         // placeholder
    pub matching_skills: Vec<String>,
    pub reasoning: String,
    pub recommendations: Vec<String>,
    pub backend: String, // "heuristic" | "remote"
}

/// `round(skill * 0.6 + experience * 0.4)`, clamped to `[0, 100]`.
pub fn overall_match_score(skill: f64, experience: f64) -> u32 {
    (skill * SKILL_WEIGHT + experience * EXPERIENCE_WEIGHT)
        .round()
        .clamp(0.0, 100.0) as u32
}

fn reasoning(matched: usize, required: usize) -> String {
    format!("Candidate has {matched} matching skills out of {required} required skills.")
}

fn to_score(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The job matcher trait. Implement this to swap backends without touching
/// the ranker or the handlers.
#[async_trait]
pub trait JobMatcher: Send + Sync {
    async fn score(
        &self,
        job: &JobProfile,
        candidate: &CandidateProfile,
    ) -> Result<JobMatch, AppError>;
}

/// Backend requested by a caller. `open-source` and `openai` are accepted as
/// aliases for older clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    #[serde(alias = "open-source")]
    Heuristic,
    #[serde(alias = "openai")]
    Remote,
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicJobMatcher (default)
// ────────────────────────────────────────────────────────────────────────────

/// Skill-overlap matcher.
///
/// Algorithm:
/// 1. A job skill is matched if the configured `MatchStrategy` pairs it with any
///    candidate skill (default: bidirectional case-insensitive substring)
/// 2. skill score = matched / required × 100 (0 when nothing is required)
/// 3. experience and culture fit come from the `PlaceholderSource`
/// 4. overall = round(skill × 0.6 + experience × 0.4)
pub struct HeuristicJobMatcher {
    strategy: MatchStrategy,
    placeholders: Box<dyn PlaceholderSource>,
}

impl HeuristicJobMatcher {
    pub fn new(strategy: MatchStrategy, placeholders: Box<dyn PlaceholderSource>) -> Self {
        Self {
            strategy,
            placeholders,
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Scores two skill lists. Never fails; empty lists score zero skill match.
    pub fn evaluate(&self, job_skills: &[String], candidate_skills: &[String]) -> JobMatch {
        let matching_skills = matched_skills(job_skills, candidate_skills, self.strategy);
        let skill = skill_match_score(matching_skills.len(), job_skills.len());
        let experience = self.placeholders.experience();
        let culture_fit = self.placeholders.culture_fit();

        JobMatch {
            overall_match_score: overall_match_score(skill, experience),
            skill_match_score: skill,
            experience_match_score: to_score(experience),
            culture_fit_score: to_score(culture_fit),
            reasoning: reasoning(matching_skills.len(), job_skills.len()),
            matching_skills,
            recommendations: GENERIC_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
            backend: "heuristic".to_string(),
        }
    }
}

#[async_trait]
impl JobMatcher for HeuristicJobMatcher {
    async fn score(
        &self,
        job: &JobProfile,
        candidate: &CandidateProfile,
    ) -> Result<JobMatch, AppError> {
        Ok(self.evaluate(&job.skills, &candidate.skills))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteJobMatcher (AI service backend)
// ────────────────────────────────────────────────────────────────────────────

/// Fields the remote service may return. Anything missing is filled locally.
#[derive(Debug, Default, Deserialize)]
struct RemoteAnalysis {
    overall_match_score: Option<f64>,
    skill_match_score: Option<f64>,
    experience_match_score: Option<f64>,
    culture_fit_score: Option<f64>,
    reasoning: Option<String>,
    recommendations: Option<Vec<String>>,
}

pub struct RemoteJobMatcher {
    client: AiClient,
    fallback: Arc<HeuristicJobMatcher>,
}

impl RemoteJobMatcher {
    pub fn new(client: AiClient, fallback: Arc<HeuristicJobMatcher>) -> Self {
        Self { client, fallback }
    }
}

#[async_trait]
impl JobMatcher for RemoteJobMatcher {
    async fn score(
        &self,
        job: &JobProfile,
        candidate: &CandidateProfile,
    ) -> Result<JobMatch, AppError> {
        let matching_skills =
            matched_skills(&job.skills, &candidate.skills, self.fallback.strategy());
        let skill = skill_match_score(matching_skills.len(), job.skills.len());

        let options = CallOptions {
            temperature: 0.3,
            max_tokens: 500,
        };
        let system = format!("{JOB_MATCH_SYSTEM} {JSON_ONLY_INSTRUCTION}");
        let text = match self
            .client
            .call_text(&build_match_prompt(job, candidate), &system, options)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Remote job match failed, using heuristic: {e}");
                return self.fallback.score(job, candidate).await;
            }
        };

        debug!("Remote job match answered via model {}", self.client.model());
        Ok(interpret_remote_answer(&text, skill, matching_skills))
    }
}

/// Builds the report from the service's answer. A non-JSON answer keeps the
/// local skill score and neutral placeholders.
fn interpret_remote_answer(text: &str, skill: f64, matching_skills: Vec<String>) -> JobMatch {
    match parse_json::<RemoteAnalysis>(text) {
        Ok(analysis) => JobMatch {
            overall_match_score: to_score(analysis.overall_match_score.unwrap_or(skill)),
            skill_match_score: analysis
                .skill_match_score
                .unwrap_or(skill)
                .clamp(0.0, 100.0),
            experience_match_score: to_score(analysis.experience_match_score.unwrap_or(50.0)),
            culture_fit_score: to_score(analysis.culture_fit_score.unwrap_or(50.0)),
            matching_skills,
            reasoning: analysis
                .reasoning
                .unwrap_or_else(|| "AI-enhanced skill matching analysis".to_string()),
            recommendations: analysis.recommendations.unwrap_or_default(),
            backend: "remote".to_string(),
        },
        Err(e) => {
            warn!("Could not parse remote job match answer: {e}");
            JobMatch {
                overall_match_score: to_score(skill),
                skill_match_score: skill,
                experience_match_score: 50,
                culture_fit_score: 50,
                matching_skills,
                reasoning: "Basic skill matching analysis (AI analysis failed)".to_string(),
                recommendations: vec!["Consider adding more skills to improve matching".to_string()],
                backend: "remote".to_string(),
            }
        }
    }
}

fn build_match_prompt(job: &JobProfile, candidate: &CandidateProfile) -> String {
    let budget = job
        .budget
        .as_ref()
        .map(|b| format!("{} {} - {}", b.currency, b.min, b.max))
        .unwrap_or_else(|| "Not specified".to_string());
    let bio = if candidate.bio.trim().is_empty() {
        "Not provided"
    } else {
        candidate.bio.as_str()
    };

    JOB_MATCH_PROMPT_TEMPLATE
        .replace("{title}", &job.title)
        .replace("{description}", &job.description)
        .replace("{job_skills}", &job.skills.join(", "))
        .replace("{budget}", &budget)
        .replace("{candidate_skills}", &candidate.skills.join(", "))
        .replace("{bio}", bio)
}

// ────────────────────────────────────────────────────────────────────────────
// Backend selection
// ────────────────────────────────────────────────────────────────────────────

/// The configured matchers. The remote one exists only when an API key is set.
#[derive(Clone)]
pub struct Matchers {
    heuristic: Arc<HeuristicJobMatcher>,
    remote: Option<Arc<RemoteJobMatcher>>,
}

impl Matchers {
    pub fn new(heuristic: Arc<HeuristicJobMatcher>, remote: Option<Arc<RemoteJobMatcher>>) -> Self {
        Self { heuristic, remote }
    }

    /// Returns the requested backend, or the heuristic when remote is unavailable.
    pub fn select(&self, kind: MatcherKind) -> Arc<dyn JobMatcher> {
        match (kind, &self.remote) {
            (MatcherKind::Remote, Some(remote)) => remote.clone() as Arc<dyn JobMatcher>,
            (MatcherKind::Remote, None) => {
                debug!("Remote matcher requested but not configured; using heuristic");
                self.heuristic.clone()
            }
            (MatcherKind::Heuristic, _) => self.heuristic.clone(),
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::placeholder::{FixedPlaceholders, RandomPlaceholders};

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixed_matcher(experience: f64) -> HeuristicJobMatcher {
        HeuristicJobMatcher::new(
            MatchStrategy::Substring,
            Box::new(FixedPlaceholders {
                experience,
                culture_fit: 80.0,
            }),
        )
    }

    #[test]
    fn test_example_half_match() {
        let report = fixed_matcher(50.0).evaluate(&list(&["React", "Node.js"]), &list(&["React", "Python"]));
        assert_eq!(report.matching_skills, list(&["React"]));
        assert_eq!(report.skill_match_score, 50.0);
        // 50 * 0.6 + 50 * 0.4
        assert_eq!(report.overall_match_score, 50);
        assert_eq!(
            report.reasoning,
            "Candidate has 1 matching skills out of 2 required skills."
        );
    }

    #[test]
    fn test_empty_job_skills_is_zero_not_nan() {
        let report = fixed_matcher(0.0).evaluate(&[], &list(&["React"]));
        assert_eq!(report.skill_match_score, 0.0);
        assert!(!report.skill_match_score.is_nan());
        assert_eq!(report.overall_match_score, 0);
    }

    #[test]
    fn test_both_lists_empty() {
        let report = fixed_matcher(50.0).evaluate(&[], &[]);
        assert_eq!(report.skill_match_score, 0.0);
        assert!(report.matching_skills.is_empty());
    }

    #[test]
    fn test_java_matches_javascript_by_default() {
        let report = fixed_matcher(50.0).evaluate(&list(&["Java"]), &list(&["JavaScript"]));
        assert_eq!(report.skill_match_score, 100.0);
    }

    #[test]
    fn test_exact_strategy_rejects_javascript_for_java() {
        let matcher = HeuristicJobMatcher::new(MatchStrategy::Exact, Box::new(FixedPlaceholders::default()));
        let report = matcher.evaluate(&list(&["Java"]), &list(&["JavaScript"]));
        assert_eq!(report.skill_match_score, 0.0);
    }

    #[test]
    fn test_overall_bounded_with_random_placeholders() {
        let matcher = HeuristicJobMatcher::new(MatchStrategy::Substring, Box::new(RandomPlaceholders::seeded(42)));
        for _ in 0..50 {
            let report = matcher.evaluate(&list(&["Rust", "Go", "SQL"]), &list(&["rust"]));
            assert!(report.overall_match_score <= 100);
            assert!((60..=100).contains(&report.experience_match_score));
            assert!((70..=100).contains(&report.culture_fit_score));
            assert!((report.skill_match_score - 100.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overall_formula_rounds() {
        assert_eq!(overall_match_score(100.0, 100.0), 100);
        assert_eq!(overall_match_score(0.0, 0.0), 0);
        // 33.33 * 0.6 + 61 * 0.4 = 20 + 24.4 = 44.4
        assert_eq!(overall_match_score(100.0 / 3.0, 61.0), 44);
    }

    #[test]
    fn test_recommendations_are_generic() {
        let report = fixed_matcher(50.0).evaluate(&list(&["Rust"]), &[]);
        assert_eq!(report.recommendations.len(), 3);
        assert_eq!(report.backend, "heuristic");
    }

    #[tokio::test]
    async fn test_trait_score_uses_profiles() {
        let matcher = fixed_matcher(50.0);
        let job = JobProfile {
            skills: list(&["Docker"]),
            ..Default::default()
        };
        let candidate = CandidateProfile {
            skills: list(&["docker"]),
            ..Default::default()
        };
        let report = matcher.score(&job, &candidate).await.unwrap();
        assert_eq!(report.skill_match_score, 100.0);
    }

    #[test]
    fn test_profiles_default_missing_skills() {
        let job: JobProfile = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        let candidate: CandidateProfile = serde_json::from_str("{}").unwrap();
        assert!(job.skills.is_empty());
        assert!(candidate.skills.is_empty());
    }

    #[test]
    fn test_interpret_remote_json() {
        let text = r#"{"overall_match_score": 88, "experience_match_score": 70, "reasoning": "good"}"#;
        let report = interpret_remote_answer(text, 50.0, list(&["Rust"]));
        assert_eq!(report.overall_match_score, 88);
        assert_eq!(report.skill_match_score, 50.0);
        assert_eq!(report.experience_match_score, 70);
        assert_eq!(report.culture_fit_score, 50);
        assert_eq!(report.reasoning, "good");
        assert_eq!(report.backend, "remote");
    }

    #[test]
    fn test_interpret_remote_garbage() {
        let report = interpret_remote_answer("I think they fit well", 75.0, vec![]);
        assert_eq!(report.overall_match_score, 75);
        assert_eq!(report.experience_match_score, 50);
        assert!(report.reasoning.contains("AI analysis failed"));
    }

    #[test]
    fn test_prompt_contains_inputs() {
        let job = JobProfile {
            title: "Rust Engineer".to_string(),
            skills: list(&["Rust", "Tokio"]),
            ..Default::default()
        };
        let prompt = build_match_prompt(&job, &CandidateProfile::default());
        assert!(prompt.contains("Rust Engineer"));
        assert!(prompt.contains("Rust, Tokio"));
        assert!(prompt.contains("Not provided"));
        assert!(!prompt.contains("{title}"));
    }

    #[tokio::test]
    async fn test_remote_falls_back_when_unreachable() {
        let fallback = Arc::new(fixed_matcher(50.0));
        let client = AiClient::new(
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            "key".to_string(),
            "free-model".to_string(),
        )
        .unwrap();
        let remote = RemoteJobMatcher::new(client, fallback);
        let job = JobProfile {
            skills: list(&["Rust"]),
            ..Default::default()
        };
        let candidate = CandidateProfile {
            skills: list(&["Rust"]),
            ..Default::default()
        };
        let report = remote.score(&job, &candidate).await.unwrap();
        assert_eq!(report.backend, "heuristic");
        assert_eq!(report.skill_match_score, 100.0);
    }

    #[tokio::test]
    async fn test_select_remote_without_key_uses_heuristic() {
        let matchers = Matchers::new(Arc::new(fixed_matcher(50.0)), None);
        let matcher = matchers.select(MatcherKind::Remote);
        let report = matcher
            .score(&JobProfile::default(), &CandidateProfile::default())
            .await
            .unwrap();
        assert_eq!(report.backend, "heuristic");
    }

    #[test]
    fn test_matcher_kind_aliases() {
        let k: MatcherKind = serde_json::from_str(r#""open-source""#).unwrap();
        assert_eq!(k, MatcherKind::Heuristic);
        let k: MatcherKind = serde_json::from_str(r#""openai""#).unwrap();
        assert_eq!(k, MatcherKind::Remote);
    }
}
