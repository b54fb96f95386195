//! Recommendation ranking: scores a set of jobs for one candidate and keeps the best.

use serde::Serialize;
use tracing::warn;

use crate::matching::fit::{CandidateProfile, JobMatch, JobMatcher, JobProfile};
use crate::models::job::Job;

/// A job paired with its match report.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub job: Job,
    pub job_match: JobMatch,
}

/// Scores every job, sorts descending by overall score and keeps `limit`.
///
/// The sort is stable, so equally scored jobs keep their input order. A job
/// whose scoring fails is skipped and logged rather than failing the ranking.
pub async fn rank_jobs(
    matcher: &dyn JobMatcher,
    candidate: &CandidateProfile,
    jobs: Vec<Job>,
    limit: usize,
) -> Vec<Recommendation> {
    let mut ranked = Vec::with_capacity(jobs.len());

    for job in jobs {
        match matcher.score(&JobProfile::from(&job), candidate).await {
            Ok(job_match) => ranked.push(Recommendation { job, job_match }),
            Err(e) => warn!("Skipping job {} in ranking: {e}", job.id),
        }
    }

    ranked.sort_by(|a, b| {
        b.job_match
            .overall_match_score
            .cmp(&a.job_match.overall_match_score)
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use uuid::Uuid;

    use crate::errors::AppError;
    use crate::matching::fit::HeuristicJobMatcher;
    use crate::matching::placeholder::FixedPlaceholders;
    use crate::matching::skills::MatchStrategy;
    use crate::models::job::fixtures::job;

    /// Returns a preset overall score per job title; unknown titles fail.
    struct ScriptedMatcher {
        scores: HashMap<String, u32>,
    }

    #[async_trait]
    impl JobMatcher for ScriptedMatcher {
        async fn score(
            &self,
            job: &JobProfile,
            _candidate: &CandidateProfile,
        ) -> Result<JobMatch, AppError> {
            let score = *self
                .scores
                .get(&job.title)
                .ok_or_else(|| AppError::Ai(format!("no score for {}", job.title)))?;
            Ok(JobMatch {
                overall_match_score: score,
                skill_match_score: score as f64,
                experience_match_score: 50,
                culture_fit_score: 50,
                matching_skills: vec![],
                reasoning: String::new(),
                recommendations: vec![],
                backend: "scripted".to_string(),
            })
        }
    }

    fn scripted(pairs: &[(&str, u32)]) -> ScriptedMatcher {
        ScriptedMatcher {
            scores: pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
        }
    }

    fn titles(ranked: &[Recommendation]) -> Vec<&str> {
        ranked.iter().map(|r| r.job.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_ties_keep_input_order() {
        let matcher = scripted(&[("a", 70), ("b", 90), ("c", 90)]);
        let employer = Uuid::new_v4();
        let jobs = vec![job("a", &[], employer), job("b", &[], employer), job("c", &[], employer)];

        let ranked = rank_jobs(&matcher, &CandidateProfile::default(), jobs, 2).await;
        assert_eq!(titles(&ranked), vec!["b", "c"]);
        assert!(ranked.iter().all(|r| r.job_match.overall_match_score == 90));
    }

    #[tokio::test]
    async fn test_descending_order() {
        let matcher = scripted(&[("low", 10), ("high", 95), ("mid", 50)]);
        let employer = Uuid::new_v4();
        let jobs = vec![job("low", &[], employer), job("high", &[], employer), job("mid", &[], employer)];

        let ranked = rank_jobs(&matcher, &CandidateProfile::default(), jobs, 10).await;
        assert_eq!(titles(&ranked), vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn test_limit_larger_than_input() {
        let matcher = scripted(&[("only", 40)]);
        let jobs = vec![job("only", &[], Uuid::new_v4())];
        let ranked = rank_jobs(&matcher, &CandidateProfile::default(), jobs, 5).await;
        assert_eq!(ranked.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_is_skipped() {
        let matcher = scripted(&[("ok", 60)]);
        let employer = Uuid::new_v4();
        let jobs = vec![job("broken", &[], employer), job("ok", &[], employer)];
        let ranked = rank_jobs(&matcher, &CandidateProfile::default(), jobs, 5).await;
        assert_eq!(titles(&ranked), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_empty_jobs() {
        let matcher = scripted(&[]);
        let ranked = rank_jobs(&matcher, &CandidateProfile::default(), vec![], 3).await;
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_with_heuristic_matcher() {
        let matcher = HeuristicJobMatcher::new(MatchStrategy::Substring, Box::new(FixedPlaceholders::default()));
        let employer = Uuid::new_v4();
        let jobs = vec![
            job("python", &["Python", "Django"], employer),
            job("rust", &["Rust"], employer),
            job("mixed", &["Rust", "Go"], employer),
        ];
        let candidate = CandidateProfile {
            skills: vec!["Rust".to_string()],
            ..Default::default()
        };
        let ranked = rank_jobs(&matcher, &candidate, jobs, 3).await;
        assert_eq!(titles(&ranked), vec!["rust", "mixed", "python"]);
    }
}
