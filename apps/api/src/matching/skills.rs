//! Skill comparison: decides whether a job skill is covered by a candidate's skills.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum normalized similarity for the fuzzy strategy.
const FUZZY_THRESHOLD: f64 = 0.8;

/// How a job skill is compared against candidate skills.
///
/// `Substring` is the default and deliberately permissive: `"Java"` matches
/// `"JavaScript"` and vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    #[default]
    Substring,
    Fuzzy,
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchStrategy::Exact),
            "substring" => Ok(MatchStrategy::Substring),
            "fuzzy" => Ok(MatchStrategy::Fuzzy),
            other => Err(format!("unknown match strategy '{other}'")),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Substring => "substring",
            MatchStrategy::Fuzzy => "fuzzy",
        };
        f.write_str(name)
    }
}

impl MatchStrategy {
    /// Compares two skills. Case-insensitive under every strategy, and an exact
    /// (trimmed) match always counts.
    pub fn skills_match(&self, job_skill: &str, candidate_skill: &str) -> bool {
        let job = job_skill.trim().to_lowercase();
        let candidate = candidate_skill.trim().to_lowercase();
        if job == candidate {
            return true;
        }
        match self {
            MatchStrategy::Exact => false,
            MatchStrategy::Substring => candidate.contains(&job) || job.contains(&candidate),
            MatchStrategy::Fuzzy => {
                let job = alphanumeric(&job);
                let candidate = alphanumeric(&candidate);
                !job.is_empty() && similarity(&job, &candidate) >= FUZZY_THRESHOLD
            }
        }
    }
}

/// Job skills covered by at least one candidate skill, in job order.
pub fn matched_skills(
    job_skills: &[String],
    candidate_skills: &[String],
    strategy: MatchStrategy,
) -> Vec<String> {
    job_skills
        .iter()
        .filter(|skill| {
            candidate_skills
                .iter()
                .any(|candidate| strategy.skills_match(skill, candidate))
        })
        .cloned()
        .collect()
}

/// `matched / required * 100`, or `0.0` when nothing is required.
pub fn skill_match_score(matched: usize, required: usize) -> f64 {
    if required == 0 {
        return 0.0;
    }
    (matched as f64 / required as f64 * 100.0).clamp(0.0, 100.0)
}

fn alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// `1 - levenshtein / max_len`, in `[0, 1]`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
