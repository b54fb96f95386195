//! Keyword heuristics over job descriptions, and canned application advice.

use serde::{Deserialize, Serialize};

use crate::matching::fit::CandidateProfile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    #[default]
    Mid,
    Senior,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryIndication {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub key_requirements: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub industry: String,
    pub remote_friendly: bool,
    pub salary_indication: SalaryIndication,
    pub company_culture: Vec<String>,
    pub growth_opportunities: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSuggestions {
    pub cover_letter_tips: Vec<String>,
    pub skill_highlights: Vec<String>,
    pub experience_relevance: String,
    pub interview_prep: Vec<String>,
    pub red_flags: Vec<String>,
}

const SENIOR_MARKERS: &[&str] = &["senior", "lead", "principal"];
const JUNIOR_MARKERS: &[&str] = &["junior", "entry", "graduate"];
const REMOTE_MARKERS: &[&str] = &["remote", "work from home", "wfh"];
const HIGH_PAY_MARKERS: &[&str] = &["competitive", "high", "excellent"];
const LOW_PAY_MARKERS: &[&str] = &["entry", "junior"];
const REQUIREMENT_KEYWORDS: &[&str] = &[
    "experience",
    "knowledge",
    "proficiency",
    "familiarity",
    "expertise",
];

fn mentions_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Derives coarse signals from a job description by keyword presence.
pub fn analyze_job_description(description: &str) -> JobAnalysis {
    let text = description.to_lowercase();

    let experience_level = if mentions_any(&text, SENIOR_MARKERS) {
        ExperienceLevel::Senior
    } else if mentions_any(&text, JUNIOR_MARKERS) {
        ExperienceLevel::Junior
    } else {
        ExperienceLevel::Mid
    };

    let salary_indication = if mentions_any(&text, HIGH_PAY_MARKERS) {
        SalaryIndication::High
    } else if mentions_any(&text, LOW_PAY_MARKERS) {
        SalaryIndication::Low
    } else {
        SalaryIndication::Medium
    };

    let key_requirements = REQUIREMENT_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|kw| format!("Strong {kw} in relevant technologies"))
        .collect();

    let mut company_culture = Vec::new();
    if mentions_any(&text, &["team", "collaboration"]) {
        company_culture.push("Team-oriented".to_string());
    }
    if mentions_any(&text, &["fast-paced", "startup"]) {
        company_culture.push("Fast-paced environment".to_string());
    }

    JobAnalysis {
        key_requirements,
        experience_level,
        industry: "tech".to_string(),
        remote_friendly: mentions_any(&text, REMOTE_MARKERS),
        salary_indication,
        company_culture,
        growth_opportunities: true,
    }
}

/// Generic application advice, plus the candidate's first three skills.
pub fn application_suggestions(candidate: &CandidateProfile) -> ApplicationSuggestions {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    ApplicationSuggestions {
        cover_letter_tips: strings(&[
            "Highlight relevant experience",
            "Show enthusiasm for the role",
            "Demonstrate cultural fit",
            "Address specific requirements",
        ]),
        skill_highlights: candidate.skills.iter().take(3).cloned().collect(),
        experience_relevance: "Focus on transferable skills and achievements".to_string(),
        interview_prep: strings(&[
            "Research the company thoroughly",
            "Prepare for technical questions",
            "Practice behavioral questions",
            "Have questions ready for the interviewer",
        ]),
        red_flags: vec![],
    }
}
