//! Skill extraction: scans free text for entries of a known skill vocabulary.

use rand::seq::SliceRandom;
use serde::Serialize;

/// Most skills returned for one text.
pub const MAX_EXTRACTED: usize = 5;
/// Skills sampled when the fallback is enabled and nothing matched.
pub const FALLBACK_SAMPLE: usize = 3;
/// Most texts accepted by one batch request.
pub const MAX_BATCH: usize = 10;

pub const KNOWN_SKILLS: [&str; 46] = [
    "JavaScript", "Python", "React", "Node.js", "MongoDB", "PostgreSQL",
    "AWS", "Docker", "Git", "TypeScript", "Vue.js", "Angular",
    "Express.js", "Django", "Flask", "FastAPI", "GraphQL", "REST API",
    "HTML", "CSS", "SASS", "Bootstrap", "Tailwind CSS", "Redux",
    "Next.js", "Nuxt.js", "Laravel", "Spring Boot", "Java", "C#",
    "PHP", "Ruby", "Go", "Rust", "Swift", "Kotlin", "Flutter",
    "React Native", "TensorFlow", "PyTorch", "Machine Learning",
    "Data Science", "DevOps", "CI/CD", "Kubernetes", "Jenkins",
];

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub skills: Vec<String>,
    pub count: usize,
    /// True when `skills` is a random sample rather than found in the text.
    pub sampled: bool,
}

/// Finds vocabulary skills mentioned in text (case-insensitive substring).
///
/// With `fallback` off an unmatched text yields nothing. With it on, a few
/// unrelated vocabulary entries are sampled instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillExtractor {
    fallback: bool,
}

impl SkillExtractor {
    pub fn new(fallback: bool) -> Self {
        Self { fallback }
    }

    pub fn extract(&self, text: &str) -> Extraction {
        let found = scan(text);
        if found.is_empty() && self.fallback {
            let skills = sample(FALLBACK_SAMPLE);
            return Extraction {
                count: skills.len(),
                skills,
                sampled: true,
            };
        }
        Extraction {
            count: found.len(),
            skills: found,
            sampled: false,
        }
    }
}

/// Vocabulary entries found in `text`, in vocabulary order, capped.
fn scan(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    KNOWN_SKILLS
        .iter()
        .filter(|skill| lower.contains(&skill.to_lowercase()))
        .take(MAX_EXTRACTED)
        .map(|s| s.to_string())
        .collect()
}

fn sample(n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    KNOWN_SKILLS
        .choose_multiple(&mut rng, n)
        .map(|s| s.to_string())
        .collect()
}
