// Prompt constants for the remote job matcher.

/// System prompt for job/candidate matching.
pub const JOB_MATCH_SYSTEM: &str = "You are a job matching expert. \
    Analyze job-candidate compatibility and return detailed scores and recommendations.";

/// Job match prompt template. Replace every `{placeholder}` before sending.
pub const JOB_MATCH_PROMPT_TEMPLATE: &str = r#"Analyze the match between a job and a candidate based on the following information:

Job Title: {title}
Job Description: {description}
Required Skills: {job_skills}
Budget: {budget}

Candidate Skills: {candidate_skills}
Candidate Bio: {bio}

Return a JSON object with:
- "overall_match_score" (0-100)
- "skill_match_score" (0-100)
- "experience_match_score" (0-100)
- "culture_fit_score" (0-100)
- "reasoning" (brief explanation)
- "recommendations" (array of suggestions for improvement)"#;
