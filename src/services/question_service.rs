use std::sync::Arc;

use uuid::Uuid;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{call::ScreeningQuestion, candidate::Candidate, job::JobDescription};

const SKILL_PROBES: usize = 3;

fn question(text: String, category: &str, source: &str) -> ScreeningQuestion {
    ScreeningQuestion {
        question: text,
        category: category.to_string(),
        source: Some(source.to_string()),
    }
}

/// Rule-based screening questions. Pure: same inputs, same questions.
pub fn generate_questions(candidate: &Candidate, job: &JobDescription) -> Vec<ScreeningQuestion> {
    let mut questions = Vec::new();

    if let Some(title) = &candidate.current_title {
        questions.push(question(
            format!("Can you confirm your current role as {}?", title),
            "verification",
            "resume",
        ));
    }
    if let Some(years) = candidate.years_of_experience.filter(|y| *y > 0) {
        questions.push(question(
            format!(
                "Your resume indicates about {} years of experience. Is that accurate?",
                years
            ),
            "verification",
            "resume",
        ));
    }
    if let (Some(theirs), Some(ours)) = (&candidate.location, &job.location) {
        if !theirs.eq_ignore_ascii_case(ours) {
            questions.push(question(
                format!(
                    "The role is based in {}. You're currently in {}. Would you be open to relocating or is remote work preferred?",
                    ours, theirs
                ),
                "verification",
                "job_description",
            ));
        }
    }

    for skill in job.required_skills.iter().take(SKILL_PROBES) {
        let has_skill = candidate
            .skills
            .iter()
            .any(|s| s.eq_ignore_ascii_case(skill));
        if has_skill {
            questions.push(question(
                format!(
                    "I see you have experience with {}. Can you describe a project where you used this skill and what your specific contribution was?",
                    skill
                ),
                "skills",
                "resume",
            ));
        } else {
            questions.push(question(
                format!(
                    "This role requires {}. Do you have any experience with this, or related technologies?",
                    skill
                ),
                "skills",
                "job_description",
            ));
        }
    }

    if let Some(company) = &candidate.current_company {
        questions.push(question(
            format!(
                "Tell me about your role at {}. What were your main responsibilities?",
                company
            ),
            "experience",
            "resume",
        ));
    }
    questions.push(question(
        format!(
            "What experience do you have that's most relevant to the {} position?",
            job.title
        ),
        "experience",
        "job_description",
    ));

    questions.push(question(
        format!(
            "What attracted you to apply for the {} role at {}?",
            job.title,
            job.company.as_deref().unwrap_or("our company")
        ),
        "motivation",
        "job_description",
    ));
    questions.push(question(
        "Where do you see yourself in 2-3 years, and how does this role fit into that?".into(),
        "motivation",
        "general",
    ));
    if let Some(current) = &candidate.current_title {
        if is_career_transition(current, &job.title) {
            questions.push(question(
                format!(
                    "Your background is in {}, but you're applying for {}. What's driving this career transition?",
                    current, job.title
                ),
                "motivation",
                "resume",
            ));
        }
    }

    questions.push(question(
        "What is your availability to start? Are you currently in a notice period?".into(),
        "logistics",
        "general",
    ));

    questions
}

/// True when the two titles share no word.
fn is_career_transition(current_title: &str, job_title: &str) -> bool {
    let job_words: Vec<String> = job_title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    !current_title
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|w| job_words.contains(&w))
}

#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn Store>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn generate(&self, candidate_id: Uuid, job_id: Uuid) -> Result<Vec<ScreeningQuestion>> {
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".into()))?;
        Ok(generate_questions(&candidate, &job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{candidate::NewCandidate, job::NewJob};
    use chrono::Utc;

    fn fixtures() -> (Candidate, JobDescription) {
        let now = Utc::now();
        let candidate = Candidate::from_new(
            Uuid::new_v4(),
            NewCandidate {
                full_name: "Ana Gomez".into(),
                current_title: Some("Data Analyst".into()),
                current_company: Some("Initech".into()),
                skills: vec!["go".into()],
                years_of_experience: Some(4),
                ..Default::default()
            },
            now,
        );
        let job = JobDescription::from_new(
            Uuid::new_v4(),
            NewJob {
                title: "Backend Engineer".into(),
                description: "Services".into(),
                required_skills: vec!["Go".into(), "Postgres".into(), "Kafka".into(), "Rust".into()],
                ..Default::default()
            },
            now,
        );
        (candidate, job)
    }

    #[test]
    fn probes_top_three_required_skills() {
        let (candidate, job) = fixtures();
        let questions = generate_questions(&candidate, &job);
        let skills: Vec<_> = questions.iter().filter(|q| q.category == "skills").collect();
        assert_eq!(skills.len(), 3);
        assert_eq!(skills[0].source.as_deref(), Some("resume"));
        assert_eq!(skills[1].source.as_deref(), Some("job_description"));
    }

    #[test]
    fn flags_career_transition_and_ends_with_logistics() {
        let (candidate, job) = fixtures();
        let questions = generate_questions(&candidate, &job);
        assert!(questions
            .iter()
            .any(|q| q.question.contains("career transition")));
        assert_eq!(questions.last().map(|q| q.category.as_str()), Some("logistics"));
    }

    #[test]
    fn shared_title_word_is_not_a_transition() {
        assert!(!is_career_transition("Senior Backend Developer", "Backend Engineer"));
        assert!(is_career_transition("Nurse", "Backend Engineer"));
    }
}
