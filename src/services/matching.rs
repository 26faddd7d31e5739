//! Identity keys and field-level merges used by sync reconciliation.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    candidate::{non_empty, normalize_skills, Candidate, NewCandidate},
    job::{JobDescription, NewJob},
    remote::{RemoteCandidate, RemoteJob},
};

fn collapse(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Name plus email. Without an email there is no identity fallback: two
/// people can share a name.
pub fn candidate_identity_key(full_name: &str, email: Option<&str>) -> Option<String> {
    let email = email.map(str::trim).filter(|e| !e.is_empty())?;
    let name = collapse(full_name);
    if name.is_empty() {
        return None;
    }
    Some(format!("{}|{}", name, email.to_lowercase()))
}

pub fn job_identity_key(title: &str, company: Option<&str>) -> Option<String> {
    let title = collapse(title);
    if title.is_empty() {
        return None;
    }
    Some(format!("{}|{}", title, company.map(collapse).unwrap_or_default()))
}

/// Identity key to local id, built once per sync run and kept current as
/// records are created.
#[derive(Debug, Default)]
pub struct LocalIndex {
    candidates: HashMap<String, Uuid>,
    jobs: HashMap<String, Uuid>,
}

impl LocalIndex {
    pub fn build(candidates: &[Candidate], jobs: &[JobDescription]) -> Self {
        let mut index = Self::default();
        for c in candidates {
            index.add_candidate(c);
        }
        for j in jobs {
            index.add_job(j);
        }
        index
    }

    pub fn add_candidate(&mut self, candidate: &Candidate) {
        if let Some(key) = candidate_identity_key(&candidate.full_name, candidate.email.as_deref()) {
            self.candidates.entry(key).or_insert(candidate.id);
        }
    }

    pub fn add_job(&mut self, job: &JobDescription) {
        if let Some(key) = job_identity_key(&job.title, job.company.as_deref()) {
            self.jobs.entry(key).or_insert(job.id);
        }
    }

    pub fn find_candidate(&self, remote: &RemoteCandidate) -> Option<Uuid> {
        candidate_identity_key(&remote.full_name, remote.email.as_deref())
            .and_then(|key| self.candidates.get(&key).copied())
    }

    pub fn find_job(&self, remote: &RemoteJob) -> Option<Uuid> {
        job_identity_key(&remote.title, remote.company.as_deref())
            .and_then(|key| self.jobs.get(&key).copied())
    }
}

/// How much a remote record may change an existing local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Non-empty remote values replace local ones.
    Overwrite,
    /// Remote values only land in empty local fields. Used when another
    /// source already owns the record, so two sources that disagree do not
    /// flip a field back and forth on every sync.
    FillEmpty,
}

fn fill(slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    match non_empty(incoming.clone()) {
        Some(value) if slot.as_deref() != Some(value.as_str()) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

fn fill_with(mode: MergeMode, slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    match mode {
        MergeMode::Overwrite => fill(slot, incoming),
        MergeMode::FillEmpty if slot.as_deref().map_or(true, |s| s.trim().is_empty()) => {
            fill(slot, incoming)
        }
        MergeMode::FillEmpty => false,
    }
}

fn union_skills(existing: &mut Vec<String>, incoming: &[String]) -> bool {
    let merged = normalize_skills(existing.iter().chain(incoming.iter()));
    if merged == *existing {
        return false;
    }
    *existing = merged;
    true
}

/// Merges a remote candidate into a local one. Blank remote values never
/// erase local ones and skills are always a union. Returns whether anything
/// changed.
pub fn merge_candidate(local: &mut Candidate, remote: &RemoteCandidate, mode: MergeMode) -> bool {
    let mut changed = false;

    let name = remote.full_name.trim();
    if mode == MergeMode::Overwrite && !name.is_empty() && local.full_name != name {
        local.full_name = name.to_string();
        changed = true;
    }
    changed |= fill_with(mode, &mut local.email, &remote.email);
    changed |= fill_with(mode, &mut local.phone, &remote.phone);
    changed |= fill_with(mode, &mut local.current_title, &remote.current_title);
    changed |= fill_with(mode, &mut local.current_company, &remote.current_company);
    changed |= fill_with(mode, &mut local.location, &remote.location);
    changed |= union_skills(&mut local.skills, &remote.skills);
    if let Some(years) = remote.years_of_experience {
        let empty = local.years_of_experience.is_none();
        if local.years_of_experience != Some(years) && (mode == MergeMode::Overwrite || empty) {
            local.years_of_experience = Some(years);
            changed = true;
        }
    }
    changed
}

pub fn merge_job(local: &mut JobDescription, remote: &RemoteJob) -> bool {
    let mut changed = false;

    let title = remote.title.trim();
    if !title.is_empty() && local.title != title {
        local.title = title.to_string();
        changed = true;
    }
    changed |= fill(&mut local.company, &remote.company);
    if let Some(description) = non_empty(remote.description.clone()) {
        if local.description != description {
            local.description = description;
            changed = true;
        }
    }
    changed |= union_skills(&mut local.required_skills, &remote.required_skills);
    changed |= fill(&mut local.location, &remote.location);
    changed
}

/// Required-field check for a candidate that would be created from scratch.
pub fn new_candidate(remote: &RemoteCandidate) -> Result<NewCandidate, String> {
    if remote.full_name.trim().is_empty() {
        return Err("candidate has no name".into());
    }
    Ok(NewCandidate {
        full_name: remote.full_name.clone(),
        email: remote.email.clone(),
        phone: remote.phone.clone(),
        current_title: remote.current_title.clone(),
        current_company: remote.current_company.clone(),
        location: remote.location.clone(),
        skills: remote.skills.clone(),
        years_of_experience: remote.years_of_experience,
        resume_text: None,
    })
}

pub fn new_job(remote: &RemoteJob) -> Result<NewJob, String> {
    if remote.title.trim().is_empty() {
        return Err("job has no title".into());
    }
    Ok(NewJob {
        title: remote.title.clone(),
        company: remote.company.clone(),
        description: remote.description.clone().unwrap_or_default(),
        required_skills: remote.required_skills.clone(),
        preferred_skills: Vec::new(),
        location: remote.location.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn local_candidate(skills: &[&str]) -> Candidate {
        Candidate::from_new(
            Uuid::new_v4(),
            NewCandidate {
                full_name: "Ana Gomez".into(),
                email: Some("ana@example.com".into()),
                phone: Some("+15551234567".into()),
                skills: skills.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn identity_key_needs_an_email() {
        assert_eq!(candidate_identity_key("Ana Gomez", None), None);
        assert_eq!(
            candidate_identity_key("  Ana   GOMEZ ", Some("Ana@Example.com")),
            candidate_identity_key("ana gomez", Some("ana@example.com"))
        );
    }

    #[test]
    fn empty_remote_skills_leave_local_skills_alone() {
        let mut local = local_candidate(&["Go"]);
        let remote = RemoteCandidate {
            remote_id: "r1".into(),
            full_name: "Ana Gomez".into(),
            skills: vec![],
            ..Default::default()
        };
        assert!(!merge_candidate(&mut local, &remote, MergeMode::Overwrite));
        assert_eq!(local.skills, vec!["Go"]);
    }

    #[test]
    fn skills_merge_as_a_union_and_blanks_never_erase() {
        let mut local = local_candidate(&["Go"]);
        let remote = RemoteCandidate {
            remote_id: "r1".into(),
            full_name: "Ana Gomez".into(),
            phone: Some("  ".into()),
            current_title: Some("Staff Engineer".into()),
            skills: vec!["go".into(), "Rust".into()],
            ..Default::default()
        };
        assert!(merge_candidate(&mut local, &remote, MergeMode::Overwrite));
        assert_eq!(local.skills, vec!["Go", "Rust"]);
        assert_eq!(local.phone.as_deref(), Some("+15551234567"));
        assert_eq!(local.current_title.as_deref(), Some("Staff Engineer"));
    }

    #[test]
    fn fill_empty_keeps_owned_values_but_still_unions_skills() {
        let mut local = local_candidate(&["Go"]);
        local.current_title = Some("Senior Engineer".into());
        local.years_of_experience = Some(8);
        let remote = RemoteCandidate {
            remote_id: "c1".into(),
            full_name: "Ana G.".into(),
            current_title: Some("Engineering Manager".into()),
            current_company: Some("Acme".into()),
            years_of_experience: Some(10),
            skills: vec!["Rust".into()],
            ..Default::default()
        };

        assert!(merge_candidate(&mut local, &remote, MergeMode::FillEmpty));
        assert_eq!(local.full_name, "Ana Gomez");
        assert_eq!(local.current_title.as_deref(), Some("Senior Engineer"));
        assert_eq!(local.current_company.as_deref(), Some("Acme"));
        assert_eq!(local.years_of_experience, Some(8));
        assert_eq!(local.skills, vec!["Go", "Rust"]);

        assert!(!merge_candidate(&mut local, &remote, MergeMode::FillEmpty));
    }

    #[test]
    fn index_matches_by_identity_and_ignores_emailless_records() {
        let local = local_candidate(&[]);
        let index = LocalIndex::build(std::slice::from_ref(&local), &[]);

        let same = RemoteCandidate {
            remote_id: "r9".into(),
            full_name: "ana gomez".into(),
            email: Some("ANA@example.com".into()),
            ..Default::default()
        };
        assert_eq!(index.find_candidate(&same), Some(local.id));

        let no_email = RemoteCandidate {
            email: None,
            ..same
        };
        assert_eq!(index.find_candidate(&no_email), None);
    }

    #[test]
    fn job_merge_keeps_description_when_remote_has_none() {
        let mut job = JobDescription::from_new(
            Uuid::new_v4(),
            NewJob {
                title: "Backend Engineer".into(),
                description: "Build services".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        let remote = RemoteJob {
            remote_id: "j1".into(),
            title: "Backend Engineer".into(),
            description: None,
            required_skills: vec!["Go".into()],
            ..Default::default()
        };
        assert!(merge_job(&mut job, &remote));
        assert_eq!(job.description, "Build services");
        assert_eq!(job.required_skills, vec!["Go"]);
        assert!(!merge_job(&mut job, &remote));
    }

    #[test]
    fn records_missing_required_fields_are_refused() {
        assert!(new_candidate(&RemoteCandidate::default()).is_err());
        assert!(new_job(&RemoteJob::default()).is_err());
    }
}
