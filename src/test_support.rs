use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "resume_surface_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

pub fn sample_payload() -> Value {
    json!({
        "id": "resume-42",
        "status": "draft",
        "personalInfo": {
            "fullName": "Ada Example",
            "professionalTitle": "Systems Engineer",
            "email": "ada@example.com",
            "phone": "+1 555 0100",
            "address": "Oslo",
            "website": "https://ada.example.com",
            "linkedin": "linkedin.com/in/ada",
            "professionalSummary": "Builds storage engines and the tooling around them."
        },
        "workExperience": [
            {
                "company": "Northwind",
                "position": "Senior Engineer",
                "startDate": "2016",
                "endDate": "2020",
                "description": "Owned the replication layer."
            },
            {
                "company": "Contoso",
                "jobTitle": "Staff Engineer",
                "startDate": "2020",
                "current": true,
                "description": "Leads the query planner team."
            }
        ],
        "education": [
            {
                "degree": "MSc",
                "fieldOfStudy": "Computer Science",
                "institution": "NTNU",
                "startYear": "2011",
                "graduationYear": "2016",
                "gpa": "4.8"
            }
        ],
        "skills": [
            { "name": "Rust", "proficiency": 9 },
            { "name": "SQL", "level": "7" },
            "Linux"
        ],
        "languages": [
            { "language": "English", "proficiency": "Fluent" },
            { "language": "Norwegian", "proficiency": "Native" }
        ],
        "certifications": [
            { "name": "CKA", "issuer": "CNCF", "date": "2021" }
        ],
        "interests": ["Climbing", { "name": "Chess" }]
    })
}
