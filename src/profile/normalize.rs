use std::sync::OnceLock;

use serde_json::{Map, Value};

use super::{
    AccomplishmentEntry, CanonicalProfile, CertificationEntry, DEFAULT_PROFICIENCY,
    EducationEntry, InterestEntry, LanguageEntry, PRESENT_LABEL, PROFICIENCY_MAX,
    PersonalDetails, SkillEntry, WorkEntry,
};

const PERSONAL_CONTAINERS: &[&str] = &["personalInfo", "personal", "contactInfo"];

const FULL_NAME: &[&str] = &["fullName", "full_name"];
const PROFESSIONAL_TITLE: &[&str] = &["professionalTitle", "title", "jobTitle", "headline"];
const PROFESSIONAL_SUMMARY: &[&str] = &["professionalSummary", "summary", "objective"];
const EMAIL: &[&str] = &["email", "emailAddress"];
const PHONE: &[&str] = &["phone", "phoneNumber", "mobile"];
const ADDRESS: &[&str] = &["address", "location"];
const WEBSITE: &[&str] = &["website", "portfolio", "url"];
const LINKEDIN: &[&str] = &["linkedin", "linkedIn", "linkedinUrl"];

const WORK_HISTORY: &[&str] = &["workExperience", "experience", "workHistory", "employment"];
const COMPANY: &[&str] = &["company", "employer", "organization"];
const POSITION: &[&str] = &["position", "jobTitle", "title", "role"];
const START_DATE: &[&str] = &["startDate", "start_date", "from"];
const END_DATE: &[&str] = &["endDate", "end_date", "to"];
const CURRENT_FLAGS: &[&str] = &["current", "isCurrent"];
const WORK_DESCRIPTION: &[&str] = &["description", "responsibilities", "summary"];

const EDUCATION: &[&str] = &["education", "educationHistory"];
const DEGREE: &[&str] = &["degree", "degreeType"];
const FIELD_OF_STUDY: &[&str] = &["fieldOfStudy", "field", "major"];
const WHOLE_DEGREE: &[&str] = &["degree", "qualification", "program"];
const INSTITUTION: &[&str] = &["institution", "school", "university"];
const START_YEAR: &[&str] = &["startYear"];
const END_YEAR: &[&str] = &["endYear", "graduationYear"];
const EDUCATION_START_DATE: &[&str] = &["startDate"];
const EDUCATION_END_DATE: &[&str] = &["endDate", "graduationDate"];
const GPA: &[&str] = &["gpa", "GPA"];
const EDUCATION_DESCRIPTION: &[&str] = &["description", "details", "honors"];

const SKILLS: &[&str] = &["skills", "skillSet"];
const SKILL_NAME: &[&str] = &["name", "skill", "title"];
const PROFICIENCY: &[&str] = &["proficiency", "level", "rating"];

const CERTIFICATIONS: &[&str] = &["certifications", "certificates"];
const CERTIFICATION_NAME: &[&str] = &["name", "title"];
const ISSUER: &[&str] = &["issuer", "organization", "authority"];
const CERTIFICATION_DATE: &[&str] = &["date", "issueDate", "year"];

const LANGUAGES: &[&str] = &["languages"];
const LANGUAGE_NAME: &[&str] = &["language", "name"];
const LANGUAGE_PROFICIENCY: &[&str] = &["proficiency", "level", "fluency"];

const ACCOMPLISHMENTS: &[&str] = &["accomplishments", "achievements", "awards"];
const ACCOMPLISHMENT_TITLE: &[&str] = &["title", "name"];
const ACCOMPLISHMENT_DESCRIPTION: &[&str] = &["description", "details"];

const INTERESTS: &[&str] = &["interests", "hobbies"];
const INTEREST_NAME: &[&str] = &["name", "interest", "title"];

const NON_SECTION_KEYS: &[&str] = &["id", "_id", "userId", "resumeId", "status", "isActive"];

pub fn normalize(raw: &Value) -> CanonicalProfile {
    let empty = Map::new();
    let root = raw.as_object().unwrap_or(&empty);
    let personal_record = PERSONAL_CONTAINERS
        .iter()
        .find_map(|key| root.get(*key).and_then(Value::as_object))
        .unwrap_or(root);

    CanonicalProfile {
        personal: normalize_personal(personal_record, root),
        work_history: records(root, WORK_HISTORY)
            .map(|entries| entries.iter().map(normalize_work_entry).collect())
            .unwrap_or_default(),
        education: records(root, EDUCATION)
            .map(|entries| entries.iter().map(normalize_education_entry).collect())
            .unwrap_or_default(),
        skills: records(root, SKILLS)
            .map(|entries| entries.iter().map(normalize_skill_entry).collect())
            .unwrap_or_default(),
        certifications: records(root, CERTIFICATIONS)
            .map(|entries| entries.iter().map(normalize_certification).collect()),
        languages: records(root, LANGUAGES)
            .map(|entries| entries.iter().map(normalize_language).collect()),
        accomplishments: records(root, ACCOMPLISHMENTS)
            .map(|entries| entries.iter().map(normalize_accomplishment).collect()),
        interests: records(root, INTERESTS)
            .map(|entries| entries.iter().map(normalize_interest).collect()),
        unrecognized_sections: unrecognized_sections(root),
    }
}

fn normalize_personal(record: &Map<String, Value>, root: &Map<String, Value>) -> PersonalDetails {
    // A summary may live beside the personal block rather than inside it.
    let professional_summary = lookup_text(record, PROFESSIONAL_SUMMARY)
        .or_else(|| lookup_text(root, PROFESSIONAL_SUMMARY))
        .unwrap_or_default();

    PersonalDetails {
        full_name: text(record, FULL_NAME),
        professional_title: text(record, PROFESSIONAL_TITLE),
        professional_summary,
        email: text(record, EMAIL),
        phone: text(record, PHONE),
        address: text(record, ADDRESS),
        website: text(record, WEBSITE),
        linkedin: text(record, LINKEDIN),
    }
}

fn normalize_work_entry(entry: &Value) -> WorkEntry {
    let record = as_record(entry);
    let is_current = CURRENT_FLAGS.iter().any(|flag| truthy(record.get(*flag)));
    let end_date = if is_current {
        PRESENT_LABEL.to_owned()
    } else {
        text(record, END_DATE)
    };

    WorkEntry {
        company: text(record, COMPANY),
        position: text(record, POSITION),
        start_date: text(record, START_DATE),
        end_date,
        description: text(record, WORK_DESCRIPTION),
    }
}

fn normalize_education_entry(entry: &Value) -> EducationEntry {
    let record = as_record(entry);

    let degree = text(record, DEGREE);
    let field_of_study = text(record, FIELD_OF_STUDY);
    let degree_line = if !degree.is_empty() && !field_of_study.is_empty() {
        format!("{degree} in {field_of_study}")
    } else {
        first_non_empty_text(record, WHOLE_DEGREE)
    };

    let start_year = text(record, START_YEAR);
    let end_year = text(record, END_YEAR);
    let date_range = if start_year.is_empty() && end_year.is_empty() {
        join_range(
            &text(record, EDUCATION_START_DATE),
            &text(record, EDUCATION_END_DATE),
        )
    } else {
        join_range(&start_year, &end_year)
    };

    let gpa = text(record, GPA);
    let detail_line = if gpa.trim().is_empty() {
        text(record, EDUCATION_DESCRIPTION)
    } else {
        format!("GPA: {}", gpa.trim())
    };

    EducationEntry {
        degree_line,
        institution: text(record, INSTITUTION),
        date_range,
        detail_line,
    }
}

fn normalize_skill_entry(entry: &Value) -> SkillEntry {
    if let Value::String(name) = entry {
        return SkillEntry {
            name: name.clone(),
            percentage: proficiency_percentage(DEFAULT_PROFICIENCY),
        };
    }

    let record = as_record(entry);
    let proficiency = lookup(record, PROFICIENCY)
        .and_then(numeric)
        .unwrap_or(DEFAULT_PROFICIENCY);

    SkillEntry {
        name: text(record, SKILL_NAME),
        percentage: proficiency_percentage(proficiency),
    }
}

fn normalize_certification(entry: &Value) -> CertificationEntry {
    let record = as_record(entry);
    CertificationEntry {
        name: text(record, CERTIFICATION_NAME),
        issuer: text(record, ISSUER),
        date: text(record, CERTIFICATION_DATE),
    }
}

fn normalize_language(entry: &Value) -> LanguageEntry {
    if let Value::String(language) = entry {
        return LanguageEntry {
            language: language.clone(),
            proficiency: String::new(),
        };
    }

    let record = as_record(entry);
    LanguageEntry {
        language: text(record, LANGUAGE_NAME),
        proficiency: text(record, LANGUAGE_PROFICIENCY),
    }
}

fn normalize_accomplishment(entry: &Value) -> AccomplishmentEntry {
    let record = as_record(entry);
    AccomplishmentEntry {
        title: text(record, ACCOMPLISHMENT_TITLE),
        description: text(record, ACCOMPLISHMENT_DESCRIPTION),
    }
}

fn normalize_interest(entry: &Value) -> InterestEntry {
    match entry {
        Value::String(name) => InterestEntry { name: name.clone() },
        other => InterestEntry {
            name: text(as_record(other), INTEREST_NAME),
        },
    }
}

fn proficiency_percentage(value: f64) -> u8 {
    let clamped = value.clamp(0.0, PROFICIENCY_MAX);
    (clamped / PROFICIENCY_MAX * 100.0).round() as u8
}

fn join_range(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{start} - {end}"),
        (false, true) => start.to_owned(),
        (true, false) => end.to_owned(),
        (true, true) => String::new(),
    }
}

fn unrecognized_sections(root: &Map<String, Value>) -> Vec<String> {
    let known = [
        PERSONAL_CONTAINERS,
        WORK_HISTORY,
        EDUCATION,
        SKILLS,
        CERTIFICATIONS,
        LANGUAGES,
        ACCOMPLISHMENTS,
        INTERESTS,
        NON_SECTION_KEYS,
    ];

    root.iter()
        .filter(|(_, value)| value.is_array())
        .map(|(key, _)| key)
        .filter(|key| !known.iter().any(|aliases| aliases.contains(&key.as_str())))
        .cloned()
        .collect()
}

fn as_record(entry: &Value) -> &Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    entry
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

fn records<'a>(root: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Vec<Value>> {
    aliases
        .iter()
        .find_map(|alias| root.get(*alias).and_then(Value::as_array))
}

// JSON null counts as absent; an empty string is present and stops the search.
fn lookup<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .find(|value| scalar_text(value).is_some())
}

fn lookup_text(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    lookup(record, aliases).and_then(scalar_text)
}

fn text(record: &Map<String, Value>, aliases: &[&str]) -> String {
    lookup_text(record, aliases).unwrap_or_default()
}

fn first_non_empty_text(record: &Map<String, Value>, aliases: &[&str]) -> String {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias).and_then(scalar_text))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|number| number != 0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::profile::{CanonicalProfile, PRESENT_LABEL};

    use super::normalize;

    #[test]
    fn canonical_name_wins_over_legacy_name() {
        let profile = normalize(&json!({ "fullName": "A", "name": "B" }));
        assert_eq!(profile.personal.full_name, "A");
    }

    #[test]
    fn legacy_name_is_not_a_full_name_alias() {
        let profile = normalize(&json!({ "name": "B" }));
        assert_eq!(profile.personal.full_name, "");
    }

    #[test]
    fn empty_string_short_circuits_alias_fallback() {
        let profile = normalize(&json!({
            "personalInfo": { "professionalTitle": "", "title": "Engineer" }
        }));
        assert_eq!(profile.personal.professional_title, "");
    }

    #[test]
    fn null_value_falls_through_to_next_alias() {
        let profile = normalize(&json!({
            "personalInfo": { "email": null, "emailAddress": "a@example.com" }
        }));
        assert_eq!(profile.personal.email, "a@example.com");
    }

    #[test]
    fn summary_falls_back_to_root_level_field() {
        let profile = normalize(&json!({
            "personalInfo": { "fullName": "Ada" },
            "summary": "Builds compilers."
        }));
        assert_eq!(profile.personal.professional_summary, "Builds compilers.");
    }

    #[test]
    fn current_flag_renders_present() {
        let profile = normalize(&json!({
            "workExperience": [
                { "endDate": "2020-05", "current": true },
                { "endDate": "2020-05", "current": false, "isCurrent": false },
                { "endDate": "2021-01", "isCurrent": true },
                { "company": "Acme" }
            ]
        }));
        let ends = profile
            .work_history
            .iter()
            .map(|entry| entry.end_date.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ends, vec![PRESENT_LABEL, "2020-05", PRESENT_LABEL, ""]);
    }

    #[test]
    fn degree_and_field_join_only_when_both_present() {
        let profile = normalize(&json!({
            "education": [
                { "degree": "BSc", "fieldOfStudy": "Physics" },
                { "degree": "BSc", "fieldOfStudy": "" },
                { "degree": "", "qualification": "Diploma" },
                { "fieldOfStudy": "History" }
            ]
        }));
        let lines = profile
            .education
            .iter()
            .map(|entry| entry.degree_line.as_str())
            .collect::<Vec<_>>();
        assert_eq!(lines, vec!["BSc in Physics", "BSc", "Diploma", ""]);
    }

    #[test]
    fn gpa_replaces_description_instead_of_appending() {
        let profile = normalize(&json!({
            "education": [
                { "gpa": "3.9", "description": "Dean's list" },
                { "description": "Dean's list" },
                { "gpa": 3.5 }
            ]
        }));
        assert_eq!(profile.education[0].detail_line, "GPA: 3.9");
        assert_eq!(profile.education[1].detail_line, "Dean's list");
        assert_eq!(profile.education[2].detail_line, "GPA: 3.5");
    }

    #[test]
    fn education_prefers_year_pair_over_date_pair() {
        let profile = normalize(&json!({
            "education": [
                { "startYear": 2012, "endYear": 2016, "startDate": "2012-09" },
                { "startDate": "2010-09", "endDate": "2012-06" },
                { "school": "MIT", "university": "Harvard" }
            ]
        }));
        assert_eq!(profile.education[0].date_range, "2012 - 2016");
        assert_eq!(profile.education[1].date_range, "2010-09 - 2012-06");
        assert_eq!(profile.education[2].institution, "MIT");
        assert_eq!(profile.education[2].date_range, "");
    }

    #[test]
    fn skill_percentage_scales_and_defaults() {
        let profile = normalize(&json!({
            "skills": [
                { "name": "Rust", "proficiency": 8 },
                { "name": "Go", "level": "3" },
                { "name": "C" },
                { "name": "Zig", "rating": 42 },
                "SQL"
            ]
        }));
        let percentages = profile
            .skills
            .iter()
            .map(|skill| skill.percentage)
            .collect::<Vec<_>>();
        assert_eq!(percentages, vec![80, 30, 50, 100, 50]);
        assert_eq!(profile.skills[4].name, "SQL");
    }

    #[test]
    fn optional_sections_stay_absent_unless_supplied() {
        let without = normalize(&json!({}));
        assert_eq!(without.certifications, None);
        assert_eq!(without.interests, None);

        let with = normalize(&json!({ "hobbies": ["chess", { "name": "running" }], "languages": [] }));
        let interests = with.interests.expect("interests should be present");
        assert_eq!(interests[0].name, "chess");
        assert_eq!(interests[1].name, "running");
        assert_eq!(with.languages, Some(Vec::new()));
    }

    #[test]
    fn identifiers_and_unknown_arrays_are_split_out() {
        let profile = normalize(&json!({
            "id": "abc",
            "status": "draft",
            "projects": [{ "name": "x" }],
            "_id": ["legacy"]
        }));
        assert_eq!(profile.unrecognized_sections, vec!["projects".to_owned()]);
    }

    #[test]
    fn malformed_input_produces_defaults() {
        for raw in [
            json!(null),
            json!(42),
            json!("text"),
            json!([1, 2, 3]),
            json!({ "workExperience": "not an array", "skills": [null, 7] }),
        ] {
            let profile = normalize(&raw);
            assert_eq!(profile.personal, CanonicalProfile::default().personal);
            assert!(profile.work_history.is_empty());
            assert!(profile.skills.iter().all(|skill| skill.name.is_empty()));
        }
    }
}
