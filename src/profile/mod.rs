use serde::Serialize;

use crate::section::{SectionKind, SectionTag};

mod normalize;

pub use self::normalize::normalize;

pub const PRESENT_LABEL: &str = "Present";
pub const PROFICIENCY_MAX: f64 = 10.0;
pub const DEFAULT_PROFICIENCY: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    pub full_name: String,
    pub professional_title: String,
    pub professional_summary: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub linkedin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntry {
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree_line: String,
    pub institution: String,
    pub date_range: String,
    pub detail_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    pub name: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub language: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccomplishmentEntry {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProfile {
    pub personal: PersonalDetails,
    pub work_history: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<CertificationEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<LanguageEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accomplishments: Option<Vec<AccomplishmentEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<InterestEntry>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_sections: Vec<String>,
}

impl CanonicalProfile {
    pub fn section_tags(&self) -> Vec<SectionTag> {
        let mut tags = vec![
            SectionTag::Known(SectionKind::Header),
            SectionTag::Known(SectionKind::Summary),
            SectionTag::Known(SectionKind::Experience),
            SectionTag::Known(SectionKind::Education),
            SectionTag::Known(SectionKind::Skills),
        ];
        let optional = [
            (SectionKind::Certifications, self.certifications.is_some()),
            (SectionKind::Languages, self.languages.is_some()),
            (SectionKind::Accomplishments, self.accomplishments.is_some()),
            (SectionKind::Interests, self.interests.is_some()),
        ];
        tags.extend(
            optional
                .into_iter()
                .filter(|(_, present)| *present)
                .map(|(kind, _)| SectionTag::Known(kind)),
        );
        tags.extend(
            self.unrecognized_sections
                .iter()
                .cloned()
                .map(SectionTag::Other),
        );
        tags
    }
}
