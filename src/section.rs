use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Header,
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Languages,
    Accomplishments,
    Interests,
}

impl SectionKind {
    pub const ALL: [SectionKind; 9] = [
        Self::Header,
        Self::Summary,
        Self::Experience,
        Self::Education,
        Self::Skills,
        Self::Certifications,
        Self::Languages,
        Self::Accomplishments,
        Self::Interests,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Summary => "summary",
            Self::Experience => "experience",
            Self::Education => "education",
            Self::Skills => "skills",
            Self::Certifications => "certifications",
            Self::Languages => "languages",
            Self::Accomplishments => "accomplishments",
            Self::Interests => "interests",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(tag.trim()))
    }

    pub fn marker_class(self) -> &'static str {
        match self {
            Self::Header => "header-item",
            Self::Summary => "summary-item",
            Self::Experience => "experience-item",
            Self::Education => "education-item",
            Self::Skills => "skills-item",
            Self::Certifications => "certifications-item",
            Self::Languages => "languages-item",
            Self::Accomplishments => "accomplishments-item",
            Self::Interests => "interests-item",
        }
    }
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionTag {
    Known(SectionKind),
    Other(String),
}
