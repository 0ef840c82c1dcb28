use std::fmt;

use serde::{Deserialize, Serialize};

/// Document sections of the provider upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ReferralNote,
    ClinicalNotes,
    ImagingNotes,
    LabResults,
    OtherTestResults,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::ReferralNote,
        Section::ClinicalNotes,
        Section::ImagingNotes,
        Section::LabResults,
        Section::OtherTestResults,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::ReferralNote => "referral_note",
            Section::ClinicalNotes => "clinical_notes",
            Section::ImagingNotes => "imaging_notes",
            Section::LabResults => "lab_results",
            Section::OtherTestResults => "other_test_results",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::ReferralNote => "Referral Note",
            Section::ClinicalNotes => "Clinical Notes",
            Section::ImagingNotes => "Imaging Notes",
            Section::LabResults => "Lab Results",
            Section::OtherTestResults => "Other Test Results",
        }
    }

    pub fn subtypes(self) -> &'static [&'static str] {
        match self {
            Section::ReferralNote => &["General", "Specialist", "Emergency"],
            Section::ClinicalNotes => &["Progress Note", "Discharge Summary", "Admission Note"],
            Section::ImagingNotes => &["MRI", "CT", "PET", "Ultrasound"],
            Section::LabResults => &["CBC", "CMP", "CSF", "Genetic Test", "Other"],
            Section::OtherTestResults => &["EEG", "EMG", "Sleep Study", "Other"],
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.key() == key)
    }

    /// Returns the catalogue spelling of `subtype` when the section offers it.
    pub fn canonical_subtype(self, subtype: &str) -> Option<&'static str> {
        let wanted = subtype.trim();
        self.subtypes()
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Serializable view of one section, as listed by the sections endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub key: &'static str,
    pub title: &'static str,
    pub subtypes: &'static [&'static str],
}

pub fn catalogue() -> Vec<SectionInfo> {
    Section::ALL
        .into_iter()
        .map(|section| SectionInfo {
            key: section.key(),
            title: section.title(),
            subtypes: section.subtypes(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_key(section.key()), Some(section));
        }
        assert_eq!(Section::from_key("referralNote"), None);
    }

    #[test]
    fn serde_uses_section_keys() {
        let json = serde_json::to_string(&Section::OtherTestResults).expect("serialize");
        assert_eq!(json, "\"other_test_results\"");
    }

    #[test]
    fn subtype_lookup_is_case_insensitive_but_canonical() {
        assert_eq!(Section::ImagingNotes.canonical_subtype("mri"), Some("MRI"));
        assert_eq!(
            Section::ClinicalNotes.canonical_subtype(" discharge summary "),
            Some("Discharge Summary")
        );
        assert_eq!(Section::ImagingNotes.canonical_subtype("EEG"), None);
    }

    #[test]
    fn catalogue_lists_every_section() {
        let sections = catalogue();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[3].key, "lab_results");
        assert_eq!(sections[3].subtypes.len(), 5);
    }
}
