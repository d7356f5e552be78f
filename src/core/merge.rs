//! Per-column precedence for building an output row. Each column lists its
//! sources in priority order; the first non-blank value wins.

use crate::domain::model::{
    visibility_flag, Column, CompanyInfo, ExtractedField, ExtractedFields, OutputRow,
    RawProfileBlob, RegistryInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonScrape {
    JobRole,
    ProfileUrl,
    FriendsCount,
    FollowersVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyScrape {
    PageUrl,
    Website,
    FollowersQty,
    FollowersVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryField {
    Identifier,
    EntityType,
    Status,
    StartDate,
    TaxStatus,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    PersonScrape(PersonScrape),
    PersonExtracted(ExtractedField),
    CompanyScrape(CompanyScrape),
    CompanyExtracted(ExtractedField),
    Registry(RegistryField),
}

use Source::{CompanyExtracted, CompanyScrape as Company, PersonExtracted, PersonScrape as Person, Registry};

pub const PRECEDENCE: &[(Column, &[Source])] = &[
    (
        Column::CompanyName,
        &[CompanyExtracted(ExtractedField::CompanyName), PersonExtracted(ExtractedField::CompanyName)],
    ),
    (
        Column::JobRole,
        &[Person(PersonScrape::JobRole), PersonExtracted(ExtractedField::JobRole)],
    ),
    (
        Column::CompanyWebsite,
        &[
            Company(CompanyScrape::Website),
            CompanyExtracted(ExtractedField::CompanyWebsite),
            PersonExtracted(ExtractedField::CompanyWebsite),
        ],
    ),
    (
        Column::CompanyPage,
        &[Company(CompanyScrape::PageUrl), PersonExtracted(ExtractedField::CompanyPage)],
    ),
    (
        Column::CompanyFollowers,
        &[
            Company(CompanyScrape::FollowersQty),
            CompanyExtracted(ExtractedField::CompanyFollowers),
            PersonExtracted(ExtractedField::CompanyFollowers),
        ],
    ),
    (Column::CompanyFollowersVisible, &[Company(CompanyScrape::FollowersVisible)]),
    (
        Column::PersonalProfile,
        &[Person(PersonScrape::ProfileUrl), PersonExtracted(ExtractedField::PersonalProfile)],
    ),
    (
        Column::FriendsCount,
        &[Person(PersonScrape::FriendsCount), PersonExtracted(ExtractedField::PersonFollowers)],
    ),
    (Column::PersonFollowersVisible, &[Person(PersonScrape::FollowersVisible)]),
    (Column::PersonVisibility, &[Person(PersonScrape::FollowersVisible)]),
    (
        Column::RegistryName,
        &[CompanyExtracted(ExtractedField::CompanyName), PersonExtracted(ExtractedField::CompanyName)],
    ),
    (Column::RegistryIdentifier, &[Registry(RegistryField::Identifier)]),
    (
        Column::EntityType,
        &[
            Registry(RegistryField::EntityType),
            CompanyExtracted(ExtractedField::EntityType),
            PersonExtracted(ExtractedField::EntityType),
        ],
    ),
    (
        Column::RegistryStatus,
        &[
            Registry(RegistryField::Status),
            CompanyExtracted(ExtractedField::RegistryStatus),
            PersonExtracted(ExtractedField::RegistryStatus),
        ],
    ),
    (Column::RegistryStartDate, &[Registry(RegistryField::StartDate)]),
    (Column::TaxStatus, &[Registry(RegistryField::TaxStatus)]),
    (Column::TaxRegistered, &[Registry(RegistryField::TaxStatus)]),
    (Column::Locality, &[Registry(RegistryField::Location)]),
];

/// Everything one record produced, borrowed for merging.
#[derive(Debug, Clone, Copy)]
pub struct MergeInputs<'a> {
    pub person: &'a RawProfileBlob,
    pub person_fields: &'a ExtractedFields,
    pub company: Option<&'a CompanyInfo>,
    pub registry: Option<&'a RegistryInfo>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl MergeInputs<'_> {
    pub fn resolve(&self, source: Source) -> Option<String> {
        match source {
            Source::PersonScrape(field) => match field {
                PersonScrape::JobRole => non_blank(self.person.job_role.as_deref()),
                PersonScrape::ProfileUrl => non_blank(self.person.profile_url.as_deref()),
                PersonScrape::FriendsCount => non_blank(self.person.friends_count.as_deref()),
                PersonScrape::FollowersVisible => self
                    .person
                    .followers_visible
                    .map(|v| visibility_flag(v).to_string()),
            },
            Source::PersonExtracted(field) => non_blank(Some(self.person_fields.get(field))),
            Source::CompanyScrape(field) => {
                let company = self.company?;
                match field {
                    CompanyScrape::PageUrl => company
                        .profile
                        .as_ref()
                        .and_then(|p| non_blank(p.profile_url.as_deref()))
                        .or_else(|| non_blank(Some(&company.page_url))),
                    CompanyScrape::Website => non_blank(company.website()),
                    CompanyScrape::FollowersQty => company
                        .followers
                        .as_ref()
                        .and_then(|f| non_blank(f.followers_qty.as_deref()))
                        .or_else(|| {
                            company
                                .profile
                                .as_ref()
                                .and_then(|p| non_blank(p.followers_qty.as_deref()))
                        }),
                    CompanyScrape::FollowersVisible => company
                        .followers
                        .as_ref()
                        .and_then(|f| f.followers_visible)
                        .or_else(|| company.profile.as_ref().and_then(|p| p.followers_visible))
                        .map(|v| visibility_flag(v).to_string()),
                }
            }
            Source::CompanyExtracted(field) => {
                non_blank(self.company.map(|c| c.extracted.get(field)))
            }
            Source::Registry(field) => {
                let registry = self.registry?;
                let value = match field {
                    RegistryField::Identifier => &registry.identifier,
                    RegistryField::EntityType => &registry.entity_type,
                    RegistryField::Status => &registry.status,
                    RegistryField::StartDate => &registry.start_date,
                    RegistryField::TaxStatus => &registry.tax_status,
                    RegistryField::Location => &registry.location,
                };
                non_blank(value.as_deref())
            }
        }
    }
}

pub fn build_row(row: u32, inputs: &MergeInputs<'_>) -> OutputRow {
    let mut output = OutputRow::new(row);
    for (column, sources) in PRECEDENCE {
        if let Some(value) = sources.iter().find_map(|source| inputs.resolve(*source)) {
            output.put(*column, value);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FollowerInfo;

    #[test]
    fn test_every_column_has_one_rule() {
        let mut seen = std::collections::HashSet::new();
        for (column, sources) in PRECEDENCE {
            assert!(seen.insert(*column), "duplicate rule for {}", column);
            assert!(!sources.is_empty());
        }
    }

    #[test]
    fn test_direct_scrape_followers_win_over_extraction() {
        let person = RawProfileBlob::default();
        let person_fields = ExtractedFields::default().with(ExtractedField::CompanyFollowers, "42");
        let company = CompanyInfo {
            page_url: "https://fb.example/acme".into(),
            followers: Some(FollowerInfo {
                followers_qty: Some("500".into()),
                followers_visible: Some(true),
            }),
            extracted: ExtractedFields::default().with(ExtractedField::CompanyFollowers, "450"),
            attempts: 1,
            ..CompanyInfo::default()
        };
        let row = build_row(
            3,
            &MergeInputs {
                person: &person,
                person_fields: &person_fields,
                company: Some(&company),
                registry: None,
            },
        );
        assert_eq!(row.get(Column::CompanyFollowers), Some("500"));
        assert_eq!(row.get(Column::CompanyFollowersVisible), Some("y"));
        assert_eq!(row.get(Column::CompanyPage), Some("https://fb.example/acme"));
    }

    #[test]
    fn test_company_page_prefers_scraped_profile_url() {
        let person = RawProfileBlob::default();
        let person_fields = ExtractedFields::default();
        let company = CompanyInfo {
            page_url: "https://fb.example/acme?ref=bio".into(),
            profile: Some(RawProfileBlob {
                profile_url: Some("https://www.facebook.com/acmeptyltd".into()),
                ..RawProfileBlob::default()
            }),
            attempts: 1,
            ..CompanyInfo::default()
        };
        let row = build_row(
            3,
            &MergeInputs {
                person: &person,
                person_fields: &person_fields,
                company: Some(&company),
                registry: None,
            },
        );
        assert_eq!(row.get(Column::CompanyPage), Some("https://www.facebook.com/acmeptyltd"));
    }

    #[test]
    fn test_extraction_is_fallback_for_person_fields() {
        let person = RawProfileBlob {
            friends_count: Some("812 friends".into()),
            ..RawProfileBlob::default()
        };
        let person_fields = ExtractedFields::default()
            .with(ExtractedField::PersonFollowers, "800")
            .with(ExtractedField::JobRole, "Broker");
        let row = build_row(
            4,
            &MergeInputs {
                person: &person,
                person_fields: &person_fields,
                company: None,
                registry: None,
            },
        );
        assert_eq!(row.get(Column::FriendsCount), Some("812 friends"));
        assert_eq!(row.get(Column::JobRole), Some("Broker"));
        assert_eq!(row.get(Column::PersonFollowersVisible), None);
    }

    #[test]
    fn test_registry_values_and_no_company_columns() {
        let person = RawProfileBlob::default();
        let person_fields = ExtractedFields::default()
            .with(ExtractedField::CompanyName, "Acme Pty Ltd")
            .with(ExtractedField::RegistryStatus, "unknown");
        let registry = RegistryInfo {
            status: Some("Active".into()),
            identifier: Some("12345678901".into()),
            ..RegistryInfo::default()
        };
        let row = build_row(
            3,
            &MergeInputs {
                person: &person,
                person_fields: &person_fields,
                company: None,
                registry: Some(&registry),
            },
        );
        assert_eq!(row.get(Column::CompanyName), Some("Acme Pty Ltd"));
        assert_eq!(row.get(Column::RegistryName), Some("Acme Pty Ltd"));
        assert_eq!(row.get(Column::RegistryStatus), Some("Active"));
        assert_eq!(row.get(Column::RegistryIdentifier), Some("12345678901"));
        assert_eq!(row.get(Column::CompanyPage), None);
        assert_eq!(row.get(Column::CompanyFollowers), None);
        assert_eq!(row.get(Column::CompanyFollowersVisible), None);
    }
}
