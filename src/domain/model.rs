use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One name from the input sheet and its 0-based position in the names range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub index: usize,
    pub name: String,
}

impl InputRecord {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Unstructured output of a single profile scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProfileBlob {
    pub intro_text: String,
    pub intro_links: Vec<String>,
    pub main_text: String,
    pub main_links: Vec<String>,
    pub friends_count: Option<String>,
    pub followers_qty: Option<String>,
    #[serde(deserialize_with = "de_visibility_flag")]
    pub followers_visible: Option<bool>,
    pub profile_url: Option<String>,
    pub job_role: Option<String>,
    pub relationship_text: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub websites: Vec<String>,
}

/// Follower details read straight off a company page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowerInfo {
    pub followers_qty: Option<String>,
    #[serde(deserialize_with = "de_visibility_flag")]
    pub followers_visible: Option<bool>,
}

/// Scrapers report visibility as `"y"`/`"n"` or as a JSON bool.
fn de_visibility_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" => Some(true),
            "n" | "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

pub fn visibility_flag(visible: bool) -> &'static str {
    if visible {
        "y"
    } else {
        "n"
    }
}

/// Semantic keys the extraction service is asked to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtractedField {
    WorksAt,
    IsBroker,
    JobRole,
    CompanyPage,
    CompanyWebsite,
    PersonFollowers,
    CompanyFollowers,
    Linkedin,
    PersonalProfile,
    CompanyName,
    EntityType,
    RegistryStatus,
    MaritalStatus,
    MarriedTo,
}

impl ExtractedField {
    pub const ALL: [ExtractedField; 14] = [
        ExtractedField::WorksAt,
        ExtractedField::IsBroker,
        ExtractedField::JobRole,
        ExtractedField::CompanyPage,
        ExtractedField::CompanyWebsite,
        ExtractedField::PersonFollowers,
        ExtractedField::CompanyFollowers,
        ExtractedField::Linkedin,
        ExtractedField::PersonalProfile,
        ExtractedField::CompanyName,
        ExtractedField::EntityType,
        ExtractedField::RegistryStatus,
        ExtractedField::MaritalStatus,
        ExtractedField::MarriedTo,
    ];

    /// Key requested in the extraction prompt.
    pub fn key(self) -> &'static str {
        match self {
            ExtractedField::WorksAt => "worksAt",
            ExtractedField::IsBroker => "isBroker",
            ExtractedField::JobRole => "jobRole",
            ExtractedField::CompanyPage => "companyFacebook",
            ExtractedField::CompanyWebsite => "companyWebsite",
            ExtractedField::PersonFollowers => "personFollowers",
            ExtractedField::CompanyFollowers => "companyFollowers",
            ExtractedField::Linkedin => "linkedin",
            ExtractedField::PersonalProfile => "personalProfile",
            ExtractedField::CompanyName => "companyName",
            ExtractedField::EntityType => "entityType",
            ExtractedField::RegistryStatus => "abnStatus",
            ExtractedField::MaritalStatus => "maritalStatus",
            ExtractedField::MarriedTo => "marriedTo",
        }
    }

    /// Long-form keys the service sometimes echoes back from the prompt wording.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ExtractedField::WorksAt => &["where they work"],
            ExtractedField::IsBroker => &["is broker"],
            ExtractedField::JobRole => &["job role"],
            ExtractedField::CompanyPage => &["company's facebook page", "companyPage"],
            ExtractedField::CompanyWebsite => &["company's website"],
            ExtractedField::PersonFollowers => &["the person's following/friends amount (QTY)"],
            ExtractedField::CompanyFollowers => &["the company's following amount (QTY)"],
            ExtractedField::Linkedin => &["their linkedin profile"],
            ExtractedField::PersonalProfile => &["facebook personal profile"],
            ExtractedField::CompanyName => &["company's name"],
            ExtractedField::EntityType => &["entity type"],
            ExtractedField::RegistryStatus => &["abn status"],
            ExtractedField::MaritalStatus => &["marital status"],
            ExtractedField::MarriedTo => &["married to"],
        }
    }

    pub fn is_relationship(self) -> bool {
        matches!(
            self,
            ExtractedField::MaritalStatus | ExtractedField::MarriedTo | ExtractedField::PersonFollowers
        )
    }
}

/// Values returned by the extraction service. Missing keys read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    values: BTreeMap<ExtractedField, String>,
}

impl ExtractedFields {
    pub fn get(&self, field: ExtractedField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    /// `None` for absent or blank values.
    pub fn non_empty(&self, field: ExtractedField) -> Option<&str> {
        let value = self.get(field).trim();
        (!value.is_empty()).then_some(value)
    }

    pub fn set(&mut self, field: ExtractedField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn with(mut self, field: ExtractedField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Drops person-only keys so they cannot leak into company-side results.
    pub fn strip_relationship(&mut self) {
        self.values.retain(|field, _| !field.is_relationship());
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExtractedField, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Registry attributes for one company; all `None` when the search had no match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryInfo {
    pub identifier: Option<String>,
    pub entity_type: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub tax_status: Option<String>,
    pub location: Option<String>,
    pub error: Option<String>,
}

impl RegistryInfo {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_match(&self) -> bool {
        [
            &self.identifier,
            &self.entity_type,
            &self.status,
            &self.start_date,
            &self.tax_status,
            &self.location,
        ]
        .iter()
        .any(|v| v.is_some())
    }
}

/// Outcome of the company enrichment stage. Always produced, even on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyInfo {
    pub page_url: String,
    pub followers: Option<FollowerInfo>,
    pub profile: Option<RawProfileBlob>,
    pub extracted: ExtractedFields,
    pub error: Option<String>,
    pub attempts: u32,
}

impl CompanyInfo {
    pub fn failed(page_url: &str, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            page_url: page_url.to_string(),
            error: Some(message.into()),
            attempts,
            ..Self::default()
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        self.extracted.non_empty(ExtractedField::CompanyName)
    }

    pub fn website(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.websites.iter().map(|w| w.trim()).find(|w| !w.is_empty()))
    }
}

/// Output columns of the enrichment sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    CompanyName,
    JobRole,
    CompanyWebsite,
    CompanyPage,
    CompanyFollowers,
    CompanyFollowersVisible,
    PersonalProfile,
    FriendsCount,
    PersonFollowersVisible,
    /// Mirrors `PersonFollowersVisible`.
    PersonVisibility,
    RegistryName,
    RegistryIdentifier,
    EntityType,
    RegistryStatus,
    RegistryStartDate,
    TaxStatus,
    /// Mirrors `TaxStatus`.
    TaxRegistered,
    Locality,
}

impl Column {
    pub fn letter(self) -> &'static str {
        match self {
            Column::CompanyName => "C",
            Column::JobRole => "K",
            Column::CompanyWebsite => "N",
            Column::CompanyPage => "P",
            Column::CompanyFollowers => "Q",
            Column::CompanyFollowersVisible => "R",
            Column::PersonalProfile => "T",
            Column::FriendsCount => "V",
            Column::PersonFollowersVisible => "W",
            Column::PersonVisibility => "X",
            Column::RegistryName => "AC",
            Column::RegistryIdentifier => "AD",
            Column::EntityType => "AE",
            Column::RegistryStatus => "AF",
            Column::RegistryStartDate => "AG",
            Column::TaxStatus => "AH",
            Column::TaxRegistered => "AI",
            Column::Locality => "AJ",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Column-mapped values for one sheet row. Only columns present here are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRow {
    pub row: u32,
    pub cells: BTreeMap<Column, String>,
}

impl OutputRow {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    /// Blank values are ignored so that they never clear an existing cell.
    pub fn put(&mut self, column: Column, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.cells.insert(column, value);
        }
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells.get(&column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_blob_accepts_visibility_variants() {
        let blob: RawProfileBlob = serde_json::from_value(serde_json::json!({
            "introText": "Works at Acme",
            "followersQty": "1,204",
            "followersVisible": "y"
        }))
        .unwrap();
        assert_eq!(blob.followers_visible, Some(true));
        assert!(blob.intro_links.is_empty());

        let info: FollowerInfo =
            serde_json::from_value(serde_json::json!({"followersVisible": false})).unwrap();
        assert_eq!(info.followers_visible, Some(false));
        assert_eq!(info.followers_qty, None);
    }

    #[test]
    fn test_extracted_fields_missing_key_is_empty() {
        let fields = ExtractedFields::default().with(ExtractedField::CompanyName, "Acme Pty Ltd");
        assert_eq!(fields.get(ExtractedField::CompanyName), "Acme Pty Ltd");
        assert_eq!(fields.get(ExtractedField::Linkedin), "");
        assert_eq!(fields.non_empty(ExtractedField::Linkedin), None);
    }

    #[test]
    fn test_strip_relationship() {
        let mut fields = ExtractedFields::default()
            .with(ExtractedField::MaritalStatus, "married")
            .with(ExtractedField::MarriedTo, "John")
            .with(ExtractedField::PersonFollowers, "300")
            .with(ExtractedField::CompanyFollowers, "500");
        fields.strip_relationship();
        assert_eq!(fields.get(ExtractedField::MaritalStatus), "");
        assert_eq!(fields.get(ExtractedField::MarriedTo), "");
        assert_eq!(fields.get(ExtractedField::PersonFollowers), "");
        assert_eq!(fields.get(ExtractedField::CompanyFollowers), "500");
    }

    #[test]
    fn test_output_row_ignores_blank_values() {
        let mut row = OutputRow::new(3);
        row.put(Column::CompanyName, "Acme");
        row.put(Column::JobRole, "   ");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get(Column::JobRole), None);
    }

    #[test]
    fn test_registry_info_match() {
        assert!(!RegistryInfo::default().is_match());
        assert!(!RegistryInfo::failed("timeout").is_match());
        let info = RegistryInfo {
            status: Some("Active".into()),
            ..RegistryInfo::default()
        };
        assert!(info.is_match());
    }
}
