//! Business-registry cross-reference: pick the first search hit, then read the
//! result page through a table of declarative field rules.

use crate::domain::model::RegistryInfo;
use crate::domain::ports::{RegistryPage, RegistrySource};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, LazyLock};
use url::Url;

static RESULT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(ABN|ACN|business|entity)/").expect("valid regex"));
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ABN\s+(\d[\d ]+)").expect("valid regex"));
static START_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from (\d{1,2}\s\w+\s\d{4})").expect("valid regex"));
static STATUS_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ABN status:?$").expect("valid regex"));
static TAX_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Goods.*GST").expect("valid regex"));

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IDENTIFIER_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a#content-main[title*="Current details for ABN"]"#));
static ENTITY_TYPE_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a[href*="/Help/EntityTypeDescription"]"#));
static LOCALITY_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[itemprop="address"] span[itemprop="addressLocality"]"#));
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| selector("table tbody tr"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Registry attributes filled from the label/value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableField {
    Status,
    StartDate,
    TaxStatus,
}

#[derive(Debug, Clone, Copy)]
pub enum ValueTransform {
    Trim,
    /// First capture group of the regex, or nothing.
    Capture(&'static LazyLock<Regex>),
}

impl ValueTransform {
    pub fn apply(self, value: &str) -> Option<String> {
        let value = value.trim();
        match self {
            ValueTransform::Trim => (!value.is_empty()).then(|| value.to_string()),
            ValueTransform::Capture(re) => re
                .captures(value)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: TableField,
    pub label: &'static LazyLock<Regex>,
    pub transform: ValueTransform,
}

pub static TABLE_RULES: [FieldRule; 3] = [
    FieldRule {
        field: TableField::Status,
        label: &STATUS_LABEL_RE,
        transform: ValueTransform::Trim,
    },
    FieldRule {
        field: TableField::StartDate,
        label: &STATUS_LABEL_RE,
        transform: ValueTransform::Capture(&START_DATE_RE),
    },
    FieldRule {
        field: TableField::TaxStatus,
        label: &TAX_LABEL_RE,
        transform: ValueTransform::Trim,
    },
];

/// Scans `(label, value)` rows; the first row matching a rule wins for that field.
pub fn match_rows<'a, I>(rows: I, rules: &[FieldRule]) -> Vec<(TableField, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut found: Vec<(TableField, String)> = Vec::new();
    for (label, value) in rows {
        let label = label.trim();
        for rule in rules {
            if found.iter().any(|(field, _)| *field == rule.field) || !rule.label.is_match(label) {
                continue;
            }
            if let Some(v) = rule.transform.apply(value) {
                found.push((rule.field, v));
            }
        }
    }
    found
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First result link on a search page, resolved against the page URL.
pub fn select_result_link(page: &RegistryPage) -> Option<String> {
    let document = Html::parse_document(&page.html);
    let href = document
        .select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| RESULT_LINK_RE.is_match(href))?;

    match Url::parse(&page.url).and_then(|base| base.join(href)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(href.to_string()),
    }
}

pub fn parse_result_page(html: &str) -> RegistryInfo {
    let document = Html::parse_document(html);
    let mut info = RegistryInfo::default();

    info.identifier = document
        .select(&IDENTIFIER_SEL)
        .filter_map(|a| a.value().attr("title"))
        .find_map(|title| IDENTIFIER_RE.captures(title))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<String>());

    info.entity_type = document
        .select(&ENTITY_TYPE_SEL)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    info.location = document
        .select(&LOCALITY_SEL)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let rows: Vec<(String, String)> = document
        .select(&ROW_SEL)
        .filter_map(|row| {
            let th = row.select(&TH_SEL).next()?;
            let td = row.select(&TD_SEL).next()?;
            Some((element_text(th), element_text(td)))
        })
        .collect();

    for (field, value) in match_rows(
        rows.iter().map(|(l, v)| (l.as_str(), v.as_str())),
        &TABLE_RULES,
    ) {
        match field {
            TableField::Status => info.status = Some(value),
            TableField::StartDate => info.start_date = Some(value),
            TableField::TaxStatus => info.tax_status = Some(value),
        }
    }

    info
}

pub struct RegistryLookup {
    source: Arc<dyn RegistrySource>,
}

impl RegistryLookup {
    pub fn new(source: Arc<dyn RegistrySource>) -> Self {
        Self { source }
    }

    /// No match yields an empty `RegistryInfo`; navigation failures yield one with
    /// `error` set. Never returns `Err`.
    pub async fn lookup(&self, company_name: &str) -> RegistryInfo {
        tracing::info!(stage = "registry", "Searching for: {}", company_name);

        let search_page = match self.source.search(company_name).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(stage = "registry", "Search for '{}' failed: {}", company_name, e);
                return RegistryInfo::failed(e.to_string());
            }
        };

        let Some(result_url) = select_result_link(&search_page) else {
            tracing::info!(stage = "registry", "No results found for '{}'", company_name);
            return RegistryInfo::default();
        };

        match self.source.fetch(&result_url).await {
            Ok(page) => {
                let info = parse_result_page(&page.html);
                tracing::info!(stage = "registry", "Scraped: {:?}", info);
                info
            }
            Err(e) => {
                tracing::warn!(stage = "registry", "Fetching {} failed: {}", result_url, e);
                RegistryInfo::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
        <html><body>
          <a id="content-main" title="Current details for ABN 12 345 678 901">Main content</a>
          <table><tbody>
            <tr><th>Entity name:</th><td>ACME PTY LTD</td></tr>
            <tr><th>ABN status:</th><td>Active from 29 Sep 2015</td></tr>
            <tr><th>Entity type:</th><td><a href="/Help/EntityTypeDescription?Id=19">Australian Private Company</a></td></tr>
            <tr><th>Goods &amp; Services Tax (GST):</th><td>Registered from 01 Oct 2015</td></tr>
            <tr><th>Main business location:</th>
                <td><div itemprop="address"><span itemprop="addressLocality">WA 6000</span></div></td></tr>
          </tbody></table>
        </body></html>"#;

    #[test]
    fn test_parse_result_page() {
        let info = parse_result_page(RESULT_PAGE);
        assert_eq!(info.identifier.as_deref(), Some("12345678901"));
        assert_eq!(info.entity_type.as_deref(), Some("Australian Private Company"));
        assert_eq!(info.location.as_deref(), Some("WA 6000"));
        assert_eq!(info.status.as_deref(), Some("Active from 29 Sep 2015"));
        assert_eq!(info.start_date.as_deref(), Some("29 Sep 2015"));
        assert_eq!(info.tax_status.as_deref(), Some("Registered from 01 Oct 2015"));
        assert_eq!(info.error, None);
    }

    #[test]
    fn test_parse_page_without_table() {
        let info = parse_result_page("<html><body><p>Nothing here</p></body></html>");
        assert!(!info.is_match());
    }

    #[test]
    fn test_match_rows_first_match_wins() {
        let rows = vec![
            ("ABN status", "Cancelled"),
            ("ABN status:", "Active from 1 Jan 2020"),
            ("Goods and Services Tax (GST):", "Not currently registered"),
        ];
        let found = match_rows(rows, &TABLE_RULES);
        assert!(found.contains(&(TableField::Status, "Cancelled".to_string())));
        assert!(found.contains(&(TableField::StartDate, "1 Jan 2020".to_string())));
        assert!(found.contains(&(TableField::TaxStatus, "Not currently registered".to_string())));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_status_without_date_leaves_start_date_empty() {
        let found = match_rows(vec![("ABN status:", "Active")], &TABLE_RULES);
        assert_eq!(found, vec![(TableField::Status, "Active".to_string())]);
    }

    #[test]
    fn test_select_result_link_resolves_relative_href() {
        let page = RegistryPage {
            url: "https://abr.business.gov.au/Search/ResultsActive?SearchText=acme".into(),
            html: r#"<a href="/Help">Help</a><a href="/ABN/View?id=12345678901">ACME PTY LTD</a>"#.into(),
        };
        assert_eq!(
            select_result_link(&page).as_deref(),
            Some("https://abr.business.gov.au/ABN/View?id=12345678901")
        );
    }

    #[test]
    fn test_select_result_link_none() {
        let page = RegistryPage {
            url: "https://abr.business.gov.au/Search".into(),
            html: r#"<p>No records found</p><a href="/Help">Help</a>"#.into(),
        };
        assert_eq!(select_result_link(&page), None);
    }
}
