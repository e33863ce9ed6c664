//! Job posting records as produced by the scraper

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A scraped job posting.
///
/// Known fields are typed; everything else the scraper returned is kept in
/// `extra` untouched so it survives serialization without being interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            company: None,
            location: None,
            job_type: None,
            description: None,
            date_posted: None,
            job_url: None,
            min_amount: None,
            max_amount: None,
            currency: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_job_url(mut self, url: impl Into<String>) -> Self {
        self.job_url = Some(url.into());
        self
    }

    pub fn with_salary(mut self, min: Option<f64>, max: Option<f64>, currency: Option<&str>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self.currency = currency.map(str::to_string);
        self
    }

    /// Parse a raw scraper object.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn title_or_na(&self) -> &str {
        self.title.as_deref().unwrap_or("N/A")
    }

    pub fn company_or_na(&self) -> &str {
        self.company.as_deref().unwrap_or("N/A")
    }

    pub fn has_salary(&self) -> bool {
        self.min_amount.is_some() || self.max_amount.is_some()
    }

    /// Whether the scraper flagged the posting as remote.
    pub fn is_remote_flagged(&self) -> bool {
        self.extra.get("isRemote").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Scrapers hand out ids as either strings or numbers.
fn id_from_any<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("job id must be a non-empty string or number, got {}", other))),
    }
}
