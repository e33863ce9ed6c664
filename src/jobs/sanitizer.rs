//! Strips high-volume, low-value attributes from scraped postings

use crate::jobs::record::JobRecord;
use serde_json::{Map, Value};

/// Keys removed before a posting is sent downstream.
pub const STRIPPED_FIELDS: &[&str] = &[
    "jobLevel",
    "jobFunction",
    "listingType",
    "emails",
    "companyIndustry",
    "companyLogo",
    "companyUrlDirect",
    "companyAddresses",
    "companyNumEmployees",
    "companyRevenue",
    "companyDescription",
    "skills",
    "experienceRange",
    "companyRating",
    "companyReviewsCount",
    "vacancyCount",
    "workFromHomeType",
];

/// Copy of a raw posting object with the stripped fields removed.
pub fn sanitize_object(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(key, _)| !STRIPPED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Non-object values pass through unchanged.
pub fn sanitize_value(raw: &Value) -> Value {
    match raw {
        Value::Object(map) => Value::Object(sanitize_object(map)),
        other => other.clone(),
    }
}

pub fn sanitize(record: &JobRecord) -> JobRecord {
    JobRecord {
        extra: sanitize_object(&record.extra),
        ..record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noisy() -> Value {
        json!({
            "id": "job-1",
            "title": "Platform Engineer",
            "companyLogo": "https://cdn.example.com/logo.png",
            "skills": ["rust", "k8s"],
            "companyRating": 4.1,
            "emails": ["hr@example.com"],
            "isRemote": true,
            "someNewScraperField": "kept"
        })
    }

    #[test]
    fn test_strips_named_fields_and_keeps_the_rest() {
        let cleaned = sanitize_value(&noisy());
        let map = cleaned.as_object().unwrap();

        for key in ["companyLogo", "skills", "companyRating", "emails"] {
            assert!(!map.contains_key(key), "{} should be stripped", key);
        }
        assert_eq!(map["id"], json!("job-1"));
        assert_eq!(map["isRemote"], json!(true));
        assert_eq!(map["someNewScraperField"], json!("kept"));
    }

    #[test]
    fn test_sanitizing_twice_is_a_no_op() {
        let once = sanitize_value(&noisy());
        let twice = sanitize_value(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_absent_keys_are_fine() {
        let minimal = json!({"id": "x"});
        assert_eq!(sanitize_value(&minimal), minimal);
    }

    #[test]
    fn test_record_extra_fields_are_sanitized() {
        let record = JobRecord::from_value(noisy()).unwrap();
        let cleaned = sanitize(&record);

        assert_eq!(cleaned.title, record.title);
        assert!(!cleaned.extra.contains_key("skills"));
        assert!(cleaned.extra.contains_key("someNewScraperField"));
        assert_eq!(sanitize(&cleaned), cleaned);
    }
}
