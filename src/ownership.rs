//! Read365 school library holding lookup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::LibraryTarget;
use crate::error::LookupError;
use crate::model::Ownership;

/// Search endpoint of the library service.
pub const SEARCH_URL: &str = "https://read365.edunet.net/alpasq/api/search";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves one ISBN-13 to the library's holding status. Implementations
/// never fail; errors collapse into [`Ownership::Unknown`].
pub trait OwnershipLookup: Send + Sync {
    fn lookup(&self, isbn13: &str) -> Ownership;
}

/// HTTP client for the Read365 search API.
#[derive(Clone)]
pub struct Read365Library {
    agent: ureq::Agent,
    library: LibraryTarget,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search_keyword: &'a str,
    neis_code: [&'a str; 1],
    prov_code: &'a str,
    cover_yn: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchData {
    book_list: Vec<Holding>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Holding {
    isbn: Option<String>,
    book_key: Value,
    species_key: Value,
}

impl Read365Library {
    /// Creates a client sharing `agent` with the other lookups.
    pub fn new(agent: ureq::Agent, library: LibraryTarget) -> Self {
        Self {
            agent,
            library,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn search(&self, isbn13: &str) -> Result<Ownership, LookupError> {
        let request = SearchRequest {
            search_keyword: isbn13,
            neis_code: [self.library.neis_code.as_str()],
            prov_code: &self.library.prov_code,
            cover_yn: "N",
        };

        let mut response = self
            .agent
            .post(SEARCH_URL)
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .send_json(&request)?;

        let body = response.body_mut().read_to_string()?;
        find_holding(&body, isbn13)
    }
}

impl OwnershipLookup for Read365Library {
    fn lookup(&self, isbn13: &str) -> Ownership {
        match self.search(isbn13) {
            Ok(ownership) => {
                info!(isbn = isbn13, status = ?ownership, "library lookup succeeded");
                ownership
            }
            Err(error) => {
                warn!(isbn = isbn13, %error, "library lookup failed");
                Ownership::Unknown
            }
        }
    }
}

/// Scans a search response for a holding whose ISBN equals `isbn13` exactly.
pub fn find_holding(body: &str, isbn13: &str) -> Result<Ownership, LookupError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    let ownership = response
        .data
        .book_list
        .into_iter()
        .find(|holding| holding.isbn.as_deref() == Some(isbn13))
        .map(|holding| Ownership::Present {
            book_key: key_to_string(&holding.book_key),
            species_key: key_to_string(&holding.species_key),
        })
        .unwrap_or(Ownership::Absent);

    Ok(ownership)
}

fn key_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "status": "OK",
        "data": {
            "totalCount": 2,
            "bookList": [
                {"isbn": "9788954682150", "bookKey": 1, "speciesKey": 2},
                {"isbn": "9788954682152", "bookKey": 4471203, "speciesKey": "3390115"}
            ]
        }
    }"#;

    #[test]
    fn exact_isbn_match_is_present_with_keys() {
        let ownership = find_holding(FIXTURE, "9788954682152").expect("parsed");
        assert_eq!(
            ownership,
            Ownership::Present {
                book_key: Some("4471203".into()),
                species_key: Some("3390115".into()),
            }
        );
    }

    #[test]
    fn repeated_lookup_yields_same_result() {
        let first = find_holding(FIXTURE, "9788954682152").expect("parsed");
        let second = find_holding(FIXTURE, "9788954682152").expect("parsed");
        assert_eq!(first, second);
    }

    #[test]
    fn no_exact_match_is_absent() {
        let ownership = find_holding(FIXTURE, "9788954682").expect("parsed");
        assert_eq!(ownership, Ownership::Absent);
    }

    #[test]
    fn empty_response_is_absent() {
        assert_eq!(find_holding("{}", "9788954682152").expect("parsed"), Ownership::Absent);
    }

    #[test]
    fn missing_keys_stay_unset() {
        let body = r#"{"data": {"bookList": [{"isbn": "9791190123456", "bookKey": null}]}}"#;
        let ownership = find_holding(body, "9791190123456").expect("parsed");
        assert_eq!(
            ownership,
            Ownership::Present {
                book_key: None,
                species_key: None,
            }
        );
        assert_eq!(ownership.reference_keys(), None);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            find_holding("not json", "9791190123456"),
            Err(LookupError::Malformed(_))
        ));
    }
}
