//! Aladin `ItemLookUp` client.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::LookupError;
use crate::model::{CatalogEntry, Identifier};

/// Lookup endpoint of the catalog API.
pub const LOOKUP_URL: &str = "http://www.aladin.co.kr/ttb/api/ItemLookUp.aspx";
/// Page of a catalog item, used for title hyperlinks.
pub const ITEM_PAGE_URL: &str = "https://www.aladin.co.kr/shop/wproduct.aspx";

const API_VERSION: &str = "20131101";
const OPT_RESULT: &str = "Story,categoryIdList,bestSellerRank,ratingInfo,reviewList";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves one identifier to catalog metadata.
pub trait CatalogLookup: Send + Sync {
    fn lookup(&self, query: &Identifier) -> Result<CatalogEntry, LookupError>;
}

/// Link to the catalog page of an item.
pub fn item_page_url(item_id: u64) -> String {
    format!("{ITEM_PAGE_URL}?ItemId={item_id}")
}

/// HTTP client for the Aladin open API.
#[derive(Clone)]
pub struct AladinCatalog {
    agent: ureq::Agent,
    api_key: String,
    timeout: Duration,
}

impl AladinCatalog {
    /// Creates a client sharing `agent` with the other lookups.
    pub fn new(agent: ureq::Agent, api_key: impl Into<String>) -> Self {
        Self {
            agent,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn fetch_entry(&self, query: &Identifier) -> Result<(CatalogEntry, Option<String>), LookupError> {
        let (id_type, id_value) = match query {
            Identifier::ItemId(id) => ("ItemId", id.to_string()),
            Identifier::Isbn13(isbn) => ("ISBN13", isbn.clone()),
        };

        let mut response = self
            .agent
            .get(LOOKUP_URL)
            .query("ttbkey", &self.api_key)
            .query("itemIdType", id_type)
            .query("ItemId", &id_value)
            .query("output", "js")
            .query("Version", API_VERSION)
            .query("OptResult", OPT_RESULT)
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .call()?;

        let body = response.body_mut().read_to_string()?;
        parse_lookup_response(&body)
    }

    fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, LookupError> {
        let mut response = self
            .agent
            .get(url)
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .call()?;
        Ok(response.body_mut().read_to_vec()?)
    }
}

impl CatalogLookup for AladinCatalog {
    fn lookup(&self, query: &Identifier) -> Result<CatalogEntry, LookupError> {
        let (mut entry, cover_url) = self.fetch_entry(query)?;
        info!(query = ?query, title = %entry.title, "catalog lookup succeeded");

        if let Some(cover_url) = cover_url {
            match self.fetch_cover(&cover_url) {
                Ok(bytes) => {
                    debug!(query = ?query, bytes = bytes.len(), "cover fetched");
                    entry.cover = Some(bytes);
                }
                Err(error) => {
                    warn!(query = ?query, %error, "cover fetch failed");
                }
            }
        }

        Ok(entry)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    item: Vec<ItemPayload>,
    error_code: Option<i64>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ItemPayload {
    item_id: Option<u64>,
    isbn13: String,
    title: String,
    author: String,
    publisher: String,
    price_standard: i64,
    pub_date: String,
    description: String,
    category_name: String,
    cover: String,
    sales_point: u64,
    sub_info: SubInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SubInfo {
    rating_info: RatingInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RatingInfo {
    rating_score: f64,
    rating_count: u64,
}

/// Turns a lookup response body into an entry and the cover URL, if any.
/// Only the first item is used.
pub fn parse_lookup_response(body: &str) -> Result<(CatalogEntry, Option<String>), LookupError> {
    let response: LookupResponse = serde_json::from_str(body.trim().trim_end_matches(';'))?;

    if let Some(code) = response.error_code {
        return Err(LookupError::Api {
            code,
            message: response.error_message.unwrap_or_default(),
        });
    }

    let item = response.item.into_iter().next().ok_or(LookupError::NotFound)?;
    let cover_url = Some(item.cover).filter(|url| !url.is_empty());
    let entry = CatalogEntry {
        item_id: item.item_id,
        isbn13: item.isbn13,
        title: item.title,
        author: item.author,
        publisher: item.publisher,
        standard_price: item.price_standard,
        publish_date: item.pub_date,
        description: item.description.trim().to_string(),
        category: item.category_name,
        rating_score: item.sub_info.rating_info.rating_score,
        rating_count: item.sub_info.rating_info.rating_count,
        sales_index: item.sales_point,
        cover: None,
    };

    Ok((entry, cover_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "version": "20131101",
        "totalResults": 1,
        "item": [{
            "title": "작별하지 않는다",
            "link": "http://www.aladin.co.kr/shop/wproduct.aspx?ItemId=279124435",
            "author": "한강 (지은이)",
            "pubDate": "2021-09-09",
            "description": "  제주 4·3을 다룬 장편소설.  ",
            "isbn13": "9788954682152",
            "itemId": 279124435,
            "priceStandard": 16800,
            "categoryName": "국내도서>소설/시/희곡>한국소설",
            "publisher": "문학동네",
            "salesPoint": 123456,
            "cover": "https://image.aladin.co.kr/product/27912/44/cover.jpg",
            "subInfo": {"ratingInfo": {"ratingScore": 9.4, "ratingCount": 812}}
        }]
    }"#;

    #[test]
    fn parses_first_item() {
        let (entry, cover) = parse_lookup_response(FIXTURE).expect("fixture parsed");
        assert_eq!(entry.item_id, Some(279124435));
        assert_eq!(entry.isbn13, "9788954682152");
        assert_eq!(entry.title, "작별하지 않는다");
        assert_eq!(entry.standard_price, 16800);
        assert_eq!(entry.description, "제주 4·3을 다룬 장편소설.");
        assert_eq!(entry.rating_score, 9.4);
        assert_eq!(entry.rating_count, 812);
        assert_eq!(entry.sales_index, 123456);
        assert_eq!(
            cover.as_deref(),
            Some("https://image.aladin.co.kr/product/27912/44/cover.jpg")
        );
        assert!(entry.cover.is_none());
    }

    #[test]
    fn missing_rating_defaults_to_zero() {
        let body = r#"{"item": [{"title": "t", "isbn13": "9791190123456"}]}"#;
        let (entry, cover) = parse_lookup_response(body).expect("parsed");
        assert_eq!(entry.rating_score, 0.0);
        assert_eq!(entry.rating_count, 0);
        assert_eq!(cover, None);
    }

    #[test]
    fn empty_result_is_not_found() {
        let error = parse_lookup_response(r#"{"item": []}"#).unwrap_err();
        assert!(matches!(error, LookupError::NotFound));
    }

    #[test]
    fn api_error_payload_is_reported() {
        let body = r#"{"errorCode": 2, "errorMessage": "잘못된 TTBKey 입니다."}"#;
        let error = parse_lookup_response(body).unwrap_err();
        assert!(matches!(error, LookupError::Api { code: 2, .. }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let error = parse_lookup_response("<html>").unwrap_err();
        assert!(matches!(error, LookupError::Malformed(_)));
    }

    #[test]
    fn item_page_url_uses_item_id() {
        assert_eq!(
            item_page_url(12345),
            "https://www.aladin.co.kr/shop/wproduct.aspx?ItemId=12345"
        );
    }
}
