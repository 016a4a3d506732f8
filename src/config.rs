//! Loading and validating `config.yml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::{Result, ToolError};

/// Value written into a freshly created config file.
pub const PLACEHOLDER: &str = "write here";
/// Default output name written into a freshly created config file.
pub const DEFAULT_OUTPUT_NAME: &str = "output.xlsx";

const HOLDING_DETAIL_URL: &str = "https://read365.edunet.net/PureScreen/SchoolSearchResult";

/// Raw file contents. Every key is optional so that presence can be
/// reported per key instead of as a generic parse failure.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    aladin_key: Option<String>,
    library_link: Option<String>,
    output_file_name: Option<String>,
}

/// School library addressed by the ownership lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTarget {
    pub school_name: String,
    pub prov_code: String,
    pub neis_code: String,
}

impl LibraryTarget {
    /// Extracts the school name, province code and NEIS code from the link
    /// the user copied out of the library search page.
    pub fn from_link(link: &str) -> Result<Self> {
        let url = Url::parse(link.trim()).map_err(|_| ToolError::InvalidLibraryLink("schoolName"))?;
        let param = |name: &'static str| -> Result<String> {
            url.query_pairs()
                .find(|(key, value)| key == name && !value.trim().is_empty())
                .map(|(_, value)| value.trim().to_string())
                .ok_or(ToolError::InvalidLibraryLink(name))
        };

        Ok(Self {
            school_name: param("schoolName")?,
            prov_code: param("provCode")?,
            neis_code: param("neisCode")?,
        })
    }

    /// Detail page for a holding identified by its two reference keys.
    pub fn holding_url(&self, book_key: &str, species_key: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("bookKey", book_key)
            .append_pair("speciesKey", species_key)
            .append_pair("provCode", &self.prov_code)
            .append_pair("neisCode", &self.neis_code)
            .finish();
        format!("{HOLDING_DETAIL_URL}?{query}")
    }
}

/// Validated run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub catalog_api_key: String,
    pub library: LibraryTarget,
    pub output: PathBuf,
}

impl Settings {
    /// Reads the config file at `path`. A missing file is replaced by a
    /// template and reported as an error so the user can fill it in.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            write_template(path)?;
            return Err(ToolError::ConfigTemplateCreated(path.to_path_buf()));
        }

        let source = fs::read_to_string(path)?;
        let settings = Self::parse(&source)?;
        info!(
            school = %settings.library.school_name,
            prov_code = %settings.library.prov_code,
            neis_code = %settings.library.neis_code,
            "loaded school library settings"
        );
        Ok(settings)
    }

    /// Validates YAML config text.
    pub fn parse(source: &str) -> Result<Self> {
        let raw: RawConfig = if source.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(source)?
        };

        let catalog_api_key = required(raw.aladin_key, "aladinKey")?;
        let library_link = required(raw.library_link, "libraryLink")?;
        let output = required(raw.output_file_name, "outputFileName")?;

        Ok(Self {
            catalog_api_key,
            library: LibraryTarget::from_link(&library_link)?,
            output: PathBuf::from(output),
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != PLACEHOLDER)
        .ok_or(ToolError::MissingConfigKey(key))
}

fn write_template(path: &Path) -> Result<()> {
    let template = RawConfig {
        aladin_key: Some(PLACEHOLDER.into()),
        library_link: Some(PLACEHOLDER.into()),
        output_file_name: Some(DEFAULT_OUTPUT_NAME.into()),
    };
    fs::write(path, serde_yaml::to_string(&template)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://read365.edunet.net/PureScreen/SchoolSearch?schoolName=%ED%95%9C%EB%B9%9B%EC%A4%91%ED%95%99%EA%B5%90&provCode=B10&neisCode=7010123";

    #[test]
    fn parses_complete_config() {
        let source = format!("aladinKey: ttb-key\nlibraryLink: \"{LINK}\"\noutputFileName: books.xlsx\n");
        let settings = Settings::parse(&source).expect("config parsed");
        assert_eq!(settings.catalog_api_key, "ttb-key");
        assert_eq!(settings.library.school_name, "한빛중학교");
        assert_eq!(settings.library.prov_code, "B10");
        assert_eq!(settings.library.neis_code, "7010123");
        assert_eq!(settings.output, PathBuf::from("books.xlsx"));
    }

    #[test]
    fn placeholder_counts_as_missing() {
        let source = format!("aladinKey: write here\nlibraryLink: \"{LINK}\"\noutputFileName: a.xlsx\n");
        let error = Settings::parse(&source).unwrap_err();
        assert!(matches!(error, ToolError::MissingConfigKey("aladinKey")));
    }

    #[test]
    fn empty_file_reports_first_key() {
        let error = Settings::parse("").unwrap_err();
        assert!(matches!(error, ToolError::MissingConfigKey("aladinKey")));
    }

    #[test]
    fn library_link_without_neis_code_is_rejected() {
        let error = LibraryTarget::from_link("https://example.com/search?schoolName=x&provCode=B10")
            .unwrap_err();
        assert!(matches!(error, ToolError::InvalidLibraryLink("neisCode")));
    }

    #[test]
    fn missing_file_writes_template() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("config.yml");

        let error = Settings::load(&path).unwrap_err();
        assert!(matches!(error, ToolError::ConfigTemplateCreated(_)));

        let written = fs::read_to_string(&path).expect("template written");
        assert!(written.contains("aladinKey: write here"));
        assert!(written.contains("outputFileName: output.xlsx"));
        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            ToolError::MissingConfigKey("aladinKey")
        ));
    }

    #[test]
    fn holding_url_carries_keys_and_codes() {
        let target = LibraryTarget::from_link(LINK).expect("link parsed");
        let url = target.holding_url("11", "22");
        assert!(url.contains("bookKey=11"));
        assert!(url.contains("speciesKey=22"));
        assert!(url.contains("provCode=B10"));
        assert!(url.contains("neisCode=7010123"));
    }
}
