use std::time::Duration;

use serde::Deserialize;

use super::config::ArchiveConfig;
use super::error::ArchiveError;
use crate::data::loader::read_delimited;
use crate::data::model::Table;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("figmint/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "X-Dataverse-key";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Every native API response wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct DatasetData {
    #[serde(rename = "latestVersion")]
    latest_version: DatasetVersion,
}

#[derive(Debug, Deserialize)]
struct DatasetVersion {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    label: Option<String>,
    #[serde(rename = "dataFile")]
    data_file: DataFile,
}

#[derive(Debug, Deserialize)]
struct DataFile {
    id: i64,
    filename: Option<String>,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
}

/// One file of a dataset, as listed by the archive.
///
/// Ingested tabular files are listed under a `.tab` label regardless of
/// the uploaded extension, and the access endpoint serves them as
/// tab-separated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub label: String,
    pub id: i64,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl From<FileEntry> for ArchiveFile {
    fn from(entry: FileEntry) -> Self {
        let FileEntry { label, data_file } = entry;
        let label = label
            .or_else(|| data_file.filename.clone())
            .unwrap_or_else(|| format!("file {}", data_file.id));
        Self {
            label,
            id: data_file.id,
            filename: data_file.filename,
            content_type: data_file.content_type,
        }
    }
}

// ---------------------------------------------------------------------------
// URL and payload helpers
// ---------------------------------------------------------------------------

/// Accept a DOI with or without the `doi:` prefix, or as a resolver URL.
pub fn normalize_doi(doi: &str) -> String {
    let trimmed = doi.trim();
    let trimmed = trimmed.strip_prefix("https://doi.org/").unwrap_or(trimmed);
    if trimmed.starts_with("doi:") || trimmed.starts_with("hdl:") {
        trimmed.to_owned()
    } else {
        format!("doi:{trimmed}")
    }
}

fn dataset_url(base: &str, doi: &str) -> String {
    format!(
        "{base}/api/datasets/:persistentId/?persistentId={}",
        normalize_doi(doi)
    )
}

fn access_url(base: &str, file_id: i64) -> String {
    format!("{base}/api/access/datafile/{file_id}")
}

fn parse_dataset_envelope(body: &[u8]) -> Result<Vec<ArchiveFile>, ArchiveError> {
    let envelope: ApiEnvelope<DatasetData> =
        serde_json::from_slice(body).map_err(|e| ArchiveError::Decode(e.to_string()))?;
    if !envelope.status.eq_ignore_ascii_case("ok") {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("status {}", envelope.status));
        return Err(ArchiveError::Api(message));
    }
    let data = envelope
        .data
        .ok_or_else(|| ArchiveError::Decode("envelope has no data".to_owned()))?;
    Ok(data
        .latest_version
        .files
        .into_iter()
        .map(ArchiveFile::from)
        .collect())
}

/// Match on the listed label first, then on the stored filename, so
/// `field_samples.tab` finds the ingested file either way.
fn find_file<'a>(files: &'a [ArchiveFile], wanted: &str) -> Option<&'a ArchiveFile> {
    files
        .iter()
        .find(|f| f.label == wanted)
        .or_else(|| files.iter().find(|f| f.filename.as_deref() == Some(wanted)))
}

fn table_from_tsv(bytes: &[u8]) -> Result<Table, ArchiveError> {
    read_delimited(bytes, b'\t').map_err(|e| ArchiveError::Tabular(e.to_string()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking client for a Dataverse-style archive.
///
/// One request, one response; callers decide where the wait happens.
pub struct ArchiveClient {
    http: reqwest::blocking::Client,
    config: ArchiveConfig,
}

impl ArchiveClient {
    pub fn new(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ArchiveError::Init(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Build a client from `DATAVERSE_SERVER` / `DATAVERSE_KEY`.
    pub fn from_env() -> Result<Self, ArchiveError> {
        Self::new(ArchiveConfig::from_env()?)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// List the files of the latest published version of a dataset.
    pub fn dataset_files(&self, doi: &str) -> Result<Vec<ArchiveFile>, ArchiveError> {
        let url = dataset_url(&self.config.base_url, doi);
        log::info!("listing dataset {}", normalize_doi(doi));
        let body = self.get(&url)?;
        parse_dataset_envelope(&body)
    }

    /// Download one file's bytes through the access endpoint.
    pub fn fetch_file_bytes(&self, file_id: i64) -> Result<Vec<u8>, ArchiveError> {
        let url = access_url(&self.config.base_url, file_id);
        self.get(&url)
    }

    /// Look a file up by its listed name within a dataset and parse it as
    /// tab-separated text into a [`Table`].
    pub fn fetch_table_by_name(&self, label: &str, doi: &str) -> Result<Table, ArchiveError> {
        let files = self.dataset_files(doi)?;
        let file = find_file(&files, label).ok_or_else(|| ArchiveError::FileNotFound {
            label: label.to_owned(),
            doi: normalize_doi(doi),
        })?;
        log::info!("fetching '{}' (file id {})", file.label, file.id);
        let bytes = self.fetch_file_bytes(file.id)?;
        table_from_tsv(&bytes)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.config.api_token {
            request = request.header(API_KEY_HEADER, token.as_str());
        }
        let response = request.send().map_err(|source| ArchiveError::Request {
            url: url.to_owned(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        let body = response.bytes().map_err(|source| ArchiveError::Request {
            url: url.to_owned(),
            source,
        })?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;

    fn listing() -> Vec<ArchiveFile> {
        vec![
            ArchiveFile {
                label: "readme.md".into(),
                id: 7,
                filename: Some("readme.md".into()),
                content_type: Some("text/markdown".into()),
            },
            ArchiveFile {
                label: "field_samples.tab".into(),
                id: 42,
                filename: Some("field_samples.tab".into()),
                content_type: Some("text/tab-separated-values".into()),
            },
        ]
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("10.7910/DVN/ABC123"), "doi:10.7910/DVN/ABC123");
        assert_eq!(normalize_doi("doi:10.7910/DVN/ABC123"), "doi:10.7910/DVN/ABC123");
        assert_eq!(
            normalize_doi("https://doi.org/10.7910/DVN/ABC123"),
            "doi:10.7910/DVN/ABC123"
        );
        assert_eq!(normalize_doi(" hdl:1902.1/111 "), "hdl:1902.1/111");
    }

    #[test]
    fn test_dataset_url() {
        assert_eq!(
            dataset_url("https://demo.dataverse.org", "10.70122/FK2/XYZ"),
            "https://demo.dataverse.org/api/datasets/:persistentId/?persistentId=doi:10.70122/FK2/XYZ"
        );
    }

    #[test]
    fn test_access_url() {
        assert_eq!(
            access_url("https://demo.dataverse.org", 42),
            "https://demo.dataverse.org/api/access/datafile/42"
        );
    }

    #[test]
    fn test_parse_dataset_envelope() {
        let body = serde_json::json!({
            "status": "OK",
            "data": {
                "id": 1,
                "latestVersion": {
                    "versionNumber": 2,
                    "files": [
                        {
                            "label": "field_samples.tab",
                            "restricted": false,
                            "dataFile": {
                                "id": 42,
                                "filename": "field_samples.tab",
                                "contentType": "text/tab-separated-values",
                                "filesize": 1234
                            }
                        }
                    ]
                }
            }
        });
        let files = parse_dataset_envelope(body.to_string().as_bytes()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].label, "field_samples.tab");
        assert_eq!(files[0].id, 42);
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = br#"{"status":"ERROR","message":"Dataset not found"}"#;
        match parse_dataset_envelope(body) {
            Err(ArchiveError::Api(msg)) => assert_eq!(msg, "Dataset not found"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        assert!(matches!(
            parse_dataset_envelope(b"<html>gateway timeout</html>"),
            Err(ArchiveError::Decode(_))
        ));
    }

    #[test]
    fn test_find_file_by_label_or_filename() {
        let files = listing();
        assert_eq!(find_file(&files, "field_samples.tab").map(|f| f.id), Some(42));
        assert_eq!(find_file(&files, "readme.md").map(|f| f.id), Some(7));
        assert_eq!(find_file(&files, "missing.tab"), None);
    }

    #[test]
    fn test_table_from_tsv() {
        let bytes = b"station\tconc\nCedar Creek\t4.2\nMill Race\t3.1\n";
        let table = table_from_tsv(bytes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records[0].get("station"),
            Some(&Value::Str("Cedar Creek".into()))
        );
        assert_eq!(table.records[1].get("conc"), Some(&Value::Float(3.1)));
    }

    #[test]
    fn test_table_from_tsv_rejects_ragged_rows() {
        let bytes = b"a\tb\n1\n";
        assert!(matches!(
            table_from_tsv(bytes),
            Err(ArchiveError::Tabular(_))
        ));
    }
}
