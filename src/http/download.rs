//! File Downloads
//!
//! Binary responses (exports, stored files) carry their name and type in the
//! `Content-Disposition` and `Content-Type` headers.

use std::path::{Path, PathBuf};

use super::transport::RawResponse;

/// Name used when the server does not suggest one
pub const DEFAULT_FILE_NAME: &str = "download";

/// A file payload received from the API
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileDownload {
    pub fn from_response(response: RawResponse) -> Self {
        let file_name = response
            .header("content-disposition")
            .and_then(parse_content_disposition);
        let content_type = response.header("content-type").map(str::to_string);

        Self {
            file_name,
            content_type,
            bytes: response.body,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the payload into `dir`.
    ///
    /// `name` overrides the server-suggested name. Only the final path
    /// component of either is used.
    pub fn save(&self, dir: &Path, name: Option<&str>) -> std::io::Result<PathBuf> {
        let requested = name
            .map(str::to_string)
            .or_else(|| self.file_name.clone())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        let file_name = Path::new(&requested)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.into());

        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, &self.bytes)?;

        tracing::info!(path = ?path, bytes = self.bytes.len(), "Saved download");
        Ok(path)
    }
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// `filename*=UTF-8''...` wins over a plain `filename=`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;

    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw
                    .trim()
                    .trim_matches('"')
                    .splitn(3, '\'')
                    .last()
                    .unwrap_or_default();
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    if !decoded.is_empty() {
                        return Some(decoded.into_owned());
                    }
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = urlencoding::decode(name)
                        .map(|n| n.into_owned())
                        .ok()
                        .or_else(|| Some(name.to_string()));
                }
            }
            _ => {}
        }
    }

    plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plain_filename() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"users.xlsx\"").as_deref(),
            Some("users.xlsx")
        );
    }

    #[test]
    fn test_extended_filename_wins() {
        let header = "attachment; filename=\"fallback.xlsx\"; filename*=UTF-8''%E4%BD%BF%E7%94%A8%E8%80%85.xlsx";
        assert_eq!(
            parse_content_disposition(header).as_deref(),
            Some("使用者.xlsx")
        );
    }

    #[test]
    fn test_missing_filename() {
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_save_strips_directories() {
        let dir = tempdir().unwrap();
        let download = FileDownload {
            file_name: Some("../../etc/report.csv".to_string()),
            content_type: Some("text/csv".to_string()),
            bytes: b"a,b\n1,2\n".to_vec(),
        };

        let path = download.save(dir.path(), None).unwrap();

        assert_eq!(path, dir.path().join("report.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n");
    }
}
