//! File endpoints (`/api/v1/files`)

use crate::http::{ApiClient, ApiRequest, ApiResult, FileDownload};

const BASE: &str = "/api/v1/files";

pub struct FilesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> FilesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Fetch a stored file.
    ///
    /// `path` is either an API path (`/api/v1/...`) or a full URL on the same
    /// backend; the base URL prefix is stripped from full URLs.
    pub async fn download(&self, path: &str) -> ApiResult<FileDownload> {
        let relative = path
            .strip_prefix(self.client.base_url())
            .unwrap_or(path);
        let relative = if relative.starts_with('/') {
            relative.to_string()
        } else {
            format!("/{}", relative)
        };

        self.client.download(ApiRequest::get(relative)).await
    }

    /// Remove a stored file by its storage path
    pub async fn delete(&self, file_path: &str) -> ApiResult<()> {
        self.client
            .call_unit(ApiRequest::delete(BASE).query("filePath", file_path))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::http::mock::MockTransport;
    use crate::http::RawResponse;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_download_strips_base_url() {
        let transport = MockTransport::new(|_| {
            Ok(RawResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "image/png".to_string())],
                body: vec![0x89, 0x50],
            })
        });
        let client = client(transport.clone());

        let file = client
            .files()
            .download("http://console.test/files/2025/logo.png")
            .await
            .unwrap();

        assert_eq!(file.bytes, vec![0x89, 0x50]);
        assert_eq!(file.file_name, None);
        let request = transport.last();
        assert_eq!(request.url, "http://console.test/files/2025/logo.png");
        assert_eq!(request.header("Authorization"), Some("Bearer token"));
    }

    #[tokio::test]
    async fn test_delete_passes_path() {
        let transport = MockTransport::ok(json!(true));
        let client = client(transport.clone());

        client.files().delete("2025/10/report.pdf").await.unwrap();

        let request = transport.last();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url, "http://console.test/api/v1/files");
        assert_eq!(request.query_value("filePath"), Some("2025/10/report.pdf"));
    }
}
