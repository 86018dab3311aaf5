//! Request Description
//!
//! A transport-independent description of one API call. Requests are cloned
//! into the replay queue when a token refresh is needed.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;

/// Whether a request carries the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Bearer,
    None,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// One API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Body,
    pub(crate) auth: Auth,
    pub(crate) binary: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            auth: Auth::Bearer,
            binary: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Flatten a serializable struct into query parameters.
    ///
    /// Null fields are skipped and arrays are joined with commas.
    pub fn query_params<T: Serialize>(mut self, params: &T) -> Result<Self, ApiError> {
        match serde_json::to_value(params)? {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(rendered) = render_query_value(&value) {
                        self.query.push((key, rendered));
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(ApiError::Decode(format!(
                "query parameters must be an object, got {}",
                other
            ))),
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Body::Form(fields);
        self
    }

    /// Never attach the bearer token, even when one is stored
    pub fn without_auth(mut self) -> Self {
        self.auth = Auth::None;
        self
    }

    /// Expect a file payload instead of a JSON envelope
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth(&self) -> Auth {
        self.auth
    }
}

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_query_value).collect();
            Some(parts.join(","))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Query {
        page_num: u32,
        keywords: Option<String>,
        status: Option<i32>,
        ids: Vec<u32>,
    }

    #[test]
    fn test_query_params_flatten() {
        let request = ApiRequest::get("/api/v1/users/page")
            .query_params(&Query {
                page_num: 2,
                keywords: None,
                status: Some(1),
                ids: vec![3, 4],
            })
            .unwrap();

        let mut query = request.query.clone();
        query.sort();
        assert_eq!(
            query,
            vec![
                ("ids".to_string(), "3,4".to_string()),
                ("pageNum".to_string(), "2".to_string()),
                ("status".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_builder_flags() {
        let request = ApiRequest::post("/x").without_auth().binary();
        assert_eq!(request.auth(), Auth::None);
        assert!(request.binary);
        assert_eq!(request.method(), &Method::POST);
    }
}
