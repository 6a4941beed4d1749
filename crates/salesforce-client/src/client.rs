//! REST implementation of the `SalesforceApi` capability.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sync_core::{FieldType, FieldTypeMap, Record, SalesforceApi};

use crate::config::ConnectionConfig;

/// Successful OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

/// Error body returned by the OAuth endpoint.
#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// One entry of the error array returned by REST endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    message: String,
    error_code: String,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
struct DescribeField {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    done: bool,
    #[serde(default)]
    next_records_url: Option<String>,
    records: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Authenticated Salesforce REST client.
///
/// Constructed once with [`SalesforceClient::connect`] and then shared by
/// reference; the session is not refreshed.
pub struct SalesforceClient {
    http: Client,
    instance_url: String,
    access_token: String,
    api_version: String,
    tooling_api: bool,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("tooling_api", &self.tooling_api)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Authenticate with the OAuth 2.0 username-password flow.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let token_url = format!("{}/services/oauth2/token", config.login_url);
        tracing::debug!("Requesting access token from {token_url}");

        let password = format!("{}{}", config.password, config.security_token);
        let response = http
            .post(&token_url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("username", config.username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to reach {token_url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Authentication failed ({status}): {}",
                describe_oauth_error(&body)
            );
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse OAuth token response")?;
        tracing::info!("Authenticated against {}", token.instance_url);

        Ok(Self {
            http,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            access_token: token.access_token,
            api_version: config.api_version.clone(),
            tooling_api: config.tooling_api,
        })
    }

    /// Base path for data or tooling resources.
    fn base_path(&self) -> String {
        let mut base = format!("{}/services/data/v{}", self.instance_url, self.api_version);
        if self.tooling_api {
            base.push_str("/tooling");
        }
        base
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;
        parse_response(response, url).await
    }

    async fn run_query(&self, endpoint: &str, soql: &str) -> Result<Vec<Record>> {
        let url = format!("{}/{endpoint}", self.base_path());
        let mut page: QueryResponse = self.get_json(&url, &[("q", soql)]).await?;
        let mut records: Vec<Record> = page.records.drain(..).map(Record::from).collect();

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                anyhow::bail!("Query response is not done but has no nextRecordsUrl");
            };
            let next_url = format!("{}{}", self.instance_url, next);
            tracing::debug!("Fetching next page {next}");
            page = self.get_json(&next_url, &[]).await?;
            records.extend(page.records.drain(..).map(Record::from));
        }

        Ok(records)
    }
}

#[async_trait]
impl SalesforceApi for SalesforceClient {
    async fn describe(&self, object: &str) -> Result<FieldTypeMap> {
        let url = resource_url(&self.base_path(), &["sobjects", object, "describe"])?;
        let response: DescribeResponse = self.get_json(url.as_str(), &[]).await?;
        Ok(response
            .fields
            .into_iter()
            .map(|f| (f.name, f.field_type))
            .collect())
    }

    async fn query(&self, soql: &str) -> Result<Vec<Record>> {
        self.run_query("query", soql).await
    }

    async fn query_all(&self, soql: &str) -> Result<Vec<Record>> {
        // The tooling API has no queryAll resource
        let endpoint = if self.tooling_api { "query" } else { "queryAll" };
        self.run_query(endpoint, soql).await
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn resource_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid base URL {base}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("Base URL {base} cannot have a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn parse_response<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read response from {url}"))?;

    if !status.is_success() {
        anyhow::bail!("{url} returned {status}: {}", describe_api_error(&body));
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse response from {url}"))
}

/// Render a REST error body as `ERROR_CODE: message`, falling back to the
/// raw body.
fn describe_api_error(body: &str) -> String {
    match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    }
}

fn describe_oauth_error(body: &str) -> String {
    match serde_json::from_str::<OAuthError>(body) {
        Ok(e) if e.error_description.is_empty() => e.error,
        Ok(e) => format!("{}: {}", e.error, e.error_description),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_api_error() {
        let body = r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#;
        assert_eq!(
            describe_api_error(body),
            "INVALID_SESSION_ID: Session expired or invalid"
        );
        assert_eq!(describe_api_error("<html>oops</html>"), "<html>oops</html>");
    }

    #[test]
    fn test_resource_url_encodes_segments() {
        let base = "https://acme.my.salesforce.com/services/data/v60.0";
        let url = resource_url(base, &["sobjects", "Lead", "describe"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.my.salesforce.com/services/data/v60.0/sobjects/Lead/describe"
        );

        let url = resource_url(base, &["sobjects", "Lead/../User", "describe"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.my.salesforce.com/services/data/v60.0/sobjects/Lead%2F..%2FUser/describe"
        );

        let url = resource_url(base, &["sobjects", "My Object?x=1", "describe"]).unwrap();
        assert!(url.as_str().contains("/sobjects/My%20Object%3Fx=1/describe"));
    }

    #[test]
    fn test_describe_oauth_error() {
        let body = r#"{"error":"invalid_grant","error_description":"authentication failure"}"#;
        assert_eq!(
            describe_oauth_error(body),
            "invalid_grant: authentication failure"
        );
    }

    #[test]
    fn test_parse_describe_response_keeps_order() {
        let body = r#"{
            "name": "Lead",
            "fields": [
                {"name": "Id", "type": "id", "label": "Lead ID"},
                {"name": "Email", "type": "email"},
                {"name": "LastModifiedDate", "type": "datetime"},
                {"name": "Location__c", "type": "location"}
            ]
        }"#;
        let response: DescribeResponse = serde_json::from_str(body).unwrap();
        let map: FieldTypeMap = response
            .fields
            .into_iter()
            .map(|f| (f.name, f.field_type))
            .collect();

        let names: Vec<&str> = map.names().collect();
        assert_eq!(names, vec!["Id", "Email", "LastModifiedDate", "Location__c"]);
        assert_eq!(map.get("LastModifiedDate"), Some(&FieldType::DateTime));
        assert_eq!(
            map.get("Location__c"),
            Some(&FieldType::Other("location".to_string()))
        );
    }

    #[test]
    fn test_parse_query_page() {
        let body = r#"{
            "totalSize": 3,
            "done": false,
            "nextRecordsUrl": "/services/data/v60.0/query/01gD0000002HU6KIAW-2000",
            "records": [
                {"attributes": {"type": "Lead"}, "Id": "00Q1", "Owner": {"attributes": {"type": "User"}, "Name": "Ada"}}
            ]
        }"#;
        let page: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(!page.done);
        assert_eq!(
            page.next_records_url.as_deref(),
            Some("/services/data/v60.0/query/01gD0000002HU6KIAW-2000")
        );

        let record = Record::from(page.records.into_iter().next().unwrap());
        assert_eq!(
            record.get_path("Owner.Name").and_then(|v| v.as_str()),
            Some("Ada")
        );
    }

    #[test]
    fn test_parse_last_query_page() {
        let body = r#"{"totalSize": 0, "done": true, "records": []}"#;
        let page: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(page.done);
        assert!(page.next_records_url.is_none());
    }
}
