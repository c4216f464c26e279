use crate::core::error::{ConnectorError, Result};
use crate::core::model::{
    AccountSnapshot, Credentials, FetchedDocument, SessionToken, SignedDocumentRef,
    TransactionalDocumentRef,
};
use crate::core::NaloApi;
use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, error};

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Every Nalo response wraps its payload in `detail`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    detail: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginDetail {
    token: Option<String>,
}

/// Identifiers come back either as numbers or as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{n}"),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignedDocumentItem {
    id: RemoteId,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionalDocumentItem {
    id: Option<RemoteId>,
    contract_id: RemoteId,
    id_operation: RemoteId,
}

#[derive(Debug, Deserialize)]
struct DocumentContent {
    filename: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: RemoteId,
    name: String,
    current_value: f64,
}

pub struct NaloProvider {
    base_url: String,
    client: reqwest::Client,
}

impl NaloProvider {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nalo-sync/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticated GET returning the raw body. Every failure is `ServiceUnavailable`.
    async fn get_text(&self, token: &SessionToken, path: &str) -> Result<String> {
        let url = self.url(path);
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, token.authorization_header())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Request failed");
                ConnectorError::ServiceUnavailable(format!("{url}: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            ConnectorError::ServiceUnavailable(format!("{url}: {e}"))
        })?;

        if !status.is_success() {
            error!(%status, response = %body, url = %url, "Request rejected");
            return Err(ConnectorError::ServiceUnavailable(format!(
                "{url} returned {status}"
            )));
        }
        Ok(body)
    }

    async fn get_detail<T: DeserializeOwned>(&self, token: &SessionToken, path: &str) -> Result<T> {
        let body = self.get_text(token, path).await?;
        parse_envelope::<T>(&body, path)?.ok_or_else(|| {
            error!(response = %body, path, "Response has no detail");
            ConnectorError::ServiceUnavailable(format!("{path}: missing detail"))
        })
    }

    async fn fetch_content(&self, token: &SessionToken, path: &str) -> Result<FetchedDocument> {
        let content: DocumentContent = self.get_detail(token, path).await?;
        let bytes = decode_base64(&content.data).map_err(|e| {
            error!(error = %e, filename = %content.filename, "Invalid document payload");
            ConnectorError::ServiceUnavailable(format!("{path}: invalid base64 payload: {e}"))
        })?;
        debug!(filename = %content.filename, size = bytes.len(), "Fetched document");
        Ok(FetchedDocument::new(content.filename, bytes))
    }
}

fn parse_envelope<T: DeserializeOwned>(body: &str, path: &str) -> Result<Option<T>> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) => Ok(envelope.detail),
        Err(e) => {
            error!(error = ?e, response = %body, path, "Failed to parse response");
            Err(ConnectorError::ServiceUnavailable(format!(
                "{path}: malformed response: {e}"
            )))
        }
    }
}

fn decode_base64(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact)
}

#[async_trait]
impl NaloApi for NaloProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken> {
        let url = self.url("/login");
        debug!("Logging in at {}", url);

        let form = [
            ("email", credentials.login.as_str()),
            ("password", credentials.password.as_str()),
            ("userToken", "false"),
        ];
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Login request failed");
                ConnectorError::AuthenticationFailure(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read login response");
            ConnectorError::AuthenticationFailure(e.to_string())
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").cloned());
            error!(%status, ?detail, "Login rejected");
            return Err(ConnectorError::AuthenticationFailure(format!(
                "login returned {status}"
            )));
        }

        let token = serde_json::from_str::<Envelope<LoginDetail>>(&body)
            .ok()
            .and_then(|envelope| envelope.detail)
            .and_then(|detail| detail.token)
            .filter(|token| !token.is_empty());

        match token {
            Some(token) => Ok(SessionToken::new(token)),
            None => {
                error!("Failed to retrieve user token");
                Err(ConnectorError::AuthenticationFailure(
                    "no token in login response".to_string(),
                ))
            }
        }
    }

    async fn list_signed_documents(&self, token: &SessionToken) -> Result<Vec<SignedDocumentRef>> {
        let items: Vec<SignedDocumentItem> = self
            .get_detail(token, "/profiles/me/signed-documents/")
            .await?;
        Ok(items
            .into_iter()
            .map(|item| SignedDocumentRef {
                id: item.id.to_string(),
                filename: item.filename,
            })
            .collect())
    }

    async fn fetch_signed_document(
        &self,
        token: &SessionToken,
        doc: &SignedDocumentRef,
    ) -> Result<FetchedDocument> {
        let path = format!("/profiles/me/signed-document-content/{}", doc.id);
        self.fetch_content(token, &path).await
    }

    async fn list_transactional_documents(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<TransactionalDocumentRef>> {
        let items: Vec<TransactionalDocumentItem> =
            self.get_detail(token, "/account/transactional-pdfs").await?;
        Ok(items
            .into_iter()
            .map(|item| TransactionalDocumentRef {
                id: item.id.map(|id| id.to_string()),
                contract_id: item.contract_id.to_string(),
                id_operation: item.id_operation.to_string(),
            })
            .collect())
    }

    async fn fetch_transactional_document(
        &self,
        token: &SessionToken,
        doc: &TransactionalDocumentRef,
    ) -> Result<FetchedDocument> {
        let path = format!(
            "/contract/get-document/{}/{}",
            doc.contract_id, doc.id_operation
        );
        self.fetch_content(token, &path).await
    }

    async fn get_accounts(&self, token: &SessionToken) -> Result<Vec<AccountSnapshot>> {
        let path = "/projects/mine/without-details";
        let body = self.get_text(token, path).await?;
        let projects: Vec<Project> = parse_envelope(&body, path)?.ok_or_else(|| {
            error!("Failed to retrieve project details");
            ConnectorError::AuthenticationFailure("account list has no detail".to_string())
        })?;

        Ok(projects
            .into_iter()
            .map(|project| AccountSnapshot::new(project.id.to_string(), project.name, project.current_value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            login: "jane@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    async fn mount_json(server: &MockServer, request_path: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .and(header("Authorization", "Token abc"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_authenticate_posts_form() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("email=jane%40example.com"))
            .and(body_string_contains("password=hunter2"))
            .and(body_string_contains("userToken=false"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"detail":{"token":"abc"}}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let token = provider.authenticate(&credentials()).await.unwrap();
        assert_eq!(token, SessionToken::new("abc"));
    }

    #[tokio::test]
    async fn test_authenticate_without_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"detail":{}}"#))
            .mount(&mock_server)
            .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let err = provider.authenticate(&credentials()).await.unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"detail":"Identifiants incorrects"}"#),
            )
            .mount(&mock_server)
            .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let err = provider.authenticate(&credentials()).await.unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[tokio::test]
    async fn test_authenticate_unreachable_is_authentication_failure() {
        // Nothing listens on the discard port
        let provider = NaloProvider::new("http://127.0.0.1:9").unwrap();
        let err = provider.authenticate(&credentials()).await.unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[tokio::test]
    async fn test_list_and_fetch_signed_documents() {
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/profiles/me/signed-documents/",
            200,
            r#"{"detail":[{"id":12,"filename":"contrat.pdf"},{"id":"13","filename":null}]}"#,
        )
        .await;
        mount_json(
            &mock_server,
            "/profiles/me/signed-document-content/12",
            200,
            r#"{"detail":{"filename":"contrat.pdf","data":"JVBERi0xLjQ="}}"#,
        )
        .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let token = SessionToken::new("abc");

        let docs = provider.list_signed_documents(&token).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "12");
        assert_eq!(docs[0].filename.as_deref(), Some("contrat.pdf"));
        assert_eq!(docs[1].id, "13");
        assert!(docs[1].filename.is_none());

        let file = provider.fetch_signed_document(&token, &docs[0]).await.unwrap();
        assert_eq!(file.filename(), "contrat.pdf");
        assert_eq!(file.bytes(), b"%PDF-1.4");
        assert_eq!(file.vendor(), "Nalo");
        assert_eq!(file.version(), 1);
    }

    #[tokio::test]
    async fn test_fetch_transactional_document() {
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/account/transactional-pdfs",
            200,
            r#"{"detail":[{"id":1,"contract_id":77,"id_operation":"op-5"}]}"#,
        )
        .await;
        mount_json(
            &mock_server,
            "/contract/get-document/77/op-5",
            200,
            // unpadded base64 with a line break
            "{\"detail\":{\"filename\":\"versement.pdf\",\"data\":\"aGVs\\nbG8\"}}",
        )
        .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let token = SessionToken::new("abc");

        let docs = provider.list_transactional_documents(&token).await.unwrap();
        assert_eq!(
            docs,
            vec![TransactionalDocumentRef {
                id: Some("1".to_string()),
                contract_id: "77".to_string(),
                id_operation: "op-5".to_string(),
            }]
        );

        let file = provider
            .fetch_transactional_document(&token, &docs[0])
            .await
            .unwrap();
        assert_eq!(file.filename(), "versement.pdf");
        assert_eq!(file.bytes(), b"hello");
    }

    #[tokio::test]
    async fn test_document_errors_are_service_unavailable() {
        let mock_server = MockServer::start().await;
        mount_json(&mock_server, "/profiles/me/signed-documents/", 500, "oops").await;
        mount_json(
            &mock_server,
            "/profiles/me/signed-document-content/1",
            200,
            r#"{"detail":{"filename":"a.pdf","data":"***"}}"#,
        )
        .await;
        mount_json(&mock_server, "/account/transactional-pdfs", 200, "not json").await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let token = SessionToken::new("abc");

        let err = provider.list_signed_documents(&token).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnavailable(_)));

        let doc = SignedDocumentRef {
            id: "1".to_string(),
            filename: None,
        };
        let err = provider.fetch_signed_document(&token, &doc).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnavailable(_)));

        let err = provider
            .list_transactional_documents(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_get_accounts_rounds_balances() {
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/projects/mine/without-details",
            200,
            r#"{"detail":[{"id":42,"name":"Retraite","current_value":123.456},{"id":43,"name":"Projet immo","current_value":1000}]}"#,
        )
        .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let accounts = provider
            .get_accounts(&SessionToken::new("abc"))
            .await
            .unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].label, "Retraite");
        assert_eq!(accounts[0].balance, 123.46);
        assert_eq!(accounts[0].vendor_id, "42");
        assert_eq!(accounts[0].number, "42");
        assert_eq!(accounts[1].balance, 1000.0);
    }

    #[tokio::test]
    async fn test_get_accounts_without_detail() {
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/projects/mine/without-details",
            200,
            r#"{"message":"nope"}"#,
        )
        .await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let err = provider
            .get_accounts(&SessionToken::new("abc"))
            .await
            .unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[tokio::test]
    async fn test_get_accounts_server_error() {
        let mock_server = MockServer::start().await;
        mount_json(&mock_server, "/projects/mine/without-details", 503, "").await;

        let provider = NaloProvider::new(&mock_server.uri()).unwrap();
        let err = provider
            .get_accounts(&SessionToken::new("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnavailable(_)));
    }
}
