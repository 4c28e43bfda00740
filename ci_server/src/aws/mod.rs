//! AWS service clients over the JSON 1.1 protocol.
//!
//! Each call is one signed `POST /` with the operation named in the
//! `X-Amz-Target` header. There is no retry and no pagination.

pub mod services;
pub mod sigv4;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ci_flow::CollaboratorError;

use self::sigv4::{Credentials, SigningRequest};

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Client for one AWS service endpoint.
#[derive(Clone, Debug)]
pub struct AwsJsonClient {
    http: reqwest::Client,
    endpoint: Url,
    host: String,
    region: String,
    service: &'static str,
    target_prefix: &'static str,
    credentials: Credentials,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl AwsJsonClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        region: &str,
        service: &'static str,
        target_prefix: &'static str,
        credentials: Credentials,
    ) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("invalid {service} endpoint {endpoint}: {e}"))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => anyhow::bail!("{service} endpoint has no host: {endpoint}"),
        };

        Ok(Self {
            http,
            endpoint,
            host,
            region: region.to_string(),
            service,
            target_prefix,
            credentials,
        })
    }

    /// Invoke `operation` with a JSON request and decode the JSON response.
    pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| CollaboratorError::Decode(format!("cannot encode {operation} request: {e}")))?;
        let target = format!("{}.{operation}", self.target_prefix);

        let signature = sigv4::sign(
            &self.credentials,
            &self.region,
            self.service,
            &SigningRequest {
                host: &self.host,
                content_type: JSON_CONTENT_TYPE,
                target: &target,
                body: &body,
            },
            chrono::Utc::now(),
        );

        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .header(HOST, &self.host)
            .header("x-amz-target", &target)
            .header("x-amz-date", &signature.amz_date)
            .header(AUTHORIZATION, &signature.authorization);
        if let Some(token) = &signature.security_token {
            builder = builder.header("x-amz-security-token", token);
        }

        let resp = builder
            .body(body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(format!("{target}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let parsed: Option<ErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(body) => (
                    body.kind
                        .map(|kind| error_code(&kind).to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    body.message.unwrap_or_default(),
                ),
                None => ("Unknown".to_string(), text),
            };
            tracing::warn!(target = %target, status = status.as_u16(), code = %code, "AWS call failed: {message}");
            return Err(CollaboratorError::Service {
                service: self.service.to_string(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("{target}: {e}")))
    }
}

/// Strip the namespace from an AWS error type, e.g.
/// `com.amazonaws.codebuild#ResourceNotFoundException`.
fn error_code(kind: &str) -> &str {
    let kind = kind.rsplit('#').next().unwrap_or(kind);
    kind.split(':').next().unwrap_or(kind)
}
