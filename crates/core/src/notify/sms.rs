use crate::config::Settings;
use crate::notify::error::NotifyError;
use crate::notify::Channel;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl SmsClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let (account_sid, auth_token) = settings.require_twilio_credentials()?;
        Ok(Self {
            http: settings.http_client()?,
            base_url: settings.twilio_base_url.clone(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: settings.require_twilio_from()?.to_string(),
            to: settings.require_sms_to()?.to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }

    /// Sends one text message and returns the gateway's message id.
    pub async fn send(&self, body: &str) -> Result<String> {
        let res = self
            .http
            .post(self.url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", self.to.as_str()), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| NotifyError::new(Channel::Sms, "http", e.to_string()))?;

        let status = res.status();
        let text = res.text().await.context("failed to read sms gateway response")?;
        if !status.is_success() {
            let detail = serde_json::from_str::<GatewayError>(&text)
                .map(|e| format!("status={status} code={:?} message={}", e.code, e.message))
                .unwrap_or_else(|_| format!("status={status} body={text}"));
            return Err(NotifyError::new(Channel::Sms, "http", detail).into());
        }

        let sent = serde_json::from_str::<MessageResource>(&text)
            .map_err(|e| NotifyError::new(Channel::Sms, "decode", e.to_string()))?;
        tracing::info!(sid = %sent.sid, to = %self.to, "sms sent");
        Ok(sent.sid)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SmsClient {
        let settings = Settings {
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: Some("secret".to_string()),
            twilio_from: Some("+15550000000".to_string()),
            sms_to: Some("+15551111111".to_string()),
            twilio_base_url: server.uri(),
            ..Settings::default()
        };
        SmsClient::from_settings(&settings).unwrap()
    }

    #[test]
    fn requires_gateway_credentials() {
        let err = SmsClient::from_settings(&Settings::default()).unwrap_err();
        assert!(err.to_string().contains("TWILIO_ACCOUNT_SID"));
    }

    #[tokio::test]
    async fn posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("Body=Bottom+fishing+picks%3A+ABCD"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
            .mount(&server)
            .await;

        let sid = client_for(&server)
            .send("Bottom fishing picks: ABCD")
            .await
            .unwrap();
        assert_eq!(sid, "SM1");
    }

    #[tokio::test]
    async fn gateway_rejection_is_an_sms_diagnostic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 21211,
                "message": "Invalid 'To' Phone Number",
                "status": 400
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).send("x").await.unwrap_err();
        let diag = err.downcast_ref::<NotifyError>().unwrap();
        assert_eq!(diag.channel, Channel::Sms);
        assert!(diag.detail.contains("21211"));
    }
}
