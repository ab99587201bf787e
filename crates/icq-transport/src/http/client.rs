//! reqwest-backed [`Bot`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use icq_core::{ApiError, ApiResult, Bot, EventBatch, FileUpload, ParseMode, Query};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, Url};
use serde_json::Value;
use tracing::{debug, info, trace};

use super::config::HttpBotConfig;

/// A bot talking to the vendor HTTP API.
///
/// Every call is `GET {api_url}/bot/v1/{method}?token=...&...`, except file
/// uploads which are multipart POSTs to the same URL shape.
pub struct HttpBot {
    client: Client,
    base: Url,
    token: String,
    poll_grace: Duration,
    parse_mode: ParseMode,
}

impl HttpBot {
    pub fn new(config: HttpBotConfig) -> ApiResult<Self> {
        let base = format!("{}/bot/v1/", config.api_url.trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|e| ApiError::transport(format!("invalid API URL '{}': {e}", config.api_url)))?;

        let mut builder = ClientBuilder::new().timeout(config.timeout);
        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy).map_err(|e| ApiError::transport(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::transport(e.to_string()))?;

        info!(api = %base, proxy = config.proxy.is_some(), "HTTP bot created");

        Ok(Self {
            client,
            base,
            token: config.token,
            poll_grace: config.poll_grace,
            parse_mode: config.parse_mode,
        })
    }

    /// The `/bot/v1/` root all methods are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, method: &str, query: &Query) -> ApiResult<Url> {
        let mut url = self
            .base
            .join(method)
            .map_err(|e| ApiError::transport(format!("invalid method '{method}': {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("token", &self.token);
            for (key, value) in query.iter() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: &str, request: RequestBuilder) -> ApiResult<Value> {
        let response = request.send().await.map_err(map_error)?;
        let status = response.status();
        trace!(method, status = status.as_u16(), "API response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(method, status = status.as_u16(), "API call rejected");
            return Err(ApiError::ApiCallFailed {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(map_error)
    }
}

/// Maps a reqwest failure, dropping the URL since it carries the token.
fn map_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::decode(err.without_url().to_string())
    } else {
        ApiError::transport(err.without_url().to_string())
    }
}

#[async_trait]
impl Bot for HttpBot {
    async fn call(&self, method: &str, query: Query) -> ApiResult<Value> {
        debug!(method, params = query.len(), "Calling bot API");
        let url = self.url(method, &query)?;
        self.send(method, self.client.get(url)).await
    }

    async fn upload(&self, method: &str, query: Query, file: FileUpload) -> ApiResult<Value> {
        debug!(method, file = %file.file_name, size = file.bytes.len(), "Uploading file");
        let url = self.url(method, &query)?;

        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(mime) = &file.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::transport(e.without_url().to_string()))?;
        }
        let form = Form::new().part("file", part);

        self.send(method, self.client.post(url).multipart(form)).await
    }

    async fn fetch_events(&self, last_event_id: i64, poll_time: u64) -> ApiResult<EventBatch> {
        let query = Query::new()
            .param("lastEventId", last_event_id)
            .param("pollTime", poll_time);
        let url = self.url("events/get", &query)?;
        let timeout = Duration::from_secs(poll_time) + self.poll_grace;
        trace!(last_event_id, poll_time, "Long-polling events");

        let body = self
            .send("events/get", self.client.get(url).timeout(timeout))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use icq_core::{BotApi, BoxedBot, SendOptions};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TOKEN: &str = "001.0123456789.0123456789:747432131";

    fn bot_for(server: &MockServer) -> HttpBot {
        HttpBot::new(HttpBotConfig::new(TOKEN).api_url(server.uri())).unwrap()
    }

    #[test]
    fn test_base_url_tolerates_trailing_slash() {
        let bot = HttpBot::new(HttpBotConfig::new(TOKEN).api_url("https://api.example.com/")).unwrap();
        assert_eq!(bot.base_url().as_str(), "https://api.example.com/bot/v1/");
    }

    #[test]
    fn test_invalid_api_url() {
        let err = HttpBot::new(HttpBotConfig::new(TOKEN).api_url("not a url")).err();
        assert!(matches!(err, Some(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn test_call_sends_token_and_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot/v1/self/get"))
            .and(query_param("token", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userId": "747432131",
                "nick": "test_api_bot",
                "firstName": "Test",
                "ok": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bot: BoxedBot = Arc::new(bot_for(&server));
        let info = bot.get_self().await.unwrap();
        assert_eq!(info.user_id, "747432131");
        assert_eq!(info.first_name.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_call_failed() {
        let server = MockServer::start().await;
        Mock::given(path("/bot/v1/chats/getInfo"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = bot_for(&server).get_chat_info("c").await.unwrap_err();
        match err {
            ApiError::ApiCallFailed { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_params_reach_the_wire() {
        let server = MockServer::start().await;
        Mock::given(path("/bot/v1/messages/deleteMessages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let ack = bot_for(&server)
            .delete_messages("c", &["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert!(ack.ok);

        let requests = server.received_requests().await.unwrap();
        let ids: Vec<String> = requests[0]
            .url
            .query_pairs()
            .filter(|(k, _)| k == "msgId")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_send_text_carries_parse_mode_from_config() {
        let server = MockServer::start().await;
        Mock::given(path("/bot/v1/messages/sendText"))
            .and(query_param("parseMode", "MarkdownV2"))
            .and(query_param("text", "hi there"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "msgId": "7" })))
            .expect(1)
            .mount(&server)
            .await;

        let bot = HttpBot::new(
            HttpBotConfig::new(TOKEN)
                .api_url(server.uri())
                .parse_mode(ParseMode::MarkdownV2),
        )
        .unwrap();
        let sent = bot.send_text("c", "hi there", SendOptions::new()).await.unwrap();
        assert_eq!(sent.msg_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_fetch_events_decodes_batch() {
        let server = MockServer::start().await;
        Mock::given(path("/bot/v1/events/get"))
            .and(query_param("lastEventId", "3"))
            .and(query_param("pollTime", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    { "eventId": 4, "type": "newMessage", "payload": {} },
                    { "eventId": 5, "payload": {} },
                    { "eventId": "6", "type": "deletedMessage", "payload": {} }
                ]
            })))
            .mount(&server)
            .await;

        let batch = bot_for(&server).fetch_events(3, 1).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.last_event_id(), Some(6));
    }

    #[tokio::test]
    async fn test_slow_poll_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(path("/bot/v1/events/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "events": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let bot = HttpBot::new(
            HttpBotConfig::new(TOKEN)
                .api_url(server.uri())
                .poll_grace(Duration::from_millis(100)),
        )
        .unwrap();
        let err = bot.fetch_events(0, 0).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_upload_is_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot/v1/messages/sendFile"))
            .and(query_param("chatId", "c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "msgId": "9" })))
            .expect(1)
            .mount(&server)
            .await;

        let file = FileUpload::from_bytes("report.txt", b"quarterly".to_vec()).mime("text/plain");
        bot_for(&server)
            .send_file("c", file, None, SendOptions::new())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains(r#"name="file""#));
        assert!(body.contains(r#"filename="report.txt""#));
        assert!(body.contains("quarterly"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        // Nothing listens on the discard port.
        let bot = HttpBot::new(HttpBotConfig::new(TOKEN).api_url("http://127.0.0.1:9")).unwrap();
        let err = bot.get_self().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.to_string().contains(TOKEN));
    }
}
