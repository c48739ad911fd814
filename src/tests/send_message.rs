// End to end message sending: corp token endpoint and message API on one
// mock server, driven through Client::message().send().

#[cfg(test)]
mod test {
    use httpmock::Method::POST;
    use httpmock::{Mock, MockServer};
    use serde_json::json;

    use crate::api::client::{Client, DEFAULT_USER_AGENT};
    use crate::api::message::{Message, SendOptions, Text, TextCard};
    use crate::api::target::TargetSet;
    use crate::error::Error;
    use crate::sources::corp;
    use crate::tests::common::test_context;
    use crate::transport::redact::REDACTED;

    const AGENT_ID: i64 = 1000005;
    const SEND_PATH: &str = "/cgi-bin/message/send";

    async fn mock_token<'a>(server: &'a MockServer) -> Mock<'a> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/cgi-bin/gettoken").query_param("corpid", "ww1");
                then.status(200).json_body(json!({"errcode": 0, "errmsg": "ok", "access_token": "tok", "expires_in": 7200}));
            })
            .await
    }

    fn client(server: &MockServer) -> Client {
        let ctx = test_context();
        let transport = corp::Config::new("ww1", "s3cret")
            .with_token_url(server.url("/cgi-bin/gettoken"))
            .transport(&ctx);
        Client::new(transport)
            .with_base_url(&format!("{}/", server.base_url()))
            .unwrap()
    }

    fn users(ids: &[&str]) -> TargetSet {
        let mut targets = TargetSet::new();
        for id in ids {
            targets.add_user(*id);
        }
        targets
    }

    #[tokio::test]
    async fn text_message_is_sent_and_invalid_targets_decoded() {
        let server = MockServer::start_async().await;
        let token = mock_token(&server).await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(SEND_PATH)
                    .query_param("access_token", "tok")
                    .header("user-agent", DEFAULT_USER_AGENT)
                    .json_body(json!({
                        "touser": "u1|u2",
                        "toparty": "2",
                        "agentid": AGENT_ID,
                        "msgtype": "text",
                        "text": {"content": "hello"},
                    }));
                then.status(200).json_body(json!({
                    "errcode": 0,
                    "errmsg": "ok",
                    "invaliduser": "u2",
                    "invalidparty": "",
                    "invalidtag": "",
                }));
            })
            .await;

        let mut targets = users(&["u1", "u2"]);
        targets.add_party(2);
        let result = client(&server)
            .message()
            .send(&test_context(), AGENT_ID, &targets, &Text::new("hello").into(), SendOptions::default())
            .await
            .unwrap();

        token.assert_async().await;
        send.assert_async().await;
        assert_eq!(result.invalid_targets.users().as_slice(), &["u2".to_owned()]);
        assert!(result.invalid_targets.parties().is_empty());
        assert!(result.invalid_targets.tags().is_empty());
    }

    #[tokio::test]
    async fn token_is_fetched_once_for_several_sends() {
        let server = MockServer::start_async().await;
        let token = mock_token(&server).await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST).path(SEND_PATH).query_param("access_token", "tok");
                then.status(200).json_body(json!({"errcode": 0, "errmsg": "ok"}));
            })
            .await;

        let client = client(&server);
        let card: Message = TextCard {
            url: "https://example.com/approve".into(),
            title: "Approval".into(),
            description: "pending".into(),
            button_text: "Open".into(),
        }
        .into();
        for _ in 0..3 {
            let result = client
                .message()
                .send(&test_context(), AGENT_ID, &users(&["u1"]), &card, SendOptions { safe: true })
                .await
                .unwrap();
            assert!(result.invalid_targets.is_empty());
        }

        token.assert_hits_async(1).await;
        send.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn canceled_send_leaves_client_usable() {
        let server = MockServer::start_async().await;
        let token = mock_token(&server).await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST).path(SEND_PATH).query_param("access_token", "tok");
                then.status(200).json_body(json!({"errcode": 0, "errmsg": "ok"}));
            })
            .await;

        let client = client(&server);
        let message: Message = Text::new("hello").into();

        let canceled = test_context();
        canceled.cancel();
        let err = client
            .message()
            .send(&canceled, AGENT_ID, &users(&["u1"]), &message, SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Canceled), "{err:?}");
        token.assert_hits_async(0).await;

        let result = client
            .message()
            .send(&test_context(), AGENT_ID, &users(&["u1"]), &message, SendOptions::default())
            .await
            .unwrap();
        assert!(result.invalid_targets.is_empty());
        token.assert_hits_async(1).await;
        send.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_request() {
        let server = MockServer::start_async().await;
        let token = mock_token(&server).await;
        let client = client(&server);
        let message: Message = Text::new("hello").into();

        let err = client
            .message()
            .send(&test_context(), AGENT_ID, &TargetSet::new(), &message, SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err:?}");

        let err = client
            .message()
            .send(&test_context(), 0, &users(&["u1"]), &message, SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err:?}");

        token.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn api_error_envelope_is_surfaced_redacted() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(SEND_PATH);
                then.status(200).json_body(json!({"errcode": 81013, "errmsg": "user & party & tag all invalid"}));
            })
            .await;

        let err = client(&server)
            .message()
            .send(&test_context(), AGENT_ID, &users(&["ghost"]), &Text::new("hi").into(), SendOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.api_code(), Some(81013));
        let rendered = err.to_string();
        assert!(rendered.contains(&format!("access_token={REDACTED}")), "{rendered}");
        assert!(!rendered.contains("access_token=tok"), "{rendered}");
        match err {
            Error::Api(e) => {
                assert_eq!(e.http_code, 200);
                assert_eq!(e.message, "user & party & tag all invalid");
                assert!(e.body.contains("81013"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_failure_keeps_status_and_body() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(SEND_PATH);
                then.status(502).body("bad gateway");
            })
            .await;

        let err = client(&server)
            .message()
            .send(&test_context(), AGENT_ID, &users(&["u1"]), &Text::new("hi").into(), SendOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::Api(e) => {
                assert_eq!(e.http_code, 502);
                assert_eq!(e.code, 0);
                assert_eq!(e.body, "bad gateway");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_failure_stops_the_send() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/cgi-bin/gettoken");
                then.status(200).json_body(json!({"errcode": 40013, "errmsg": "invalid corpid"}));
            })
            .await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST).path(SEND_PATH);
                then.status(200).json_body(json!({"errcode": 0}));
            })
            .await;

        let err = client(&server)
            .message()
            .send(&test_context(), AGENT_ID, &users(&["u1"]), &Text::new("hi").into(), SendOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Retrieve(_)), "{err:?}");
        assert_eq!(err.api_code(), Some(40013));
        send.assert_hits_async(0).await;
    }
}
