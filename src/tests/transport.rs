// Credential injection and request release in the Transport decorator.

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use http::Method;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use reqwest::{Request, Url};

    use crate::cache::token::Token;
    use crate::error::Error;
    use crate::sources::StaticTokenSource;
    use crate::tests::common::{build_reqwest_client, tracked_body, CountingSource};
    use crate::transport::redact::REDACTED;
    use crate::transport::Transport;

    fn request_with_tracked_body(url: &str, drops: Arc<AtomicUsize>) -> Request {
        let mut request = Request::new(Method::POST, Url::parse(url).unwrap());
        *request.body_mut() = Some(tracked_body(drops));
        request
    }

    #[tokio::test]
    async fn missing_source_fails_and_releases_body() {
        let drops = Arc::new(AtomicUsize::new(0));
        let request = request_with_tracked_body("http://127.0.0.1:9/cgi-bin/x", drops.clone());

        let err = Transport::default().round_trip(request).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_source_releases_body_without_sending() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/cgi-bin/x");
                then.status(200);
            })
            .await;

        let drops = Arc::new(AtomicUsize::new(0));
        let request = request_with_tracked_body(&server.url("/cgi-bin/x"), drops.clone());
        let upstream = Arc::new(CountingSource::new().failing());
        let transport = Transport::new(upstream.clone()).with_base(build_reqwest_client());

        let err = transport.round_trip(request).await.unwrap_err();
        assert!(matches!(err, Error::MissingAccessToken), "{err:?}");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(upstream.calls(), 1);
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn access_token_is_added_to_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cgi-bin/user/get")
                    .query_param("userid", "zhangsan")
                    .query_param("access_token", "tok-123");
                then.status(200).body(r#"{"errcode":0}"#);
            })
            .await;

        let transport = Transport::new(StaticTokenSource::shared(Token::perpetual("tok-123")))
            .with_base(build_reqwest_client());
        let url = Url::parse(&server.url("/cgi-bin/user/get?userid=zhangsan")).unwrap();

        let response = transport.round_trip(Request::new(Method::GET, url)).await.unwrap();
        assert!(response.status().is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_errors_are_redacted() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = Transport::new(StaticTokenSource::shared(Token::perpetual("very-secret")))
            .with_base(build_reqwest_client());
        let url = Url::parse(&format!("http://{addr}/cgi-bin/x")).unwrap();

        match transport.round_trip(Request::new(Method::GET, url)).await.unwrap_err() {
            Error::Http(e) => {
                let url = e.url().expect("error url");
                assert!(!url.as_str().contains("very-secret"), "{url}");
                assert!(url.as_str().contains(&format!("access_token={REDACTED}")), "{url}");
                assert!(!e.to_string().contains("very-secret"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
