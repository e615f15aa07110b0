//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use nasemu_errors::{AcquisitionError, Error};
    use nasemu_events::{channel, AcquisitionEvent, AppEvent};
    use nasemu_net::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_stream_sends_browser_headers() {
        let server = MockServer::start_async().await;
        let content = b"spk body";

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/pkg.spk")
                    .header("user-agent", BROWSER_USER_AGENT)
                    .header("dnt", "1")
                    .header("pragma", "no-cache");
                then.status(200).body(content);
            })
            .await;

        let client = NetClient::with_defaults().unwrap();
        let (tx, mut rx) = channel();
        let url = server.url("/pkg.spk");

        let mut reader = open_stream(&client, &url, Some(&tx)).await.unwrap();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, content);
        assert_eq!(reader.total(), Some(content.len() as u64));
        assert_eq!(reader.counter().get(), content.len() as u64);

        let mut saw_started = false;
        let mut saw_progress = false;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::Acquisition(AcquisitionEvent::Started { total_bytes, .. }) => {
                    assert_eq!(total_bytes, Some(content.len() as u64));
                    saw_started = true;
                }
                AppEvent::Acquisition(AcquisitionEvent::Progress { .. }) => saw_progress = true,
                _ => {}
            }
        }
        assert!(saw_started);
        assert!(saw_progress);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.spk");
                then.status(404);
            })
            .await;

        let client = NetClient::with_defaults().unwrap();
        let result = open_stream(&client, &server.url("/missing.spk"), None).await;

        assert!(matches!(
            result,
            Err(Error::Acquisition(AcquisitionError::HttpStatus { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = NetClient::with_defaults().unwrap();
        // Port 9 (discard) is not expected to accept connections on loopback
        let result = open_stream(&client, "http://127.0.0.1:9/pkg.spk", None).await;

        assert!(matches!(
            result,
            Err(Error::Acquisition(AcquisitionError::Transport { .. }))
        ));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let config = NetConfig {
            headers: vec![("bad header".to_string(), "x".to_string())],
            ..NetConfig::default()
        };
        assert!(matches!(
            NetClient::new(&config),
            Err(Error::Acquisition(AcquisitionError::ClientSetup(_)))
        ));
    }
}
