use std::time::Duration;

use reqwest::{header as ReqwestHeaders, Client as ReqwestClient, Proxy, StatusCode};

use faultline_core::faultline_debug;

use super::thread::TransportThread;
use crate::{ClientOptions, Delivery, Envelope, SendOutcome, Transport};

/// A [`Transport`] that sends envelopes via the [`reqwest`] library.
///
/// When the `transport` feature is enabled this will currently be the
/// default transport. This is separately enabled by the `reqwest` feature
/// flag.
///
/// [`reqwest`]: https://crates.io/crates/reqwest
pub struct ReqwestHttpTransport {
    thread: TransportThread,
}

impl ReqwestHttpTransport {
    /// Creates a new transport.
    pub fn new(options: &ClientOptions) -> Self {
        Self::new_internal(options, None)
    }

    /// Creates a new transport that uses the specified [`ReqwestClient`].
    pub fn with_client(options: &ClientOptions, client: ReqwestClient) -> Self {
        Self::new_internal(options, Some(client))
    }

    fn new_internal(options: &ClientOptions, client: Option<ReqwestClient>) -> Self {
        let client = client.unwrap_or_else(|| {
            let mut builder = ReqwestClient::builder().timeout(options.http_timeout);
            if let Some(url) = options.http_proxy.as_ref() {
                match Proxy::http(url.as_ref()) {
                    Ok(proxy) => builder = builder.proxy(proxy),
                    Err(err) => {
                        faultline_debug!("invalid http proxy: {}", err);
                    }
                }
            }
            if let Some(url) = options.https_proxy.as_ref() {
                match Proxy::https(url.as_ref()) {
                    Ok(proxy) => builder = builder.proxy(proxy),
                    Err(err) => {
                        faultline_debug!("invalid https proxy: {}", err);
                    }
                }
            }
            builder.build().unwrap_or_else(|_| ReqwestClient::new())
        });

        let dsn = options.dsn.as_ref().expect("transport requires a DSN");
        let user_agent = options.user_agent.clone();
        let auth = dsn.to_auth(Some(user_agent.as_ref())).to_string();
        let url = dsn.envelope_api_url().to_string();

        let thread = TransportThread::new(options.max_queue_size, move |envelope, mut rl| {
            let mut body = Vec::new();
            let request = match envelope.to_writer(&mut body) {
                Ok(()) => Some(
                    client
                        .post(&url)
                        .header("X-Faultline-Auth", &auth)
                        .body(body),
                ),
                Err(err) => {
                    faultline_debug!("failed to serialize envelope: {}", err);
                    None
                }
            };

            // NOTE: because of lifetime issues, building the request has to
            // happen outside of the async block.
            async move {
                let Some(request) = request else {
                    return (rl, SendOutcome::Invalid);
                };

                match request.send().await {
                    Ok(response) => {
                        let status = response.status();
                        let headers = response.headers();
                        let retry_after = headers
                            .get(ReqwestHeaders::RETRY_AFTER)
                            .and_then(|x| x.to_str().ok())
                            .map(str::to_owned);
                        let rate_limits = headers
                            .get("x-faultline-rate-limits")
                            .and_then(|x| x.to_str().ok())
                            .map(str::to_owned);

                        // the structured per-category form wins over the
                        // blanket Retry-After
                        if let Some(ref header) = rate_limits {
                            rl.update_from_rate_limits(header);
                        }

                        let outcome = if status == StatusCode::TOO_MANY_REQUESTS {
                            match (&rate_limits, &retry_after) {
                                (None, Some(header)) => rl.update_from_retry_after(header),
                                (None, None) => rl.update_from_retry_after(""),
                                _ => {}
                            }
                            SendOutcome::RateLimited
                        } else if status.is_server_error() {
                            if rate_limits.is_some() {
                                SendOutcome::RateLimited
                            } else if let Some(ref header) = retry_after {
                                rl.update_from_retry_after(header);
                                SendOutcome::RateLimited
                            } else {
                                faultline_debug!("server failed to take envelope: {}", status);
                                SendOutcome::Failed
                            }
                        } else if status.is_client_error() {
                            faultline_debug!("server rejected envelope: {}", status);
                            SendOutcome::Invalid
                        } else if status.is_success() {
                            SendOutcome::Success
                        } else {
                            faultline_debug!("unexpected response status: {}", status);
                            SendOutcome::Failed
                        };
                        (rl, outcome)
                    }
                    Err(err) => {
                        faultline_debug!("failed to send envelope: {}", err);
                        (rl, SendOutcome::Failed)
                    }
                }
            }
        });

        Self { thread }
    }
}

impl Transport for ReqwestHttpTransport {
    fn send_envelope(&self, envelope: Envelope) -> Delivery {
        self.thread.send(envelope)
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.thread.flush(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}
