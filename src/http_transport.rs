use bytes::Bytes;
use futures::future::BoxFuture;
use metrics_exporter_falcon_core::Result;
use reqwest::{
    header,
    Client,
    Method,
    StatusCode,
    Url,
};
use std::{
    io,
    sync::{
        Mutex,
        PoisonError,
    },
    time::Duration,
};

/// Default connect timeout.
pub const CONN_TIMEOUT_DEFAULT: Duration = Duration::from_millis(5000);
/// Default read timeout.
pub const READ_TIMEOUT_DEFAULT: Duration = Duration::from_millis(5000);
/// Default advisory batch size.
pub const DEFAULT_BATCH_SIZE_LIMIT: usize = 10;

/// Delivers an encoded push body somewhere.
pub trait Transport: Send + Sync + 'static {
    /// Send one JSON body. The returned future resolves once the remote side
    /// has answered.
    fn send(&self, body: Bytes) -> BoxFuture<'static, io::Result<()>>;

    /// Release the resources held by the transport. Only called once.
    fn close(&self) {}
}

/// Where and how to push metrics.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Base url of the Open-Falcon agent or transfer, e.g. `http://127.0.0.1:1988`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Method of the push request. The agent accepts PATCH and POST.
    pub method: Method,
    /// Advisory only, requests are never split.
    pub batch_size_limit: usize,
}

impl SenderConfig {
    pub fn new(base_url: impl ToString) -> Self {
        SenderConfig {
            base_url: base_url.to_string(),
            connect_timeout: CONN_TIMEOUT_DEFAULT,
            read_timeout: READ_TIMEOUT_DEFAULT,
            method: Method::PATCH,
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn batch_size_limit(mut self, limit: usize) -> Self {
        self.batch_size_limit = limit;
        self
    }

    /// The push url, `<base_url>/v1/push`.
    pub fn push_url(&self) -> Result<Url> {
        let url = format!("{}/v1/push", self.base_url.trim_end_matches('/'));
        Url::parse(&url).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}

/// Pushes bodies to `<base_url>/v1/push` with a long lived HTTP client.
#[derive(Debug)]
pub struct HttpPushTransport {
    client: Mutex<Option<Client>>,
    url: Url,
    method: Method,
}

impl HttpPushTransport {
    pub fn new(config: &SenderConfig) -> Result<Self> {
        let url = config.push_url()?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(err)?;
        debug!(%url, method = %config.method, "created open-falcon transport");
        Ok(HttpPushTransport {
            client: Mutex::new(Some(client)),
            url,
            method: config.method.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for HttpPushTransport {
    fn send(&self, body: Bytes) -> BoxFuture<'static, io::Result<()>> {
        let client = self.client.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let url = self.url.clone();
        let method = self.method.clone();

        Box::pin(async move {
            let Some(client) = client else {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "transport is closed"));
            };

            let res = client
                .request(method, url)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(err)?;

            let status = res.status();
            if status != StatusCode::OK {
                let text = res.text().await.map_err(|err| err.to_string()).unwrap_or_default();
                return Err(io::Error::other(format!(
                    "send to open-falcon endpoint failed: ({}) {text}",
                    status.as_u16()
                )));
            }

            Ok(())
        })
    }

    fn close(&self) {
        // in-flight requests keep their own handle to the connection pool
        self.client.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

fn err(err: reqwest::Error) -> io::Error {
    let kind = if err.is_timeout() {
        io::ErrorKind::TimedOut
    } else if err.is_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, err)
}
