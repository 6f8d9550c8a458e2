use crate::{
    HttpPushTransport,
    SenderConfig,
    Transport,
};
use bytes::Bytes;
use metrics_exporter_falcon_core::{
    FalconMetrics,
    Result,
};
use std::sync::{
    atomic::{
        AtomicBool,
        AtomicUsize,
        Ordering,
    },
    Arc,
};

/// Sends batches of records to one endpoint without waiting for the result.
///
/// Delivery failures are logged and the batch is dropped. Nothing is retried
/// and no error ever reaches the caller, so a broken monitoring backend cannot
/// affect the measured application.
#[derive(Debug)]
pub struct FalconSender<T = HttpPushTransport> {
    transport: Arc<T>,
    closed: AtomicBool,
    batch_size_limit: AtomicUsize,
}

impl FalconSender<HttpPushTransport> {
    /// Create a sender pushing over HTTP as configured.
    pub fn new(config: SenderConfig) -> Result<Self> {
        let transport = HttpPushTransport::new(&config)?;
        let sender = FalconSender::with_transport(transport);
        sender.set_batch_size_limit(config.batch_size_limit);
        Ok(sender)
    }
}

impl<T: Transport> FalconSender<T> {
    pub fn with_transport(transport: T) -> Self {
        FalconSender {
            transport: Arc::new(transport),
            closed: AtomicBool::new(false),
            batch_size_limit: AtomicUsize::new(crate::DEFAULT_BATCH_SIZE_LIMIT),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The configured batch size. It is kept for reference only, every call
    /// to [`FalconSender::send`] results in exactly one request.
    pub fn batch_size_limit(&self) -> usize {
        self.batch_size_limit.load(Ordering::Relaxed)
    }

    pub fn set_batch_size_limit(&self, limit: usize) {
        self.batch_size_limit.store(limit, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Submit `metrics` in a single request on the current tokio runtime and
    /// return immediately. Empty batches are not sent.
    pub fn send(&self, metrics: &FalconMetrics) {
        let n = metrics.len();
        if n == 0 {
            trace!("no metrics to send");
            return;
        }

        if self.is_closed() {
            warn!(%n, "open-falcon sender is closed, dropping metrics");
            return;
        }

        let body = match metrics.encode() {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                error!(?err, "failed to serialize metrics, dropping {n} metrics");
                return;
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(%err, "no runtime to send metrics on, dropping {n} metrics");
                return;
            }
        };

        let transport = self.transport.clone();
        runtime.spawn(async move {
            match transport.send(body).await {
                Ok(()) => trace!(%n, "sent metrics"),
                Err(err) => error!(?err, "send to open-falcon endpoint failed, lost {n} metrics"),
            }
        });
    }

    /// Release the transport. Only the first call has an effect.
    pub fn close(&self) {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        debug!(%was_closed, "closing open-falcon sender");
        if !was_closed {
            self.transport.close();
        }
    }
}
