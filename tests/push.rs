use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::patch,
    Router,
};
use metrics_exporter_falcon::{
    CounterType,
    FalconMetrics,
    FalconReporter,
    FalconSender,
    HttpPushTransport,
    MetricValue,
    Registry,
    ReporterConfig,
    SenderConfig,
    Transport,
};
use std::{
    io,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc;

#[derive(Clone)]
struct Agent {
    tx: mpsc::UnboundedSender<Bytes>,
    status: StatusCode,
    delay: Duration,
}

async fn push(State(agent): State<Agent>, body: Bytes) -> (StatusCode, &'static str) {
    let _ = agent.tx.send(body);
    tokio::time::sleep(agent.delay).await;
    (agent.status, "agent says no")
}

/// Runs a fake Open-Falcon agent on a random local port.
async fn agent(status: StatusCode, delay: Duration) -> (String, mpsc::UnboundedReceiver<Bytes>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/v1/push", patch(push))
        .with_state(Agent { tx, status, delay });

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> FalconMetrics {
    let body = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no push request received")
        .unwrap();
    FalconMetrics::decode(&body).unwrap()
}

#[test_log::test(tokio::test)]
async fn reporter_pushes_registry_contents() {
    let (base_url, mut rx) = agent(StatusCode::OK, Duration::ZERO).await;

    let registry = Arc::new(Registry::new());
    let sender = FalconSender::new(SenderConfig::new(&base_url)).unwrap();
    let reporter = FalconReporter::new(
        registry.clone(),
        sender,
        ReporterConfig {
            prefix: Some("svc".into()),
            tags: "idc=lg,loc=beijing".into(),
            step: 60,
            ..Default::default()
        },
    );

    registry.counter("requests").increment(3);
    registry.gauge("load").set(0.5);
    registry.meter("events").mark(10);
    registry.timer("query").update(Duration::from_secs(2));
    reporter.report();

    let metrics = recv(&mut rx).await;
    assert_eq!(metrics.len(), 1 + 1 + 5 + 15);
    assert!(metrics.iter().all(|m| m.endpoint() == "svc" && m.step() == 60));

    let tagged = metrics
        .iter()
        .filter(|m| m.tags() == "idc=lg,loc=beijing")
        .map(|m| m.metric())
        .collect::<std::collections::BTreeSet<_>>();
    assert_eq!(tagged, std::collections::BTreeSet::from(["svc.load.value", "svc.requests.count"]));

    let timestamps = metrics.iter().map(|m| m.timestamp()).collect::<std::collections::HashSet<_>>();
    assert_eq!(timestamps.len(), 1);

    let requests = metrics.iter().find(|m| m.metric() == "svc.requests.count").unwrap();
    assert_eq!(requests.value(), &MetricValue::UInt(3));
    assert_eq!(requests.counter_type(), CounterType::Gauge);

    let max = metrics.iter().find(|m| m.metric() == "svc.query.max").unwrap();
    let max = max.value().as_f64().unwrap();
    assert!((max - 2.0).abs() < 0.002, "{max}");

    reporter.stop();
}

#[test_log::test(tokio::test)]
async fn error_status_is_reported_by_the_transport() {
    let (base_url, mut rx) = agent(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
    let transport = HttpPushTransport::new(&SenderConfig::new(&base_url)).unwrap();

    let err = transport.send(Bytes::from_static(b"[]")).await.unwrap_err();
    assert!(err.to_string().contains("(500) agent says no"), "{err}");
    assert!(rx.recv().await.is_some());
}

#[test_log::test(tokio::test)]
async fn error_status_does_not_reach_the_caller() {
    let (base_url, mut rx) = agent(StatusCode::BAD_REQUEST, Duration::ZERO).await;
    let registry = Arc::new(Registry::new());
    let reporter = FalconReporter::new(
        registry.clone(),
        FalconSender::new(SenderConfig::new(&base_url)).unwrap(),
        ReporterConfig::default(),
    );

    registry.counter("a").increment(1);
    reporter.report();
    reporter.report();
    assert_eq!(recv(&mut rx).await.len(), 1);
    assert_eq!(recv(&mut rx).await.len(), 1);
}

#[test_log::test(tokio::test)]
async fn slow_agent_times_out() {
    let (base_url, _rx) = agent(StatusCode::OK, Duration::from_secs(3)).await;
    let config = SenderConfig::new(&base_url).read_timeout(Duration::from_millis(200));
    let transport = HttpPushTransport::new(&config).unwrap();

    let err = transport.send(Bytes::from_static(b"[]")).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::TimedOut, "{err:?}");
}

#[test_log::test(tokio::test)]
async fn unreachable_agent_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpPushTransport::new(&SenderConfig::new(format!("http://{addr}"))).unwrap();
    assert!(transport.send(Bytes::from_static(b"[]")).await.is_err());
}

#[test_log::test(tokio::test)]
async fn post_can_be_configured() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/v1/push",
        axum::routing::post(move |body: Bytes| async move {
            let _ = tx.send(body);
            StatusCode::OK
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let config = SenderConfig::new(format!("http://{addr}")).method(reqwest::Method::POST);
    let transport = HttpPushTransport::new(&config).unwrap();
    transport.send(Bytes::from_static(b"[]")).await.unwrap();
    assert_eq!(recv(&mut rx).await.len(), 0);
}
