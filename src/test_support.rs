use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use http::header::CONTENT_TYPE;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::config::{
    AnnotationKeys, Config, NetworkLatencyConfig, ProberConfig, StrategyConfig,
};
use crate::constants::{DEFAULT_SCHEDULER_NAME, PROBE_TARGET_ANNOTATION};
use crate::pod::{Container, LabelSelector, Pod, PodPhase};

pub const PROBER_NAMESPACE: &str = "monitoring";

/// Address nothing answers on; probes against it fail or time out.
pub const UNREACHABLE_PROBER_ADDR: &str = "10.255.255.1";

pub fn pod(name: &str) -> Pod {
    let mut pod = Pod::new("default", name);
    pod.scheduler_name = DEFAULT_SCHEDULER_NAME.to_owned();
    pod
}

pub fn pod_with_images(name: &str, images: &[&str]) -> Pod {
    let mut pod = pod(name);
    pod.containers = images
        .iter()
        .enumerate()
        .map(|(i, image)| Container {
            name: format!("container-{i}"),
            image: (*image).to_owned(),
        })
        .collect();
    pod
}

pub fn pod_with_probe_target(name: &str, target: &str) -> Pod {
    let mut pod = pod(name);
    pod.annotations
        .insert(PROBE_TARGET_ANNOTATION.to_owned(), target.to_owned());
    pod
}

pub fn prober_selector() -> LabelSelector {
    LabelSelector::new([("app", "prober")])
}

pub fn prober_pod(node: &str, ip: &str) -> Pod {
    let mut pod = Pod::new(PROBER_NAMESPACE, format!("prober-{node}"));
    pod.labels.insert("app".to_owned(), "prober".to_owned());
    pod.node_name = Some(node.to_owned());
    pod.phase = PodPhase::Running;
    pod.pod_ip = Some(ip.to_owned());
    pod
}

pub fn config(strategy: StrategyConfig) -> Config {
    Config {
        scheduler_name: DEFAULT_SCHEDULER_NAME.to_owned(),
        resync_interval_secs: 15,
        strategy,
        seed: Some(7),
    }
}

pub fn network_config(port: u16, timeout_ms: u64, quota: Option<i64>) -> Config {
    config(StrategyConfig::NetworkLatency(NetworkLatencyConfig {
        prober: ProberConfig {
            selector: prober_selector(),
            namespace: PROBER_NAMESPACE.to_owned(),
            port,
            timeout_ms,
            module: "http_2xx".to_owned(),
        },
        annotations: AnnotationKeys::default(),
        quota,
    }))
}

/// How a fake prober answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    /// Sends the body in the given pieces with chunked transfer encoding.
    Chunked(Vec<String>),
    /// Accepts the request and never answers.
    Hang,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_owned())
    }
}

/// A prober agent answering every request with the same canned reply.
pub struct FakeProber {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeProber {
    pub async fn spawn(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };

                let reply = reply.clone();
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let svc = service_fn(move |req: Request<Incoming>| {
                        recorded.lock().unwrap().push(format!(
                            "{} {} {:?}",
                            req.method(),
                            req.uri(),
                            req.version()
                        ));
                        respond(reply.clone())
                    });

                    let _ = http1::Builder::new().serve_connection(io, svc).await;
                });
            }
        });

        Self { port, requests }
    }

    /// Requests received so far, e.g. `GET /probe?... HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn respond(reply: Reply) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
    let response = match reply {
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Response::new(Empty::new().boxed())
        }
        Reply::Status(code, body) => Response::builder()
            .status(code)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Full::new(Bytes::from(body)).boxed())
            .unwrap(),
        Reply::Chunked(chunks) => {
            let frames = stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, Infallible>(Frame::data(Bytes::from(chunk)))),
            );
            Response::builder()
                .status(200)
                .body(StreamBody::new(frames).boxed())
                .unwrap()
        }
    };

    Ok(response)
}

pub const EXPOSITION_BODY: &str = "\
# HELP probe_dns_lookup_time_seconds Returns the time taken for probe dns lookup in seconds
# TYPE probe_dns_lookup_time_seconds gauge
probe_dns_lookup_time_seconds 0.0012
# HELP probe_duration_seconds Returns how long the probe took to complete in seconds
# TYPE probe_duration_seconds gauge
probe_duration_seconds 0.42
# HELP probe_success Displays whether or not the probe was a success
# TYPE probe_success gauge
probe_success 1
";
