use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::{ProbeResult, ReadinessOutcome, ReadinessProbe};
use crate::services::clock::Clock;

/// 单次 HTTP 探测
pub trait Prober {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeResult>;
}

impl<P: Prober + ?Sized> Prober for &P {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeResult> {
        (**self).probe(url)
    }
}

/// reqwest 实现的 GET 探测
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("geostack-supervisor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        match self.client.get(url).send().await {
            Ok(response) => ProbeResult::Status(response.status().as_u16()),
            Err(e) => ProbeResult::Unreachable(e.to_string()),
        }
    }
}

/// 轮询直到返回 200 或超时
///
/// A probe is also made at the instant the timeout is reached, so a server
/// that comes up exactly at the deadline is reported ready. Failed probes are
/// never surfaced individually.
pub async fn wait_for<P: Prober, C: Clock>(
    prober: &P,
    clock: &C,
    probe: &ReadinessProbe,
) -> ReadinessOutcome {
    let start = clock.now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match prober.probe(&probe.url).await {
            ProbeResult::Status(200) => {
                let elapsed = clock.now().saturating_sub(start);
                log::info!("{} is ready after {:?} ({} probes)", probe.url, elapsed, attempts);
                return ReadinessOutcome::Ready { attempts, elapsed };
            }
            ProbeResult::Status(code) => {
                log::debug!("{} answered {}, not ready yet", probe.url, code);
            }
            ProbeResult::Unreachable(reason) => {
                log::debug!("{} unreachable: {}", probe.url, reason);
            }
        }

        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= probe.timeout {
            log::info!("{} not ready within {:?} ({} probes)", probe.url, probe.timeout, attempts);
            return ReadinessOutcome::TimedOut { attempts, elapsed };
        }

        clock.sleep(probe.interval).await;
    }
}
