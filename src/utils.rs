use crate::error::{MirrorError, Result};
use crate::types::{Mirror, PingResult};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// 构建带有超时设置的 HTTP Client, 防止慢源一直挂起
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MirrorError::PingFailed {
            url: String::new(),
            reason: e.to_string(),
        })
}

/// 单个源测速逻辑, 返回毫秒数
pub async fn ping_mirror(client: &Client, mirror: &Mirror) -> Result<u64> {
    let url = mirror.ping.trim();
    let start = Instant::now();

    let fail = |reason: String| MirrorError::PingFailed {
        url: url.to_string(),
        reason,
    };

    // 使用 HEAD 请求而不是 GET，只获取元数据，速度更快且省流量
    // 只要收到响应就算成功 (405/404 也是一次完整的往返)
    let resp = client.head(url).send().await.map_err(|e| {
        if e.is_timeout() {
            fail("timeout".to_string())
        } else {
            fail(e.to_string())
        }
    })?;

    let latency_ms = start.elapsed().as_millis() as u64;
    debug!(mirror = %mirror.name, url, status = %resp.status(), latency_ms, "ping ok");
    Ok(latency_ms)
}

/// 并发测试所有镜像源的延迟
///
/// 结果按延迟从小到大排序, 失败的排在最后
pub async fn benchmark_mirrors(client: &Client, mirrors: Vec<Mirror>) -> Vec<PingResult> {
    let pb = ProgressBar::new(mirrors.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {percent}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("|| "),
    );
    pb.set_message("Testing...");

    let tasks = mirrors.into_iter().map(|m| {
        let pb = pb.clone();
        async move {
            let latency = ping_mirror(client, &m).await;
            pb.inc(1);
            PingResult { mirror: m, latency }
        }
    });

    let mut results = futures::future::join_all(tasks).await;

    pb.finish_with_message("Testing completed.");

    results.sort_by_key(|r| match &r.latency {
        Ok(ms) => *ms,
        Err(_) => u64::MAX,
    });

    results
}
