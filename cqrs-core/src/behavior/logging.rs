use crate::{
    context::AppContext,
    pipeline::{Behavior, Envelope, Next, PipelineResult},
};
use async_trait::async_trait;
use bon::Builder;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// 日志行为配置
#[derive(Builder, Clone, Copy, Debug)]
pub struct LoggingConfig {
    /// 超过该耗时的请求以 warn 级别记录
    #[builder(default = Duration::from_millis(500))]
    pub slow_threshold: Duration,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            slow_threshold: Duration::from_millis(500),
        }
    }
}

/// 日志行为：为每次分发开启 span，并在返回时记录结果与耗时（不改变结果）
#[derive(Default)]
pub struct LoggingBehavior {
    config: LoggingConfig,
}

impl LoggingBehavior {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Behavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, ctx: &AppContext, envelope: Envelope, next: Next<'_>) -> PipelineResult {
        let span = tracing::info_span!(
            "dispatch",
            request = envelope.name(),
            kind = %envelope.kind(),
            correlation_id = ctx.correlation_id().unwrap_or("-")
        );
        let slow_threshold = self.config.slow_threshold;

        async move {
            let started = Instant::now();
            tracing::debug!("executing request");

            let result = next.run(envelope).await;
            let elapsed = started.elapsed();
            let elapsed_ms = elapsed_millis(elapsed);
            let slow = elapsed >= slow_threshold;

            match &result {
                Ok(_) if slow => tracing::warn!(elapsed_ms, slow, "request executed slowly"),
                Ok(_) => tracing::debug!(elapsed_ms, "request executed successfully"),
                Err(f) if f.kind().is_client_error() && !slow => {
                    tracing::info!(elapsed_ms, kind = %f.kind(), error = %f, "request rejected")
                }
                Err(f) if f.kind().is_client_error() => {
                    tracing::warn!(
                        elapsed_ms,
                        slow,
                        kind = %f.kind(),
                        error = %f,
                        "request rejected slowly"
                    )
                }
                Err(f) => {
                    tracing::error!(
                        elapsed_ms,
                        slow,
                        kind = %f.kind(),
                        error = %f,
                        "request failed"
                    )
                }
            }

            result
        }
        .instrument(span)
        .await
    }
}

// 超出 u64 的耗时按上限记录
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::RequestBus;
    use crate::dispatcher::Dispatcher;
    use crate::error::{AppResult, Failure, FailureKind};
    use crate::handler::RequestHandler;
    use crate::query::Query;
    use crate::request::Request;
    use std::sync::Arc;

    struct Lookup(u32);

    impl Request for Lookup {
        const NAME: &'static str = "catalog.lookup";
        type Output = String;
    }
    impl Query for Lookup {}

    struct LookupHandler;

    #[async_trait]
    impl RequestHandler<Lookup> for LookupHandler {
        async fn handle(&self, _ctx: &AppContext, q: Lookup) -> AppResult<String> {
            match q.0 {
                0 => Err(Failure::not_found("item 0")),
                1 => Err(Failure::internal("storage offline")),
                n => Ok(format!("item {n}")),
            }
        }
    }

    fn dispatcher(config: LoggingConfig) -> Dispatcher {
        let mut builder = Dispatcher::builder();
        builder
            .behavior(Arc::new(LoggingBehavior::new(config)))
            .register_query::<Lookup, _>(Arc::new(LookupHandler))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(
            LoggingConfig::builder().build().slow_threshold,
            LoggingConfig::default().slow_threshold
        );
    }

    #[tokio::test]
    async fn results_pass_through_unchanged() {
        let d = dispatcher(LoggingConfig::default());
        let ctx = AppContext::builder().correlation_id("cor-1").build();

        assert_eq!(d.dispatch(&ctx, Lookup(7)).await, Ok("item 7".to_string()));
        assert_eq!(
            d.dispatch(&ctx, Lookup(0)).await.unwrap_err().kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            d.dispatch(&ctx, Lookup(1)).await.unwrap_err().kind(),
            FailureKind::Internal
        );
    }

    #[test]
    fn elapsed_millis_saturates() {
        assert_eq!(elapsed_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(elapsed_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn slow_failures_keep_their_kind() {
        let d = dispatcher(
            LoggingConfig::builder()
                .slow_threshold(Duration::ZERO)
                .build(),
        );
        let ctx = AppContext::default();
        assert_eq!(
            d.dispatch(&ctx, Lookup(0)).await.unwrap_err().kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            d.dispatch(&ctx, Lookup(1)).await.unwrap_err().kind(),
            FailureKind::Internal
        );
    }

    #[tokio::test]
    async fn slow_threshold_does_not_affect_outcome() {
        let d = dispatcher(
            LoggingConfig::builder()
                .slow_threshold(Duration::ZERO)
                .build(),
        );
        let out = d.dispatch(&AppContext::default(), Lookup(3)).await;
        assert_eq!(out, Ok("item 3".to_string()));
    }
}
