use bon::Builder;
use tokio_util::sync::CancellationToken;

/// 应用层上下文（Application Context）
///
/// 承载一次分发（命令/查询）所需的横切信息，是行为与处理器之间共享请求级数据的唯一通道：
/// - 关联追踪 `correlation_id`、因果链 `causation_id`、执行者 `actor_id`；
/// - 幂等键 `idempotency_key`：由基础设施决定是否参与幂等；
/// - 取消令牌 `cancellation`：取消后，尚未执行的阶段不再运行，已获取资源的行为按失败路径释放。
///
/// 典型用法：
/// ```rust
/// use cqrs_core::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .correlation_id("cor-123")
///     .actor_id("u-1")
///     .idempotency_key("idem-xyz")
///     .build();
/// assert_eq!(ctx.correlation_id(), Some("cor-123"));
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Builder, Clone, Debug, Default)]
pub struct AppContext {
    #[builder(into)]
    correlation_id: Option<String>,
    #[builder(into)]
    causation_id: Option<String>,
    #[builder(into)]
    actor_id: Option<String>,
    #[builder(into)]
    idempotency_key: Option<String>,
    #[builder(default)]
    cancellation: CancellationToken,
}

impl AppContext {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
