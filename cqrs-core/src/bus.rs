use crate::{context::AppContext, error::AppResult, request::Request};
use async_trait::async_trait;

/// 请求总线（Request Bus）
///
/// - 传输层（HTTP、CLI、消息消费者）唯一依赖的分发入口；
/// - 根据请求的具体类型路由到对应处理器，并返回与请求关联的 `Output`；
/// - 该 trait 带有泛型方法，通常以具体实现类型注入使用。
#[async_trait]
pub trait RequestBus: Send + Sync {
    /// 分发请求到对应处理器
    ///
    /// - `ctx`：请求级上下文（链路追踪、幂等键、取消令牌）
    /// - `request`：具体请求实例，按值移交
    async fn dispatch<R: Request>(&self, ctx: &AppContext, request: R) -> AppResult<R::Output>;
}
