use crate::{context::AppContext, error::AppResult, request::Request};
use async_trait::async_trait;

/// 请求处理器：某一请求类型的唯一业务实现
#[async_trait]
pub trait RequestHandler<R>: Send + Sync
where
    R: Request,
{
    async fn handle(&self, ctx: &AppContext, request: R) -> AppResult<R::Output>;
}
