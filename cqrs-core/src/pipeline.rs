//! 行为管道（Behavior Pipeline）
//!
//! 每个请求类型在构建期得到一条固定的行为链 `[B1, B2, ..., Bn] -> Handler`：
//! - 进入时按声明顺序执行，返回时按相反顺序展开（LIFO）；
//! - 任一行为可不调用 `Next` 直接返回 `Err(Failure)` 以短路后续阶段；
//! - 请求以 `Envelope` 的形式按值在阶段之间移交，结果以类型擦除的 `BoxAnySend` 回传。
//!
use crate::{
    context::AppContext,
    error::Failure,
    request::{Request, RequestKind},
};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::{Any, TypeId};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxAnySend = Box<dyn Any + Send>;

/// 管道各阶段的统一返回值
pub type PipelineResult = Result<BoxAnySend, Failure>;

pub(crate) type HandlerFuture<'a> = Pin<Box<dyn Future<Output = PipelineResult> + Send + 'a>>;

pub(crate) type HandlerFn =
    Arc<dyn for<'a> Fn(Envelope, &'a AppContext) -> HandlerFuture<'a> + Send + Sync>;

// 通过显式的高阶约束推导闭包签名，使返回的 future 可以借用 ctx
pub(crate) fn handler_fn<F>(f: F) -> HandlerFn
where
    F: for<'a> Fn(Envelope, &'a AppContext) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 类型擦除后的请求
///
/// 行为通过 `downcast_ref` 读取具体请求；所有权随 `Next::run` 移交给下一阶段。
pub struct Envelope {
    name: &'static str,
    kind: RequestKind,
    type_id: TypeId,
    payload: Box<dyn Any + Send + Sync>,
}

impl Envelope {
    pub(crate) fn new<R: Request>(kind: RequestKind, request: R) -> Self {
        Self {
            name: R::NAME,
            kind,
            type_id: TypeId::of::<R>(),
            payload: Box::new(request),
        }
    }

    /// 请求的稳定名称（`Request::NAME`）
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn is<R: Request>(&self) -> bool {
        self.type_id == TypeId::of::<R>()
    }

    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.payload.downcast_ref::<R>()
    }

    pub(crate) fn into_inner<R: Request>(self) -> Result<R, Self> {
        let Self {
            name,
            kind,
            type_id,
            payload,
        } = self;

        payload.downcast::<R>().map(|r| *r).map_err(|payload| Self {
            name,
            kind,
            type_id,
            payload,
        })
    }
}

/// 横切行为（Behavior）
///
/// 可以：
/// - 调用 `next.run(envelope)` 并原样或改写后返回结果；
/// - 不调用 `next` 直接返回失败（短路）；
/// - 在 `next` 返回后观察结果，并在所有退出路径上释放自己获取的资源。
#[async_trait]
pub trait Behavior: Send + Sync {
    /// 行为名称（用于日志）
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, ctx: &AppContext, envelope: Envelope, next: Next<'_>) -> PipelineResult;
}

/// 续延：代表“执行管道的剩余部分”
pub struct Next<'a> {
    ctx: &'a AppContext,
    behaviors: &'a [Arc<dyn Behavior>],
    handler: &'a HandlerFn,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        ctx: &'a AppContext,
        behaviors: &'a [Arc<dyn Behavior>],
        handler: &'a HandlerFn,
    ) -> Self {
        Self {
            ctx,
            behaviors,
            handler,
        }
    }

    /// 执行下一阶段：下一个行为，或最内层的处理器
    pub async fn run(self, envelope: Envelope) -> PipelineResult {
        if self.ctx.is_cancelled() {
            return Err(Failure::cancelled(envelope.name()));
        }

        match self.behaviors.split_first() {
            Some((head, rest)) => {
                let request = envelope.name();
                let stage = head.name();
                tracing::trace!(request, stage, "entering behavior");

                // 行为的 panic 在本阶段转换为 Internal，外层行为照常展开
                let next = Next::new(self.ctx, rest, self.handler);
                AssertUnwindSafe(head.handle(self.ctx, envelope, next))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        let reason = panic_message(payload.as_ref());
                        tracing::error!(request, stage, %reason, "behavior panicked");
                        Err(Failure::internal(format!("behavior {stage} panicked: {reason}")))
                    })
            }
            None => self.invoke_handler(envelope).await,
        }
    }

    // 处理器的 panic 在此转换为 Internal，外层行为照常走失败展开路径
    async fn invoke_handler(self, envelope: Envelope) -> PipelineResult {
        let name = envelope.name();
        let invocation = AssertUnwindSafe((self.handler)(envelope, self.ctx)).catch_unwind();

        tokio::select! {
            biased;
            _ = self.ctx.cancellation().cancelled() => Err(Failure::cancelled(name)),
            outcome = invocation => outcome.unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                tracing::error!(request = name, %reason, "handler panicked");
                Err(Failure::internal(format!("handler panicked: {reason}")))
            }),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
