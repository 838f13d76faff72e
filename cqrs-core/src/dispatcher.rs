//! 进程内分发器（Dispatcher）
//!
//! - 启动期通过 `DispatcherBuilder` 注册处理器与行为，并可声明“必须存在”的请求类型做预检；
//! - `build()` 后注册表冻结为只读，并为每个请求类型一次性组装好行为链（全局行为在最外层）；
//! - 分发期无锁，可在多个任务中并发使用。
//!
use crate::{
    bus::RequestBus,
    command::Command,
    context::AppContext,
    error::{AppResult, Failure, RegistryError},
    handler::RequestHandler,
    pipeline::{Behavior, Envelope, Next, panic_message},
    query::Query,
    registry::HandlerRegistry,
    request::{Request, RequestKind},
};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::{TypeId, type_name};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// 分发器：冻结后的注册表 + 预组装的行为链
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// 获取已注册的请求名列表（只读视图）
    pub fn registered_requests(&self) -> Vec<&'static str> {
        self.registry.registered_requests()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

#[async_trait]
impl RequestBus for Dispatcher {
    async fn dispatch<R: Request>(&self, ctx: &AppContext, request: R) -> AppResult<R::Output> {
        let Some(entry) = self.registry.resolve_by_id(TypeId::of::<R>()) else {
            tracing::error!(request = R::NAME, "no handler registered");
            return Err(Failure::handler_not_found(R::NAME));
        };

        let envelope = Envelope::new(entry.kind(), request);
        let next = Next::new(ctx, entry.behaviors(), entry.invoke());

        // 各阶段已各自捕获 panic，此处仅兜底，保证调用方总是拿到 Result
        let out = AssertUnwindSafe(next.run(envelope))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                tracing::error!(request = R::NAME, %reason, "pipeline panicked");
                Err(Failure::internal(format!("pipeline panicked: {reason}")))
            })?;

        match out.downcast::<R::Output>() {
            Ok(output) => Ok(*output),
            Err(_) => Err(Failure::internal(format!(
                "type mismatch: expected={}, request={}",
                type_name::<R::Output>(),
                R::NAME
            ))),
        }
    }
}

/// 启动期构建器
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: HandlerRegistry,
    globals: Vec<Arc<dyn Behavior>>,
    expected: Vec<(TypeId, &'static str)>,
}

impl DispatcherBuilder {
    /// 追加全局行为（作用于所有请求，位于专属行为之外）
    pub fn behavior(&mut self, behavior: Arc<dyn Behavior>) -> &mut Self {
        self.globals.push(behavior);
        self
    }

    /// 注册命令处理器
    pub fn register_command<C, H>(&mut self, handler: Arc<H>) -> Result<&mut Self, RegistryError>
    where
        C: Command,
        H: RequestHandler<C> + 'static,
    {
        self.registry.register::<C, H>(RequestKind::Command, handler)?;
        Ok(self)
    }

    /// 注册查询处理器
    pub fn register_query<Q, H>(&mut self, handler: Arc<H>) -> Result<&mut Self, RegistryError>
    where
        Q: Query,
        H: RequestHandler<Q> + 'static,
    {
        self.registry.register::<Q, H>(RequestKind::Query, handler)?;
        Ok(self)
    }

    /// 为已注册的请求追加专属行为（按调用顺序由外向内）
    pub fn with_behavior<R: Request>(
        &mut self,
        behavior: Arc<dyn Behavior>,
    ) -> Result<&mut Self, RegistryError> {
        self.registry.add_behavior::<R>(behavior)?;
        Ok(self)
    }

    /// 声明必须存在处理器的请求类型，`build()` 时统一预检
    pub fn expect<R: Request>(&mut self) -> &mut Self {
        let key = (TypeId::of::<R>(), R::NAME);
        if !self.expected.contains(&key) {
            self.expected.push(key);
        }
        self
    }

    /// 冻结注册表并组装行为链
    pub fn build(self) -> Result<Dispatcher, RegistryError> {
        let Self {
            mut registry,
            globals,
            expected,
        } = self;

        let missing: Vec<&'static str> = expected
            .iter()
            .filter(|(key, _)| registry.resolve_by_id(*key).is_none())
            .map(|(_, name)| *name)
            .collect();
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "dispatcher is missing handlers");
            return Err(RegistryError::MissingHandlers { requests: missing });
        }

        for entry in registry.entries_mut() {
            entry.prepend_behaviors(&globals);
        }

        tracing::info!(
            handlers = registry.len(),
            global_behaviors = globals.len(),
            "dispatcher built"
        );

        Ok(Dispatcher {
            registry: Arc::new(registry),
        })
    }
}
