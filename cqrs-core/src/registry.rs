//! 处理器注册表（Handler Registry）
//!
//! 以请求的 `TypeId` 精确匹配处理器，不做任何继承式回退。
//! 注册只发生在启动期（`&mut self`），分发期注册表被冻结为只读。
//!
use crate::{
    error::{Failure, RegistryError},
    handler::RequestHandler,
    pipeline::{Behavior, BoxAnySend, HandlerFn, handler_fn},
    request::{Request, RequestKind},
};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// 注册项：一个请求类型对应一个处理器及其专属行为
pub struct HandlerEntry {
    request: &'static str,
    handler: &'static str,
    kind: RequestKind,
    invoke: HandlerFn,
    behaviors: Vec<Arc<dyn Behavior>>,
}

impl HandlerEntry {
    pub fn request_name(&self) -> &'static str {
        self.request
    }

    /// 处理器的类型名（仅用于诊断）
    pub fn handler_name(&self) -> &'static str {
        self.handler
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// 该请求类型专属的行为（按注册顺序）
    pub fn behaviors(&self) -> &[Arc<dyn Behavior>] {
        &self.behaviors
    }

    pub(crate) fn invoke(&self) -> &HandlerFn {
        &self.invoke
    }
}

#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<TypeId, HandlerEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器；同一请求类型重复注册返回 `DuplicateRegistration`
    pub fn register<R, H>(
        &mut self,
        kind: RequestKind,
        handler: Arc<H>,
    ) -> Result<(), RegistryError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let key = TypeId::of::<R>();

        if let Some(existing) = self.entries.get(&key) {
            return Err(RegistryError::DuplicateRegistration {
                request: R::NAME,
                existing: existing.handler,
            });
        }

        let invoke = handler_fn(move |envelope, ctx| {
            let handler = handler.clone();

            Box::pin(async move {
                // 键与闭包共享同一泛型 R，正常情况下 downcast 不会失败
                match envelope.into_inner::<R>() {
                    Ok(request) => {
                        let output = handler.handle(ctx, request).await?;
                        Ok(Box::new(output) as BoxAnySend)
                    }
                    Err(envelope) => Err(Failure::internal(format!(
                        "type mismatch: expected={}, found={}",
                        R::NAME,
                        envelope.name()
                    ))),
                }
            })
        });

        self.entries.insert(
            key,
            HandlerEntry {
                request: R::NAME,
                handler: type_name::<H>(),
                kind,
                invoke,
                behaviors: Vec::new(),
            },
        );

        Ok(())
    }

    /// 为已注册的请求类型追加专属行为
    pub fn add_behavior<R: Request>(
        &mut self,
        behavior: Arc<dyn Behavior>,
    ) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get_mut(&TypeId::of::<R>())
            .ok_or(RegistryError::HandlerNotFound { request: R::NAME })?;
        entry.behaviors.push(behavior);
        Ok(())
    }

    pub fn resolve<R: Request>(&self) -> Result<&HandlerEntry, RegistryError> {
        self.resolve_by_id(TypeId::of::<R>())
            .ok_or(RegistryError::HandlerNotFound { request: R::NAME })
    }

    pub(crate) fn resolve_by_id(&self, key: TypeId) -> Option<&HandlerEntry> {
        self.entries.get(&key)
    }

    pub fn contains<R: Request>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取已注册的请求名列表（排序后的只读视图）
    pub fn registered_requests(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|e| e.request).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut HandlerEntry> {
        self.entries.values_mut()
    }
}

impl HandlerEntry {
    // 构建期把全局行为放在最外层
    pub(crate) fn prepend_behaviors(&mut self, globals: &[Arc<dyn Behavior>]) {
        let mut chain = Vec::with_capacity(globals.len() + self.behaviors.len());
        chain.extend(globals.iter().cloned());
        chain.append(&mut self.behaviors);
        self.behaviors = chain;
    }
}
