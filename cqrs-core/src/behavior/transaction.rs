//! 事务行为（TransactionBehavior）
//!
//! 为命令开启工作单元：成功提交，任何失败（含取消、处理器 panic 转换的 Internal）回滚。
//! 查询不进入事务，直接放行。
//!
use crate::{
    context::AppContext,
    error::{AppResult, Failure},
    pipeline::{Behavior, Envelope, Next, PipelineResult},
    request::RequestKind,
};
use async_trait::async_trait;
use std::sync::Arc;

/// 工作单元（Unit of Work）
#[async_trait]
pub trait UnitOfWork: Send {
    /// 提交事务
    async fn commit(&mut self) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(&mut self) -> AppResult<()>;
}

/// 工作单元工厂：每次命令分发获取一个独立的工作单元（例如从连接池取连接并 BEGIN）
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self, ctx: &AppContext) -> AppResult<Box<dyn UnitOfWork>>;
}

pub struct TransactionBehavior {
    factory: Arc<dyn UnitOfWorkFactory>,
}

impl TransactionBehavior {
    pub fn new(factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl Behavior for TransactionBehavior {
    fn name(&self) -> &'static str {
        "transaction"
    }

    async fn handle(&self, ctx: &AppContext, envelope: Envelope, next: Next<'_>) -> PipelineResult {
        if envelope.kind() == RequestKind::Query {
            return next.run(envelope).await;
        }

        let request = envelope.name();
        let mut uow = self.factory.begin(ctx).await?;

        match next.run(envelope).await {
            Ok(out) => match uow.commit().await {
                Ok(()) => Ok(out),
                Err(e) => {
                    tracing::error!(request, error = %e, "commit failed");
                    Err(Failure::internal(format!("commit failed: {}", e.message())))
                }
            },
            Err(failure) => {
                if let Err(e) = uow.rollback().await {
                    tracing::error!(request, error = %e, "rollback failed");
                }
                Err(failure)
            }
        }
    }
}
