use async_trait::async_trait;
use cqrs_core::behavior::validation::{email, max_length, not_empty};
use cqrs_core::behavior::{
    LoggingBehavior, LoggingConfig, TransactionBehavior, UnitOfWork, UnitOfWorkFactory,
    ValidationBehavior,
};
use cqrs_core::{AppContext, AppResult, Dispatcher, Failure, RequestBus, RequestHandler};
use cqrs_macros::{command, query};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[command(result = String)]
struct LoginCommand {
    email: String,
}

#[query(result = Option<String>, name = "SessionOwner")]
struct SessionOwner {
    token: String,
}

/// 会话存储：token -> email
#[derive(Default, Clone)]
struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

struct LoginHandler {
    users: HashSet<String>,
    store: SessionStore,
}

#[async_trait]
impl RequestHandler<LoginCommand> for LoginHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: LoginCommand) -> AppResult<String> {
        let email = cmd.email.trim().to_lowercase();
        if !self.users.contains(&email) {
            return Err(Failure::unauthorized("invalid credentials"));
        }

        let token = format!("session-{}", Uuid::new_v4().simple());
        self.store
            .sessions
            .lock()
            .await
            .insert(token.clone(), email);
        Ok(token)
    }
}

struct SessionOwnerHandler {
    store: SessionStore,
}

#[async_trait]
impl RequestHandler<SessionOwner> for SessionOwnerHandler {
    async fn handle(&self, _ctx: &AppContext, q: SessionOwner) -> AppResult<Option<String>> {
        Ok(self.store.sessions.lock().await.get(&q.token).cloned())
    }
}

/// 工作单元：回滚时仅移除 begin 之后新增的会话，已有会话保持不变
///
/// 新增会话按 begin 时的 token 集合区分，因此要求同一存储上的命令顺序分发（本示例即如此）。
struct SessionUow {
    store: SessionStore,
    known: Option<HashSet<String>>,
}

#[async_trait]
impl UnitOfWork for SessionUow {
    async fn commit(&mut self) -> AppResult<()> {
        self.known = None;
        tracing::debug!("session store committed");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if let Some(known) = self.known.take() {
            let mut sessions = self.store.sessions.lock().await;
            sessions.retain(|token, _| known.contains(token));
        }
        tracing::debug!("session store rolled back");
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for SessionStore {
    async fn begin(&self, _ctx: &AppContext) -> AppResult<Box<dyn UnitOfWork>> {
        let known = self.sessions.lock().await.keys().cloned().collect();
        Ok(Box::new(SessionUow {
            store: self.clone(),
            known: Some(known),
        }))
    }
}

fn build_dispatcher(store: &SessionStore, users: &[&str]) -> anyhow::Result<Dispatcher> {
    let login = LoginHandler {
        users: users.iter().map(|u| u.to_string()).collect(),
        store: store.clone(),
    };
    let owner = SessionOwnerHandler {
        store: store.clone(),
    };

    let mut builder = Dispatcher::builder();
    builder
        .behavior(Arc::new(LoggingBehavior::new(
            LoggingConfig::builder()
                .slow_threshold(Duration::from_millis(200))
                .build(),
        )))
        .behavior(Arc::new(TransactionBehavior::new(Arc::new(store.clone()))))
        .register_command::<LoginCommand, _>(Arc::new(login))?
        .with_behavior::<LoginCommand>(Arc::new(
            ValidationBehavior::new()
                .rule(not_empty("Email", |c: &LoginCommand| c.email.as_str()))
                .rule(email("Email", |c: &LoginCommand| c.email.as_str()))
                .rule(max_length("Email", 254, |c: &LoginCommand| c.email.as_str())),
        ))?
        .register_query::<SessionOwner, _>(Arc::new(owner))?
        .with_behavior::<SessionOwner>(Arc::new(
            ValidationBehavior::new().rule(not_empty("Token", |q: &SessionOwner| q.token.as_str())),
        ))?
        .expect::<LoginCommand>()
        .expect::<SessionOwner>();

    Ok(builder.build()?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("DEMO_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let store = SessionStore::default();
    let dispatcher = build_dispatcher(&store, &["alice@example.com"])?;
    let ctx = AppContext::builder()
        .correlation_id(Uuid::new_v4().to_string())
        .build();

    // 登录
    let token = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: "alice@example.com".into(),
            },
        )
        .await?;
    println!("logged in: token={token}");

    // 查询会话归属
    let owner = dispatcher
        .dispatch(
            &ctx,
            SessionOwner {
                token: token.clone(),
            },
        )
        .await?;
    println!("session owner: {owner:?}");

    // 空邮箱 -> 校验失败
    let err = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: String::new(),
            },
        )
        .await
        .err();
    if let Some(f) = err {
        println!("rejected: status={} {f} {:?}", f.status_code(), f.details());
    }

    // 未知用户 -> 未授权，事务回滚
    let err = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: "mallory@example.com".into(),
            },
        )
        .await
        .err();
    if let Some(f) = err {
        println!("rejected: status={} {f}", f.status_code());
    }

    println!("active sessions: {}", store.len().await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqrs_core::FailureKind;

    #[tokio::test]
    async fn login_then_lookup_owner() -> anyhow::Result<()> {
        let store = SessionStore::default();
        let dispatcher = build_dispatcher(&store, &["alice@example.com"])?;
        let ctx = AppContext::default();

        let token = dispatcher
            .dispatch(
                &ctx,
                LoginCommand {
                    email: " Alice@Example.com ".into(),
                },
            )
            .await?;
        assert!(token.starts_with("session-"));

        let owner = dispatcher.dispatch(&ctx, SessionOwner { token }).await?;
        assert_eq!(owner.as_deref(), Some("alice@example.com"));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_email_never_reaches_the_store() -> anyhow::Result<()> {
        let store = SessionStore::default();
        let dispatcher = build_dispatcher(&store, &["alice@example.com"])?;

        let err = dispatcher
            .dispatch(
                &AppContext::default(),
                LoginCommand {
                    email: "alice".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(err.detail("Email"), Some("must be a valid email address"));
        assert_eq!(store.len().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() -> anyhow::Result<()> {
        let store = SessionStore::default();
        let dispatcher = build_dispatcher(&store, &["alice@example.com"])?;

        let err = dispatcher
            .dispatch(
                &AppContext::default(),
                LoginCommand {
                    email: "mallory@example.com".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Unauthorized);
        assert_eq!(err.status_code(), 401);
        assert_eq!(store.len().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn rollback_keeps_committed_sessions() -> anyhow::Result<()> {
        let store = SessionStore::default();
        let dispatcher = build_dispatcher(&store, &["alice@example.com"])?;
        let ctx = AppContext::default();

        let token = dispatcher
            .dispatch(
                &ctx,
                LoginCommand {
                    email: "alice@example.com".into(),
                },
            )
            .await?;

        let mut uow = store.begin(&ctx).await?;
        store
            .sessions
            .lock()
            .await
            .insert("session-staged".into(), "bob@example.com".into());
        uow.rollback().await?;

        assert_eq!(store.len().await, 1);
        let owner = dispatcher.dispatch(&ctx, SessionOwner { token }).await?;
        assert_eq!(owner.as_deref(), Some("alice@example.com"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_has_no_owner() -> anyhow::Result<()> {
        let store = SessionStore::default();
        let dispatcher = build_dispatcher(&store, &[])?;

        let owner = dispatcher
            .dispatch(
                &AppContext::default(),
                SessionOwner {
                    token: "session-missing".into(),
                },
            )
            .await?;
        assert_eq!(owner, None);
        Ok(())
    }
}
