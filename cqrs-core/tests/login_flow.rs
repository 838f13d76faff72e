use async_trait::async_trait;
use cqrs_core::behavior::validation::not_empty;
use cqrs_core::behavior::{LoggingBehavior, ValidationBehavior};
use cqrs_core::{
    AppContext, AppResult, Command, Dispatcher, FailureKind, Request, RequestBus, RequestHandler,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginCommand {
    email: String,
}

impl Request for LoginCommand {
    const NAME: &'static str = "users.login";
    type Output = String;
}
impl Command for LoginCommand {}

#[derive(Default)]
struct LoginHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl RequestHandler<LoginCommand> for LoginHandler {
    async fn handle(&self, _ctx: &AppContext, _cmd: LoginCommand) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("session-token-abc".to_string())
    }
}

fn dispatcher(handler: Arc<LoginHandler>) -> anyhow::Result<Dispatcher> {
    let mut builder = Dispatcher::builder();
    builder
        .behavior(Arc::new(LoggingBehavior::default()))
        .register_command::<LoginCommand, _>(handler)?
        .with_behavior::<LoginCommand>(Arc::new(
            ValidationBehavior::new().rule(not_empty("Email", |c: &LoginCommand| c.email.as_str())),
        ))?
        .expect::<LoginCommand>();
    Ok(builder.build()?)
}

#[tokio::test]
async fn valid_login_returns_session_token() -> anyhow::Result<()> {
    let handler = Arc::new(LoginHandler::default());
    let dispatcher = dispatcher(handler.clone())?;
    let ctx = AppContext::builder().correlation_id("cor-login").build();

    let token = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: "user@example.com".into(),
            },
        )
        .await?;

    assert_eq!(token, "session-token-abc");
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn empty_email_is_rejected_before_the_handler() -> anyhow::Result<()> {
    let handler = Arc::new(LoginHandler::default());
    let dispatcher = dispatcher(handler.clone())?;

    let err = dispatcher
        .dispatch(
            &AppContext::default(),
            LoginCommand {
                email: String::new(),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(err.details().len(), 1);
    assert_eq!(err.detail("Email"), Some("must not be empty"));
    assert_eq!(err.status_code(), 400);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn same_command_twice_yields_equal_tokens() -> anyhow::Result<()> {
    let dispatcher = dispatcher(Arc::new(LoginHandler::default()))?;
    let ctx = AppContext::default();
    let cmd = LoginCommand {
        email: "user@example.com".into(),
    };

    let first = dispatcher.dispatch(&ctx, cmd.clone()).await;
    let second = dispatcher.dispatch(&ctx, cmd).await;
    assert!(first.is_ok());
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn validation_failure_serializes_with_field_details() -> anyhow::Result<()> {
    let dispatcher = dispatcher(Arc::new(LoginHandler::default()))?;
    let err = dispatcher
        .dispatch(
            &AppContext::default(),
            LoginCommand {
                email: "   ".into(),
            },
        )
        .await
        .unwrap_err();

    let json = serde_json::to_value(&err)?;
    assert_eq!(json["kind"], "validation");
    assert_eq!(json["details"]["Email"], "must not be empty");
    Ok(())
}
