use cqrs_core::{Query, Request};
use cqrs_macros::query;

#[query(result = Option<u64>)]
enum FindSession {
    ByToken(String),
    ByUser { email: String },
}

#[query(result = Vec<String>, name = "sessions.active")]
struct ActiveSessions;

fn assert_query<Q: Query>() {}

fn main() {
    assert_query::<FindSession>();
    assert_query::<ActiveSessions>();
    assert_eq!(<FindSession as Request>::NAME, "FindSession");
    assert_eq!(<ActiveSessions as Request>::NAME, "sessions.active");

    let q = FindSession::ByUser {
        email: "a@b.io".into(),
    };
    assert_ne!(q, FindSession::ByToken("t".into()));
    assert_eq!(q.clone(), q);
}
