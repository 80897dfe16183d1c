use depot_derive::depot_error;
use std::borrow::Cow;

#[depot_error]
pub enum LookupError {
    #[absent]
    #[error("{path}: missing{}", format_context(.context))]
    Missing { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[absent]
    #[error("{path}: stale{}", format_context(.context))]
    Stale { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{path}: denied{}", format_context(.context))]
    Denied { path: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let missing = LookupError::Missing { path: "a/b".into(), context: None };
    let stale = LookupError::Stale { path: "a/c".into(), context: None };
    let denied = LookupError::Denied { path: "a/d".into(), context: None };
    let internal = LookupError::from("oops");

    assert!(missing.is_absent());
    assert!(stale.is_absent());
    assert!(!denied.is_absent());
    assert!(!internal.is_absent());

    assert_eq!(missing.path(), Some("a/b"));
    assert_eq!(denied.path(), Some("a/d"));
    assert_eq!(internal.path(), None);
    assert_ne!(missing.to_string(), stale.to_string());
}
