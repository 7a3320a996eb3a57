use feq_derive::feq_error;
use std::borrow::Cow;

#[feq_error]
pub enum SeatError {
    #[status(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(409)]
    #[error("No seats left")]
    Exhausted {},

    #[error("Internal fault{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

mod org {
    use super::SeatError;
    use feq_derive::feq_error;
    use std::borrow::Cow;

    #[feq_error]
    pub enum OrgError {
        #[status(source)]
        #[error("Seat failure{}: {source}", format_context(.context))]
        Seats { source: SeatError, context: Option<Cow<'static, str>> },

        #[status(403)]
        #[error("Forbidden")]
        Forbidden {},
    }
}

fn main() {
    let missing = SeatError::NotFound { message: "org".into(), context: None };
    assert_eq!(missing.status_code(), 404);
    assert_eq!(SeatError::Exhausted {}.status_code(), 409);
    assert_eq!(SeatError::from("x").status_code(), 500);

    let scoped: Result<(), SeatError> = Err(missing);
    let err = scoped.context("org 7").unwrap_err();
    assert_eq!(err.to_string(), "Not found (org 7): org");

    let wrapped = org::OrgError::from(SeatError::Exhausted {});
    assert_eq!(wrapped.status_code(), 409);
    assert_eq!(org::OrgError::Forbidden {}.status_code(), 403);
}
