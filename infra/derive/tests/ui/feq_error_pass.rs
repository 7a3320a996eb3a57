use feq_derive::feq_error;
use std::borrow::Cow;

#[feq_error]
pub enum StoreError {
    #[error("Io fault{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Internal fault{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), StoreError> {
    let res: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
    res.context("reading catalog")?;
    Ok(())
}

fn main() {
    let err = read().unwrap_err();
    assert!(err.to_string().contains("(reading catalog)"));
    assert_eq!(err.status_code(), 500);

    let internal: StoreError = "boom".into();
    assert_eq!(internal.to_string(), "Internal fault: boom");
}
