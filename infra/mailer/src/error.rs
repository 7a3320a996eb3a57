use std::borrow::Cow;

#[feq_derive::feq_error]
pub enum MailerError {
    #[error("Mailer configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(400)]
    #[error("Invalid email{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Email API rejected the message{} ({status}): {message}", format_context(.context))]
    Rejected { status: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Email transport error{}: {source}", format_context(.context))]
    Transport { source: reqwest::Error, context: Option<Cow<'static, str>> },
}
