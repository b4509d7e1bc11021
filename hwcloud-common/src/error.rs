#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error: {0}")]
    Common(String),
    #[error("sign error: {0}")]
    Sign(String),
    #[error("invalid header: {0}")]
    Header(String),
}
