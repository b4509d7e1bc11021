use crate::credentials::CredentialsError;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// 与厂商无关的错误分类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    NotSupported,
    InvalidStatus,
    DuplicateId,
    AccountReadOnly,
    Auth,
    Transient,
    Timeout,
    /// IAM `1101`: 名称不符合要求
    InvalidName,
    Fatal,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("account is read only: {0}")]
    AccountReadOnly(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("transient error: {0}")]
    Transient(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("{0}")]
    Fatal(String),
    #[error("api error {status}: {report}")]
    Api {
        kind: ErrorKind,
        status: u16,
        report: Box<ErrorReport>,
    },
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<Error>,
    },
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Common(#[from] hwcloud_common::Error),
    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("sign error: {0}")]
    Sign(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::InvalidStatus(_) => ErrorKind::InvalidStatus,
            Error::DuplicateId(_) => ErrorKind::DuplicateId,
            Error::AccountReadOnly(_) => ErrorKind::AccountReadOnly,
            Error::Auth(_) | Error::Credentials(_) | Error::Common(_) | Error::Sign(_) => {
                ErrorKind::Auth
            }
            Error::Transient(_) => ErrorKind::Transient,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::InvalidName(_) => ErrorKind::InvalidName,
            Error::Api { kind, .. } => *kind,
            Error::Context { source, .. } => source.kind(),
            Error::Reqwest(e) if e.is_timeout() => ErrorKind::Timeout,
            Error::Reqwest(_) => ErrorKind::Transient,
            Error::Fatal(_)
            | Error::Json(_)
            | Error::Xml(_)
            | Error::Url(_)
            | Error::Io(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// 去掉`Context`之后的厂商错误报告
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Error::Api { report, .. } => Some(report),
            Error::Context { source, .. } => source.report(),
            _ => None,
        }
    }

    /// 厂商错误码，如`EPS.0004`、`NoSuchBucketPolicy`
    pub fn vendor_code(&self) -> Option<&str> {
        self.report().and_then(ErrorReport::vendor_code)
    }

    pub(crate) fn api(status: u16, report: ErrorReport) -> Self {
        Error::Api {
            kind: report.classify(),
            status,
            report: Box::new(report),
        }
    }
}

// region:    --- ErrorReport
/// 各服务返回的错误体字段不统一，这里取并集，同时保留原始json
#[derive(Clone, Debug, Default)]
pub struct ErrorReport {
    pub status: u16,
    pub request_id: Option<String>,
    pub error_code: Option<String>,
    pub error_msg: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub errorcode: Vec<String>,
    pub raw: Value,
}

fn text_of(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ErrorReport {
    pub fn from_json(status: u16, raw: Value) -> Self {
        let mut report = ErrorReport {
            status,
            ..Default::default()
        };
        report.absorb(&raw);
        // 部分服务把错误包在 {"error": {...}} 里
        if let Some(inner @ Value::Object(_)) = raw.get("error") {
            report.absorb(inner);
        }
        report.raw = raw;
        report
    }

    /// 响应体不是json时使用
    pub fn from_text(status: u16, text: &str) -> Self {
        ErrorReport {
            status,
            message: (!text.is_empty()).then(|| text.to_owned()),
            raw: Value::String(text.to_owned()),
            ..Default::default()
        }
    }

    fn absorb(&mut self, v: &Value) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = text_of(v, key);
            }
        };
        fill(&mut self.request_id, "request_id");
        fill(&mut self.error_code, "error_code");
        fill(&mut self.error_msg, "error_msg");
        fill(&mut self.code, "code");
        fill(&mut self.message, "message");
        if let Some(Value::Array(arr)) = v.get("errorcode") {
            self.errorcode
                .extend(arr.iter().filter_map(|c| c.as_str().map(str::to_owned)));
        }
    }

    pub fn vendor_code(&self) -> Option<&str> {
        self.error_code
            .as_deref()
            .or(self.code.as_deref())
            .or(self.errorcode.first().map(String::as_str))
    }

    pub fn vendor_message(&self) -> Option<&str> {
        self.error_msg.as_deref().or(self.message.as_deref())
    }

    pub fn classify(&self) -> ErrorKind {
        match self.vendor_code() {
            Some("EPS.0004") => return ErrorKind::NotSupported,
            Some("EPS.0039") => return ErrorKind::Forbidden,
            Some("1101") => return ErrorKind::InvalidName,
            _ => {}
        }
        if self.raw.to_string().contains("RouterNotFound") {
            return ErrorKind::NotFound;
        }
        match self.status {
            404 => ErrorKind::NotFound,
            403 => ErrorKind::Forbidden,
            401 => ErrorKind::Auth,
            500.. => ErrorKind::Transient,
            _ => ErrorKind::Fatal,
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code: {}, message: {}",
            self.vendor_code().unwrap_or("-"),
            self.vendor_message().unwrap_or("-")
        )?;
        if let Some(id) = &self.request_id {
            write!(f, ", request_id: {id}")?;
        }
        Ok(())
    }
}
// endregion: --- ErrorReport

/// 给错误加一层上下文: 操作名 + 资源id
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.into(),
            source: Box::new(e),
        })
    }
}
