use morava_core::message::MessageError;
use morava_core::proto::Code;
use thiserror::Error;
use tonic::codegen::http::uri;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    TonicTransportError(#[from] tonic::transport::Error),

    #[error("gRPC error: {0}")]
    FromStatus(#[from] tonic::Status),

    #[error("server returned {}: {message}", code.as_str_name())]
    ServerStatus { code: Code, message: String },

    #[error("unable to parse the address: {0}")]
    UrlParseError(#[from] uri::InvalidUri),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error("invalid token")]
    InvalidToken,

    #[error("process queue has been dropped")]
    Dropped,

    #[error("unable to perform operation: {0}")]
    Unrecoverable(String),
}

impl ClientError {
    /// The business status code carried by a server response, if any.
    pub fn server_code(&self) -> Option<Code> {
        match self {
            ClientError::ServerStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
