use routecodex_protocol::json::FieldPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("conversion failed at {field_path}: {message}")]
    Conversion {
        field_path: FieldPath,
        message: String,
    },
}

impl CodecError {
    pub fn at(field_path: FieldPath, message: impl Into<String>) -> Self {
        Self::Conversion {
            field_path,
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::at(FieldPath::root(), message)
    }
}
