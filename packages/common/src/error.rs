use thiserror::Error;
use vellum_model::ModelError;

/// Common error type that can hold any vellum error
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::CommonResult;
    use vellum_model::Path;

    #[test]
    fn test_model_errors_convert() {
        fn lookup() -> CommonResult<()> {
            Err(ModelError::NodeNotFoundAtPath(Path::new(vec![0, 3])))?;
            Ok(())
        }

        let err = lookup().unwrap_err();
        assert!(matches!(err, CommonError::Model(_)));
        assert!(err.to_string().contains("[0,3]"));
    }

    #[test]
    fn test_string_errors_convert() {
        let err = CommonError::from("boom");
        assert_eq!(err.to_string(), "Generic error: boom");
    }
}
