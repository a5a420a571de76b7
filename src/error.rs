use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("data quality error: {0}")]
    DataQuality(String),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub fn data_quality(message: impl Into<String>) -> Self {
        Self::DataQuality(message.into())
    }

    #[cfg(test)]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    #[cfg(test)]
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
