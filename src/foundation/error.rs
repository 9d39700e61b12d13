pub type EpicycleResult<T> = Result<T, EpicycleError>;

#[derive(thiserror::Error, Debug)]
pub enum EpicycleError {
    #[error("extraction error: {0}")]
    Extraction(String),

    #[error(
        "invalid term count: {requested} harmonics requested, but {samples} samples support at most {max}"
    )]
    InvalidTermCount {
        requested: usize,
        samples: usize,
        max: usize,
    },

    #[error("invalid frame count: {0} (an animation needs at least 2 frames)")]
    InvalidFrameCount(u32),

    #[error("render error: {0}")]
    Render(String),

    #[error("io error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EpicycleError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Pipeline stage this kind of error is raised by.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "contour extraction",
            Self::InvalidTermCount { .. } => "fourier transform",
            Self::InvalidFrameCount(_) | Self::Render(_) => "animation",
            Self::Io { .. } => "file io",
            Self::Validation(_) => "configuration",
            Self::Serde(_) => "serialization",
            Self::Other(_) => "pipeline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            EpicycleError::extraction("x")
                .to_string()
                .contains("extraction error:")
        );
        assert!(
            EpicycleError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            EpicycleError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            EpicycleError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
        assert!(
            EpicycleError::InvalidFrameCount(1)
                .to_string()
                .contains("invalid frame count: 1")
        );
    }

    #[test]
    fn term_count_message_names_the_limit() {
        let err = EpicycleError::InvalidTermCount {
            requested: 51,
            samples: 100,
            max: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("51"));
        assert!(msg.contains("at most 50"));
        assert_eq!(err.stage(), "fourier transform");
    }

    #[test]
    fn io_keeps_source() {
        let err = EpicycleError::io("read 'x.png'", std::io::Error::other("boom"));
        assert!(err.to_string().contains("read 'x.png'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = EpicycleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
