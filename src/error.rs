pub type MoodpaperResult<T> = Result<T, MoodpaperError>;

#[derive(thiserror::Error, Debug)]
pub enum MoodpaperError {
    #[error("input error: {0}")]
    Input(String),

    #[error("empty palette input: {0}")]
    EmptyPalette(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MoodpaperError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn empty_palette(msg: impl Into<String>) -> Self {
        Self::EmptyPalette(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
