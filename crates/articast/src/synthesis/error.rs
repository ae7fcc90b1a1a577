use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("no text to process")]
    EmptyInput,

    #[error("speech backend error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("speech request failed: {0}")]
    Request(String),

    #[error("error processing chunk {index}: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: Box<SynthesisError>,
    },

    #[error("chunk {0} finished without reporting a result")]
    MissingChunk(usize),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        SynthesisError::Request(err.to_string())
    }
}
