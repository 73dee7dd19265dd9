use url::Url;

/// Why a single fetch of the stat page produced no streams.
///
/// Both variants are local to one tick: the tracker is left untouched and the next
/// scheduled tick simply tries again.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Requesting stats from {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("The stat document is not well-formed: {0}")]
    Parse(#[from] roxmltree::Error),
}

impl FetchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
