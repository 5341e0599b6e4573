use chrono::TimeDelta;

use crate::core::{
    aggregate::Combiner,
    measurement::Measurement,
    site::SiteId,
    time::Timestamp,
};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timestamp `{0}` has no timezone information")]
    MissingTimezone(String),

    #[error("invalid timestamp `{input}`")]
    InvalidTimestamp {
        input: String,

        #[source]
        source: chrono::ParseError,
    },

    #[error(
        "period length {period_length} is not a whole multiple of the source period duration {source_duration}"
    )]
    InvalidPeriodLength { period_length: TimeDelta, source_duration: TimeDelta },

    #[error("`{0:?}` combination is not implemented")]
    UnsupportedCombiner(Combiner),

    #[error("`{0}` measurement is missing")]
    MissingMeasurement(Measurement),

    #[error("period duration must be positive, got {0}")]
    InvalidDuration(TimeDelta),

    #[error("site {site_id} has more than one period starting at {start_time}")]
    DuplicateTime { site_id: SiteId, start_time: Timestamp },

    #[error("cannot merge periods of different sites ({0} and {1})")]
    SiteMismatch(SiteId, SiteId),

    #[error("cannot merge a period with itself")]
    SelfMerge,

    #[error("{0} sites found, please choose one")]
    AmbiguousSite(usize),

    #[error("site {0} is not found")]
    SiteNotFound(SiteId),

    #[error("unexpected SolarEdge response: {0}")]
    Protocol(String),

    #[error("SolarEdge request failed")]
    Http(#[from] ureq::Error),

    #[error("local database failure")]
    Database(#[from] rusqlite::Error),

    #[error("the local database already exists")]
    AlreadyPresent,

    #[error("the local database connection is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(error.to_string())
    }
}
