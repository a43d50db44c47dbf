use thiserror::Error;

/// Convenient result alias for the searoute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// "No route" is deliberately absent: searches report it as `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a waypoint identifier is not part of the network.
    #[error("unknown waypoint: {id}")]
    UnknownWaypoint { id: String },

    /// Raised when a waypoint identifier is inserted twice.
    #[error("duplicate waypoint: {id}")]
    DuplicateWaypoint { id: String },

    /// Raised when an edge references a waypoint that has not been added.
    #[error("edge {from} -> {to} references unknown waypoint {missing}")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },

    /// Raised when a route is built from a path without any waypoints.
    #[error("path was empty")]
    EmptyPath,

    /// Raised when two consecutive path waypoints are not joined by a usable edge.
    #[error("no usable edge between {from} and {to}")]
    MissingEdge { from: String, to: String },

    /// Raised when a planned route has no waypoints to compare against.
    #[error("planned route for vessel {vessel} has no waypoints")]
    EmptyPlannedRoute { vessel: String },

    /// Raised when an observed position is not a finite coordinate pair.
    #[error("vessel {vessel} reported a non-finite position ({latitude}, {longitude})")]
    InvalidPosition {
        vessel: String,
        latitude: f64,
        longitude: f64,
    },

    /// Raised when a configuration value cannot be parsed or is out of range.
    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON decoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
