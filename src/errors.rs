use thiserror::Error;

pub type Result<T> = std::result::Result<T, PerimeterError>;

#[derive(Error, Debug)]
pub enum PerimeterError {
    #[error("fetch error: {0:#}")]
    FetchError(anyhow::Error),

    #[error("data shape error: {0}")]
    DataShapeError(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    // reprojection failures
    #[error("could not create projection: {0}")]
    ProjCreateError(#[from] proj::ProjCreateError),

    #[error("could not project geometry: {0}")]
    ProjError(#[from] proj::ProjError),

    #[error("publish error: {0:#}")]
    PublishError(anyhow::Error),
}

pub fn data_shape(msg: impl ToString) -> PerimeterError {
    PerimeterError::DataShapeError(msg.to_string())
}

pub fn invalid_parameter(msg: impl ToString) -> PerimeterError {
    PerimeterError::InvalidParameter(msg.to_string())
}
