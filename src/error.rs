use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("At least one media SSRC must be configured")]
    ErrNoMediaSsrcs,
    #[error("Number of RTP send modules must match number of media SSRCs")]
    ErrRtpModuleCountMismatch,
    #[error("Number of RTX SSRCs must match number of media SSRCs")]
    ErrRtxSsrcCountMismatch,
    #[error("Active-layer mask length must match number of media SSRCs")]
    ErrActiveLayerCountMismatch,
    #[error("Encoder stream list is empty")]
    ErrEncoderStreamsEmpty,
    #[error("More encoder streams than configured media SSRCs")]
    ErrTooManyEncoderStreams,
    #[error("Encoder max bitrate must be greater than zero")]
    ErrZeroEncoderMaxBitrate,
    #[error("Encoder stream bitrate priority must be greater than zero")]
    ErrInvalidBitratePriority,
    #[error("Sender must be stopped before extracting source states")]
    ErrSenderStillActive,
    #[error("Encoded frame carries an unknown simulcast index")]
    ErrUnknownSimulcastIndex,

    #[error("{0}")]
    Other(String),
}
