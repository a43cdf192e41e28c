use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RewriteError>;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to open input file {}: {source}", .path.display())]
    FailedToOpenInput { path: PathBuf, source: io::Error },

    #[error("failed to create output file {}: {source}", .path.display())]
    FailedToCreateOutput { path: PathBuf, source: io::Error },

    #[error("failed to read XML token: {0}")]
    TokenRead(#[from] quick_xml::Error),

    #[error("malformed attribute list: {0}")]
    InvalidAttribute(#[from] quick_xml::events::attributes::AttrError),

    // quick-xml reports structural and IO problems on the write side through
    // one channel, so both end up in this generic variant.
    #[error("writing XML failed with: {message}")]
    XmlOutput { message: String },

    #[error("failed to flush output: {0}")]
    Flush(#[source] io::Error),
}
