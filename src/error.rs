use std::io;

use thiserror::Error;

/// Reasons a connection to a device could not be opened.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no usable bluetooth radio")]
    RadioUnavailable,
    #[error("invalid device address `{0}`")]
    InvalidAddress(String),
    #[error("device {address} is unreachable")]
    Unreachable {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("device {0} does not offer the serial port service")]
    ServiceNotOffered(String),
    #[error("not permitted to connect to {0}")]
    PermissionDenied(String),
}

/// Errors from reading or writing an open connection.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("not connected")]
    NotConnected,
    #[error("input stream is owned by the running listener")]
    Listening,
    #[error("stream closed by peer")]
    Closed,
    #[error("write failed")]
    Write(#[source] io::Error),
    #[error("read failed")]
    Read(#[source] io::Error),
}

impl IoError {
    pub(crate) fn from_write(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::WriteZero
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => IoError::Closed,
            _ => IoError::Write(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_hangup_is_closed() {
        let e = IoError::from_write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(e, IoError::Closed));

        let e = IoError::from_write(io::Error::new(io::ErrorKind::Other, "radio reset"));
        assert!(matches!(e, IoError::Write(_)));
    }

    #[test]
    fn connect_error_names_device() {
        let e = ConnectError::ServiceNotOffered("00:11:22:33:44:55".to_string());
        assert_eq!(
            e.to_string(),
            "device 00:11:22:33:44:55 does not offer the serial port service"
        );
    }
}
