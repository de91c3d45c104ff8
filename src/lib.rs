pub mod bluetooth;
pub mod config;
pub mod drive;
pub mod error;
pub mod session;

pub use bluetooth::{BluezRadio, DeviceDescriptor, Radio};
pub use error::{ConnectError, IoError};
pub use session::{ListenEnd, SerialSession};
