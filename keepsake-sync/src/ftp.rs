//! FTP transport (`suppaftp`, blocking client).

use std::io::Cursor;

use suppaftp::types::FileType;
use suppaftp::FtpStream;

use keepsake_core::Credentials;

use crate::error::{remote_err, SyncError};
use crate::remote::{Connection, Transport};

pub const DEFAULT_FTP_PORT: u16 = 21;

/// Plain FTP, binary transfer type, one login per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtpTransport;

impl Transport for FtpTransport {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Connection>, SyncError> {
        let addr = socket_addr(&credentials.host);
        let mut stream =
            FtpStream::connect(addr.as_str()).map_err(|e| remote_err("connect", &addr, e))?;
        stream
            .login(credentials.user.as_str(), credentials.password.as_str())
            .map_err(|e| remote_err("login", &addr, e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| remote_err("connect", &addr, e))?;
        tracing::debug!(host = %addr, "ftp connection ready");
        Ok(Box::new(FtpConnection { stream }))
    }
}

struct FtpConnection {
    stream: FtpStream,
}

impl Connection for FtpConnection {
    fn retrieve(&mut self, remote_path: &str) -> Result<Vec<u8>, SyncError> {
        self.stream
            .retr_as_buffer(remote_path)
            .map(Cursor::into_inner)
            .map_err(|e| remote_err("fetch", remote_path, e))
    }

    fn store(&mut self, remote_path: &str, bytes: &[u8]) -> Result<(), SyncError> {
        let mut reader = Cursor::new(bytes);
        self.stream
            .put_file(remote_path, &mut reader)
            .map(|_| ())
            .map_err(|e| remote_err("upload", remote_path, e))
    }

    fn close(self: Box<Self>) -> Result<(), SyncError> {
        let FtpConnection { mut stream } = *self;
        stream.quit().map_err(|e| remote_err("close", "", e))
    }
}

/// `host` → `host:21`; hosts that already carry a port are left alone.
fn socket_addr(host: &str) -> String {
    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(name, port)| !name.is_empty() && port.parse::<u16>().is_ok());
    if has_port {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_FTP_PORT}")
    }
}
