//! Thin wrappers over the platform calls the transport needs.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Wait until `fd` is readable or `timeout` elapses.
///
/// Returns `Ok(true)` when the descriptor has inbound data (or a pending
/// connection, for a listening socket), `Ok(false)` on timeout. Hangup and
/// error conditions also count as readable so the subsequent read surfaces
/// them instead of the caller polling a dead descriptor forever.
/// Interrupted calls are retried with the full timeout.
pub(crate) fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `pollfd` is a valid, writable pollfd array of length 1 and
        // `fd` is an open descriptor owned by the calling socket.
        let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        let wake = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
        return Ok(rc > 0 && (pollfd.revents & wake) != 0);
    }
}

/// Disable lingering on close: pending data is discarded and `close(2)`
/// never blocks.
pub(crate) fn set_linger_off(fd: RawFd) -> io::Result<()> {
    let linger = libc::linger {
        l_onoff: 1,
        l_linger: 0,
    };

    // SAFETY: `linger` is a valid, correctly sized linger struct and `fd` is
    // an open socket descriptor owned by the calling socket.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            (&linger as *const libc::linger).cast::<libc::c_void>(),
            std::mem::size_of::<libc::linger>() as libc::socklen_t,
        )
    };

    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn readable_after_write() {
        let (mut left, right) = UnixStream::pair().unwrap();
        left.write_all(b"x").unwrap();
        assert!(wait_readable(right.as_raw_fd(), Duration::from_millis(500)).unwrap());
    }

    #[test]
    fn times_out_when_idle() {
        let (_left, right) = UnixStream::pair().unwrap();
        assert!(!wait_readable(right.as_raw_fd(), Duration::from_millis(20)).unwrap());
    }

    #[test]
    fn linger_off_applies_to_stream_socket() {
        let (left, _right) = UnixStream::pair().unwrap();
        set_linger_off(left.as_raw_fd()).unwrap();
    }
}
