//! Thin typed wrappers around the raw platform calls.
//!
//! Everything above this module works with `std::fs` handles and the
//! fallible functions exported here; no other module issues an ioctl or
//! poll directly.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::io::RawFd;

/// Linux spidev ioctl bindings.
pub mod spi {
    use nix::ioctl_write_ptr;

    const SPI_IOC_MAGIC: u8 = b'k';

    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of `struct spi_ioc_transfer` in the kernel ABI.
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate the ioctl number for `SPI_IOC_MESSAGE(n)`.
    ///
    /// `_IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])`
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }

    /// Transfer descriptor passed to `SPI_IOC_MESSAGE`.
    /// Layout must match the kernel's `struct spi_ioc_transfer`.
    #[repr(C)]
    #[derive(Debug, Default, Clone)]
    pub struct SpiIocTransfer {
        pub tx_buf: u64,
        pub rx_buf: u64,
        pub len: u32,
        pub speed_hz: u32,
        pub delay_usecs: u16,
        pub bits_per_word: u8,
        pub cs_change: u8,
        pub tx_nbits: u8,
        pub rx_nbits: u8,
        pub word_delay_usecs: u8,
        pub _pad: u8,
    }
}

/// Set the SPI mode (0-3) on an open spidev descriptor.
pub fn spi_set_mode(fd: RawFd, mode: u8) -> io::Result<()> {
    unsafe { spi::spi_ioc_wr_mode(fd, &mode) }
        .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    Ok(())
}

/// Set the word size on an open spidev descriptor.
pub fn spi_set_bits_per_word(fd: RawFd, bits: u8) -> io::Result<()> {
    unsafe { spi::spi_ioc_wr_bits_per_word(fd, &bits) }
        .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    Ok(())
}

/// Set the maximum clock speed on an open spidev descriptor.
pub fn spi_set_max_speed_hz(fd: RawFd, speed_hz: u32) -> io::Result<()> {
    unsafe { spi::spi_ioc_wr_max_speed_hz(fd, &speed_hz) }
        .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    Ok(())
}

/// Perform one synchronous full-duplex transfer of equal-length buffers.
pub fn spi_transfer(fd: RawFd, tx: &[u8], rx: &mut [u8], speed_hz: u32) -> io::Result<()> {
    debug_assert_eq!(tx.len(), rx.len());
    let transfer = spi::SpiIocTransfer {
        tx_buf: tx.as_ptr() as u64,
        rx_buf: rx.as_mut_ptr() as u64,
        len: tx.len() as u32,
        speed_hz,
        bits_per_word: 8,
        ..Default::default()
    };
    let ret = unsafe {
        libc::ioctl(
            fd,
            spi::spi_ioc_message(1),
            &transfer as *const spi::SpiIocTransfer,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Block in `poll(2)` on a single descriptor, watching for a priority
/// condition (`POLLPRI | POLLERR`).
///
/// Returns `Ok(true)` when a priority event is pending, `Ok(false)` when
/// the call timed out or reported a non-priority condition. A negative
/// `timeout_ms` blocks indefinitely.
pub fn poll_priority(fd: RawFd, timeout_ms: i32) -> io::Result<bool> {
    let mut fds = [libc::pollfd {
        fd,
        events: libc::POLLPRI | libc::POLLERR,
        revents: 0,
    }];
    let ret = unsafe { libc::poll(fds.as_mut_ptr(), 1, timeout_ms) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    if ret == 0 {
        return Ok(false);
    }
    Ok(fds[0].revents & libc::POLLPRI != 0)
}

/// Read a file to EOF and rewind it, discarding the contents.
///
/// On a sysfs GPIO value file this both clears a pending priority-edge
/// condition and throws away the stale value.
pub fn drain(mut file: &File) -> io::Result<()> {
    let mut buf = [0u8; 64];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(())
}
