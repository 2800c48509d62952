//! Linux SMBus Transport
//!
//! [`RegisterBus`] over a `/dev/i2c-N` character device using the
//! `I2C_SLAVE` and `I2C_SMBUS` ioctls.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::device::bus::{RegisterBus, WRITE_MASK};
use crate::input::error::{KbdError, Result};

const I2C_SLAVE: u16 = 0x0703;
const I2C_SMBUS: u16 = 0x0720;

const I2C_SMBUS_READ: u8 = 1;
const I2C_SMBUS_WRITE: u8 = 0;

const I2C_SMBUS_BYTE_DATA: u32 = 2;
const I2C_SMBUS_WORD_DATA: u32 = 3;

const I2C_SMBUS_BLOCK_MAX: usize = 32;

/// `union i2c_smbus_data`; byte and word live at the start of the block
#[repr(C, align(2))]
struct SmbusData {
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

/// `struct i2c_smbus_ioctl_data`
#[repr(C)]
struct SmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut SmbusData,
}

#[allow(unsafe_code)]
mod ioctl {
    use super::{SmbusIoctlData, I2C_SLAVE, I2C_SMBUS};

    nix::ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
    nix::ioctl_write_ptr_bad!(i2c_smbus, I2C_SMBUS, SmbusIoctlData);
}

/// SMBus client bound to one slave address
#[derive(Debug)]
pub struct LinuxI2cBus {
    file: File,
    path: PathBuf,
    address: u16,
}

impl LinuxI2cBus {
    /// Open `path` and bind it to `address`
    pub fn open(path: impl AsRef<Path>, address: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // SAFETY: fd is a valid open i2c-dev descriptor owned by `file`.
        #[allow(unsafe_code)]
        let bound = unsafe { ioctl::i2c_set_slave(file.as_raw_fd(), address as libc::c_int) };
        bound.map_err(|e| KbdError::Io(std::io::Error::from(e)))?;

        info!("Opened {} at address 0x{:02X}", path.display(), address);

        Ok(Self {
            file,
            path,
            address,
        })
    }

    /// Character device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Slave address
    pub fn address(&self) -> u16 {
        self.address
    }

    fn transfer(&self, read_write: u8, command: u8, size: u32, data: &mut SmbusData) -> Result<()> {
        let args = SmbusIoctlData {
            read_write,
            command,
            size,
            data: data as *mut SmbusData,
        };

        // SAFETY: `args` and the buffer it points to outlive the call, and the
        // buffer is large enough for any SMBus transfer size.
        #[allow(unsafe_code)]
        let rc = unsafe { ioctl::i2c_smbus(self.file.as_raw_fd(), &args) };
        rc.map(|_| ())
            .map_err(|e| KbdError::bus(command & !WRITE_MASK, e.desc()))
    }
}

impl RegisterBus for LinuxI2cBus {
    fn read_u8(&mut self, reg: u8) -> Result<u8> {
        let mut data = SmbusData {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        };
        self.transfer(I2C_SMBUS_READ, reg, I2C_SMBUS_BYTE_DATA, &mut data)?;
        debug!("read_u8 0x{:02X} -> 0x{:02X}", reg, data.block[0]);
        Ok(data.block[0])
    }

    fn read_u16(&mut self, reg: u8) -> Result<[u8; 2]> {
        let mut data = SmbusData {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        };
        self.transfer(I2C_SMBUS_READ, reg, I2C_SMBUS_WORD_DATA, &mut data)?;

        // the kernel stores the word in host order
        let word = u16::from_ne_bytes([data.block[0], data.block[1]]);
        Ok(word.to_le_bytes())
    }

    fn write_u8(&mut self, reg: u8, value: u8) -> Result<()> {
        let mut data = SmbusData {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        };
        data.block[0] = value;
        self.transfer(I2C_SMBUS_WRITE, reg | WRITE_MASK, I2C_SMBUS_BYTE_DATA, &mut data)?;
        debug!("write_u8 0x{:02X} <- 0x{:02X}", reg, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let result = LinuxI2cBus::open("/nonexistent/i2c-99", 0x1F);
        assert!(matches!(result, Err(KbdError::Io(_))));
    }

    #[test]
    fn test_open_regular_file_rejects_ioctl() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(LinuxI2cBus::open(file.path(), 0x1F).is_err());
    }

    #[test]
    fn test_ioctl_layout() {
        assert_eq!(std::mem::size_of::<SmbusData>(), 34);
        assert_eq!(std::mem::align_of::<SmbusData>(), 2);
    }
}
