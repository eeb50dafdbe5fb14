// Copyright (c) 2017-2019 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr;

use libc::{self, c_void, off_t, size_t, MAP_FAILED, MAP_SHARED, O_SYNC, PROT_READ, PROT_WRITE};
use log::debug;

use super::registers::{RegisterBlock, Registers};
use super::{Error, Result};
use crate::system::DeviceInfo;

const PATH_DEV_GPIOMEM: &str = "/dev/gpiomem";
const PATH_DEV_MEM: &str = "/dev/mem";

// Size of the mapped window. The register block only occupies the start of it.
const GPIO_MEM_SIZE: usize = 0x1000;

/// GPIO registers mapped through `/dev/gpiomem` or `/dev/mem`.
pub(crate) struct GpioMem {
    mem_ptr: *mut RegisterBlock,
}

impl fmt::Debug for GpioMem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioMem")
            .field("mem_ptr", &self.mem_ptr)
            .finish()
    }
}

impl GpioMem {
    pub(crate) fn open(device_info: &DeviceInfo) -> Result<GpioMem> {
        // Try /dev/gpiomem first. If that fails, try /dev/mem instead. If neither works,
        // report back the error that's the most relevant.
        let mem_ptr = match Self::map_devgpiomem() {
            Ok(ptr) => {
                debug!("Mapped GPIO registers through {}", PATH_DEV_GPIOMEM);
                ptr
            }
            Err(gpiomem_err) => match Self::map_devmem(device_info) {
                Ok(ptr) => {
                    debug!(
                        "Mapped GPIO registers through {} ({}: {})",
                        PATH_DEV_MEM, PATH_DEV_GPIOMEM, gpiomem_err
                    );
                    ptr
                }
                Err(ref e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    // Did /dev/gpiomem also give us a Permission Denied error? If so, return
                    // that path instead of /dev/mem. Solving /dev/gpiomem issues should be
                    // preferred (add user to gpio group) over /dev/mem (use sudo),
                    if gpiomem_err.kind() == io::ErrorKind::PermissionDenied {
                        return Err(Error::NotPermitted(String::from(PATH_DEV_GPIOMEM)));
                    }

                    return Err(Error::NotPermitted(String::from(PATH_DEV_MEM)));
                }
                Err(_) => return Err(Error::MappingFailed(gpiomem_err)),
            },
        };

        Ok(GpioMem { mem_ptr })
    }

    fn map_devgpiomem() -> io::Result<*mut RegisterBlock> {
        // Open /dev/gpiomem with read/write/sync flags. This might fail if
        // /dev/gpiomem doesn't exist, or /dev/gpiomem doesn't have the
        // appropriate permissions, or the current user is not a member of
        // the gpio group.
        let gpiomem_file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(PATH_DEV_GPIOMEM)?;

        // Memory-map /dev/gpiomem at offset 0
        let gpiomem_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                GPIO_MEM_SIZE,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                gpiomem_file.as_raw_fd(),
                0,
            )
        };

        if gpiomem_ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(gpiomem_ptr as *mut RegisterBlock)
    }

    fn map_devmem(device_info: &DeviceInfo) -> io::Result<*mut RegisterBlock> {
        let mem_file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(PATH_DEV_MEM)?;

        // Memory-map /dev/mem at the appropriate offset for our SoC
        let mem_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                GPIO_MEM_SIZE,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                mem_file.as_raw_fd(),
                (device_info.peripheral_base() + device_info.gpio_offset()) as off_t,
            )
        };

        if mem_ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(mem_ptr as *mut RegisterBlock)
    }
}

impl Registers for GpioMem {
    #[inline(always)]
    fn read_gpfsel(&self, index: usize) -> u32 {
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.mem_ptr).gpfsel[index])) }
    }

    #[inline(always)]
    fn write_gpfsel(&self, index: usize, value: u32) {
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.mem_ptr).gpfsel[index]), value) }
    }

    #[inline(always)]
    fn write_gpset(&self, bank: usize, mask: u32) {
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.mem_ptr).gpset[bank]), mask) }
    }

    #[inline(always)]
    fn write_gpclr(&self, bank: usize, mask: u32) {
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.mem_ptr).gpclr[bank]), mask) }
    }

    #[inline(always)]
    fn read_gplev(&self, bank: usize) -> u32 {
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.mem_ptr).gplev[bank])) }
    }
}

impl Drop for GpioMem {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.mem_ptr as *mut c_void, GPIO_MEM_SIZE as size_t);
        }
    }
}

// Required because of the raw pointer to our memory-mapped file
unsafe impl Send for GpioMem {}
unsafe impl Sync for GpioMem {}
