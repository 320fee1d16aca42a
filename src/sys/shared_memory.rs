// Anonymous shared memory for fork-inherited mappings.
//
// The region is mapped MAP_SHARED | MAP_ANONYMOUS, so every process forked
// after the mapping exists sees the same physical pages, zero-initialized
// by the kernel. A hidden size header sits immediately before the returned
// address; freeing needs no external bookkeeping.

use std::io;
use std::ptr::NonNull;

/// Bytes reserved in front of every allocation for the hidden size header.
///
/// A full 128-byte stride (not just `size_of::<usize>()`) keeps the returned
/// address aligned for the `repr(C, align(128))` structs placed in the
/// region, since `mmap` itself returns page-aligned memory.
pub const HEADER_SIZE: usize = 128;

/// Map a zero-initialized shared region of at least `size` usable bytes.
///
/// Must be called before any worker process is forked; children inherit the
/// mapping at the same address. Failure to allocate leaves the system unable
/// to proceed, so callers treat the error as fatal.
#[cfg(unix)]
pub fn alloc_shared(size: usize) -> io::Result<NonNull<u8>> {
    let total = size + HEADER_SIZE;
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            total,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }

    unsafe {
        // Stash the total mapping size where free_shared can find it.
        *(ptr as *mut usize) = total;
        Ok(NonNull::new_unchecked((ptr as *mut u8).add(HEADER_SIZE)))
    }
}

/// Unmap a region previously returned by [`alloc_shared`].
///
/// # Safety
///
/// `ptr` must have been returned by [`alloc_shared`], must not be used after
/// this call, and no other process may still be accessing the region.
#[cfg(unix)]
pub unsafe fn free_shared(ptr: NonNull<u8>) -> io::Result<()> {
    let base = ptr.as_ptr().sub(HEADER_SIZE);
    let total = *(base as *const usize);
    if libc::munmap(base as *mut libc::c_void, total) != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn alloc_shared(_size: usize) -> io::Result<NonNull<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "shared memory requires unix",
    ))
}

#[cfg(not(unix))]
pub unsafe fn free_shared(_ptr: NonNull<u8>) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "shared memory requires unix",
    ))
}
