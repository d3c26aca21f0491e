use std::ffi::CStr;

/// Host name of this machine, used as the default lease identity.
pub fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname NUL-terminates on
    // success when the name fits, and we force a terminator below regardless.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    if let Some(last) = buf.last_mut() {
        *last = 0;
    }
    let name = CStr::from_bytes_until_nul(&buf).ok()?.to_str().ok()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Wall clock as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
