//! Administrator privilege detection
//!
//! Child processes inherit the token of this process, so "run the script
//! elevated" reduces to "are we elevated". The runner refuses to start a
//! script when the answer is no and the policy requires elevation.

use crate::settings::ElevationPolicy;

/// Whether the current process runs with administrator rights
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            tracing::warn!("OpenProcessToken failed; treating process as not elevated");
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut returned = 0u32;
        let queried = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut TOKEN_ELEVATION as *mut std::ffi::c_void),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        );
        let _ = CloseHandle(token);

        queried.is_ok() && elevation.TokenIsElevated != 0
    }
}

/// Whether the current process runs as root
#[cfg(unix)]
pub fn is_elevated() -> bool {
    // geteuid cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(any(windows, unix)))]
pub fn is_elevated() -> bool {
    false
}

/// Decides whether a script may be started under `policy`
#[derive(Debug, Clone, Copy)]
pub struct ElevationGate {
    policy: ElevationPolicy,
}

impl ElevationGate {
    pub fn new(policy: ElevationPolicy) -> Self {
        Self { policy }
    }

    /// True when a script may start now
    pub fn permits_start(&self) -> bool {
        match self.policy {
            ElevationPolicy::Inherit => true,
            ElevationPolicy::Require => is_elevated(),
        }
    }
}
