//! Process level setup around the monitor: the wake keyboard, privilege
//! drop and systemd readiness.

use anyhow::{bail, Context, Result};

use crate::core::relay::WakeInput;

#[cfg(target_os = "linux")]
pub fn open_wake_keyboard() -> Result<Box<dyn WakeInput>> {
    let keyboard = crate::core::relay::WakeKeyboard::create()
        .context("Failed to create uinput device (is /dev/uinput writable?)")?;
    Ok(Box::new(keyboard))
}

#[cfg(not(target_os = "linux"))]
pub fn open_wake_keyboard() -> Result<Box<dyn WakeInput>> {
    bail!("Wake keypress needs Linux uinput")
}

/// Switch the process to `user` and their primary group.
#[cfg(unix)]
pub fn drop_privileges(user: &str) -> Result<()> {
    use nix::unistd::{setgid, setuid, User};

    let Some(account) =
        User::from_name(user).with_context(|| format!("Failed to look up user: {user}"))?
    else {
        bail!("No such user: {user}");
    };

    #[cfg(target_os = "linux")]
    nix::unistd::setgroups(&[account.gid]).context("Failed to set supplementary groups")?;
    setgid(account.gid).context("Failed to set group id")?;
    setuid(account.uid).context("Failed to set user id")?;

    log::info!("Running as {user} (uid {}, gid {})", account.uid, account.gid);
    Ok(())
}

#[cfg(not(unix))]
pub fn drop_privileges(user: &str) -> Result<()> {
    bail!("Cannot switch to user {user} on this platform")
}

/// Tell systemd startup is complete. A no-op outside a notify service.
#[cfg(target_os = "linux")]
pub fn notify_ready() -> Result<()> {
    sd_notify::notify(false, &[sd_notify::NotifyState::Ready])
        .context("Failed to notify systemd")
}

#[cfg(not(target_os = "linux"))]
pub fn notify_ready() -> Result<()> {
    log::warn!("systemd notification is only available on Linux");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_unknown_user_is_an_error() {
        let err = drop_privileges("nfc-bridge-no-such-user").unwrap_err();
        assert!(err.to_string().contains("nfc-bridge-no-such-user"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_notify_outside_systemd() {
        std::env::remove_var("NOTIFY_SOCKET");
        assert!(notify_ready().is_ok());
    }
}
