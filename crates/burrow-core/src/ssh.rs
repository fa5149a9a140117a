//! SSH daemon bootstrap for new containers
//!
//! The container command is a POSIX shell script that turns any image with
//! an OpenSSH server into a password-login box. Images without `sshd` just
//! idle so they can still be inspected and removed.

/// Port sshd listens on inside every container
pub const SSH_PORT: u16 = 2222;

/// Container command for the sshd bootstrap script
pub fn bootstrap_command(user: &str, password: &str, port: u16) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        bootstrap_script(user, password, port),
    ]
}

/// Shell script that creates `user`, sets its password, configures sshd on
/// `port` and execs it in the foreground.
///
/// `user` and `password` are interpolated verbatim, so callers pass a
/// validated user name and a hex password.
pub fn bootstrap_script(user: &str, password: &str, port: u16) -> String {
    let config = "/etc/ssh/sshd_config";
    [
        "set -e".to_string(),
        "SSHD=$(command -v sshd || echo /usr/sbin/sshd)".to_string(),
        "if [ -x \"$SSHD\" ]; then".to_string(),
        format!("  if ! id -u {user} >/dev/null 2>&1; then"),
        format!("    (command -v useradd >/dev/null 2>&1 && useradd -m -s /bin/bash {user}) ||"),
        format!("    (command -v adduser >/dev/null 2>&1 && adduser -D -s /bin/bash {user}) || true"),
        "  fi".to_string(),
        format!("  echo '{user}:{password}' | chpasswd"),
        format!("  if [ -f {config} ]; then"),
        format!("    sed -i 's/^#\\?PasswordAuthentication.*/PasswordAuthentication yes/' {config}"),
        format!("    sed -i 's/^#\\?PermitRootLogin.*/PermitRootLogin no/' {config}"),
        format!("    if grep -q '^#\\?Port ' {config}; then"),
        format!("      sed -i 's/^#\\?Port .*/Port {port}/' {config}"),
        "    else".to_string(),
        format!("      echo 'Port {port}' >> {config}"),
        "    fi".to_string(),
        "  fi".to_string(),
        "  mkdir -p /var/run/sshd".to_string(),
        "  ssh-keygen -A".to_string(),
        format!("  exec \"$SSHD\" -D -e -p {port}"),
        "fi".to_string(),
        "while :; do sleep 3600; done".to_string(),
    ]
    .join("\n")
}
