//! Remote target value object

use std::fmt;
use std::time::Duration;

/// Host key policy passed to `ssh -o StrictHostKeyChecking=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyChecking {
    /// Controllers are reimaged often; keys are not checked
    #[default]
    No,
    AcceptNew,
    Yes,
}

impl HostKeyChecking {
    pub fn as_ssh_option(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::AcceptNew => "accept-new",
            Self::Yes => "yes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no" => Some(Self::No),
            "accept-new" => Some(Self::AcceptNew),
            "yes" => Some(Self::Yes),
            _ => None,
        }
    }
}

/// Where and how to connect for one deploy.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    /// `None` means key-based auth only
    pub password: Option<String>,
    pub port: u16,
    /// Bound on establishing the session
    pub connect_timeout: Duration,
    /// Wall-clock bound on every remote command and upload
    pub command_timeout: Duration,
    pub host_key_checking: HostKeyChecking,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: None,
            port: 22,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(300),
            host_key_checking: HostKeyChecking::default(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_host_key_checking(mut self, policy: HostKeyChecking) -> Self {
        self.host_key_checking = policy;
        self
    }

    /// `user@host` destination for ssh/sftp.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

// Keep the password out of logs and panic messages.
impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .field("host_key_checking", &self.host_key_checking)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_joins_user_and_host() {
        let target = RemoteTarget::new("roborio-1234-frc.local", "lvuser");
        assert_eq!(target.destination(), "lvuser@roborio-1234-frc.local");
        assert_eq!(target.port, 22);
    }

    #[test]
    fn debug_redacts_password() {
        let target = RemoteTarget::new("10.12.34.2", "admin").with_password("hunter2");
        let debug = format!("{:?}", target);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn host_key_policy_parses_ssh_values() {
        assert_eq!(HostKeyChecking::parse("accept-new"), Some(HostKeyChecking::AcceptNew));
        assert_eq!(HostKeyChecking::parse("maybe"), None);
        assert_eq!(HostKeyChecking::Yes.as_ssh_option(), "yes");
    }
}
