//! Host adapter speaking MEL over the host's TCP command port.
//!
//! Each [`Command`] is rendered as one MEL statement and sent to the port.
//! The host answers with the statement's result followed by a NUL byte.

use serde_json::Value;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{value_as_bool, value_to_strings, Command, Host};
use crate::error::{HostError, HostResult};

/// Command port address used when nothing else is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7001";

/// Environment variable overriding the command port address.
pub const COMMAND_PORT_ENV: &str = "RIGBAKE_COMMAND_PORT";

/// Default reply timeout (5 minutes; bakes over long takes are slow).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration for the command port connection.
#[derive(Debug, Clone)]
pub struct CommandPortConfig {
    /// `host:port` of the command port. `None` falls back to the environment.
    pub address: Option<String>,
    /// How long to wait for a reply.
    pub timeout: Duration,
    /// How long to wait for the connection.
    pub connect_timeout: Duration,
}

impl Default for CommandPortConfig {
    fn default() -> Self {
        Self {
            address: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl CommandPortConfig {
    /// Sets the command port address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the reply timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the reply timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Resolves the address: config override, then `RIGBAKE_COMMAND_PORT`,
    /// then the default.
    pub fn resolved_address(&self) -> String {
        if let Some(ref address) = self.address {
            return address.clone();
        }
        match std::env::var(COMMAND_PORT_ENV) {
            Ok(address) if !address.is_empty() => address,
            _ => DEFAULT_ADDRESS.to_string(),
        }
    }
}

/// [`Host`] implementation backed by a live command port connection.
///
/// Replies are matched to commands purely by order. Once an exchange fails
/// partway (timeout, read error, early close) the late reply may still
/// arrive, so the connection is marked unusable and every later call fails
/// with [`HostError::Transport`].
pub struct CommandPortHost {
    stream: TcpStream,
    timeout: Duration,
    pending: Vec<u8>,
    broken: Option<String>,
}

impl CommandPortHost {
    /// Connects to the command port.
    pub fn connect(config: &CommandPortConfig) -> HostResult<Self> {
        let address = config.resolved_address();
        let connect_err = |source| HostError::ConnectFailed {
            address: address.clone(),
            source,
        };

        let socket_addr = address
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| connect_err(std::io::Error::from(ErrorKind::AddrNotAvailable)))?;
        let stream =
            TcpStream::connect_timeout(&socket_addr, config.connect_timeout).map_err(connect_err)?;
        stream.set_read_timeout(Some(config.timeout))?;
        stream.set_nodelay(true)?;

        log::debug!("connected to command port {}", address);
        Ok(Self {
            stream,
            timeout: config.timeout,
            pending: Vec::new(),
            broken: None,
        })
    }

    /// Queries the host application version string.
    pub fn version(&mut self) -> HostResult<String> {
        let reply = self.run_command(&Command::new("about").switch("version"))?;
        Ok(super::value_as_string(&reply).unwrap_or_default())
    }

    /// Returns true while replies can still be paired with commands.
    pub fn is_usable(&self) -> bool {
        self.broken.is_none()
    }

    fn send(&mut self, name: &str, mel: &str) -> HostResult<Value> {
        if let Some(reason) = &self.broken {
            return Err(HostError::transport(reason.clone()));
        }
        log::debug!("mel> {}", mel);
        match self.exchange(mel) {
            Ok(reply) => parse_reply(name, &String::from_utf8_lossy(&reply)),
            Err(e) => {
                let reason = format!("'{}' did not complete: {}", name, e);
                log::warn!("command port out of step, closing: {}", reason);
                self.broken = Some(reason);
                Err(e)
            }
        }
    }

    fn exchange(&mut self, mel: &str) -> HostResult<Vec<u8>> {
        if !self.pending.is_empty() {
            return Err(HostError::transport(format!(
                "{} unread bytes from an earlier reply",
                self.pending.len()
            )));
        }
        self.stream.write_all(mel.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;

        let mut buf = [0u8; 4096];
        loop {
            if let Some(end) = self.pending.iter().position(|b| *b == 0) {
                let reply = self.pending[..end].to_vec();
                self.pending.drain(..=end);
                return Ok(reply);
            }
            let n = match self.stream.read(&mut buf) {
                Ok(0) => return Err(HostError::transport("host closed the connection")),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(HostError::Timeout {
                        timeout: self.timeout,
                    })
                }
                Err(e) => return Err(HostError::Io(e)),
            };
            self.pending.extend_from_slice(&buf[..n]);
        }
    }
}

impl Host for CommandPortHost {
    fn object_exists(&mut self, name: &str) -> HostResult<bool> {
        let reply = self.run_command(&Command::new("objExists").arg(name))?;
        Ok(value_as_bool(&reply))
    }

    fn get_attribute(&mut self, plug: &str) -> HostResult<Value> {
        self.run_command(&Command::new("getAttr").arg(plug))
    }

    fn set_attribute(&mut self, plug: &str, value: &Value) -> HostResult<()> {
        let mut cmd = Command::new("setAttr");
        if value.is_string() {
            cmd = cmd.flag("type", "string");
        }
        self.run_command(&cmd.arg(plug).arg(value.clone()))
            .map_err(|e| match e {
                HostError::CommandRejected { message, .. } => HostError::attribute(plug, message),
                other => other,
            })?;
        Ok(())
    }

    fn is_attribute_locked(&mut self, plug: &str) -> HostResult<bool> {
        let reply = self
            .run_command(&Command::new("getAttr").switch("lock").arg(plug))
            .map_err(|e| match e {
                HostError::CommandRejected { message, .. } => HostError::attribute(plug, message),
                other => other,
            })?;
        Ok(value_as_bool(&reply))
    }

    fn selection(&mut self) -> HostResult<Vec<String>> {
        let reply = self.run_command(&Command::new("ls").switch("selection"))?;
        Ok(value_to_strings(&reply))
    }

    fn select(&mut self, nodes: &[String]) -> HostResult<()> {
        let cmd = if nodes.is_empty() {
            Command::new("select").switch("clear")
        } else {
            Command::new("select")
                .switch("replace")
                .args(nodes.iter().cloned())
        };
        self.run_command(&cmd)?;
        Ok(())
    }

    fn run_command(&mut self, command: &Command) -> HostResult<Value> {
        let mel = render_mel(command);
        self.send(command.name(), &mel)
    }
}

/// Renders a command as a single MEL statement.
pub fn render_mel(command: &Command) -> String {
    let mut out = String::from(command.name());
    for (flag, value) in command.flags() {
        out.push_str(" -");
        out.push_str(flag);
        if let Some(value) = value {
            push_mel_value(&mut out, value);
        }
    }
    for arg in command.arguments() {
        push_mel_value(&mut out, arg);
    }
    out.push(';');
    out
}

fn push_mel_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                push_mel_value(out, item);
            }
        }
        Value::String(s) => {
            out.push_str(" \"");
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        other => {
            out.push(' ');
            out.push_str(&other.to_string());
        }
    }
}

/// Parses a raw command port reply.
///
/// Error replies become [`HostError::CommandRejected`]; tab-separated
/// replies become arrays; numeric text becomes numbers.
pub fn parse_reply(command: &str, raw: &str) -> HostResult<Value> {
    let text = raw.trim_end_matches(['\0', '\n', '\r']);

    for marker in ["// Error: ", "Error: "] {
        if let Some(message) = text.trim_start().strip_prefix(marker) {
            return Err(HostError::rejected(command, message.trim()));
        }
    }

    if text.is_empty() {
        return Ok(Value::Null);
    }
    if text.contains('\t') {
        return Ok(Value::Array(
            text.split('\t')
                .filter(|item| !item.is_empty())
                .map(parse_scalar)
                .collect(),
        ));
    }
    Ok(parse_scalar(text))
}

fn parse_scalar(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigbake_mapping::CodedError;
    use serde_json::json;
    use std::net::TcpListener;

    #[test]
    fn test_render_mel() {
        let cmd = Command::new("setCharacterObject")
            .arg("take1:Hip")
            .arg("MocapCharacter1")
            .arg(1)
            .arg(0);
        assert_eq!(
            render_mel(&cmd),
            r#"setCharacterObject "take1:Hip" "MocapCharacter1" 1 0;"#
        );

        let cmd = Command::new("bakeResults")
            .flag("simulation", true)
            .flag("time", "1:48")
            .flag("sampleBy", 1)
            .args(vec!["a", "b"]);
        assert_eq!(
            render_mel(&cmd),
            r#"bakeResults -simulation true -time "1:48" -sampleBy 1 "a" "b";"#
        );

        let cmd = Command::new("playbackOptions").switch("query").switch("minTime");
        assert_eq!(render_mel(&cmd), "playbackOptions -query -minTime;");
    }

    #[test]
    fn test_render_escapes_strings() {
        let cmd = Command::new("print").arg("say \"hi\"\\");
        assert_eq!(render_mel(&cmd), r#"print "say \"hi\"\\";"#);
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply("x", "").unwrap(), Value::Null);
        assert_eq!(parse_reply("x", "1\n").unwrap(), json!(1));
        assert_eq!(parse_reply("x", "48.5").unwrap(), json!(48.5));
        assert_eq!(parse_reply("x", "Hips").unwrap(), json!("Hips"));
        assert_eq!(
            parse_reply("x", "a:b\tc:d\t").unwrap(),
            json!(["a:b", "c:d"])
        );
        assert_eq!(parse_reply("x", "1\t5\t48").unwrap(), json!([1, 5, 48]));
    }

    #[test]
    fn test_parse_error_reply() {
        let err = parse_reply("setAttr", "// Error: No object matches name: foo\n").unwrap_err();
        match err {
            HostError::CommandRejected { command, message } => {
                assert_eq!(command, "setAttr");
                assert_eq!(message, "No object matches name: foo");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_config_builder() {
        let config = CommandPortConfig::default()
            .address("10.0.0.5:7002")
            .timeout_secs(30);
        assert_eq!(config.resolved_address(), "10.0.0.5:7002");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_round_trip_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let n = conn.read(&mut buf).unwrap();
            let received = String::from_utf8_lossy(&buf[..n]).to_string();
            conn.write_all(b"1\n\0").unwrap();
            received
        });

        let config = CommandPortConfig::default().address(address).timeout_secs(5);
        let mut host = CommandPortHost::connect(&config).unwrap();
        assert!(host.object_exists("take1:Hip").unwrap());

        let received = server.join().unwrap();
        assert_eq!(received.trim_end(), r#"objExists "take1:Hip";"#);
    }

    #[test]
    fn test_reply_split_across_reads() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            conn.read(&mut buf).unwrap();
            conn.write_all(b"Hi").unwrap();
            conn.flush().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            conn.write_all(b"ps\n\0").unwrap();
            conn.read(&mut buf).unwrap();
            conn.write_all(b"0\n\0").unwrap();
        });

        let config = CommandPortConfig::default().address(address).timeout_secs(5);
        let mut host = CommandPortHost::connect(&config).unwrap();
        let name = host.run_command(&Command::new("GetHIKNodeName").arg(1)).unwrap();
        assert_eq!(name, json!("Hips"));
        assert!(!host.object_exists("take1:Hip").unwrap());
        assert!(host.is_usable());
        server.join().unwrap();
    }

    #[test]
    fn test_late_reply_is_never_paired_with_the_next_command() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            conn.read(&mut buf).unwrap();
            std::thread::sleep(Duration::from_millis(300));
            let _ = conn.write_all(b"1\n\0");
            conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
            // Anything read now would be a second command.
            matches!(conn.read(&mut buf), Ok(n) if n > 0)
        });

        let config = CommandPortConfig::default()
            .address(address)
            .timeout(Duration::from_millis(100));
        let mut host = CommandPortHost::connect(&config).unwrap();

        let first = host.object_exists("a").unwrap_err();
        assert!(matches!(first, HostError::Timeout { .. }));
        assert!(first.to_string().contains("100ms"));
        assert!(!host.is_usable());

        std::thread::sleep(Duration::from_millis(400));
        let second = host.object_exists("b").unwrap_err();
        assert!(matches!(second, HostError::Transport { .. }));
        assert_eq!(second.code(), "HOST_009");

        drop(host);
        assert!(!server.join().unwrap());
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let address = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let config = CommandPortConfig::default().address(address);
        let err = CommandPortHost::connect(&config).err().unwrap();
        assert!(matches!(err, HostError::ConnectFailed { .. }));
    }
}
