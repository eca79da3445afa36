//! Target discovery strategies
//!
//! Builds the per-run target set from exactly one source: the iSCSI session
//! table, the OS connection table, or a single override address. The
//! resulting set is deduplicated, numerically sorted, and already scoped to
//! the local network segment.

use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::net::{parse_ipv4, NetworkScope};
use regex::Regex;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};

static SESSION_IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tcp:.*?(\d+\.\d+\.\d+\.\d+)").expect("static regex"));

/// Discovery source for a run; sources are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Query the iSCSI session table (`iscsiadm -m session`)
    SessionTable,
    /// Scan established TCP connections for the session remote port
    ConnectionTable,
    /// Single caller-supplied target, bypassing subnet filtering
    Override(Ipv4Addr),
}

/// Discovers the candidate target set for a run
pub struct TargetDiscovery {
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
}

impl TargetDiscovery {
    /// Create a discovery component over the given command runner
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Logger) -> Self {
        Self { runner, logger }
    }

    /// Produce the scoped, sorted, deduplicated target set.
    ///
    /// An empty result from the session or connection table is fatal and
    /// occurs before any remote side effect.
    pub async fn discover(
        &self,
        source: TargetSource,
        scope: NetworkScope,
    ) -> Result<Vec<Ipv4Addr>> {
        let targets = match source {
            TargetSource::SessionTable => self.from_session_table(scope).await?,
            TargetSource::ConnectionTable => self.from_connection_table(scope).await?,
            TargetSource::Override(ip) => vec![ip],
        };

        if targets.is_empty() {
            return Err(AppError::no_targets(match source {
                TargetSource::SessionTable => "no in-scope iSCSI session addresses",
                TargetSource::ConnectionTable => "no in-scope established connections",
                TargetSource::Override(_) => "empty override target",
            }));
        }

        Ok(targets)
    }

    /// Session-table strategy: extract IPv4 addresses from `tcp:` lines
    async fn from_session_table(&self, scope: NetworkScope) -> Result<Vec<Ipv4Addr>> {
        let output = self.runner.run("iscsiadm", &to_args(&["-m", "session"])).await?;

        if !output.success() {
            return Err(AppError::no_targets(format!(
                "iscsiadm -m session exited with {:?}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        let mut targets = BTreeSet::new();
        for line in output.stdout.lines() {
            if let Some(captures) = SESSION_IP_RE.captures(line) {
                // Regex shape-matched the token; out-of-range octets are a
                // data-integrity problem and abort the run.
                let ip = parse_ipv4(&captures[1])?;
                if scope.contains(ip) {
                    targets.insert(ip);
                }
            }
        }

        Ok(targets.into_iter().collect())
    }

    /// Connection-table strategy: keep established peers on the session port
    async fn from_connection_table(&self, scope: NetworkScope) -> Result<Vec<Ipv4Addr>> {
        let args = to_args(&["-H", "-t", "-n", "-4", "state", "established"]);
        let output = self.runner.run("ss", &args).await?;

        if !output.success() {
            return Err(AppError::no_targets(format!(
                "ss exited with {:?}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        let mut targets = BTreeSet::new();
        for line in output.stdout.lines() {
            let Some((ip, port)) = parse_peer_column(line) else {
                if !line.trim().is_empty() {
                    self.logger
                        .debug("discovery", format!("skipping connection row: {}", line.trim()));
                }
                continue;
            };

            if port != crate::defaults::SESSION_REMOTE_PORT {
                continue;
            }

            match parse_ipv4(ip) {
                Ok(ip) if scope.contains(ip) => {
                    targets.insert(ip);
                }
                Ok(_) => {}
                Err(_) => {
                    // A single unparsable peer row is logged and skipped
                    self.logger
                        .warn("discovery", format!("malformed peer address: {}", ip));
                }
            }
        }

        Ok(targets.into_iter().collect())
    }
}

/// Extract (peer ip, peer port) from an `ss -H -t -n -4` row.
///
/// Row shape: `recv-q send-q local-addr:port peer-addr:port [process]`.
fn parse_peer_column(line: &str) -> Option<(&str, u16)> {
    let peer = line.split_whitespace().nth(3)?;
    let (ip, port) = peer.rsplit_once(':')?;
    Some((ip, port.parse().ok()?))
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::logging::{LogLevel, Logger};
    use crate::net::InterfaceInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted runner keyed by program name
    struct ScriptedRunner {
        outputs: HashMap<String, CommandOutput>,
    }

    impl ScriptedRunner {
        fn new(entries: &[(&str, CommandOutput)]) -> Self {
            Self {
                outputs: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, _args: &[String]) -> Result<CommandOutput> {
            self.outputs
                .get(program)
                .cloned()
                .ok_or_else(|| AppError::io(format!("unexpected program: {}", program)))
        }
    }

    fn quiet_logger() -> Logger {
        Logger::new(LogLevel::Error, false, false)
    }

    fn subnet_10_0_0() -> NetworkScope {
        NetworkScope::from_interface(&InterfaceInfo::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(255, 255, 255, 0),
        ))
    }

    const SESSION_OUTPUT: &str = "\
tcp: [1] 10.0.0.10:3260,1 iqn.2008-05.com.example:target1 (non-flash)
tcp: [2] 10.0.0.2:3260,1 iqn.2008-05.com.example:target2 (non-flash)
tcp: [3] 192.168.1.2:3260,1 iqn.2008-05.com.example:target3 (non-flash)
";

    #[tokio::test]
    async fn test_session_table_sorted_numerically_and_scoped() {
        let runner = Arc::new(ScriptedRunner::new(&[(
            "iscsiadm",
            CommandOutput::new(Some(0), SESSION_OUTPUT, ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let targets = discovery
            .discover(TargetSource::SessionTable, subnet_10_0_0())
            .await
            .unwrap();

        // 10.0.0.2 sorts before 10.0.0.10; 192.168.1.2 is out of scope
        assert_eq!(
            targets,
            vec![Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 10)]
        );
    }

    #[tokio::test]
    async fn test_session_table_deduplicates() {
        let output = "tcp: [1] 10.0.0.9:3260,1 iqn.a\ntcp: [2] 10.0.0.9:3260,1 iqn.b\n";
        let runner = Arc::new(ScriptedRunner::new(&[(
            "iscsiadm",
            CommandOutput::new(Some(0), output, ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let targets = discovery
            .discover(TargetSource::SessionTable, subnet_10_0_0())
            .await
            .unwrap();
        assert_eq!(targets, vec![Ipv4Addr::new(10, 0, 0, 9)]);
    }

    #[tokio::test]
    async fn test_out_of_range_session_token_is_fatal() {
        let output = "\
tcp: [1] 10.0.0.2:3260,1 iqn.a (non-flash)
tcp: [2] 999.0.0.1:3260,1 iqn.b (non-flash)
";
        let runner = Arc::new(ScriptedRunner::new(&[(
            "iscsiadm",
            CommandOutput::new(Some(0), output, ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let err = discovery
            .discover(TargetSource::SessionTable, subnet_10_0_0())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "ADDRESS");
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_empty_session_table_is_fatal() {
        let runner = Arc::new(ScriptedRunner::new(&[(
            "iscsiadm",
            CommandOutput::new(Some(0), "", ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let err = discovery
            .discover(TargetSource::SessionTable, subnet_10_0_0())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TARGETS");
    }

    const SS_OUTPUT: &str = "\
0      0      10.0.0.5:44812    10.0.0.7:55655
0      0      10.0.0.5:44813    10.0.0.3:55655
0      0      10.0.0.5:38200    10.0.0.9:3260
0      0      10.0.0.5:51000    192.168.1.2:55655
";

    #[tokio::test]
    async fn test_connection_table_filters_port_and_scope() {
        let runner = Arc::new(ScriptedRunner::new(&[(
            "ss",
            CommandOutput::new(Some(0), SS_OUTPUT, ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let targets = discovery
            .discover(TargetSource::ConnectionTable, subnet_10_0_0())
            .await
            .unwrap();

        // 10.0.0.9 is on the wrong port, 192.168.1.2 is out of scope
        assert_eq!(
            targets,
            vec![Ipv4Addr::new(10, 0, 0, 3), Ipv4Addr::new(10, 0, 0, 7)]
        );
    }

    #[tokio::test]
    async fn test_malformed_connection_peer_is_skipped() {
        // One peer with out-of-range octets among two valid rows
        let output = "\
0      0      10.0.0.5:44812    10.0.0.7:55655
0      0      10.0.0.5:44813    300.1.1.1:55655
0      0      10.0.0.5:44814    10.0.0.3:55655
";
        let runner = Arc::new(ScriptedRunner::new(&[(
            "ss",
            CommandOutput::new(Some(0), output, ""),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let targets = discovery
            .discover(TargetSource::ConnectionTable, subnet_10_0_0())
            .await
            .unwrap();

        assert_eq!(
            targets,
            vec![Ipv4Addr::new(10, 0, 0, 3), Ipv4Addr::new(10, 0, 0, 7)]
        );
    }

    #[tokio::test]
    async fn test_override_bypasses_scope() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let off_subnet = Ipv4Addr::new(192, 168, 1, 2);
        let targets = discovery
            .discover(TargetSource::Override(off_subnet), NetworkScope::Unrestricted)
            .await
            .unwrap();
        assert_eq!(targets, vec![off_subnet]);
    }

    #[tokio::test]
    async fn test_failed_session_query_aborts_before_side_effects() {
        let runner = Arc::new(ScriptedRunner::new(&[(
            "iscsiadm",
            CommandOutput::new(Some(21), "", "iscsiadm: No active sessions."),
        )]));
        let discovery = TargetDiscovery::new(runner, quiet_logger());

        let err = discovery
            .discover(TargetSource::SessionTable, subnet_10_0_0())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "TARGETS");
        assert!(err.to_string().contains("No active sessions"));
    }

    #[test]
    fn test_parse_peer_column() {
        let line = "0      0      10.0.0.5:44812    10.0.0.7:55655";
        assert_eq!(parse_peer_column(line), Some(("10.0.0.7", 55655)));
        assert_eq!(parse_peer_column("garbage"), None);
    }
}
