use super::{HostContext, HostTool, bounded_count, linux_only, run_command};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};
use crate::tools::traits::ToolFuture;
use crate::tools::types::{ToolArguments, ToolDescriptor, ToolError, ToolOutput};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Socket states `ss` prints; used to find the state column whether or not a
/// `Netid` column precedes it.
const SOCKET_STATES: &[&str] = &[
    "LISTEN",
    "UNCONN",
    "ESTAB",
    "SYN-SENT",
    "SYN-RECV",
    "FIN-WAIT-1",
    "FIN-WAIT-2",
    "TIME-WAIT",
    "CLOSE-WAIT",
    "LAST-ACK",
    "CLOSING",
    "CLOSE",
];

pub(super) fn tools(ctx: &Arc<HostContext>) -> Vec<HostTool> {
    vec![
        HostTool::new(
            ToolDescriptor::read_only(
                "get_open_ports",
                "List listening TCP and UDP sockets with the owning process. \
                 Useful for detecting unauthorized services.",
                InputSchema::empty(),
            ),
            ctx,
            open_ports,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_active_connections",
                "List established TCP connections and flag remote peers outside \
                 private address ranges.",
                InputSchema::empty(),
            ),
            ctx,
            active_connections,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_firewall_status",
                "Report the host firewall (ufw) status and rules.",
                InputSchema::empty(),
            ),
            ctx,
            firewall_status,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_auth_logs",
                "Return the most recent lines of the authentication log \
                 (login failures, sudo use).",
                InputSchema::empty().field(
                    FieldSpec::optional("count", FieldKind::Integer)
                        .describe("Number of lines to return (1-200, default 5)"),
                ),
            ),
            ctx,
            auth_logs,
        ),
        HostTool::new(
            ToolDescriptor::read_only(
                "get_network_info",
                "List network interfaces with their addresses and traffic counters \
                 (bytes, packets, errors, drops since boot).",
                InputSchema::empty(),
            ),
            ctx,
            network_info,
        ),
    ]
}

fn open_ports<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_open_ports")?;
        let stdout = run_command("ss", &["-H", "-lntup"], ctx.command_timeout).await?;
        let sockets: Vec<SocketEntry> = stdout.lines().filter_map(parse_ss_line).collect();
        let ports: Vec<_> = sockets
            .iter()
            .map(|socket| {
                json!({
                    "protocol": socket.protocol,
                    "address": socket.local_address,
                    "port": socket.local_port,
                    "process": socket.process.as_deref().unwrap_or("unknown"),
                    "pid": socket.pid,
                })
            })
            .collect();
        Ok(ToolOutput::json(json!(ports)))
    })
}

fn active_connections<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_active_connections")?;
        let stdout = run_command("ss", &["-H", "-tanp"], ctx.command_timeout).await?;
        let connections: Vec<_> = stdout
            .lines()
            .filter_map(parse_ss_line)
            .filter(|socket| socket.state == "ESTAB")
            .map(|socket| {
                let external = socket
                    .peer_address
                    .parse::<IpAddr>()
                    .is_ok_and(|ip| !is_internal(ip));
                json!({
                    "local": format!("{}:{}", socket.local_address, socket.local_port),
                    "remote": format!("{}:{}", socket.peer_address, socket.peer_port),
                    "external": external,
                    "process": socket.process.as_deref().unwrap_or("unknown"),
                    "pid": socket.pid,
                })
            })
            .collect();
        Ok(ToolOutput::json(json!(connections)))
    })
}

fn firewall_status<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_firewall_status")?;
        let stdout = run_command("ufw", &["status", "verbose"], ctx.command_timeout)
            .await
            .map_err(|err| {
                if err.message.contains("root") {
                    ToolError::execution(format!(
                        "{}; reading firewall status requires root",
                        err.message
                    ))
                } else {
                    err
                }
            })?;
        let active = parse_ufw_active(&stdout);
        Ok(ToolOutput::json(json!({
            "firewall": "ufw",
            "active": active,
            "details": stdout.trim(),
        })))
    })
}

fn auth_logs<'a>(ctx: &'a HostContext, arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let count = bounded_count(arguments, "count", 5, 1, 200)?;
        let path = &ctx.auth_log_path;
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ToolError::execution(format!(
                    "permission denied reading {}; run as root to inspect authentication logs",
                    path.display()
                )));
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::unavailable(format!(
                    "{} does not exist on this host",
                    path.display()
                )));
            }
            Err(error) => {
                return Err(ToolError::execution(format!(
                    "failed to read {}: {error}",
                    path.display()
                )));
            }
        };

        let lines = tail_lines(&text, usize::try_from(count).unwrap_or(usize::MAX));
        if lines.is_empty() {
            return Ok(ToolOutput::text("No authentication log entries found."));
        }
        Ok(ToolOutput::text(lines.join("\n")))
    })
}

fn network_info<'a>(ctx: &'a HostContext, _arguments: &'a ToolArguments) -> ToolFuture<'a> {
    Box::pin(async move {
        linux_only("get_network_info")?;
        let text = tokio::fs::read_to_string("/proc/net/dev")
            .await
            .map_err(|e| ToolError::execution(format!("failed to read /proc/net/dev: {e}")))?;
        let counters = parse_net_dev(&text);

        let links = match run_command("ip", &["-j", "addr"], ctx.command_timeout).await {
            Ok(stdout) => serde_json::from_str::<Vec<IpLink>>(&stdout).unwrap_or_else(|error| {
                tracing::debug!(%error, "unexpected `ip -j addr` output");
                Vec::new()
            }),
            Err(error) => {
                tracing::debug!(%error, "interface addresses unavailable");
                Vec::new()
            }
        };

        let interfaces = merge_interfaces(counters, links);
        let rx_bytes: u64 = interfaces.iter().map(|i| i.counters.rx_bytes).sum();
        let tx_bytes: u64 = interfaces.iter().map(|i| i.counters.tx_bytes).sum();
        let interfaces = serde_json::to_value(&interfaces)
            .map_err(|e| ToolError::execution(format!("failed to serialize interfaces: {e}")))?;
        Ok(ToolOutput::json(json!({
            "rx_bytes": rx_bytes,
            "tx_bytes": tx_bytes,
            "interfaces": interfaces,
        })))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct InterfaceCounters {
    rx_bytes: u64,
    rx_packets: u64,
    rx_errors: u64,
    rx_dropped: u64,
    tx_bytes: u64,
    tx_packets: u64,
    tx_errors: u64,
    tx_dropped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct NetworkInterface {
    name: String,
    state: Option<String>,
    addresses: Vec<String>,
    #[serde(flatten)]
    counters: InterfaceCounters,
}

/// One entry of `ip -j addr`.
#[derive(Debug, Deserialize)]
struct IpLink {
    ifname: String,
    #[serde(default)]
    operstate: Option<String>,
    #[serde(default)]
    addr_info: Vec<IpAddrInfo>,
}

#[derive(Debug, Deserialize)]
struct IpAddrInfo {
    local: String,
    prefixlen: u8,
}

/// Parse `/proc/net/dev`: two header lines, then `iface: <8 rx> <8 tx>`.
fn parse_net_dev(text: &str) -> Vec<(String, InterfaceCounters)> {
    text.lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let values: Vec<u64> = rest
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .ok()?;
            if values.len() < 16 {
                return None;
            }
            Some((
                name.trim().to_string(),
                InterfaceCounters {
                    rx_bytes: values[0],
                    rx_packets: values[1],
                    rx_errors: values[2],
                    rx_dropped: values[3],
                    tx_bytes: values[8],
                    tx_packets: values[9],
                    tx_errors: values[10],
                    tx_dropped: values[11],
                },
            ))
        })
        .collect()
}

/// Join counters with addresses by interface name, keeping `/proc/net/dev` order.
fn merge_interfaces(
    counters: Vec<(String, InterfaceCounters)>,
    links: Vec<IpLink>,
) -> Vec<NetworkInterface> {
    let mut links: HashMap<String, IpLink> = links
        .into_iter()
        .map(|link| (link.ifname.clone(), link))
        .collect();
    counters
        .into_iter()
        .map(|(name, counters)| {
            let link = links.remove(&name);
            let addresses = link
                .as_ref()
                .map(|link| {
                    link.addr_info
                        .iter()
                        .map(|addr| format!("{}/{}", addr.local, addr.prefixlen))
                        .collect()
                })
                .unwrap_or_default();
            NetworkInterface {
                state: link.and_then(|link| link.operstate),
                name,
                addresses,
                counters,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SocketEntry {
    protocol: Option<String>,
    state: String,
    local_address: String,
    local_port: String,
    peer_address: String,
    peer_port: String,
    process: Option<String>,
    pid: Option<u32>,
}

/// Parse one line of `ss -H` output. The `Netid` column is only present when
/// more than one protocol is listed, so columns are located relative to the
/// state token.
fn parse_ss_line(line: &str) -> Option<SocketEntry> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    let state_idx = cols
        .iter()
        .position(|col| SOCKET_STATES.contains(col))?;
    let local = cols.get(state_idx + 3)?;
    let peer = cols.get(state_idx + 4)?;
    let (local_address, local_port) = split_host_port(local)?;
    let (peer_address, peer_port) = split_host_port(peer)?;
    let users = cols.get(state_idx + 5..).map(|rest| rest.join(" "));
    let (process, pid) = users
        .as_deref()
        .map(parse_users_field)
        .unwrap_or((None, None));

    Some(SocketEntry {
        protocol: (state_idx > 0).then(|| cols[0].to_string()),
        state: cols[state_idx].to_string(),
        local_address,
        local_port,
        peer_address,
        peer_port,
        process,
        pid,
    })
}

/// Split `addr:port`, `[v6]:port` and `addr%iface:port` forms.
fn split_host_port(value: &str) -> Option<(String, String)> {
    let (host, port) = value.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = host.split_once('%').map_or(host, |(addr, _iface)| addr);
    Some((host.to_string(), port.to_string()))
}

/// Extract the first process name and pid from `users:(("sshd",pid=812,fd=3))`.
fn parse_users_field(field: &str) -> (Option<String>, Option<u32>) {
    let name = field
        .split_once("((\"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(name, _)| name.to_string());
    let pid = field
        .split_once("pid=")
        .and_then(|(_, rest)| {
            rest.split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|digits| digits.parse().ok())
        });
    (name, pid)
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_internal(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
        }
    }
}

fn parse_ufw_active(stdout: &str) -> bool {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Status:"))
        .is_some_and(|status| status.trim() == "active")
}

fn tail_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}
