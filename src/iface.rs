use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface as DatalinkInterface;
use pnet::ipnetwork::IpNetwork;

/// Name prefixes of virtualization, bridge and tunnel interfaces.
pub const VIRTUAL_PREFIXES: &[&str] = &[
    "vnet", "veth", "docker", "br-", "virbr", "tun", "tap",
    "vmnet", "vmbr", "lo", "ovs", "ifb", "docker0",
];

/// One IPv4 address of a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastTarget {
    pub interface_name: String,
    pub source_address: Ipv4Addr,
    pub broadcast_address: Ipv4Addr,
}

impl fmt::Display for BroadcastTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.interface_name, self.source_address, self.broadcast_address)
    }
}

/// Where interface surveys come from. The dispatcher only sees this seam.
pub trait InterfaceSource: Send + Sync {
    fn survey(&self) -> Vec<NetworkInterface>;
}

/// The host's interfaces as reported by the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn survey(&self) -> Vec<NetworkInterface> {
        survey_interfaces()
    }
}

pub fn is_virtual(name: &str) -> bool {
    let name = name.to_lowercase();
    VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Every non-loopback IPv4 address of every interface, skipping link-local ones.
pub fn survey_interfaces() -> Vec<NetworkInterface> {
    let interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces()
        .iter()
        .flat_map(ipv4_addresses)
        .filter(|net| !net.internal && !net.address.is_link_local())
        .collect();
    log::trace!("surveyed {} IPv4 address(es)", interfaces.len());
    interfaces
}

fn ipv4_addresses(iface: &DatalinkInterface) -> Vec<NetworkInterface> {
    iface.ips.iter()
        .filter_map(|net| match net {
            IpNetwork::V4(v4) => Some(NetworkInterface {
                name: iface.name.clone(),
                address: v4.ip(),
                netmask: v4.mask(),
                internal: iface.is_loopback(),
            }),
            IpNetwork::V6(_) => None,
        })
        .collect()
}

pub fn broadcast_addr(address: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let addr = u32::from(address);
    let mask = u32::from(netmask);
    Ipv4Addr::from((addr & mask) | !mask)
}

/// Targets for every eligible interface. A target whose broadcast address
/// degenerates to 255.255.255.255 is dropped.
pub fn broadcast_targets(interfaces: &[NetworkInterface]) -> Vec<BroadcastTarget> {
    interfaces.iter()
        .filter(|net| !net.internal && !is_virtual(&net.name))
        .filter_map(|net| {
            let broadcast = broadcast_addr(net.address, net.netmask);
            if broadcast == Ipv4Addr::BROADCAST {
                log::warn!("[survey][{}] {}/{} yields the limited broadcast address, skipping",
                    net.name, net.address, net.netmask);
                return None;
            }
            Some(BroadcastTarget {
                interface_name: net.name.clone(),
                source_address: net.address,
                broadcast_address: broadcast,
            })
        })
        .collect()
}

/// Diagnostic view of one eligible interface address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub cidr: String,
}

pub fn network_summary(interfaces: &[NetworkInterface]) -> Vec<NetworkSummary> {
    interfaces.iter()
        .filter(|net| !net.internal && !is_virtual(&net.name))
        .map(|net| {
            let network = Ipv4Addr::from(u32::from(net.address) & u32::from(net.netmask));
            let prefix = u32::from(net.netmask).count_ones();
            NetworkSummary {
                name: net.name.clone(),
                address: net.address,
                netmask: net.netmask,
                cidr: format!("{network}/{prefix}"),
            }
        })
        .collect()
}
