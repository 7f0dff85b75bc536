/// Local interface selection
///
/// Boards ship on a class C subnet; the host interface that can reach a
/// board is the one sharing its first three octets. Enumerating interfaces
/// is left to the caller.
use std::net::Ipv4Addr;

/// True when both dotted quads parse and agree on their first three octets
pub fn ip_address_matching(sensor: &str, local: &str) -> bool {
    match (sensor.parse::<Ipv4Addr>(), local.parse::<Ipv4Addr>()) {
        (Ok(sensor), Ok(local)) => sensor.octets()[..3] == local.octets()[..3],
        _ => false,
    }
}

/// First local address on the sensor's subnet
pub fn search_address_on_list<'a, S: AsRef<str>>(sensor: &str, locals: &'a [S]) -> Option<&'a str> {
    locals
        .iter()
        .map(AsRef::as_ref)
        .find(|local| ip_address_matching(sensor, local))
}
