//! # Structured response parsers
//!
//! Extract scan results, local addresses, soft AP clients and ping times from the free text
//! responses of the module. All parsers borrow the receive buffer and never allocate.
use crate::responses::LINE_END;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use embedded_nal::Ipv4Addr;
use heapless::Vec;

/// Max. number of access points returned by a scan
pub const ACCESS_POINT_CAPACITY: usize = 20;

/// Round trip time returned if no ping response was received
pub const PING_TIMEOUT: i32 = -1;

/// Returns the index of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    if haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Returns the content between the first `prefix` and the following `suffix`
pub(crate) fn between<'a>(haystack: &'a [u8], prefix: &[u8], suffix: &[u8]) -> Option<&'a [u8]> {
    let start = find(haystack, prefix)? + prefix.len();
    let length = find(&haystack[start..], suffix)?;
    Some(&haystack[start..start + length])
}

/// Encryption of an access point, as reported by scans and used for the soft AP configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encryption {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    /// ESP-AT can not join WPA2 Enterprise networks
    Wpa2Enterprise,
    /// Code not known by this crate
    Unknown(u8),
}

impl From<u8> for Encryption {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Open,
            1 => Self::Wep,
            2 => Self::WpaPsk,
            3 => Self::Wpa2Psk,
            4 => Self::WpaWpa2Psk,
            5 => Self::Wpa2Enterprise,
            other => Self::Unknown(other),
        }
    }
}

impl From<Encryption> for u8 {
    fn from(encryption: Encryption) -> Self {
        match encryption {
            Encryption::Open => 0,
            Encryption::Wep => 1,
            Encryption::WpaPsk => 2,
            Encryption::Wpa2Psk => 3,
            Encryption::WpaWpa2Psk => 4,
            Encryption::Wpa2Enterprise => 5,
            Encryption::Unknown(code) => code,
        }
    }
}

/// Access point found by a scan. The SSID borrows the receive buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint<'a> {
    pub encryption: Encryption,
    pub ssid: &'a str,
    /// RSSI in dBm
    pub signal_strength: i8,
}

impl<'a> AccessPoint<'a> {
    /// Decodes the comma separated fields of a single scan entry: encryption, SSID, RSSI.
    /// Further fields (MAC, channel, ...) are ignored.
    fn from_fields(entry: &'a [u8]) -> Self {
        let mut fields = entry.split(|byte| *byte == b',');
        let encryption = fields.next().and_then(parse_number::<u8>).map(Encryption::from);
        let ssid = fields.next().map(unquote).and_then(|ssid| core::str::from_utf8(ssid).ok());
        let signal_strength = fields.next().and_then(parse_number::<i8>);

        Self {
            encryption: encryption.unwrap_or(Encryption::Unknown(u8::MAX)),
            ssid: ssid.unwrap_or_default(),
            signal_strength: signal_strength.unwrap_or_default(),
        }
    }
}

/// Access points in the order of the scan response
#[derive(Clone, Debug, Default)]
pub struct AccessPointList<'a> {
    access_points: Vec<AccessPoint<'a>, ACCESS_POINT_CAPACITY>,
}

impl<'a> AccessPointList<'a> {
    /// Parses a CWLAP response. Every entry is enclosed by parentheses, e.g. `+CWLAP:(3,"Home",-67,...)`
    pub fn parse(response: &'a [u8]) -> Self {
        let mut list = Self::default();
        let mut remaining = response;

        while !list.access_points.is_full() {
            let Some((entry, rest)) = next_parenthesized(remaining) else {
                break;
            };

            // Capacity checked by loop condition
            let _ = list.access_points.push(AccessPoint::from_fields(entry));
            remaining = rest;
        }

        list
    }

    /// Number of access points found
    pub fn size(&self) -> usize {
        self.access_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.access_points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AccessPoint<'a>> {
        self.access_points.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessPoint<'a>> {
        self.access_points.iter()
    }
}

/// Shortest run enclosed by parentheses with a non-empty interior. Returns the interior and the rest after the closing parenthesis.
fn next_parenthesized(buffer: &[u8]) -> Option<(&[u8], &[u8])> {
    let start = buffer.iter().position(|byte| *byte == b'(')? + 1;
    if start + 1 > buffer.len() {
        return None;
    }

    let end = start + 1 + buffer[start + 1..].iter().position(|byte| *byte == b')')?;
    Some((&buffer[start..end], &buffer[end + 1..]))
}

/// MAC address
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);

/// MAC address is not in the colon separated hex format
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidMacAddress;

impl FromStr for MacAddress {
    type Err = InvalidMacAddress;

    fn from_str(encoded: &str) -> Result<Self, Self::Err> {
        let mut address = [0x0; 6];
        let mut octets = encoded.split(':');

        for byte in address.iter_mut() {
            let octet = octets.next().ok_or(InvalidMacAddress)?;
            if octet.len() != 2 {
                return Err(InvalidMacAddress);
            }

            let mut decoded = [0x0; 1];
            base16::decode_slice(octet, &mut decoded).map_err(|_| InvalidMacAddress)?;
            *byte = decoded[0];
        }

        if octets.next().is_some() {
            return Err(InvalidMacAddress);
        }

        Ok(Self(address))
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(":")?;
            }

            let mut encoded = [0x0; 2];
            base16::encode_config_slice(&[*byte], base16::EncodeLower, &mut encoded);
            // Hex digits are always ASCII
            f.write_str(core::str::from_utf8(&encoded).unwrap_or("??"))?;
        }

        Ok(())
    }
}

/// Local addresses of soft AP and station interface.
/// The module just reports the interfaces enabled by the current WIFI mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalInfo {
    pub access_point_ip: Option<Ipv4Addr>,
    pub access_point_mac: Option<MacAddress>,
    pub station_ip: Option<Ipv4Addr>,
    pub station_mac: Option<MacAddress>,
}

impl LocalInfo {
    /// Parses a CIFSR response. Missing addresses are None.
    /// Returns None if no address is present at all or if a present address is invalid.
    pub fn parse(response: &[u8]) -> Option<Self> {
        let info = Self {
            access_point_ip: labeled(response, b"APIP,\"")?,
            access_point_mac: labeled(response, b"APMAC,\"")?,
            station_ip: labeled(response, b"STAIP,\"")?,
            station_mac: labeled(response, b"STAMAC,\"")?,
        };

        if info == Self::default() {
            return None;
        }

        Some(info)
    }
}

/// Parses the quoted value following the given label.
/// Some(None) => label missing, None => label present but value invalid
fn labeled<V: FromStr>(response: &[u8], label: &[u8]) -> Option<Option<V>> {
    let Some(value) = between(response, label, b"\"") else {
        return Some(None);
    };

    let value = core::str::from_utf8(value).ok()?.parse().ok()?;
    Some(Some(value))
}

/// Station connected to the soft AP
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SoftApClient {
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
}

impl SoftApClient {
    /// Parses a single `ip,mac` roster line
    fn parse(line: &[u8]) -> Option<Self> {
        let line = line.strip_prefix(b"+CWLIF:").unwrap_or(line);
        let separator = line.iter().position(|byte| *byte == b',')?;
        let ip = core::str::from_utf8(&line[..separator]).ok()?.parse().ok()?;

        // Newer firmware versions append further fields
        let mac = line[separator + 1..].split(|byte| *byte == b',').next()?;
        let mac = core::str::from_utf8(mac).ok()?.parse().ok()?;

        Some(Self { ip, mac })
    }
}

/// Stations connected to the soft AP, bound to the CWLIF response they were parsed from
#[derive(Copy, Clone, Debug)]
pub struct Roster<'a> {
    response: &'a [u8],
}

impl<'a> Roster<'a> {
    pub fn new(response: &'a [u8]) -> Self {
        Self { response }
    }

    /// Roster lines, terminated by the first blank or status line
    fn lines(&self) -> impl Iterator<Item = &'a [u8]> {
        let response = self.response;
        let mut remaining = response.strip_prefix(LINE_END).unwrap_or(response);

        core::iter::from_fn(move || {
            let end = crate::parser::find(remaining, LINE_END)?;
            let line = &remaining[..end];
            if line.is_empty() || !line.contains(&b',') {
                return None;
            }

            remaining = &remaining[end + LINE_END.len()..];
            Some(line)
        })
    }

    /// Number of connected stations
    pub fn count(&self) -> usize {
        self.lines().count()
    }

    /// Returns the station at the given position
    pub fn get(&self, index: usize) -> Option<SoftApClient> {
        self.lines().nth(index).and_then(SoftApClient::parse)
    }

    pub fn iter(&self) -> impl Iterator<Item = SoftApClient> + 'a {
        let roster = *self;
        roster.lines().filter_map(SoftApClient::parse)
    }
}

/// Extracts the round trip time in ms of a PING response, e.g. `+37` or `+PING:37`.
/// Returns [PING_TIMEOUT] if no valid time was received.
pub fn parse_ping_time(response: &[u8]) -> i32 {
    let Some(token) = between(response, b"+", LINE_END) else {
        return PING_TIMEOUT;
    };

    let token = match token.iter().position(|byte| *byte == b':') {
        Some(separator) => &token[separator + 1..],
        None => token,
    };

    parse_number::<i32>(token).unwrap_or(PING_TIMEOUT)
}

/// Parses a decimal number, surrounding whitespace is ignored
fn parse_number<N: FromStr>(field: &[u8]) -> Option<N> {
    core::str::from_utf8(field).ok()?.trim().parse().ok()
}

/// Strips surrounding quotes
fn unquote(field: &[u8]) -> &[u8] {
    let field = field.strip_prefix(b"\"").unwrap_or(field);
    field.strip_suffix(b"\"").unwrap_or(field)
}
