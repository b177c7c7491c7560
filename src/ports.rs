use anyhow::{bail, Context, Result};

use crate::error::ScanError;

/// Which ports a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    /// Every port in `1..=n`.
    Range(u16),
    /// An explicit, deduplicated list in first-seen order.
    List(Vec<u16>),
}

impl PortSelection {
    /// The contiguous range `1..=count`. Counts above 65535 are rejected.
    pub fn first_n(count: u32) -> crate::error::Result<Self> {
        u16::try_from(count)
            .map(PortSelection::Range)
            .map_err(|_| ScanError::InvalidPorts(format!("port count {count} exceeds 65535")))
    }

    /// Parse a list such as `22,80,8000-8010` (see [`parse_ports_str`]).
    pub fn parse_list(s: &str) -> crate::error::Result<Self> {
        let ports =
            parse_ports_str(s).map_err(|e| ScanError::InvalidPorts(format!("{e:#}")))?;
        if ports.is_empty() {
            return Err(ScanError::InvalidPorts("port list is empty".to_string()));
        }
        Ok(PortSelection::List(ports))
    }

    pub fn len(&self) -> usize {
        match self {
            PortSelection::Range(n) => usize::from(*n),
            PortSelection::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u16> + Send + '_> {
        match self {
            PortSelection::Range(n) => Box::new(1..=*n),
            PortSelection::List(v) => Box::new(v.iter().copied()),
        }
    }
}

/// Parse port list text into a deduplicated list of TCP ports (1..=65535).
///
/// Supported formats, separated by commas or newlines:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
/// - comments: everything after `#` on a line is ignored
/// - whitespace and blank entries are ignored
pub fn parse_ports_str(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("");

        for item in line.split(',').map(str::trim) {
            if item.is_empty() {
                continue;
            }

            if let Some((a, b)) = item.split_once('-') {
                let start = parse_port_str(a.trim())
                    .with_context(|| format!("line {line_no}: invalid start in range: {a}"))?;
                let end = parse_port_str(b.trim())
                    .with_context(|| format!("line {line_no}: invalid end in range: {b}"))?;
                if start > end {
                    bail!("line {line_no}: invalid range {start}-{end} (start > end)");
                }
                for p in start..=end {
                    if seen.insert(p) {
                        out.push(p);
                    }
                }
                continue;
            }

            let p = parse_port_str(item)
                .with_context(|| format!("line {line_no}: invalid port value: {item}"))?;
            if seen.insert(p) {
                out.push(p);
            }
        }
    }

    Ok(out)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
