//! Format and parse primitives for numeric attributes and element text.
//!
//! Every field that carries a low-level identifier (PCI bus/slot/function,
//! CCW subchannel ids, ISA ports, SEV policies...) declares its own wire
//! spelling. Two fields that look alike rarely share one: a PCI `domain` is
//! four hex digits, a PCI `function` is as few as possible, and a drive
//! `unit` is plain decimal. Callers pass the spelling explicitly.

use std::num::ParseIntError;

/// How an unsigned value is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintFormat {
    /// Plain decimal, `%d`.
    Decimal,
    /// Lower-case hex with a `0x` prefix, zero padded to `width` digits.
    /// A width of zero renders the minimal number of digits (`0x%x`).
    Hex { width: usize },
}

impl UintFormat {
    /// Minimal-width hex, `0x%x`.
    pub const HEX: UintFormat = UintFormat::Hex { width: 0 };

    /// Render `value` according to this format.
    pub fn render(self, value: u64) -> String {
        match self {
            UintFormat::Decimal => value.to_string(),
            UintFormat::Hex { width } => format!("0x{value:0width$x}"),
        }
    }
}

/// Numeric base a field is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Decimal digits only.
    Decimal,
    /// Hex digits with an optional `0x` prefix.
    Hex,
    /// Prefix driven: `0x` hex, `0o` or a leading `0` octal, `0b` binary,
    /// decimal otherwise.
    Auto,
}

/// Format an optional unsigned value. Absent values are never rendered.
pub fn format_uint<T: Into<u64>>(value: Option<T>, format: UintFormat) -> Option<String> {
    value.map(|value| format.render(value.into()))
}

/// Parse unsigned text under `base`. Surrounding whitespace is ignored.
pub fn parse_uint(text: &str, base: Base) -> Result<u64, ParseIntError> {
    let text = text.trim();
    match base {
        Base::Decimal => text.parse(),
        Base::Hex => u64::from_str_radix(strip_hex_prefix(text).unwrap_or(text), 16),
        Base::Auto => {
            if let Some(hex) = strip_hex_prefix(text) {
                u64::from_str_radix(hex, 16)
            } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
                u64::from_str_radix(oct, 8)
            } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
                u64::from_str_radix(bin, 2)
            } else if text.len() > 1 && text.starts_with('0') {
                u64::from_str_radix(&text[1..], 8)
            } else {
                text.parse()
            }
        }
    }
}

/// Whether `text` spells a hex number with an explicit prefix.
pub fn is_hex_spelling(text: &str) -> bool {
    strip_hex_prefix(text.trim()).is_some()
}

/// Whether an optional string leaf counts as unset for omission rules.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pci_widths() {
        assert_eq!(
            format_uint(Some(0u32), UintFormat::Hex { width: 4 }).as_deref(),
            Some("0x0000")
        );
        assert_eq!(
            format_uint(Some(1u32), UintFormat::Hex { width: 2 }).as_deref(),
            Some("0x01")
        );
        assert_eq!(format_uint(Some(0u32), UintFormat::HEX).as_deref(), Some("0x0"));
        assert_eq!(
            format_uint(Some(0xABu32), UintFormat::HEX).as_deref(),
            Some("0xab"),
            "hex output is lower case"
        );
        assert_eq!(format_uint(None::<u32>, UintFormat::Decimal), None);
    }

    #[test]
    fn hex_prefix_is_optional() {
        assert_eq!(parse_uint("0x1f", Base::Hex).unwrap(), 31);
        assert_eq!(parse_uint("1f", Base::Hex).unwrap(), 31);
        assert_eq!(parse_uint("0X1F", Base::Hex).unwrap(), 31);
        assert!(parse_uint("0x", Base::Hex).is_err());
    }

    #[test]
    fn decimal_rejects_hex_digits() {
        assert_eq!(parse_uint("42", Base::Decimal).unwrap(), 42);
        assert!(parse_uint("0x2a", Base::Decimal).is_err());
        assert!(parse_uint("2a", Base::Decimal).is_err());
    }

    #[test]
    fn auto_base_follows_prefix() {
        assert_eq!(parse_uint("0x10", Base::Auto).unwrap(), 16);
        assert_eq!(parse_uint("010", Base::Auto).unwrap(), 8);
        assert_eq!(parse_uint("0b11", Base::Auto).unwrap(), 3);
        assert_eq!(parse_uint("0", Base::Auto).unwrap(), 0);
        assert_eq!(parse_uint(" 17 ", Base::Auto).unwrap(), 17);
        assert!(parse_uint("09", Base::Auto).is_err());
    }

    #[test]
    fn hex_spelling_detection() {
        assert!(is_hex_spelling("0x0800"));
        assert!(!is_hex_spelling("2048"));
        assert!(!is_hex_spelling("$PORT"));
    }
}
