//! Hex encode/decode for `--hex` mode; plain-text arguments and output otherwise.

/// Decode a command-line argument into raw bytes: as hex if `as_hex`, otherwise as the argument's
/// UTF-8 bytes verbatim.
pub(crate) fn decode_arg(arg: &str, as_hex: bool) -> Result<Vec<u8>, String> {
    if !as_hex {
        return Ok(arg.as_bytes().to_vec());
    }

    let arg = arg.strip_prefix("0x").unwrap_or(arg);
    if arg.len() % 2 != 0 {
        return Err(format!("{arg:?} has an odd number of hex digits"));
    }

    (0..arg.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&arg[i..i + 2], 16).map_err(|_| format!("{arg:?} is not valid hex")))
        .collect()
}

/// Encode raw bytes for output: as hex if `as_hex`, otherwise as lossy UTF-8 text.
pub(crate) fn encode_bytes(bytes: &[u8], as_hex: bool) -> String {
    if as_hex {
        bytes.iter().map(|byte| format!("{byte:02x}")).collect()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
