/// Format bytes as a hex string with spaces
pub fn format_hex_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split an APDU response into its data and the trailing SW1/SW2.
///
/// Returns `None` if the response is too short to carry a status word.
pub fn split_status_word(response: &[u8]) -> Option<(&[u8], u8, u8)> {
    match response {
        [data @ .., sw1, sw2] => Some((data, *sw1, *sw2)),
        _ => None,
    }
}

/// Describe the SW1/SW2 statuses a contactless reader returns to GET DATA
pub fn describe_status_word(sw1: u8, sw2: u8) -> String {
    match (sw1, sw2) {
        (0x90, 0x00) => "Success".to_string(),
        (0x62, 0x82) => "Warning: End of data reached before Le bytes".to_string(),
        (0x63, 0x00) => "Error: Operation failed".to_string(),
        (0x67, 0x00) => "Error: Wrong length".to_string(),
        (0x68, 0x00) => "Error: Class byte not supported".to_string(),
        (0x6A, 0x81) => "Error: Function not supported".to_string(),
        (0x6A, 0x82) => "Error: File not found".to_string(),
        (0x6B, 0x00) => "Error: Wrong parameter(s) P1-P2".to_string(),
        (0x6C, n) => format!("Error: Wrong Le field, exact length: {n}"),
        (0x6D, 0x00) => "Error: Instruction code not supported or invalid".to_string(),
        (0x6E, 0x00) => "Error: Class not supported".to_string(),
        _ => format!("Unknown status: {sw1:02X} {sw2:02X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex_spaced() {
        assert_eq!(format_hex_spaced(&[0x01, 0x02, 0x03, 0x0A]), "01 02 03 0A");
        assert_eq!(format_hex_spaced(&[0xFF]), "FF");
        assert_eq!(format_hex_spaced(&[]), "");
        assert_eq!(format_hex_spaced(&[0x00, 0xFF, 0x7F, 0x80]), "00 FF 7F 80");
    }

    #[test]
    fn test_split_status_word() {
        let response = [0x04, 0xAA, 0xBB, 0xCC, 0x90, 0x00];
        let (data, sw1, sw2) = split_status_word(&response).unwrap();
        assert_eq!(data, &[0x04, 0xAA, 0xBB, 0xCC]);
        assert_eq!((sw1, sw2), (0x90, 0x00));

        let (data, sw1, sw2) = split_status_word(&[0x6A, 0x82]).unwrap();
        assert!(data.is_empty());
        assert_eq!((sw1, sw2), (0x6A, 0x82));
    }

    #[test]
    fn test_split_status_word_too_short() {
        assert!(split_status_word(&[]).is_none());
        assert!(split_status_word(&[0x90]).is_none());
    }

    #[test]
    fn test_describe_status_word() {
        assert_eq!(describe_status_word(0x90, 0x00), "Success");
        assert_eq!(describe_status_word(0x6A, 0x82), "Error: File not found");
        assert_eq!(describe_status_word(0x63, 0x00), "Error: Operation failed");
        assert_eq!(
            describe_status_word(0x6C, 0x08),
            "Error: Wrong Le field, exact length: 8"
        );

        // Unknown status
        assert_eq!(describe_status_word(0x12, 0x34), "Unknown status: 12 34");
    }
}
