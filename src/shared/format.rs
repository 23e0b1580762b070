//! Display helpers shared by the files, shares and dashboard features.

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human readable byte size with at most two decimals ("1.5 KB", "1 MB").
pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && exponent < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }
    let rounded = (scaled * 100.0).round() / 100.0;

    // 2 decimals, trailing zeros trimmed
    let mut number = format!("{:.2}", rounded);
    while number.ends_with('0') {
        number.pop();
    }
    if number.ends_with('.') {
        number.pop();
    }

    format!("{} {}", number, SIZE_UNITS[exponent])
}

/// Lowercased text after the last dot; a name without a dot is its own
/// extension.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => file_name.to_lowercase(),
    }
}

/// Display tag for a file extension.
pub fn file_type_tag(extension: &str) -> String {
    let ext = extension.to_lowercase();
    match ext.as_str() {
        "pdf" => "PDF".to_string(),
        "doc" | "docx" => "DOCX".to_string(),
        "jpg" | "jpeg" | "png" | "gif" => "IMG".to_string(),
        "xls" | "xlsx" => "EXCEL".to_string(),
        "ppt" | "pptx" => "PPT".to_string(),
        "txt" => "TXT".to_string(),
        "" => "FILE".to_string(),
        other => other.to_uppercase(),
    }
}

/// Share of `quota` used by `used`, rounded to a whole percent.
pub fn storage_percent(used: i64, quota: i64) -> i64 {
    if quota <= 0 {
        return 0;
    }
    ((used as f64 / quota as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(1_073_741_824), "1 GB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "readme");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn test_file_type_tag() {
        assert_eq!(file_type_tag("pdf"), "PDF");
        assert_eq!(file_type_tag("doc"), "DOCX");
        assert_eq!(file_type_tag("JPEG"), "IMG");
        assert_eq!(file_type_tag("xlsx"), "EXCEL");
        assert_eq!(file_type_tag("pptx"), "PPT");
        assert_eq!(file_type_tag("txt"), "TXT");
        assert_eq!(file_type_tag("zip"), "ZIP");
    }

    #[test]
    fn test_storage_percent() {
        assert_eq!(storage_percent(0, 1_073_741_824), 0);
        assert_eq!(storage_percent(536_870_912, 1_073_741_824), 50);
        assert_eq!(storage_percent(10, 0), 0);
    }
}
