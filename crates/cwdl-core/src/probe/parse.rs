//! Parse HTTP response header lines collected by the probe.

/// Returns the `Location` value of the last response in `lines`.
///
/// Header lines of interim responses (e.g. `100 Continue`) are discarded when
/// a new status line starts.
pub(crate) fn parse_location(lines: &[String]) -> Option<String> {
    let mut location = None;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            location = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("location") {
                let value = value.trim();
                if !value.is_empty() {
                    location = Some(value.to_string());
                }
            }
        }
    }

    location
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_location_from_302() {
        let lines = [
            "HTTP/1.1 302 Found".to_string(),
            "Content-Length: 0".to_string(),
            "Location: https://cdn.example.com/a.pptx?OSSAccessKeyId=X".to_string(),
        ];
        assert_eq!(
            parse_location(&lines).as_deref(),
            Some("https://cdn.example.com/a.pptx?OSSAccessKeyId=X")
        );
    }

    #[test]
    fn parse_location_case_insensitive() {
        let lines = ["HTTP/2 301".to_string(), "location: /next".to_string()];
        assert_eq!(parse_location(&lines).as_deref(), Some("/next"));
    }

    #[test]
    fn parse_location_absent() {
        let lines = ["HTTP/1.1 200 OK".to_string(), "Content-Type: text/html".to_string()];
        assert!(parse_location(&lines).is_none());
    }

    #[test]
    fn interim_response_headers_discarded() {
        let lines = [
            "HTTP/1.1 100 Continue".to_string(),
            "Location: /wrong".to_string(),
            String::new(),
            "HTTP/1.1 302 Found".to_string(),
            "Location: /right".to_string(),
        ];
        assert_eq!(parse_location(&lines).as_deref(), Some("/right"));
    }
}
