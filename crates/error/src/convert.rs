use crate::{ErrorCode, ErrorContext, QueryError};

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::new(ErrorCode::Io, err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<serde_yaml::Error> for QueryError {
    fn from(err: serde_yaml::Error) -> Self {
        let mut error = QueryError::new(ErrorCode::InvalidYaml, err.to_string());
        if let Some(location) = err.location() {
            error = error.with_hint(format!(
                "Check line {} column {} of the sources file",
                location.line(),
                location.column()
            ));
        }
        error
    }
}

/// Build a `SourceNotFound` error that suggests the closest declared source.
pub fn source_not_found(name: &str, available: &[String]) -> QueryError {
    let mut error = QueryError::new(
        ErrorCode::SourceNotFound,
        format!("Source '{}' not found", name),
    )
    .with_context(ErrorContext::SourceNotFound {
        source_name: name.to_string(),
        available_sources: available.to_vec(),
    });

    if let Some(closest) = find_closest_match(name, available) {
        error = error.with_hint(format!("Did you mean '{}'?", closest));
    }
    error
}

fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("book", "back"), 2);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_source_not_found_hint() {
        let available = vec!["articles".to_string(), "users".to_string()];

        let err = source_not_found("article", &available);
        assert_eq!(err.code, ErrorCode::SourceNotFound);
        assert_eq!(err.hint, Some("Did you mean 'articles'?".to_string()));

        let err = source_not_found("completely_different", &available);
        assert!(err.hint.is_none());
    }

    #[test]
    fn test_io_error_mapping() {
        let io_err = std::io::Error::other("File error");
        let err: QueryError = io_err.into();
        assert_eq!(err.code, ErrorCode::Io);
        assert!(err.message.contains("File error"));
    }

    #[test]
    fn test_yaml_error_mapping() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("a: [").unwrap_err();
        let err: QueryError = yaml_err.into();
        assert_eq!(err.code, ErrorCode::InvalidYaml);
    }
}
